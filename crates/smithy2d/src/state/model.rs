//! # Scene → Room → Variant
//!
//! The persistent hierarchy of a project:
//!
//! ```text
//! ProjectDocument
//!   scenes[]        Scene   { guid, name, active_room_index, dirty }
//!     rooms[]       Room    { guid, name, location, size, active_variant_index }
//!       variants[]  Variant { guid, name, object_states[] }
//! ```
//!
//! Every item carries a guid that never changes; names are labels that may be
//! renamed. Lists and names are only mutated through
//! [`Project`](crate::project::Project), which keeps the guid map and the
//! disk in step. Read access is public.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SmithyError};
use crate::math::Vec2;
use crate::persist::paths::{self, AssetPath};
use crate::state::object_state::ObjectState;
use crate::state::versioning::{FORMAT_VERSION, Version};

/// Stable identity of a hierarchy item.
pub type Guid = Uuid;

/// Index path to one hierarchy item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Scene(usize),
    Room(usize, usize),
    Variant(usize, usize, usize),
}

impl NodeRef {
    pub fn kind(&self) -> &'static str {
        match self {
            NodeRef::Scene(..) => "scene",
            NodeRef::Room(..) => "room",
            NodeRef::Variant(..) => "variant",
        }
    }
}

/// `base`, or `base_1`, `base_2`, ... whichever is free first.
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

// ── Variant ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    guid: Guid,
    name: String,
    #[serde(default)]
    pub object_states: Vec<ObjectState>,
}

impl Variant {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_guid(Uuid::new_v4(), name)
    }

    pub fn with_guid(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
            object_states: Vec::new(),
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

// ── Room ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    guid: Guid,
    name: String,
    /// Top-left corner on the scene map.
    pub location: Vec2,
    pub size: Vec2,
    #[serde(default)]
    variants: Vec<Variant>,
    #[serde(default)]
    active_variant_index: Option<usize>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_guid(Uuid::new_v4(), name)
    }

    pub fn with_guid(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
            location: Vec2::ZERO,
            size: Vec2::new(1.0, 1.0),
            variants: Vec::new(),
            active_variant_index: None,
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, index: usize) -> Option<&Variant> {
        self.variants.get(index)
    }

    pub fn variant_index(&self, name: &str) -> Option<usize> {
        self.variants.iter().position(|v| v.name == name)
    }

    pub fn active_variant_index(&self) -> Option<usize> {
        self.active_variant_index
    }

    pub fn active_variant(&self) -> Option<&Variant> {
        self.variants.get(self.active_variant_index?)
    }

    pub(crate) fn variants_mut(&mut self) -> &mut Vec<Variant> {
        &mut self.variants
    }

    /// Map hit test against the room rectangle.
    pub fn contains(&self, point: Vec2) -> bool {
        let max = self.location + self.size;
        point.x >= self.location.x
            && point.x <= max.x
            && point.y >= self.location.y
            && point.y <= max.y
    }
}

// ── Scene ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    guid: Guid,
    name: String,
    #[serde(default)]
    rooms: Vec<Room>,
    #[serde(default)]
    active_room_index: Option<usize>,
    /// Changed since the last export.
    #[serde(default)]
    pub dirty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_image: Option<String>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_guid(Uuid::new_v4(), name)
    }

    pub fn with_guid(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
            rooms: Vec::new(),
            active_room_index: None,
            dirty: true,
            map_image: None,
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, index: usize) -> Option<&Room> {
        self.rooms.get(index)
    }

    pub fn room_index(&self, name: &str) -> Option<usize> {
        self.rooms.iter().position(|r| r.name == name)
    }

    pub fn active_room_index(&self) -> Option<usize> {
        self.active_room_index
    }

    pub fn active_room(&self) -> Option<&Room> {
        self.rooms.get(self.active_room_index?)
    }

    pub(crate) fn rooms_mut(&mut self) -> &mut Vec<Room> {
        &mut self.rooms
    }
}

// ── Document ────────────────────────────────────────────────────────────

fn unversioned() -> Version {
    Version::new(0, 0, 0)
}

/// The whole hierarchy as persisted in the project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default = "unversioned")]
    pub version: Version,
    #[serde(default)]
    scenes: Vec<Scene>,
    #[serde(default)]
    active_scene_index: Option<usize>,
}

impl Default for ProjectDocument {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            scenes: Vec::new(),
            active_scene_index: None,
        }
    }
}

impl ProjectDocument {
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scene(&self, index: usize) -> Option<&Scene> {
        self.scenes.get(index)
    }

    pub fn scene_index(&self, name: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.name == name)
    }

    pub fn active_scene_index(&self) -> Option<usize> {
        self.active_scene_index
    }

    pub fn active_scene(&self) -> Option<&Scene> {
        self.scenes.get(self.active_scene_index?)
    }

    pub fn room(&self, scene: usize, room: usize) -> Option<&Room> {
        self.scene(scene)?.room(room)
    }

    pub fn variant(&self, scene: usize, room: usize, variant: usize) -> Option<&Variant> {
        self.room(scene, room)?.variant(variant)
    }

    // ── Crate-internal mutation ──────────────────────────────────────

    pub(crate) fn scenes_mut(&mut self) -> &mut Vec<Scene> {
        &mut self.scenes
    }

    pub(crate) fn set_active_scene_index(&mut self, index: Option<usize>) {
        self.active_scene_index = index;
    }

    pub(crate) fn scene_mut(&mut self, index: usize) -> Result<&mut Scene> {
        self.scenes
            .get_mut(index)
            .ok_or_else(|| SmithyError::NotFound(format!("scene #{index}")))
    }

    pub(crate) fn rooms_mut(&mut self, scene: usize) -> Result<&mut Vec<Room>> {
        Ok(&mut self.scene_mut(scene)?.rooms)
    }

    pub(crate) fn room_mut(&mut self, scene: usize, room: usize) -> Result<&mut Room> {
        self.scene_mut(scene)?
            .rooms
            .get_mut(room)
            .ok_or_else(|| SmithyError::NotFound(format!("room #{room} in scene #{scene}")))
    }

    pub(crate) fn variants_mut(&mut self, scene: usize, room: usize) -> Result<&mut Vec<Variant>> {
        Ok(&mut self.room_mut(scene, room)?.variants)
    }

    pub fn variant_mut(&mut self, scene: usize, room: usize, variant: usize) -> Result<&mut Variant> {
        self.room_mut(scene, room)?
            .variants
            .get_mut(variant)
            .ok_or_else(|| SmithyError::NotFound(format!("variant #{variant} in room #{room}")))
    }

    pub(crate) fn set_active_room_index(&mut self, scene: usize, index: Option<usize>) -> Result<()> {
        self.scene_mut(scene)?.active_room_index = index;
        Ok(())
    }

    pub(crate) fn set_active_variant_index(
        &mut self,
        scene: usize,
        room: usize,
        index: Option<usize>,
    ) -> Result<()> {
        self.room_mut(scene, room)?.active_variant_index = index;
        Ok(())
    }

    // ── Node helpers ─────────────────────────────────────────────────

    /// Fails if any index in `node` is out of range.
    pub fn check(&self, node: NodeRef) -> Result<()> {
        let found = match node {
            NodeRef::Scene(s) => self.scene(s).is_some(),
            NodeRef::Room(s, r) => self.room(s, r).is_some(),
            NodeRef::Variant(s, r, v) => self.variant(s, r, v).is_some(),
        };
        if found {
            Ok(())
        } else {
            Err(SmithyError::NotFound(format!("{node:?}")))
        }
    }

    pub fn name_of(&self, node: NodeRef) -> Result<&str> {
        self.check(node)?;
        Ok(match node {
            NodeRef::Scene(s) => &self.scenes[s].name,
            NodeRef::Room(s, r) => &self.scenes[s].rooms[r].name,
            NodeRef::Variant(s, r, v) => &self.scenes[s].rooms[r].variants[v].name,
        })
    }

    pub fn guid_of(&self, node: NodeRef) -> Result<Guid> {
        self.check(node)?;
        Ok(match node {
            NodeRef::Scene(s) => self.scenes[s].guid,
            NodeRef::Room(s, r) => self.scenes[s].rooms[r].guid,
            NodeRef::Variant(s, r, v) => self.scenes[s].rooms[r].variants[v].guid,
        })
    }

    /// The asset path the item maps to under its current names.
    pub fn asset_path(&self, node: NodeRef) -> Result<String> {
        self.check(node)?;
        Ok(match node {
            NodeRef::Scene(s) => paths::scene_dir(&self.scenes[s].name),
            NodeRef::Room(s, r) => {
                paths::room_dir(&self.scenes[s].name, &self.scenes[s].rooms[r].name)
            }
            NodeRef::Variant(s, r, v) => {
                let room = &self.scenes[s].rooms[r];
                paths::variant_script(&self.scenes[s].name, &room.name, &room.variants[v].name)
            }
        })
    }

    pub(crate) fn set_name(&mut self, node: NodeRef, name: String) -> Result<()> {
        self.check(node)?;
        match node {
            NodeRef::Scene(s) => self.scenes[s].name = name,
            NodeRef::Room(s, r) => self.scenes[s].rooms[r].name = name,
            NodeRef::Variant(s, r, v) => self.scenes[s].rooms[r].variants[v].name = name,
        }
        Ok(())
    }

    /// Whether a sibling of `node` (other than `node` itself) is called `name`.
    pub fn sibling_has_name(&self, node: NodeRef, name: &str) -> bool {
        match node {
            NodeRef::Scene(s) => self
                .scenes
                .iter()
                .enumerate()
                .any(|(i, x)| i != s && x.name == name),
            NodeRef::Room(s, r) => self.scene(s).is_some_and(|scene| {
                scene
                    .rooms
                    .iter()
                    .enumerate()
                    .any(|(i, x)| i != r && x.name == name)
            }),
            NodeRef::Variant(s, r, v) => self.room(s, r).is_some_and(|room| {
                room.variants
                    .iter()
                    .enumerate()
                    .any(|(i, x)| i != v && x.name == name)
            }),
        }
    }

    /// Guids of `node` and everything below it.
    pub fn subtree_guids(&self, node: NodeRef) -> Result<Vec<Guid>> {
        self.check(node)?;
        let mut guids = Vec::new();
        match node {
            NodeRef::Scene(s) => {
                let scene = &self.scenes[s];
                guids.push(scene.guid);
                for room in &scene.rooms {
                    guids.push(room.guid);
                    guids.extend(room.variants.iter().map(|v| v.guid));
                }
            }
            NodeRef::Room(s, r) => {
                let room = &self.scenes[s].rooms[r];
                guids.push(room.guid);
                guids.extend(room.variants.iter().map(|v| v.guid));
            }
            NodeRef::Variant(s, r, v) => guids.push(self.scenes[s].rooms[r].variants[v].guid),
        }
        Ok(guids)
    }

    /// Every item, parents before children.
    pub fn nodes(&self) -> Vec<NodeRef> {
        let mut nodes = Vec::new();
        for (s, scene) in self.scenes.iter().enumerate() {
            nodes.push(NodeRef::Scene(s));
            for (r, room) in scene.rooms.iter().enumerate() {
                nodes.push(NodeRef::Room(s, r));
                nodes.extend((0..room.variants.len()).map(|v| NodeRef::Variant(s, r, v)));
            }
        }
        nodes
    }

    /// The item an asset path names, if it exists in memory.
    pub fn resolve(&self, path: &AssetPath) -> Option<NodeRef> {
        match path {
            AssetPath::Scene { scene } => Some(NodeRef::Scene(self.scene_index(scene)?)),
            AssetPath::Room { scene, room } => {
                let s = self.scene_index(scene)?;
                Some(NodeRef::Room(s, self.scenes[s].room_index(room)?))
            }
            AssetPath::Variant {
                scene,
                room,
                variant,
            } => {
                let s = self.scene_index(scene)?;
                let r = self.scenes[s].room_index(room)?;
                Some(NodeRef::Variant(s, r, self.scenes[s].rooms[r].variant_index(variant)?))
            }
            _ => None,
        }
    }

    pub fn mark_dirty(&mut self, scene: usize) {
        if let Some(scene) = self.scenes.get_mut(scene) {
            scene.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> ProjectDocument {
        let mut doc = ProjectDocument::default();
        let mut scene = Scene::new("Forest");
        let mut room = Room::new("Clearing");
        room.variants.push(Variant::new("Day"));
        room.variants.push(Variant::new("Night"));
        scene.rooms.push(room);
        scene.rooms.push(Room::new("Cave"));
        doc.scenes.push(scene);
        doc
    }

    #[test]
    fn unique_names_get_numeric_suffix() {
        let taken = ["Room", "Room_1"];
        assert_eq!(unique_name("Room", |n| taken.contains(&n)), "Room_2");
        assert_eq!(unique_name("Hall", |n| taken.contains(&n)), "Hall");
    }

    #[test]
    fn asset_paths_follow_names() {
        let doc = document();
        assert_eq!(doc.asset_path(NodeRef::Scene(0)).unwrap(), "scripts/Forest");
        assert_eq!(doc.asset_path(NodeRef::Room(0, 1)).unwrap(), "scripts/Forest/Cave");
        assert_eq!(
            doc.asset_path(NodeRef::Variant(0, 0, 1)).unwrap(),
            "scripts/Forest/Clearing/states/Night.lua"
        );
        assert!(doc.asset_path(NodeRef::Variant(0, 1, 0)).is_err());
    }

    #[test]
    fn resolve_by_path() {
        let doc = document();
        let path = AssetPath::parse("scripts/Forest/Clearing/states/Night.lua").unwrap();
        assert_eq!(doc.resolve(&path), Some(NodeRef::Variant(0, 0, 1)));
        let missing = AssetPath::parse("scripts/Desert").unwrap();
        assert_eq!(doc.resolve(&missing), None);
    }

    #[test]
    fn subtree_and_siblings() {
        let doc = document();
        assert_eq!(doc.subtree_guids(NodeRef::Scene(0)).unwrap().len(), 5);
        assert_eq!(doc.subtree_guids(NodeRef::Room(0, 0)).unwrap().len(), 3);
        assert!(doc.sibling_has_name(NodeRef::Variant(0, 0, 0), "Night"));
        assert!(!doc.sibling_has_name(NodeRef::Variant(0, 0, 0), "Day"));
        assert_eq!(doc.nodes().len(), 5);
    }

    #[test]
    fn room_hit_test() {
        let mut room = Room::new("R");
        room.location = Vec2::new(10.0, 10.0);
        room.size = Vec2::new(5.0, 5.0);
        assert!(room.contains(Vec2::new(12.0, 14.0)));
        assert!(!room.contains(Vec2::new(16.0, 12.0)));
    }

    #[test]
    fn documents_without_version_are_unversioned() {
        let doc: ProjectDocument = serde_json::from_str("{\"scenes\": []}").unwrap();
        assert_eq!(doc.version, Version::new(0, 0, 0));
        assert_eq!(ProjectDocument::default().version, FORMAT_VERSION);
    }
}
