//! # Project — The Editing Session
//!
//! A [`Project`] is everything that exists while a project folder is open:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ Project                                                    │
//! │                                                            │
//! │  config    ProjectConfig      smithy2d.toml or defaults    │
//! │  fs        Box<dyn AssetFs>   all hierarchy file moves     │
//! │  guids     GuidMap            guid ↔ asset path            │
//! │  registry  ComponentRegistry  parsed component scripts     │
//! │  doc       ProjectDocument    scenes / rooms / variants    │
//! │  world     World              the live entities            │
//! │  hooks     StateHooks         per-object save/load hooks   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Opening a project builds all of it and materializes the active variant.
//! Dropping (or [`close`](Project::close)-ing) it ends the session; nothing
//! is global.
//!
//! The state switch lives in [`crate::state::switch`], rename / delete /
//! sync in [`crate::persist`], export in [`crate::export`]. They are all
//! methods on `Project`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::component::instance::ComponentInstance;
use crate::component::registry::ComponentRegistry;
use crate::config::ProjectConfig;
use crate::error::{IoResultExt, Result, SmithyError};
use crate::persist::fs::{AssetFs, DiskFs};
use crate::persist::guid_map::GuidMap;
use crate::persist::paths::{self, ScriptScope};
use crate::persist::write_atomic;
use crate::state::hooks::StateHooks;
use crate::state::object_state::ObjectState;
use crate::state::model::{ProjectDocument, Room, Scene, Variant, unique_name};
use crate::state::switch::StateKey;
use crate::state::versioning::upgrade_document;
use crate::world::{Entity, EntityData, World};

pub struct Project {
    root: PathBuf,
    pub(crate) config: ProjectConfig,
    pub(crate) fs: Box<dyn AssetFs>,
    pub(crate) guids: GuidMap,
    pub(crate) registry: ComponentRegistry,
    pub(crate) doc: ProjectDocument,
    pub(crate) world: World,
    pub(crate) hooks: StateHooks,
}

impl Project {
    /// Open the project at `root` with its `smithy2d.toml` (if any).
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config = ProjectConfig::load(&root)?;
        Self::open_with(root, config, Box::new(DiskFs))
    }

    pub fn open_with(
        root: impl Into<PathBuf>,
        config: ProjectConfig,
        fs: Box<dyn AssetFs>,
    ) -> Result<Self> {
        let root = root.into();
        let guids = GuidMap::load(config.guid_map_path(&root))?;

        let doc_path = config.project_file_path(&root);
        let mut doc = if doc_path.exists() {
            let text = std::fs::read_to_string(&doc_path).at(&doc_path)?;
            serde_json::from_str(&text)?
        } else {
            ProjectDocument::default()
        };
        upgrade_document(&mut doc);

        let mut project = Self {
            registry: ComponentRegistry::new(&root),
            root,
            config,
            fs,
            guids,
            doc,
            world: World::new(),
            hooks: StateHooks::default(),
        };
        if project.active_state().variant.is_some() {
            let report = project.reload_active_state()?;
            log::info!(
                "Opened project {} ({} objects live)",
                project.root.display(),
                report.loaded
            );
        } else {
            log::info!("Opened project {}", project.root.display());
        }
        Ok(project)
    }

    /// Capture the live state into the active variant and write the project
    /// file.
    pub fn save(&mut self) -> Result<()> {
        self.save_active_state()?;
        let path = self.config.project_file_path(&self.root);
        let text = serde_json::to_string_pretty(&self.doc)?;
        write_atomic(&path, &text)?;
        log::info!("Saved project to {}", path.display());
        Ok(())
    }

    /// Save and end the session.
    pub fn close(mut self) -> Result<()> {
        self.save()
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn document(&self) -> &ProjectDocument {
        &self.doc
    }

    /// Direct access to stored object states. Scene and item names stay
    /// behind the rename API.
    pub fn document_mut(&mut self) -> &mut ProjectDocument {
        &mut self.doc
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn guid_map(&self) -> &GuidMap {
        &self.guids
    }

    /// Run `hook` for every entity captured into a variant.
    pub fn add_object_save_hook(
        &mut self,
        hook: impl Fn(&EntityData, &mut ObjectState) + 'static,
    ) {
        self.hooks.on_save(hook);
    }

    /// Run `hook` for every entity restored from a variant.
    pub fn add_object_load_hook(
        &mut self,
        hook: impl Fn(&ObjectState, &mut EntityData) + 'static,
    ) {
        self.hooks.on_load(hook);
    }

    pub(crate) fn abspath(&self, assetpath: &str) -> PathBuf {
        paths::asset_abspath(&self.root, assetpath)
    }

    /// The live `(scene, room, variant)` triple.
    pub fn active_state(&self) -> StateKey {
        let scene = self.doc.active_scene_index();
        let room = scene.and_then(|s| self.doc.scene(s)?.active_room_index());
        let variant = scene
            .zip(room)
            .and_then(|(s, r)| self.doc.room(s, r)?.active_variant_index());
        StateKey {
            scene,
            room,
            variant,
        }
    }

    /// Scope for resolving component scripts of `key`.
    pub fn scope_of(&self, key: StateKey) -> ScriptScope {
        let scene = key.scene.and_then(|s| self.doc.scene(s));
        let room = scene.zip(key.room).and_then(|(scene, r)| scene.room(r));
        ScriptScope::new(scene.map(Scene::name), room.map(Room::name))
    }

    pub fn scope(&self) -> ScriptScope {
        self.scope_of(self.active_state())
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Create a scene with a default room and variant. The first scene of a
    /// project becomes active and adopts whatever is live.
    pub fn add_scene(&mut self, name: &str) -> Result<usize> {
        paths::validate_scene_name(name)?;
        let name = unique_name(name, |n| self.doc.scene_index(n).is_some());
        let scene = Scene::new(&name);
        let path = paths::scene_dir(&name);
        let abspath = self.abspath(&path);
        self.fs.create_dir_all(&abspath).at(&abspath)?;
        self.guids.bind(scene.guid(), &path)?;

        let scenes = self.doc.scenes_mut();
        scenes.push(scene);
        let index = scenes.len() - 1;

        let default_room = self.config.default_room_name.clone();
        let room = self.add_room(index, &default_room)?;
        self.doc.set_active_room_index(index, Some(room))?;
        if self.doc.active_scene_index().is_none() {
            self.doc.set_active_scene_index(Some(index));
        }
        log::info!("Created scene '{name}'");
        Ok(index)
    }

    /// Create a room with a default variant.
    pub fn add_room(&mut self, scene: usize, name: &str) -> Result<usize> {
        paths::validate_name(name)?;
        let scene_ref = self
            .doc
            .scene(scene)
            .ok_or_else(|| SmithyError::NotFound(format!("scene #{scene}")))?;
        let name = unique_name(name, |n| scene_ref.room_index(n).is_some());
        let path = paths::room_dir(scene_ref.name(), &name);
        let room = Room::new(&name);
        let abspath = self.abspath(&path);
        self.fs.create_dir_all(&abspath).at(&abspath)?;
        self.guids.bind(room.guid(), &path)?;

        let rooms = self.doc.rooms_mut(scene)?;
        rooms.push(room);
        let index = rooms.len() - 1;

        let default_variant = self.config.default_variant_name.clone();
        self.add_variant(scene, index, &default_variant)?;
        self.doc.mark_dirty(scene);
        log::info!("Created room '{name}'");
        Ok(index)
    }

    /// Create a variant and its script stub. If the room has no active
    /// variant, the new one becomes active without loading anything, so it
    /// adopts the current live state on the next save.
    pub fn add_variant(&mut self, scene: usize, room: usize, name: &str) -> Result<usize> {
        paths::validate_name(name)?;
        let scene_ref = self
            .doc
            .scene(scene)
            .ok_or_else(|| SmithyError::NotFound(format!("scene #{scene}")))?;
        let room_ref = scene_ref
            .room(room)
            .ok_or_else(|| SmithyError::NotFound(format!("room #{room} in scene #{scene}")))?;
        let name = unique_name(name, |n| room_ref.variant_index(n).is_some());
        let path = paths::variant_script(scene_ref.name(), room_ref.name(), &name);
        let stub = variant_stub(&name, room_ref.name());
        let has_active = room_ref.active_variant_index().is_some();

        let variant = Variant::new(&name);
        let abspath = self.abspath(&path);
        self.fs.write_new(&abspath, &stub).at(&abspath)?;
        self.guids.bind(variant.guid(), &path)?;

        let variants = self.doc.variants_mut(scene, room)?;
        variants.push(variant);
        let index = variants.len() - 1;
        if !has_active {
            self.doc.set_active_variant_index(scene, room, Some(index))?;
        }
        self.doc.mark_dirty(scene);
        log::info!("Created variant '{name}' at {path}");
        Ok(index)
    }

    /// Write a stub script for a component that has none yet. Local
    /// components go into the active room. Returns the asset path.
    pub fn new_component_script(&mut self, name: &str, is_global: bool) -> Result<String> {
        paths::validate_name(name)?;
        let path = paths::component_script(&self.scope(), name, is_global)
            .ok_or_else(|| SmithyError::NotFound("active room for a local component".into()))?;
        let abspath = self.abspath(&path);
        self.fs.write_new(&abspath, COMPONENT_STUB).at(&abspath)?;
        log::info!("Created component script {path}");
        Ok(path)
    }

    // ── Live components ──────────────────────────────────────────────

    /// Attach a component to a live entity, resolving local scripts in the
    /// active room.
    pub fn add_component(
        &mut self,
        entity: Entity,
        name: &str,
        is_global: bool,
    ) -> Result<&mut ComponentInstance> {
        let scope = self.scope();
        let data = self
            .world
            .get_mut(entity)
            .ok_or_else(|| SmithyError::NotFound(format!("entity {entity}")))?;
        Ok(data
            .components
            .add_component(name, is_global, &mut self.registry, &scope))
    }

    pub fn remove_component(&mut self, entity: Entity, name: &str) -> Option<ComponentInstance> {
        self.world.get_mut(entity)?.components.remove_component(name)
    }

    /// The per-tick poll: recompile every script used by a live entity and
    /// re-apply changed schemas. Returns the number of scripts recompiled.
    pub fn tick(&mut self) -> usize {
        let scope = self.scope();
        let used: HashSet<String> = self
            .world
            .active_entities()
            .flat_map(|(_, d)| d.components.iter())
            .filter_map(|c| c.assetpath(&scope))
            .collect();

        let mut changed = HashSet::new();
        for path in used {
            let abspath = paths::asset_abspath(&self.root, &path);
            let component = self.registry.get_or_create(&path);
            component.recompile_if_changed(&abspath);
            if component.take_inputs_changed() {
                changed.insert(path);
            }
        }
        if changed.is_empty() {
            return 0;
        }

        for entity in self.world.entity_handles() {
            let Some(data) = self.world.get_mut(entity) else {
                continue;
            };
            for instance in data.components.iter_mut() {
                if instance
                    .assetpath(&scope)
                    .is_some_and(|p| changed.contains(&p))
                {
                    self.registry.refresh_instance(&scope, instance);
                }
            }
        }
        log::info!("Reloaded {} component script(s)", changed.len());
        changed.len()
    }
}

fn variant_stub(variant: &str, room: &str) -> String {
    format!("-- State script for '{variant}' in room '{room}'.\nlocal state = {{}}\n\nreturn state\n")
}

const COMPONENT_STUB: &str = "--$enabled(bool, true)\nlocal Component = {}\n\nreturn Component\n";
