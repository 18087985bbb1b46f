//! # Sync — Reconcile Memory With Disk
//!
//! Scripts get renamed, copied and deleted outside the editor. `sync_with_disk`
//! brings the in-memory hierarchy back in line in two phases:
//!
//! 1. **Adopt.** For every item in memory, look its guid up in the guid map.
//!    If the bound path derives a different name, the item takes that name
//!    (the file was renamed outside the editor). Items with no binding get
//!    bound to their current path.
//! 2. **Discover.** Walk `scripts/` (skipping `core`). Every scene folder,
//!    room folder and `states/*.lua` script with no in-memory item becomes
//!    one. A guid bound to that path that no item claims is reused, otherwise
//!    a fresh guid is bound.
//!
//! Running it twice in a row changes nothing the second time.

use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{IoResultExt, Result};
use crate::persist::fs::DirEntry;
use crate::persist::paths::{self, AssetPath};
use crate::project::Project;
use crate::state::model::{Guid, NodeRef, Room, Scene, Variant};

/// What a sync changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items that took a new name from the guid map, by their bound path.
    pub renamed: Vec<String>,
    /// Items that had no binding and were bound to their current path.
    pub bound: usize,
    /// Items discovered on disk, by asset path.
    pub added: Vec<String>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.renamed.is_empty() && self.bound == 0 && self.added.is_empty()
    }
}

impl Project {
    pub fn sync_with_disk(&mut self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        self.adopt_bound_names(&mut report)?;
        self.discover_on_disk(&mut report)?;
        if !report.is_empty() {
            log::info!(
                "Synced with disk: {} renamed, {} bound, {} added",
                report.renamed.len(),
                report.bound,
                report.added.len()
            );
        }
        Ok(report)
    }

    fn adopt_bound_names(&mut self, report: &mut SyncReport) -> Result<()> {
        // Parents come first, so a renamed scene is in place before its
        // rooms compute their paths.
        for node in self.doc.nodes() {
            let guid = self.doc.guid_of(node)?;
            let Some(bound) = self.guids.path(guid).map(str::to_string) else {
                let path = self.doc.asset_path(node)?;
                self.guids.bind(guid, &path)?;
                report.bound += 1;
                continue;
            };
            let derived = match AssetPath::parse(&bound) {
                Ok(parsed) => parsed.derived_name().map(str::to_string),
                Err(err) => {
                    log::warn!("Guid {guid} is bound to an unusable path: {err}");
                    None
                }
            };
            let current = self.doc.name_of(node)?.to_string();
            if let Some(name) = derived.filter(|n| *n != current) {
                log::info!("{} '{current}' renamed on disk to '{name}'", node.kind());
                self.doc.set_name(node, name)?;
                self.doc.mark_dirty(scene_of(node));
                report.renamed.push(bound);
            }
        }
        Ok(())
    }

    fn discover_on_disk(&mut self, report: &mut SyncReport) -> Result<()> {
        let mut claimed: HashSet<Guid> = self
            .doc
            .nodes()
            .into_iter()
            .filter_map(|node| self.doc.guid_of(node).ok())
            .collect();

        for scene_entry in self.list(paths::SCRIPTS_DIR)? {
            if !scene_entry.is_dir
                || scene_entry.name == paths::CORE_DIR
                || paths::validate_scene_name(&scene_entry.name).is_err()
            {
                continue;
            }
            let scene_path = paths::scene_dir(&scene_entry.name);
            let s = match self.doc.scene_index(&scene_entry.name) {
                Some(s) => s,
                None => {
                    let guid = self.claim(&scene_path, &mut claimed)?;
                    let scenes = self.doc.scenes_mut();
                    scenes.push(Scene::with_guid(guid, &scene_entry.name));
                    report.added.push(scene_path.clone());
                    scenes.len() - 1
                }
            };

            for room_entry in self.list(&scene_path)? {
                if !room_entry.is_dir || paths::validate_name(&room_entry.name).is_err() {
                    continue;
                }
                let room_path = paths::room_dir(&scene_entry.name, &room_entry.name);
                let existing = self.doc.scene(s).and_then(|x| x.room_index(&room_entry.name));
                let r = match existing {
                    Some(r) => r,
                    None => {
                        let guid = self.claim(&room_path, &mut claimed)?;
                        let rooms = self.doc.rooms_mut(s)?;
                        rooms.push(Room::with_guid(guid, &room_entry.name));
                        let r = rooms.len() - 1;
                        self.doc.mark_dirty(s);
                        report.added.push(room_path.clone());
                        r
                    }
                };

                let states = format!("{room_path}/{}", paths::STATES_DIR);
                for file in self.list(&states)? {
                    let Some(variant) = variant_name(&file) else {
                        continue;
                    };
                    if self.doc.room(s, r).and_then(|x| x.variant_index(variant)).is_some() {
                        continue;
                    }
                    let variant_path =
                        paths::variant_script(&scene_entry.name, &room_entry.name, variant);
                    let guid = self.claim(&variant_path, &mut claimed)?;
                    self.doc
                        .variants_mut(s, r)?
                        .push(Variant::with_guid(guid, variant));
                    self.doc.mark_dirty(s);
                    report.added.push(variant_path);
                }
            }
        }
        Ok(())
    }

    fn list(&self, assetpath: &str) -> Result<Vec<DirEntry>> {
        let abspath = self.abspath(assetpath);
        self.fs.list_dir(&abspath).at(&abspath)
    }

    /// The guid for a newly discovered item at `path`: the one bound there if
    /// no item holds it yet, a fresh one otherwise. Bound before returning.
    fn claim(&mut self, path: &str, claimed: &mut HashSet<Guid>) -> Result<Guid> {
        let guid = self
            .guids
            .guid(path)
            .filter(|g| !claimed.contains(g))
            .unwrap_or_else(Uuid::new_v4);
        self.guids.bind(guid, path)?;
        claimed.insert(guid);
        Ok(guid)
    }
}

fn scene_of(node: NodeRef) -> usize {
    match node {
        NodeRef::Scene(s) | NodeRef::Room(s, _) | NodeRef::Variant(s, _, _) => s,
    }
}

fn variant_name(entry: &DirEntry) -> Option<&str> {
    if entry.is_dir {
        return None;
    }
    entry
        .name
        .strip_suffix(&format!(".{}", paths::SCRIPT_EXT))
        .filter(|stem| paths::validate_name(stem).is_ok())
}
