//! Deleting scenes, rooms, variants and component scripts.
//!
//! Nothing is destroyed: the item's folder or script is moved into the
//! archive directory (suffixed on collision), its guids are pruned from the
//! map, and the item leaves the in-memory list. If the deleted item was live
//! the active indices are re-derived and the new active state is loaded.

use std::path::PathBuf;

use crate::error::{Result, SmithyError};
use crate::persist::fs::collision_free;
use crate::persist::paths::{self, AssetPath};
use crate::project::Project;
use crate::state::model::NodeRef;
use crate::state::switch::Outgoing;

/// Active index after removing `deleted` from a list now `len` long.
pub(crate) fn rederive_active(active: Option<usize>, deleted: usize, len: usize) -> Option<usize> {
    let active = active?;
    if len == 0 {
        None
    } else if active > deleted {
        Some(active - 1)
    } else {
        Some(active.min(len - 1))
    }
}

impl Project {
    /// Archive `target` and drop it from the project.
    pub fn delete(&mut self, target: NodeRef) -> Result<()> {
        let path = self.doc.asset_path(target)?;
        if AssetPath::parse(&path)?.is_protected() {
            return Err(SmithyError::ProtectedPath(path));
        }
        let guids = self.doc.subtree_guids(target)?;
        let name = self.doc.name_of(target)?.to_string();
        let live = self.is_live(target);
        let live_room = self.outgoing(self.active_state())?.room;

        let archived = self.archive(&path)?;
        if let Err(err) = self.guids.remove_subtree(&guids, &path) {
            log::error!("Delete of '{name}' failed: {err}");
            if let Some(archived) = archived {
                if let Err(undo) = self.fs.move_merge(&archived, &self.abspath(&path)) {
                    log::error!("Could not restore {path} from the archive: {undo}");
                }
            }
            return Err(err);
        }
        self.registry.forget_prefix(&path);

        match target {
            NodeRef::Scene(s) => {
                let scenes = self.doc.scenes_mut();
                scenes.remove(s);
                let len = scenes.len();
                let active = rederive_active(self.doc.active_scene_index(), s, len);
                self.doc.set_active_scene_index(active);
            }
            NodeRef::Room(s, r) => {
                let rooms = self.doc.rooms_mut(s)?;
                rooms.remove(r);
                let len = rooms.len();
                let active = self.doc.scene(s).and_then(|x| x.active_room_index());
                self.doc.set_active_room_index(s, rederive_active(active, r, len))?;
                self.doc.mark_dirty(s);
            }
            NodeRef::Variant(s, r, v) => {
                let variants = self.doc.variants_mut(s, r)?;
                variants.remove(v);
                let len = variants.len();
                let active = self.doc.room(s, r).and_then(|x| x.active_variant_index());
                self.doc.set_active_variant_index(s, r, rederive_active(active, v, len))?;
                self.doc.mark_dirty(s);
            }
        }
        log::info!("Deleted {} '{name}' ({path} archived)", target.kind());

        if live {
            let outgoing = Outgoing {
                room: live_room,
                variant: None,
            };
            self.transition(outgoing, self.active_state())?;
        }
        Ok(())
    }

    /// Delete whatever `assetpath` names: a hierarchy item or a component
    /// script. The scripts root, `core` and everything in it other than
    /// component scripts are refused before anything is touched.
    pub fn delete_asset_path(&mut self, assetpath: &str) -> Result<()> {
        let core = format!("{}/{}", paths::SCRIPTS_DIR, paths::CORE_DIR);
        let parsed = match AssetPath::parse(assetpath) {
            Err(_) if paths::is_under(assetpath, &core) => None,
            parsed => Some(parsed?),
        };
        let Some(parsed) = parsed.filter(|p| !p.is_protected()) else {
            log::error!("Refusing to delete protected path {assetpath}");
            return Err(SmithyError::ProtectedPath(assetpath.to_string()));
        };
        if let Some(node) = self.doc.resolve(&parsed) {
            return self.delete(node);
        }
        match parsed {
            AssetPath::GlobalComponent { .. } | AssetPath::LocalComponent { .. } => {
                if self.archive(assetpath)?.is_some() {
                    self.registry.forget_prefix(assetpath);
                    log::info!("Deleted component script {assetpath}");
                    Ok(())
                } else {
                    Err(SmithyError::NotFound(assetpath.to_string()))
                }
            }
            _ => Err(SmithyError::NotFound(assetpath.to_string())),
        }
    }

    fn is_live(&self, target: NodeRef) -> bool {
        let active = self.active_state();
        match target {
            NodeRef::Scene(s) => active.scene == Some(s),
            NodeRef::Room(s, r) => active.scene == Some(s) && active.room == Some(r),
            NodeRef::Variant(s, r, v) => {
                active.scene == Some(s) && active.room == Some(r) && active.variant == Some(v)
            }
        }
    }

    /// Move `assetpath` into the archive. Returns where it went, or `None`
    /// if nothing was there.
    fn archive(&self, assetpath: &str) -> Result<Option<PathBuf>> {
        let from = self.abspath(assetpath);
        if !self.fs.exists(&from) {
            return Ok(None);
        }
        let to = collision_free(
            self.fs.as_ref(),
            &paths::asset_abspath(&self.config.archive_path(self.root()), assetpath),
        );
        self.fs.move_merge(&from, &to).map_err(|e| {
            let err = SmithyError::from_io(&from, e);
            log::error!("Could not archive {assetpath}: {err}");
            err
        })?;
        log::debug!("Archived {} to {}", from.display(), to.display());
        Ok(Some(to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::switch::StateKey;
    use crate::test_support::{LockedFs, temp_project, write_asset};

    #[test]
    fn active_index_rederivation() {
        assert_eq!(rederive_active(Some(2), 0, 3), Some(1));
        assert_eq!(rederive_active(Some(1), 1, 2), Some(1));
        assert_eq!(rederive_active(Some(2), 2, 2), Some(1));
        assert_eq!(rederive_active(Some(0), 3, 3), Some(0));
        assert_eq!(rederive_active(Some(0), 0, 0), None);
        assert_eq!(rederive_active(None, 0, 4), None);
    }

    #[test]
    fn protected_paths_are_refused() {
        let (dir, mut project) = temp_project();
        write_asset(dir.path(), "scripts/core/lib.lua", "");
        for path in ["scripts", "scripts/core", "scripts/core/lib.lua"] {
            assert!(matches!(
                project.delete_asset_path(path),
                Err(SmithyError::ProtectedPath(_))
            ));
        }
        assert!(dir.path().join("scripts/core/lib.lua").exists());
    }

    #[test]
    fn deleted_room_is_archived_and_unbound() {
        let (dir, mut project) = temp_project();
        project.add_scene("Forest").unwrap();
        project.add_room(0, "Cave").unwrap();
        let cave = project.document().room(0, 1).unwrap().clone();
        let variant = cave.variants()[0].guid();

        project.delete_asset_path("scripts/Forest/Cave").unwrap();

        assert_eq!(project.document().scene(0).unwrap().rooms().len(), 1);
        assert!(!project.guid_map().contains(cave.guid()));
        assert!(!project.guid_map().contains(variant));
        assert!(!dir.path().join("scripts/Forest/Cave").exists());
        assert!(
            dir.path()
                .join(".smithy2d/archive/scripts/Forest/Cave/states/Default.lua")
                .exists()
        );
        // the live room was untouched
        assert_eq!(project.active_state(), StateKey::variant(0, 0, 0));
    }

    #[test]
    fn second_archive_of_same_path_is_suffixed() {
        let (dir, mut project) = temp_project();
        project.add_scene("Forest").unwrap();
        project.add_variant(0, 0, "Night").unwrap();
        project.delete(NodeRef::Variant(0, 0, 1)).unwrap();
        project.add_variant(0, 0, "Night").unwrap();
        project.delete(NodeRef::Variant(0, 0, 1)).unwrap();
        let archive = dir.path().join(".smithy2d/archive/scripts/Forest/Room/states");
        assert!(archive.join("Night.lua").exists());
        assert!(archive.join("Night_1.lua").exists());
    }

    #[test]
    fn deleting_the_live_room_loads_the_next_one() {
        let (dir, mut project) = temp_project();
        project.add_scene("Forest").unwrap();
        project.add_room(0, "Cave").unwrap();
        write_asset(dir.path(), "scripts/Forest/Room/components/Door.lua", "--$open(bool, false)\n");
        let e = project.world_mut().spawn("Gate").unwrap();
        project.add_component(e, "Door", false).unwrap();

        project.delete(NodeRef::Room(0, 0)).unwrap();
        // "Cave" moved to index 0 and is now live; its variant has no Gate.
        assert_eq!(project.active_state(), StateKey::variant(0, 0, 0));
        assert_eq!(project.document().room(0, 0).unwrap().name(), "Cave");
        assert!(!project.world().get(e).unwrap().is_active());
    }

    #[test]
    fn deleting_the_last_room_strips_local_components() {
        let (dir, mut project) = temp_project();
        project.add_scene("Forest").unwrap();
        write_asset(dir.path(), "scripts/Forest/Room/components/Door.lua", "--$open(bool, false)\n");
        let e = project.world_mut().spawn("Gate").unwrap();
        project.add_component(e, "Door", false).unwrap();

        project.delete(NodeRef::Room(0, 0)).unwrap();
        assert_eq!(project.active_state(), StateKey::new(Some(0), None, None));
        assert!(project.world().get(e).unwrap().components.is_empty());
    }

    #[test]
    fn locked_folder_aborts_delete() {
        let (dir, mut project) = temp_project();
        project.add_scene("Forest").unwrap();
        project.add_room(0, "Cave").unwrap();
        project.fs = Box::new(LockedFs::new(dir.path().join("scripts/Forest/Cave")));
        let err = project.delete(NodeRef::Room(0, 1)).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(project.document().scene(0).unwrap().rooms().len(), 2);
        assert_eq!(project.guid_map().len(), 5);
    }

    #[test]
    fn failed_guid_map_write_restores_the_archived_folder() {
        let (dir, mut project) = temp_project();
        project.add_scene("Forest").unwrap();
        project.add_room(0, "Cave").unwrap();
        // A folder where the map's temp file goes makes every rewrite fail.
        std::fs::create_dir_all(dir.path().join(".smithy2d/guids.tsv.tmp")).unwrap();

        assert!(project.delete(NodeRef::Room(0, 1)).is_err());
        assert_eq!(project.document().scene(0).unwrap().rooms().len(), 2);
        assert_eq!(project.guid_map().len(), 5);
        assert!(dir.path().join("scripts/Forest/Cave/states/Default.lua").exists());
        assert!(!dir.path().join(".smithy2d/archive/scripts/Forest/Cave").exists());
    }
}
