//! # State Switching — Save, Strip, Load
//!
//! Moving the editor from one `(scene, room, variant)` to another is one
//! protocol:
//!
//! ```text
//!   old variant ◄── 1. save   capture every active, non-excluded entity
//!                             (save hooks run per object)
//!               ──  2. order  parents-before-children order of the new
//!                             variant's states; a cycle aborts here
//!   live world  ──  3. strip  room left for no room: drop every local
//!                             component from every live entity
//!   new variant ──► 4. load   materialize each state, reactivate or spawn,
//!                             deactivate every active entity not named
//!                             (load hooks run per object)
//!   indices     ──  5. commit active scene / room / variant
//! ```
//!
//! Nothing in the live world or the indices changes before step 2 has
//! succeeded, so a corrupt variant never leaves the editor half switched.

use std::collections::HashSet;

use crate::component::instance::ComponentSet;
use crate::error::{Result, SmithyError};
use crate::project::Project;
use crate::state::model::Guid;
use crate::state::object_state::ObjectState;
use crate::world::hierarchy::depth_order;

/// A `(scene, room, variant)` triple. `room` requires `scene`, `variant`
/// requires `room`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateKey {
    pub scene: Option<usize>,
    pub room: Option<usize>,
    pub variant: Option<usize>,
}

impl StateKey {
    pub fn new(scene: Option<usize>, room: Option<usize>, variant: Option<usize>) -> Self {
        Self {
            scene,
            room,
            variant,
        }
    }

    pub fn variant(scene: usize, room: usize, variant: usize) -> Self {
        Self::new(Some(scene), Some(room), Some(variant))
    }
}

/// What a load did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Object states applied.
    pub loaded: usize,
    /// Entities moved to the inactive pool.
    pub deactivated: usize,
    /// Local component instances removed because no room is active.
    pub stripped: usize,
    /// Problems that did not stop the load (missing parents, missing scripts).
    pub warnings: Vec<String>,
}

/// The side being switched away from: the room it was in, and the variant
/// whose stored states should receive the live world (if any).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Outgoing {
    pub room: Option<Guid>,
    pub variant: Option<(usize, usize, usize)>,
}

impl Project {
    /// Save the live world into `old`'s variant and load `new`'s.
    pub fn switch_state(&mut self, old: StateKey, new: StateKey) -> Result<LoadReport> {
        let outgoing = self.outgoing(old)?;
        let report = self.transition(outgoing, new)?;
        log::info!(
            "Switched {:?} -> {:?}: {} loaded, {} deactivated",
            old,
            new,
            report.loaded,
            report.deactivated
        );
        Ok(report)
    }

    /// Make scene `scene` active in its remembered room and variant.
    pub fn set_active_scene(&mut self, scene: Option<usize>) -> Result<LoadReport> {
        let new = match scene {
            Some(s) => {
                let scene_ref = self
                    .doc
                    .scene(s)
                    .ok_or_else(|| SmithyError::NotFound(format!("scene #{s}")))?;
                let room = scene_ref.active_room_index();
                let variant = room.and_then(|r| scene_ref.room(r)?.active_variant_index());
                StateKey::new(Some(s), room, variant)
            }
            None => StateKey::default(),
        };
        self.switch_state(self.active_state(), new)
    }

    /// Make `room` of `scene` active in its remembered variant. The scene
    /// becomes active too.
    pub fn set_active_room(&mut self, scene: usize, room: Option<usize>) -> Result<LoadReport> {
        let variant = match room {
            Some(r) => self
                .doc
                .room(scene, r)
                .ok_or_else(|| SmithyError::NotFound(format!("room #{r} in scene #{scene}")))?
                .active_variant_index(),
            None => None,
        };
        self.switch_state(self.active_state(), StateKey::new(Some(scene), room, variant))
    }

    pub fn set_active_variant(
        &mut self,
        scene: usize,
        room: usize,
        variant: Option<usize>,
    ) -> Result<LoadReport> {
        self.switch_state(
            self.active_state(),
            StateKey::new(Some(scene), Some(room), variant),
        )
    }

    /// Capture the live world into the active variant. Returns the number of
    /// object states written, or 0 with no active variant.
    pub fn save_active_state(&mut self) -> Result<usize> {
        match self.outgoing(self.active_state())?.variant {
            Some(key) => self.save_into(key),
            None => Ok(0),
        }
    }

    /// Re-apply the active variant to the live world without saving first.
    pub fn reload_active_state(&mut self) -> Result<LoadReport> {
        let active = self.active_state();
        let outgoing = Outgoing {
            room: self.outgoing(active)?.room,
            variant: None,
        };
        self.transition(outgoing, active)
    }

    // ── Protocol ─────────────────────────────────────────────────────

    pub(crate) fn outgoing(&self, key: StateKey) -> Result<Outgoing> {
        self.check_key(key)?;
        let room = key
            .scene
            .zip(key.room)
            .and_then(|(s, r)| self.doc.room(s, r))
            .map(|room| room.guid());
        let variant = match (key.scene, key.room, key.variant) {
            (Some(s), Some(r), Some(v)) => Some((s, r, v)),
            _ => None,
        };
        Ok(Outgoing { room, variant })
    }

    fn check_key(&self, key: StateKey) -> Result<()> {
        let bad = |what: String| Err(SmithyError::NotFound(what));
        match key {
            StateKey {
                scene: None,
                room: Some(_),
                ..
            }
            | StateKey {
                room: None,
                variant: Some(_),
                ..
            } => bad(format!("state {key:?}")),
            StateKey {
                scene: Some(s),
                room,
                variant,
            } => {
                let Some(scene) = self.doc.scene(s) else {
                    return bad(format!("scene #{s}"));
                };
                if let Some(r) = room {
                    let Some(room_ref) = scene.room(r) else {
                        return bad(format!("room #{r} in scene #{s}"));
                    };
                    if let Some(v) = variant.filter(|&v| room_ref.variant(v).is_none()) {
                        return bad(format!("variant #{v} in room #{r}"));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn transition(&mut self, outgoing: Outgoing, new: StateKey) -> Result<LoadReport> {
        self.check_key(new)?;

        if let Some(key) = outgoing.variant {
            self.save_into(key)?;
        }

        let incoming = match (new.scene, new.room, new.variant) {
            (Some(s), Some(r), Some(v)) => {
                let states = self
                    .doc
                    .variant(s, r, v)
                    .map(|variant| variant.object_states.clone())
                    .unwrap_or_default();
                let order = depth_order(&states, |o| o.name.as_str(), |o| o.parent.as_str())?;
                Some((states, order))
            }
            _ => None,
        };

        let mut report = LoadReport::default();
        let new_room = new
            .scene
            .zip(new.room)
            .and_then(|(s, r)| self.doc.room(s, r))
            .map(|room| room.guid());
        if outgoing.room.is_some() && new_room.is_none() {
            report.stripped = self.strip_local_components();
        }

        if let Some((states, order)) = incoming {
            self.load_states(&states, &order, new, &mut report);
        }

        if let Some(s) = new.scene {
            self.doc.set_active_room_index(s, new.room)?;
            if let Some(r) = new.room {
                self.doc.set_active_variant_index(s, r, new.variant)?;
            }
        }
        self.doc.set_active_scene_index(new.scene);
        Ok(report)
    }

    fn save_into(&mut self, (s, r, v): (usize, usize, usize)) -> Result<usize> {
        let mut states = Vec::new();
        for (entity, data) in self.world.active_entities() {
            if data.exclude_from_state {
                continue;
            }
            let Some(mut state) = ObjectState::capture(&self.world, entity) else {
                continue;
            };
            self.hooks.run_save(data, &mut state);
            states.push(state);
        }
        // Parents left out of the capture (excluded or inactive) would
        // dangle; those children are stored as roots.
        let captured: HashSet<String> = states.iter().map(|o| o.name.clone()).collect();
        for state in states.iter_mut().filter(|o| !o.is_root()) {
            if !captured.contains(&state.parent) {
                log::debug!(
                    "'{}': parent '{}' is not saved with it, storing as root",
                    state.name,
                    state.parent
                );
                state.parent.clear();
            }
        }
        let count = states.len();
        self.doc.variant_mut(s, r, v)?.object_states = states;
        self.doc.mark_dirty(s);
        log::debug!("Saved {count} object states into variant ({s}, {r}, {v})");
        Ok(count)
    }

    fn strip_local_components(&mut self) -> usize {
        let mut stripped = 0;
        for entity in self.world.entity_handles() {
            if let Some(data) = self.world.get_mut(entity) {
                stripped += data.components.retain_global();
            }
        }
        if stripped > 0 {
            log::debug!("Stripped {stripped} local component(s)");
        }
        stripped
    }

    fn load_states(
        &mut self,
        states: &[ObjectState],
        order: &[usize],
        key: StateKey,
        report: &mut LoadReport,
    ) {
        let scope = self.scope_of(key);
        let mut named = HashSet::new();

        for &index in order {
            let state = &states[index];
            let entity = self.world.find_or_spawn(&state.name);
            if self.world.get(entity).is_some_and(|d| d.exclude_from_state) {
                report
                    .warnings
                    .push(format!("'{}' is excluded from states, not loaded", state.name));
                continue;
            }
            named.insert(state.name.clone());

            let components = ComponentSet::from_serialized(&state.components, &mut self.registry, &scope);
            for missing in components.iter().filter(|c| !c.file_exists) {
                report.warnings.push(format!(
                    "'{}': component '{}' has no script",
                    state.name, missing.name
                ));
            }

            // Parents load first, so a parent from this variant is already in
            // `named`. Anything else is a stale entity of another variant.
            let parent = if state.is_root() {
                None
            } else {
                let loaded = named
                    .contains(&state.parent)
                    .then(|| self.world.try_named(&state.parent))
                    .flatten();
                match loaded {
                    Some(parent) if parent != entity => Some(parent),
                    _ => {
                        log::warn!("'{}': parent '{}' not found", state.name, state.parent);
                        report
                            .warnings
                            .push(format!("'{}': parent '{}' not found", state.name, state.parent));
                        None
                    }
                }
            };
            if let Err(err) = self.world.set_parent(entity, parent) {
                log::warn!("'{}': {err}", state.name);
                report.warnings.push(err.to_string());
                if let Err(err) = self.world.set_parent(entity, None) {
                    log::warn!("'{}': could not detach: {err}", state.name);
                }
            }

            self.world.set_active(entity, true);
            if let Some(data) = self.world.get_mut(entity) {
                data.matrix_local = state.matrix_local;
                data.bounds = state.bounds;
                data.components = components;
                data.custom_data = state.custom_data.clone();
                self.hooks.run_load(state, data);
            }
            report.loaded += 1;
        }

        let absent: Vec<_> = self
            .world
            .active_entities()
            .filter(|(_, d)| !d.exclude_from_state && !named.contains(d.name()))
            .map(|(e, _)| e)
            .collect();
        for entity in absent {
            self.world.set_active(entity, false);
            report.deactivated += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::input::InputValue;
    use crate::math::Transform;
    use crate::test_support::{temp_project, write_asset};

    /// Scene "Forest" with rooms "Room" (variants Default, Night) and "Cave".
    fn forest() -> (tempfile::TempDir, Project) {
        let (dir, mut project) = temp_project();
        project.add_scene("Forest").unwrap();
        project.add_variant(0, 0, "Night").unwrap();
        project.add_room(0, "Cave").unwrap();
        (dir, project)
    }

    #[test]
    fn switching_away_and_back_restores_the_world() {
        let (_dir, mut project) = forest();
        let hero = project.world_mut().spawn("Hero").unwrap();
        project.world_mut().get_mut(hero).unwrap().matrix_local =
            Transform::from_xy(2.0, 5.0).matrix();

        let report = project.set_active_variant(0, 0, Some(1)).unwrap();
        assert_eq!(report.deactivated, 1);
        assert!(!project.world().get(hero).unwrap().is_active());

        let report = project.set_active_variant(0, 0, Some(0)).unwrap();
        assert_eq!(report.loaded, 1);
        let data = project.world().get(hero).unwrap();
        assert!(data.is_active());
        assert_eq!(data.matrix_local, Transform::from_xy(2.0, 5.0).matrix());

        // the entity handle survives the round trip
        assert_eq!(project.world().try_named("Hero"), Some(hero));
    }

    #[test]
    fn parents_load_before_children() {
        let (_dir, mut project) = forest();
        let variant = project.document_mut().variant_mut(0, 0, 1).unwrap();
        let mut c = ObjectState::new("C");
        c.parent = "B".into();
        let a = ObjectState::new("A");
        let mut b = ObjectState::new("B");
        b.parent = "A".into();
        variant.object_states = vec![c, a, b];

        let report = project.set_active_variant(0, 0, Some(1)).unwrap();
        assert_eq!(report.loaded, 3);
        assert!(report.warnings.is_empty());
        let world = project.world();
        let c = world.try_named("C").unwrap();
        let b = world.try_named("B").unwrap();
        assert_eq!(world.parent_name(c), Some("B"));
        assert_eq!(world.parent_name(b), Some("A"));
    }

    #[test]
    fn missing_parent_is_a_warning() {
        let (_dir, mut project) = forest();
        let variant = project.document_mut().variant_mut(0, 0, 1).unwrap();
        let mut orphan = ObjectState::new("Orphan");
        orphan.parent = "Ghost".into();
        variant.object_states = vec![orphan];

        let report = project.set_active_variant(0, 0, Some(1)).unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(report.warnings.len(), 1);
        let orphan = project.world().try_named("Orphan").unwrap();
        assert_eq!(project.world().get(orphan).unwrap().parent(), None);
    }

    #[test]
    fn chain_with_components_round_trips_exactly() {
        let (dir, mut project) = forest();
        write_asset(dir.path(), "scripts/core/components/Health.lua", "--$hp(int, 10, 0, 100)\n");
        write_asset(
            dir.path(),
            "scripts/Forest/Room/components/Patrol.lua",
            "--$speed(float, 1.5)\n--$route(string, \"loop\")\n--$mode(enum, [walk, run], walk)\n",
        );
        let a = project.world_mut().spawn("A").unwrap();
        let b = project.world_mut().spawn("B").unwrap();
        let c = project.world_mut().spawn("C").unwrap();
        project.world_mut().set_parent(b, Some(a)).unwrap();
        project.world_mut().set_parent(c, Some(b)).unwrap();
        for (i, e) in [a, b, c].into_iter().enumerate() {
            let data = project.world_mut().get_mut(e).unwrap();
            data.matrix_local = Transform::from_xy(i as f32, -(i as f32) * 0.5).matrix();
            data.bounds = crate::math::Bounds::from_size(1.0 + i as f32, 2.0);
            data.custom_data.insert("tag".into(), format!("t{i}"));
        }
        project
            .add_component(b, "Health", true)
            .unwrap()
            .set_input("hp", &InputValue::int(42));
        let patrol = project.add_component(c, "Patrol", false).unwrap();
        patrol.set_input("speed", &InputValue::float(3.25));
        patrol.set_input("route", &InputValue::String("a,b\nc".into()));
        patrol.set_input("mode", &InputValue::String("run".into()));

        let before: Vec<_> = [a, b, c]
            .iter()
            .map(|&e| project.world().get(e).unwrap().clone())
            .collect();

        project.set_active_variant(0, 0, Some(1)).unwrap();
        let saved = project.document().variant(0, 0, 0).unwrap().object_states.clone();
        assert_eq!(saved.len(), 3);
        project.set_active_variant(0, 0, Some(0)).unwrap();

        for (e, old) in [a, b, c].into_iter().zip(&before) {
            let data = project.world().get(e).unwrap();
            assert!(data.is_active());
            assert_eq!(data.matrix_local, old.matrix_local);
            assert_eq!(data.bounds, old.bounds);
            assert_eq!(data.parent(), old.parent());
            assert_eq!(data.custom_data, old.custom_data);
            assert_eq!(data.components.serialize(), old.components.serialize());
        }

        // saving the restored world reproduces the stored states exactly
        project.save_active_state().unwrap();
        assert_eq!(project.document().variant(0, 0, 0).unwrap().object_states, saved);
    }

    #[test]
    fn parent_from_another_variant_is_not_reused() {
        let (_dir, mut project) = forest();
        let ghost = project.world_mut().spawn("Ghost").unwrap();
        let variant = project.document_mut().variant_mut(0, 0, 1).unwrap();
        let mut orphan = ObjectState::new("Orphan");
        orphan.parent = "Ghost".into();
        variant.object_states = vec![orphan];

        let report = project.set_active_variant(0, 0, Some(1)).unwrap();
        assert!(!project.world().get(ghost).unwrap().is_active());
        assert_eq!(report.warnings.len(), 1);
        let orphan = project.world().try_named("Orphan").unwrap();
        assert_eq!(project.world().get(orphan).unwrap().parent(), None);
    }

    #[test]
    fn children_of_excluded_entities_are_saved_as_roots() {
        let (_dir, mut project) = forest();
        let camera = project.world_mut().spawn("Camera").unwrap();
        project.world_mut().get_mut(camera).unwrap().exclude_from_state = true;
        let hero = project.world_mut().spawn("Hero").unwrap();
        project.world_mut().set_parent(hero, Some(camera)).unwrap();

        project.set_active_variant(0, 0, Some(1)).unwrap();
        let saved = &project.document().variant(0, 0, 0).unwrap().object_states;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].name, "Hero");
        assert!(saved[0].is_root());
    }

    #[test]
    fn cycle_is_refused_before_anything_changes() {
        let (_dir, mut project) = forest();
        project.world_mut().spawn("Hero").unwrap();
        let variant = project.document_mut().variant_mut(0, 0, 1).unwrap();
        let mut a = ObjectState::new("A");
        a.parent = "B".into();
        let mut b = ObjectState::new("B");
        b.parent = "A".into();
        variant.object_states = vec![a, b];

        let before = project.active_state();
        let err = project.set_active_variant(0, 0, Some(1)).unwrap_err();
        assert!(matches!(err, SmithyError::HierarchyCycle(_)));
        assert_eq!(project.active_state(), before);
        assert!(project.world().try_named("A").is_none());
        let hero = project.world().try_named("Hero").unwrap();
        assert!(project.world().get(hero).unwrap().is_active());
    }

    #[test]
    fn leaving_for_no_room_strips_local_components() {
        let (dir, mut project) = forest();
        write_asset(dir.path(), "scripts/core/components/Health.lua", "--$hp(int, 10)\n");
        write_asset(dir.path(), "scripts/Forest/Room/components/Door.lua", "--$open(bool, false)\n");
        let e = project.world_mut().spawn("Gate").unwrap();
        project.add_component(e, "Health", true).unwrap();
        project
            .add_component(e, "Door", false)
            .unwrap()
            .set_input("open", &InputValue::Bool(true));
        assert!(project.world().get(e).unwrap().components.get_component("Door").unwrap().file_exists);

        let report = project.set_active_room(0, None).unwrap();
        assert_eq!(report.stripped, 1);
        let components = &project.world().get(e).unwrap().components;
        assert_eq!(components.len(), 1);
        assert!(components.get_component("Health").is_some());

        // the stored variant still has both
        let stored = &project.document().variant(0, 0, 0).unwrap().object_states[0];
        assert_eq!(stored.components.len(), 2);

        project.set_active_room(0, Some(0)).unwrap();
        let door = project
            .world()
            .get(e)
            .unwrap()
            .components
            .get_component("Door")
            .cloned()
            .unwrap();
        assert_eq!(door.get_input("open"), Some(&InputValue::Bool(true)));
    }

    #[test]
    fn excluded_entities_are_neither_saved_nor_deactivated() {
        let (_dir, mut project) = forest();
        let camera = project.world_mut().spawn("EditorCamera").unwrap();
        project.world_mut().get_mut(camera).unwrap().exclude_from_state = true;

        project.set_active_variant(0, 0, Some(1)).unwrap();
        assert!(project.world().get(camera).unwrap().is_active());
        assert!(project.document().variant(0, 0, 0).unwrap().object_states.is_empty());
    }

    #[test]
    fn hooks_run_on_save_and_load() {
        let (_dir, mut project) = forest();
        project.add_object_save_hook(|entity, state| {
            state.store_data("label", entity.name().to_lowercase());
        });
        project.add_object_load_hook(|state, entity| {
            if let Some(label) = state.get_data("label") {
                entity.custom_data.insert("seen".into(), label.to_string());
            }
        });
        let e = project.world_mut().spawn("Hero").unwrap();
        project.set_active_variant(0, 0, Some(1)).unwrap();
        project.set_active_variant(0, 0, Some(0)).unwrap();
        let data = project.world().get(e).unwrap();
        assert_eq!(data.custom_data.get("seen").map(String::as_str), Some("hero"));
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let (_dir, mut project) = forest();
        let old = project.active_state();
        assert!(project.switch_state(old, StateKey::variant(0, 0, 9)).is_err());
        assert!(project.switch_state(old, StateKey::new(None, Some(0), None)).is_err());
        assert_eq!(project.active_state(), old);
    }
}
