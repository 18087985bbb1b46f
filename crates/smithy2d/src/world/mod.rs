//! # World — The Live Entity Graph
//!
//! The [`World`] holds the entities currently in the editor: one
//! [`EntityData`] per live entity, keyed by a generational [`Entity`] handle,
//! plus a unique-name index. Object states refer to entities by name, so the
//! name index is what save and load go through.
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │ World                                          │
//! │                                                │
//! │  slots: Vec<Slot { generation, data }>         │
//! │  free:  Vec<u32>       despawned slot indices  │
//! │  names: HashMap<String, Entity>                │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! ## Active and Inactive
//!
//! Switching to a variant that doesn't mention an entity does not destroy it.
//! The entity is moved to the inactive pool (`active = false`): hidden, left
//! out of saves, and reactivated if a later variant names it again.

pub mod entity;
pub mod hierarchy;

use std::collections::HashMap;

pub use entity::Entity;

use crate::component::instance::ComponentSet;
use crate::error::{Result, SmithyError};
use crate::math::{Bounds, Mat4};

/// Everything the editor knows about one live entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityData {
    name: String,
    pub matrix_local: Mat4,
    pub bounds: Bounds,
    parent: Option<Entity>,
    pub components: ComponentSet,
    /// Never captured into or loaded from object states.
    pub exclude_from_state: bool,
    active: bool,
    /// Free-form data owned by save/load hooks.
    pub custom_data: std::collections::BTreeMap<String, String>,
}

impl EntityData {
    fn new(name: String) -> Self {
        Self {
            name,
            matrix_local: Mat4::IDENTITY,
            bounds: Bounds::default(),
            parent: None,
            components: ComponentSet::new(),
            exclude_from_state: false,
            active: true,
            custom_data: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    data: Option<EntityData>,
}

#[derive(Debug, Default)]
pub struct World {
    slots: Vec<Slot>,
    free: Vec<u32>,
    names: HashMap<String, Entity>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Spawning ─────────────────────────────────────────────────────

    /// Spawn an entity called `name`. Fails if the name is taken.
    pub fn spawn(&mut self, name: &str) -> Result<Entity> {
        if self.names.contains_key(name) {
            return Err(SmithyError::InvalidName {
                name: name.to_string(),
                reason: "an entity with this name already exists",
            });
        }
        Ok(self.insert(name))
    }

    /// Look `name` up, spawning it if nobody has it yet.
    pub fn find_or_spawn(&mut self, name: &str) -> Entity {
        match self.names.get(name) {
            Some(&entity) => entity,
            None => self.insert(name),
        }
    }

    fn insert(&mut self, name: &str) -> Entity {
        let data = Some(EntityData::new(name.to_string()));
        let entity = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.data = data;
                Entity::new(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    data,
                });
                Entity::new((self.slots.len() - 1) as u32, 0)
            }
        };
        self.names.insert(name.to_string(), entity);
        entity
    }

    /// Remove an entity. Its children become roots.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.contains(entity) {
            return false;
        }
        let slot = &mut self.slots[entity.slot()];
        let Some(data) = slot.data.take() else {
            return false;
        };
        slot.generation += 1;
        self.free.push(entity.index);
        self.names.remove(&data.name);
        for other in self.slots.iter_mut().filter_map(|s| s.data.as_mut()) {
            if other.parent == Some(entity) {
                other.parent = None;
            }
        }
        true
    }

    // ── Access ───────────────────────────────────────────────────────

    pub fn contains(&self, entity: Entity) -> bool {
        self.get(entity).is_some()
    }

    pub fn get(&self, entity: Entity) -> Option<&EntityData> {
        self.slots
            .get(entity.slot())
            .filter(|s| s.generation == entity.generation)?
            .data
            .as_ref()
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut EntityData> {
        self.slots
            .get_mut(entity.slot())
            .filter(|s| s.generation == entity.generation)?
            .data
            .as_mut()
    }

    pub fn try_named(&self, name: &str) -> Option<Entity> {
        self.names.get(name).copied()
    }

    /// Every entity, active or not, in slot order.
    pub fn entities(&self) -> impl Iterator<Item = (Entity, &EntityData)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let data = slot.data.as_ref()?;
            Some((Entity::new(index as u32, slot.generation), data))
        })
    }

    pub fn entity_handles(&self) -> Vec<Entity> {
        self.entities().map(|(e, _)| e).collect()
    }

    /// Active entities, in slot order.
    pub fn active_entities(&self) -> impl Iterator<Item = (Entity, &EntityData)> {
        self.entities().filter(|(_, d)| d.active)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    // ── Hierarchy & state ────────────────────────────────────────────

    /// Parent `child` under `parent` (or make it a root). Refuses links that
    /// would form a cycle.
    pub fn set_parent(&mut self, child: Entity, parent: Option<Entity>) -> Result<()> {
        let child_name = self
            .get(child)
            .map(|d| d.name.clone())
            .ok_or_else(|| SmithyError::NotFound(format!("entity {child}")))?;
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(SmithyError::NotFound(format!("entity {parent}")));
            }
            let mut cursor = Some(parent);
            while let Some(current) = cursor {
                if current == child {
                    return Err(SmithyError::HierarchyCycle(child_name));
                }
                cursor = self.get(current).and_then(|d| d.parent);
            }
        }
        if let Some(data) = self.get_mut(child) {
            data.parent = parent;
        }
        Ok(())
    }

    pub fn parent_name(&self, entity: Entity) -> Option<&str> {
        let parent = self.get(entity)?.parent?;
        self.get(parent).map(|d| d.name.as_str())
    }

    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.entities()
            .filter(|(_, d)| d.parent == Some(entity))
            .map(|(e, _)| e)
            .collect()
    }

    /// Move an entity into or out of the inactive pool.
    pub fn set_active(&mut self, entity: Entity, active: bool) {
        if let Some(data) = self.get_mut(entity) {
            data.active = active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let mut world = World::new();
        let a = world.spawn("Player").unwrap();
        assert!(world.spawn("Player").is_err());
        assert_eq!(world.find_or_spawn("Player"), a);
        assert_eq!(world.try_named("Player"), Some(a));
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn despawn_frees_name_and_orphans_children() {
        let mut world = World::new();
        let parent = world.spawn("Parent").unwrap();
        let child = world.spawn("Child").unwrap();
        world.set_parent(child, Some(parent)).unwrap();
        assert_eq!(world.parent_name(child), Some("Parent"));
        assert_eq!(world.children(parent), vec![child]);

        assert!(world.despawn(parent));
        assert!(world.get(parent).is_none());
        assert_eq!(world.try_named("Parent"), None);
        assert_eq!(world.get(child).unwrap().parent(), None);

        let reused = world.spawn("Parent").unwrap();
        assert_eq!(reused.index(), parent.index());
        assert!(world.get(parent).is_none());
    }

    #[test]
    fn set_parent_refuses_cycles() {
        let mut world = World::new();
        let a = world.spawn("A").unwrap();
        let b = world.spawn("B").unwrap();
        let c = world.spawn("C").unwrap();
        world.set_parent(b, Some(a)).unwrap();
        world.set_parent(c, Some(b)).unwrap();
        assert!(matches!(
            world.set_parent(a, Some(c)),
            Err(SmithyError::HierarchyCycle(_))
        ));
        assert!(world.set_parent(a, Some(a)).is_err());
        assert_eq!(world.get(a).unwrap().parent(), None);
    }

    #[test]
    fn inactive_pool() {
        let mut world = World::new();
        let a = world.spawn("A").unwrap();
        world.spawn("B").unwrap();
        world.set_active(a, false);
        let active: Vec<_> = world.active_entities().map(|(_, d)| d.name()).collect();
        assert_eq!(active, ["B"]);
        assert_eq!(world.entities().count(), 2);
    }
}
