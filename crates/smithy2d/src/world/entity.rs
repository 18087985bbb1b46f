//! # Entity — Handles Into the Live World
//!
//! Object states name entities; the live [`World`](super::World) hands out
//! an [`Entity`] per name. The handle is a slot index plus the slot's
//! generation at spawn time. Despawning bumps the generation, so a handle
//! kept across a despawn stops resolving instead of reaching the next
//! entity spawned into that slot:
//!
//! ```text
//! spawn "Door"    →  3v0
//! despawn 3v0        slot 3: generation 1, free
//! spawn "Crate"   →  3v1     (3v0 now resolves to nothing)
//! ```
//!
//! Handles never outlive the session; nothing on disk stores them.

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Entity {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index. Shared by every entity that ever lived in the slot.
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    pub(crate) fn slot(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({self})")
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
