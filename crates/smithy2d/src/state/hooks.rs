//! Per-object save and load callbacks.
//!
//! Other subsystems (sprite setup, map overlays, ...) keep data the state
//! machinery knows nothing about. They register hooks that run for every
//! entity after its state was captured, and after it was re-applied.

use crate::state::object_state::ObjectState;
use crate::world::EntityData;

pub type SaveHook = Box<dyn Fn(&EntityData, &mut ObjectState)>;
pub type LoadHook = Box<dyn Fn(&ObjectState, &mut EntityData)>;

#[derive(Default)]
pub struct StateHooks {
    save: Vec<SaveHook>,
    load: Vec<LoadHook>,
}

impl StateHooks {
    pub fn on_save(&mut self, hook: impl Fn(&EntityData, &mut ObjectState) + 'static) {
        self.save.push(Box::new(hook));
    }

    pub fn on_load(&mut self, hook: impl Fn(&ObjectState, &mut EntityData) + 'static) {
        self.load.push(Box::new(hook));
    }

    pub(crate) fn run_save(&self, entity: &EntityData, state: &mut ObjectState) {
        for hook in &self.save {
            hook(entity, state);
        }
    }

    pub(crate) fn run_load(&self, state: &ObjectState, entity: &mut EntityData) {
        for hook in &self.load {
            hook(state, entity);
        }
    }
}

impl std::fmt::Debug for StateHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateHooks")
            .field("save", &self.save.len())
            .field("load", &self.load.len())
            .finish()
    }
}
