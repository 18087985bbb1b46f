//! Component instances and the per-entity component set.
//!
//! An instance is a component attached to one entity: its name, whether it
//! resolves in the global namespace, and the entity's own input values. Its
//! inputs are always the schema's inputs with the entity's values laid over
//! them (see [`ComponentRegistry::refresh_instance`]).

use serde::{Deserialize, Serialize};

use crate::component::input::{ComponentInput, InputValue, decode_inputs, encode_inputs};
use crate::component::registry::ComponentRegistry;
use crate::persist::paths::{self, ScriptScope};

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstance {
    pub name: String,
    pub is_global: bool,
    pub inputs: Vec<ComponentInput>,
    pub file_exists: bool,
    pub err_log: String,
}

impl ComponentInstance {
    pub fn new(name: impl Into<String>, is_global: bool) -> Self {
        Self {
            name: name.into(),
            is_global,
            inputs: Vec::new(),
            file_exists: false,
            err_log: String::new(),
        }
    }

    /// The backing script, or `None` for a local component with no room.
    pub fn assetpath(&self, scope: &ScriptScope) -> Option<String> {
        paths::component_script(scope, &self.name, self.is_global)
    }

    /// Script present and parsed without errors.
    pub fn is_valid(&self) -> bool {
        self.file_exists && self.err_log.is_empty()
    }

    pub fn get_input(&self, name: &str) -> Option<&InputValue> {
        self.inputs.iter().find(|i| i.name == name).map(|i| &i.value)
    }

    /// Assign an input from any value whose text form parses as the input's
    /// type. Numbers are clamped into the declared range. Returns `false` if
    /// the input doesn't exist or the value doesn't fit.
    pub fn set_input(&mut self, name: &str, value: &InputValue) -> bool {
        let Some(input) = self.inputs.iter_mut().find(|i| i.name == name) else {
            return false;
        };
        let Ok(mut new) = input.value.with_string_value(&value.to_string_value()) else {
            return false;
        };
        match &mut new {
            InputValue::Int { value, range } => {
                *value = range.clamp(*value as f64) as i64;
            }
            InputValue::Float { value, range } => {
                *value = range.clamp(*value);
            }
            _ => {}
        }
        input.value = new;
        true
    }

    pub fn serialize(&self) -> SerializedComponent {
        SerializedComponent {
            name: self.name.clone(),
            is_global: self.is_global,
            data: encode_inputs(&self.inputs),
        }
    }
}

/// The compact stored form of a [`ComponentInstance`].
///
/// `data` holds newline-joined `name,datatype,value` records. Ranges, enum
/// items and error state are not stored; they come back from the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedComponent {
    pub name: String,
    pub is_global: bool,
    pub data: String,
}

impl SerializedComponent {
    /// Rebuild an unrefreshed instance. Bad records are skipped with a
    /// warning.
    pub fn deserialize(&self) -> ComponentInstance {
        let (inputs, errors) = decode_inputs(&self.data);
        for error in &errors {
            log::warn!("Component '{}': skipping stored input: {error}", self.name);
        }
        ComponentInstance {
            inputs,
            ..ComponentInstance::new(&self.name, self.is_global)
        }
    }
}

// ── ComponentSet ────────────────────────────────────────────────────────

/// The ordered, name-unique component list of one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSet {
    components: Vec<ComponentInstance>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a component, or return the existing one with that name. A new
    /// instance is refreshed against the registry right away.
    pub fn add_component(
        &mut self,
        name: &str,
        is_global: bool,
        registry: &mut ComponentRegistry,
        scope: &ScriptScope,
    ) -> &mut ComponentInstance {
        if let Some(index) = self.position(name) {
            return &mut self.components[index];
        }
        let mut instance = ComponentInstance::new(name, is_global);
        registry.refresh_instance(scope, &mut instance);
        self.components.push(instance);
        let last = self.components.len() - 1;
        &mut self.components[last]
    }

    pub fn remove_component(&mut self, name: &str) -> Option<ComponentInstance> {
        let index = self.position(name)?;
        Some(self.components.remove(index))
    }

    pub fn get_component(&self, name: &str) -> Option<&ComponentInstance> {
        self.components.iter().find(|c| c.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.components.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ComponentInstance> {
        self.components.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Drop every room-local component. Returns how many were removed.
    pub fn retain_global(&mut self) -> usize {
        let before = self.components.len();
        self.components.retain(|c| c.is_global);
        before - self.components.len()
    }

    pub fn serialize(&self) -> Vec<SerializedComponent> {
        self.components.iter().map(ComponentInstance::serialize).collect()
    }

    /// Build a set from stored instances, refreshing each against the current
    /// schema. Later duplicates of a name are ignored.
    pub fn from_serialized(
        stored: &[SerializedComponent],
        registry: &mut ComponentRegistry,
        scope: &ScriptScope,
    ) -> Self {
        let mut set = Self::new();
        for serialized in stored {
            if set.position(&serialized.name).is_some() {
                log::warn!("Duplicate stored component '{}' ignored", serialized.name);
                continue;
            }
            let mut instance = serialized.deserialize();
            registry.refresh_instance(scope, &mut instance);
            set.components.push(instance);
        }
        set
    }

    /// Re-apply the current schemas to every instance.
    pub fn refresh_all(&mut self, registry: &mut ComponentRegistry, scope: &ScriptScope) {
        for instance in &mut self.components {
            registry.refresh_instance(scope, instance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::input::InputRange;
    use crate::test_support::write_asset;

    fn setup() -> (tempfile::TempDir, ComponentRegistry, ScriptScope) {
        let dir = tempfile::tempdir().unwrap();
        write_asset(
            dir.path(),
            "scripts/core/components/Health.lua",
            "--$hp(int, 100, 0, 200)\n--$label(string, \"hero\")\n",
        );
        write_asset(
            dir.path(),
            "scripts/Forest/Clearing/components/Door.lua",
            "--$locked(bool, true)\n",
        );
        let registry = ComponentRegistry::new(dir.path());
        (dir, registry, ScriptScope::new(Some("Forest"), Some("Clearing")))
    }

    #[test]
    fn add_refreshes_and_dedups_by_name() {
        let (_dir, mut registry, scope) = setup();
        let mut set = ComponentSet::new();

        let health = set.add_component("Health", true, &mut registry, &scope);
        assert!(health.is_valid());
        assert_eq!(
            health.get_input("hp"),
            Some(&InputValue::Int {
                value: 100,
                range: InputRange::new(0.0, 200.0)
            })
        );
        health.set_input("hp", &InputValue::int(40));

        let again = set.add_component("Health", true, &mut registry, &scope);
        assert_eq!(again.get_input("hp"), Some(&InputValue::Int {
            value: 40,
            range: InputRange::new(0.0, 200.0)
        }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn missing_script_marks_instance() {
        let (_dir, mut registry, scope) = setup();
        let mut set = ComponentSet::new();
        let ghost = set.add_component("Ghost", false, &mut registry, &scope);
        assert!(!ghost.file_exists);
        assert!(ghost.inputs.is_empty());
        assert!(!ghost.is_valid());
    }

    #[test]
    fn remove_and_lookup() {
        let (_dir, mut registry, scope) = setup();
        let mut set = ComponentSet::new();
        set.add_component("Health", true, &mut registry, &scope);
        set.add_component("Door", false, &mut registry, &scope);

        assert!(set.get_component("Door").is_some());
        assert_eq!(set.remove_component("Door").map(|c| c.name), Some("Door".into()));
        assert!(set.get_component("Door").is_none());
        assert!(set.remove_component("Door").is_none());
    }

    #[test]
    fn set_input_clamps_and_type_checks() {
        let (_dir, mut registry, scope) = setup();
        let mut set = ComponentSet::new();
        let health = set.add_component("Health", true, &mut registry, &scope);

        assert!(health.set_input("hp", &InputValue::int(999)));
        assert!(matches!(health.get_input("hp"), Some(InputValue::Int { value: 200, .. })));
        assert!(!health.set_input("hp", &InputValue::String("lots".into())));
        assert!(!health.set_input("mana", &InputValue::int(1)));
    }

    #[test]
    fn stored_set_comes_back_identical() {
        let (_dir, mut registry, scope) = setup();
        let mut set = ComponentSet::new();
        set.add_component("Health", true, &mut registry, &scope)
            .set_input("label", &InputValue::String("a, b\nc".into()));
        set.add_component("Door", false, &mut registry, &scope);

        let stored = set.serialize();
        let restored = ComponentSet::from_serialized(&stored, &mut registry, &scope);
        assert_eq!(restored, set);
        assert_eq!(restored.serialize(), stored);
    }

    #[test]
    fn retain_global_strips_local() {
        let (_dir, mut registry, scope) = setup();
        let mut set = ComponentSet::new();
        set.add_component("Health", true, &mut registry, &scope);
        set.add_component("Door", false, &mut registry, &scope);
        assert_eq!(set.retain_global(), 1);
        let names: Vec<_> = set.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Health"]);
    }
}
