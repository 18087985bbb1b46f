//! Snapshots of single entities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::component::instance::SerializedComponent;
use crate::math::{Bounds, Mat4, Vec3};
use crate::world::{Entity, World};

/// One entity as stored in a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectState {
    pub name: String,
    #[serde(default = "identity")]
    pub matrix_local: Mat4,
    #[serde(default)]
    pub topleft: Vec3,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default)]
    pub components: Vec<SerializedComponent>,
    /// Name of the parent state in the same variant, empty for roots.
    #[serde(default)]
    pub parent: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_data: BTreeMap<String, String>,
    /// Pre-1.0.0 documents stored a decomposed transform instead of a matrix.
    #[serde(flatten)]
    pub legacy: LegacyTransform,
}

fn identity() -> Mat4 {
    Mat4::IDENTITY
}

/// Transform fields of a pre-1.0.0 object state, stored next to the other
/// fields. The quaternion is `[w, x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LegacyTransform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_quaternion: Option<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vec3>,
}

impl LegacyTransform {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.rotation_quaternion.is_none() && self.scale.is_none()
    }
}

impl ObjectState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matrix_local: Mat4::IDENTITY,
            topleft: Vec3::ZERO,
            bounds: Bounds::default(),
            components: Vec::new(),
            parent: String::new(),
            custom_data: BTreeMap::new(),
            legacy: LegacyTransform::default(),
        }
    }

    /// Capture `entity` as it is now, including its custom data. Save hooks
    /// run afterwards and may add to it.
    pub fn capture(world: &World, entity: Entity) -> Option<Self> {
        let data = world.get(entity)?;
        Some(Self {
            name: data.name().to_string(),
            matrix_local: data.matrix_local,
            topleft: data.bounds.topleft(),
            bounds: data.bounds,
            components: data.components.serialize(),
            parent: world.parent_name(entity).unwrap_or_default().to_string(),
            custom_data: data.custom_data.clone(),
            legacy: LegacyTransform::default(),
        })
    }

    pub fn store_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom_data.insert(key.into(), value.into());
    }

    pub fn get_data(&self, key: &str) -> Option<&str> {
        self.custom_data.get(key).map(String::as_str)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;

    #[test]
    fn capture_records_parent_by_name() {
        let mut world = World::new();
        let parent = world.spawn("Ship").unwrap();
        let child = world.spawn("Turret").unwrap();
        world.set_parent(child, Some(parent)).unwrap();
        world.get_mut(child).unwrap().matrix_local = Transform::from_xy(1.0, 2.0).matrix();
        world.get_mut(child).unwrap().bounds = Bounds::from_size(2.0, 2.0);

        let state = ObjectState::capture(&world, child).unwrap();
        assert_eq!(state.name, "Turret");
        assert_eq!(state.parent, "Ship");
        assert_eq!(state.topleft, Vec3::new(-1.0, 1.0, 0.0));
        assert!(ObjectState::capture(&world, parent).unwrap().is_root());
    }

    #[test]
    fn custom_data() {
        let mut state = ObjectState::new("A");
        state.store_data("sprite", "hero.png");
        state.store_data("sprite", "hero2.png");
        assert_eq!(state.get_data("sprite"), Some("hero2.png"));
        assert_eq!(state.get_data("missing"), None);
    }

    #[test]
    fn json_shape_skips_empty_extras() {
        let state = ObjectState::new("A");
        let json = serde_json::to_string(&state).unwrap();
        assert!(!json.contains("legacy"));
        assert!(!json.contains("location"));
        assert!(!json.contains("custom_data"));
        let back: ObjectState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn reads_legacy_states_without_a_matrix() {
        let json = r#"{
            "name": "Crate",
            "location": [1.0, 2.0, 0.0],
            "rotation_quaternion": [1.0, 0.0, 0.0, 0.0],
            "scale": [2.0, 2.0, 1.0]
        }"#;
        let state: ObjectState = serde_json::from_str(json).unwrap();
        assert_eq!(state.matrix_local, Mat4::IDENTITY);
        assert_eq!(state.legacy.location, Some(Vec3::new(1.0, 2.0, 0.0)));
        assert_eq!(state.legacy.scale, Some(Vec3::new(2.0, 2.0, 1.0)));
        assert!(state.is_root());
    }
}
