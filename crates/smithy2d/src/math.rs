//! Vector and matrix types for stored object states.
//!
//! Object states keep the full local [`Mat4`] of an entity. [`Transform`]
//! splits it into translation / rotation / scale for the two places that
//! need the parts: the Lua exporter and the upgrade of legacy states.
//! [glam](https://docs.rs/glam) types are re-exported so callers don't need
//! their own dependency on it.

use serde::{Deserialize, Serialize};

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

/// A local matrix taken apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Unrotated, unscaled, at `(x, y)` on the map plane.
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, 0.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Axis-aligned bounds of an entity before scale is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounds of a `w` x `h` rectangle centred on the origin.
    pub fn from_size(w: f32, h: f32) -> Self {
        let half = Vec3::new(w * 0.5, h * 0.5, 0.0);
        Self {
            min: -half,
            max: half,
        }
    }

    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }

    /// Top-left corner in a Y-up space.
    pub fn topleft(&self) -> Vec3 {
        Vec3::new(self.min.x, self.max.y, self.min.z)
    }
}

// ── Screen space ──────────────────────────────────────────────────────────

/// Editor units (Y up) to runtime pixels (Y down).
pub fn to_screen_position(position: Vec3, pixels_per_unit: f32) -> Vec3 {
    Vec3::new(
        position.x * pixels_per_unit,
        -position.y * pixels_per_unit,
        position.z,
    )
}

/// Round to three decimal places, folding `-0` into `0`.
pub fn round3(value: f64) -> f64 {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_round_trips_through_transform() {
        let mut t = Transform::from_xy(1.0, -2.0);
        t.scale = Vec3::new(2.0, 3.0, 1.0);
        let back = Transform::from_matrix(t.matrix());
        assert!((back.translation - t.translation).length() < 1e-5);
        assert!((back.scale - t.scale).length() < 1e-5);
    }

    #[test]
    fn screen_position_flips_y() {
        let p = to_screen_position(Vec3::new(1.0, 2.0, 3.0), 120.0);
        assert_eq!(p, Vec3::new(120.0, -240.0, 3.0));
    }

    #[test]
    fn rounding() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(-0.0001), 0.0);
        assert!(round3(-0.0001).is_sign_positive());
    }

    #[test]
    fn topleft_is_min_x_max_y() {
        let b = Bounds::from_size(2.0, 4.0);
        assert_eq!(b.topleft(), Vec3::new(-1.0, 2.0, 0.0));
        assert_eq!(b.dimensions(), Vec3::new(2.0, 4.0, 0.0));
    }
}
