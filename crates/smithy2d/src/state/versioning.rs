//! Project file versioning.
//!
//! Documents record the format version they were written with. Opening an
//! older document runs every upgrade step between its version and
//! [`FORMAT_VERSION`].
//!
//! ## 1.0.0
//!
//! Object states used to store `location`, `rotation_quaternion` and `scale`
//! separately. From 1.0.0 on they store the local matrix. A legacy state with
//! a zero scale can't be represented faithfully; it keeps its current matrix
//! and is reported.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{Quat, Transform, Vec3};
use crate::state::model::{ProjectDocument, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(pub u32, pub u32, pub u32);

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self(major, minor, patch)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

pub const FORMAT_VERSION: Version = Version::new(1, 0, 0);

/// Convert legacy transforms in `variant` to matrices. Returns the number of
/// states converted. A missing part defaults to no offset, no rotation or unit
/// scale.
pub fn upgrade_variant_to_1_0_0(variant: &mut Variant) -> usize {
    let mut converted = 0;
    let name = variant.name().to_string();
    for state in &mut variant.object_states {
        let legacy = std::mem::take(&mut state.legacy);
        if legacy.is_empty() {
            continue;
        }
        let scale = legacy.scale.unwrap_or(Vec3::ONE);
        if scale.x == 0.0 || scale.y == 0.0 || scale.z == 0.0 {
            log::warn!(
                "Object '{}' in variant '{}' has a zero scale; keeping its stored matrix",
                state.name,
                name
            );
            continue;
        }
        let [w, x, y, z] = legacy.rotation_quaternion.unwrap_or([1.0, 0.0, 0.0, 0.0]);
        state.matrix_local = Transform {
            translation: legacy.location.unwrap_or(Vec3::ZERO),
            rotation: Quat::from_xyzw(x, y, z, w).normalize(),
            scale,
        }
        .matrix();
        converted += 1;
    }
    converted
}

/// Bring a freshly loaded document up to [`FORMAT_VERSION`].
pub fn upgrade_document(doc: &mut ProjectDocument) {
    if doc.version >= FORMAT_VERSION {
        return;
    }
    log::info!("Upgrading project from {} to {}", doc.version, FORMAT_VERSION);
    if doc.version < Version::new(1, 0, 0) {
        let mut converted = 0;
        for scene in doc.scenes_mut() {
            for room in scene.rooms_mut() {
                for variant in room.variants_mut() {
                    converted += upgrade_variant_to_1_0_0(variant);
                }
            }
        }
        log::info!("Converted {converted} legacy object transforms");
    }
    doc.version = FORMAT_VERSION;
}
