//! Convenience re-exports — `use smithy2d::prelude::*` for the common items.

pub use crate::component::input::{ComponentInput, Datatype, InputRange, InputValue};
pub use crate::component::instance::{ComponentInstance, ComponentSet, SerializedComponent};
pub use crate::component::registry::ComponentRegistry;
pub use crate::config::ProjectConfig;
pub use crate::error::{Result, SmithyError};
pub use crate::export::ExportSummary;
pub use crate::math::{Bounds, Mat4, Quat, Transform, Vec2, Vec3, Vec4};
pub use crate::persist::paths::{AssetPath, ScriptScope};
pub use crate::persist::rename::RenamePlan;
pub use crate::persist::sync::SyncReport;
pub use crate::project::Project;
pub use crate::state::model::{Guid, NodeRef, ProjectDocument, Room, Scene, Variant};
pub use crate::state::object_state::ObjectState;
pub use crate::state::switch::{LoadReport, StateKey};
pub use crate::world::{Entity, EntityData, World};
