//! The scene / room / variant hierarchy, object state snapshots and the
//! switch protocol between them.

pub mod hooks;
pub mod model;
pub mod object_state;
pub mod switch;
pub mod versioning;
