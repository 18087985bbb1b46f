//! Script-backed components: typed inputs, the declaration parser, the
//! registry of parsed scripts and the per-entity component set.

pub mod input;
pub mod instance;
pub mod parser;
pub mod registry;
pub mod watcher;
