//! # Component Registry — Parsed Script Cache
//!
//! The registry maps a script's asset path to a [`Component`]: the parsed
//! declaration list of that script plus the watcher that notices edits.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │ ComponentRegistry (owned by Project)                      │
//! │                                                           │
//! │  components: HashMap<assetpath, Component>                │
//! │    Component { watcher, schema: Arc<ComponentSchema>,     │
//! │                inputs_changed }                           │
//! │                                                           │
//! │  tick: recompile_if_changed ──► new schema built aside    │
//! │                                 then swapped in one store │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Schema Swap
//!
//! A recompile never edits the current schema in place. The script is parsed
//! into a fresh [`ComponentSchema`] and the `Arc` is replaced in a single
//! assignment, so a reader holding the previous `Arc` keeps a consistent
//! snapshot.
//!
//! ## Overrides
//!
//! Instances only store values. [`override_script_inputs`] lays those values
//! over the current schema: the schema decides which inputs exist, their
//! order, type, range and enum items; the stored value wins wherever it still
//! parses as the schema's type.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::component::input::ComponentInput;
use crate::component::instance::ComponentInstance;
use crate::component::parser::parse_script_inputs;
use crate::component::watcher::{FileWatch, SignatureWatcher, WatcherFactory};
use crate::persist::paths::{self, ScriptScope};

/// The parsed declaration list of one script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSchema {
    pub inputs: Vec<ComponentInput>,
    pub err_log: String,
}

/// A cached component script.
pub struct Component {
    assetpath: String,
    watcher: Box<dyn FileWatch>,
    schema: Arc<ComponentSchema>,
    /// Set once the first schema is in; that one is the baseline.
    compiled: bool,
    inputs_changed: bool,
}

impl Component {
    fn new(assetpath: String, watcher: Box<dyn FileWatch>) -> Self {
        Self {
            assetpath,
            watcher,
            schema: Arc::new(ComponentSchema::default()),
            compiled: false,
            inputs_changed: false,
        }
    }

    pub fn assetpath(&self) -> &str {
        &self.assetpath
    }

    pub fn schema(&self) -> Arc<ComponentSchema> {
        Arc::clone(&self.schema)
    }

    pub fn err_log(&self) -> &str {
        &self.schema.err_log
    }

    pub fn file_exists(&self) -> bool {
        self.watcher.file_exists()
    }

    /// Read and clear the flag set by a recompile after the first one.
    pub fn take_inputs_changed(&mut self) -> bool {
        std::mem::take(&mut self.inputs_changed)
    }

    /// Re-parse the script if its watcher reports a change. Returns whether
    /// the schema was replaced.
    pub fn recompile_if_changed(&mut self, abspath: &Path) -> bool {
        if !self.watcher.look() {
            return false;
        }
        let schema = if self.watcher.file_exists() {
            match parse_script_inputs(abspath) {
                Ok(parsed) => ComponentSchema {
                    err_log: parsed.err_log(),
                    inputs: parsed.inputs,
                },
                Err(e) => ComponentSchema {
                    inputs: Vec::new(),
                    err_log: e.to_string(),
                },
            }
        } else {
            ComponentSchema::default()
        };
        log::debug!(
            "Recompiled component {} ({} inputs)",
            self.assetpath,
            schema.inputs.len()
        );
        self.schema = Arc::new(schema);
        self.inputs_changed |= self.compiled;
        self.compiled = true;
        true
    }
}

/// Cache of every component script referenced during a project session.
pub struct ComponentRegistry {
    asset_root: PathBuf,
    components: HashMap<String, Component>,
    watcher_factory: WatcherFactory,
}

impl ComponentRegistry {
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            components: HashMap::new(),
            watcher_factory: SignatureWatcher::boxed,
        }
    }

    pub fn with_watcher_factory(mut self, factory: WatcherFactory) -> Self {
        self.watcher_factory = factory;
        self
    }

    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Return the cached component for `assetpath`, creating it on first use.
    /// A new component starts with an empty schema until its first recompile.
    pub fn get_or_create(&mut self, assetpath: &str) -> &mut Component {
        let factory = self.watcher_factory;
        let root = &self.asset_root;
        self.components
            .entry(assetpath.to_string())
            .or_insert_with(|| {
                Component::new(
                    assetpath.to_string(),
                    factory(paths::asset_abspath(root, assetpath)),
                )
            })
    }

    pub fn get(&self, assetpath: &str) -> Option<&Component> {
        self.components.get(assetpath)
    }

    /// Recompile the component at `assetpath` if its script changed.
    pub fn recompile_if_changed(&mut self, assetpath: &str) -> bool {
        let abspath = paths::asset_abspath(&self.asset_root, assetpath);
        self.get_or_create(assetpath).recompile_if_changed(&abspath)
    }

    /// Fetch (and recompile if needed) the schema for `assetpath`.
    pub fn schema(&mut self, assetpath: &str) -> Arc<ComponentSchema> {
        self.recompile_if_changed(assetpath);
        self.get_or_create(assetpath).schema()
    }

    /// Forget cached components, e.g. after their folder was renamed.
    pub fn forget_prefix(&mut self, prefix: &str) {
        self.components
            .retain(|path, _| !paths::is_under(path, prefix));
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Bring `instance` up to date with its script: error log, file presence
    /// and inputs merged onto the current schema.
    pub fn refresh_instance(&mut self, scope: &ScriptScope, instance: &mut ComponentInstance) {
        let Some(assetpath) = instance.assetpath(scope) else {
            instance.file_exists = false;
            instance.err_log.clear();
            instance.inputs.clear();
            return;
        };
        let abspath = paths::asset_abspath(&self.asset_root, &assetpath);
        let component = self.get_or_create(&assetpath);
        component.recompile_if_changed(&abspath);
        instance.err_log = component.err_log().to_string();
        instance.file_exists = component.file_exists();
        instance.inputs = override_script_inputs(&component.schema.inputs, &instance.inputs);
    }
}

/// Lay stored `overrides` over `base`.
///
/// The result has exactly the inputs of `base`, in `base`'s order. Each one
/// takes the value of the first same-named override if that value parses as
/// the base input's type; otherwise it keeps the base default. Overrides with
/// no counterpart in `base` are dropped.
pub fn override_script_inputs(
    base: &[ComponentInput],
    overrides: &[ComponentInput],
) -> Vec<ComponentInput> {
    let merged: Vec<ComponentInput> = base
        .iter()
        .map(|input| {
            let value = overrides
                .iter()
                .find(|o| o.name == input.name)
                .and_then(|o| input.value.with_string_value(&o.value.to_string_value()).ok())
                .unwrap_or_else(|| input.value.clone());
            ComponentInput::new(input.name.clone(), value)
        })
        .collect();

    for dropped in overrides
        .iter()
        .filter(|o| !base.iter().any(|b| b.name == o.name))
    {
        log::debug!("Dropping stored value for removed input '{}'", dropped.name);
    }
    merged
}
