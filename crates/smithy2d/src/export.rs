//! # Export — Lua Payload for the Runtime
//!
//! Two files are written, both plain Lua chunks returning a table:
//!
//! ```text
//! scenes.lua                                components.lua
//! return {                                  return {
//!   ["Forest"] = {                            global = {
//!     ["Clearing"] = {                          { id = "core/components/Health",
//!       ["Day"] = {                               script = "scripts/core/..." },
//!         script = "scripts/Forest/...",      },
//!         objects = {                         scenes = {
//!           {                                   ["Forest"] = { ... },
//!             name = "Hero",                  },
//!             parent = nil,                 }
//!             components = {
//!               ["Transform"] = { ... },
//!               ["Health"] = { ["hp"]=100, },
//! ```
//!
//! Every object gets a synthesized `Transform` component first, in screen
//! space (pixels, Y down). Component inputs are the schema merged with the
//! stored values, exactly as a load would produce them. Numbers are rounded
//! to three decimals.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::component::input::InputValue;
use crate::component::registry::ComponentRegistry;
use crate::error::Result;
use crate::math::{Transform, Vec3, round3, to_screen_position};
use crate::persist::paths::{self, ScriptScope};
use crate::persist::write_atomic;
use crate::project::Project;
use crate::state::model::ProjectDocument;
use crate::state::object_state::ObjectState;

pub const SCENES_FILE: &str = "scenes.lua";
pub const COMPONENTS_FILE: &str = "components.lua";

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub scenes_file: PathBuf,
    pub components_file: PathBuf,
    pub scenes: usize,
    pub objects: usize,
}

impl Project {
    /// Save the live state, then write both payloads into `out_dir` (the
    /// configured export directory when `None`) and mark every scene clean.
    pub fn export(&mut self, out_dir: Option<&Path>) -> Result<ExportSummary> {
        self.save_active_state()?;
        let out_dir = match out_dir {
            Some(dir) => dir.to_path_buf(),
            None => self.root().join(&self.config.export_dir),
        };
        let ppu = self.config.pixels_per_unit;

        let scenes = export_scenes(&self.doc, &mut self.registry, ppu);
        let components = export_component_manifest(&self.doc);
        let scenes_file = out_dir.join(SCENES_FILE);
        let components_file = out_dir.join(COMPONENTS_FILE);
        write_atomic(&scenes_file, &scenes)?;
        write_atomic(&components_file, &components)?;

        let objects: usize = self
            .doc
            .scenes()
            .iter()
            .flat_map(|s| s.rooms())
            .flat_map(|r| r.variants())
            .map(|v| v.object_states.len())
            .sum();
        for scene in self.doc.scenes_mut() {
            scene.dirty = false;
        }
        log::info!("Exported {objects} objects to {}", out_dir.display());
        Ok(ExportSummary {
            scenes_file,
            components_file,
            scenes: self.doc.scenes().len(),
            objects,
        })
    }
}

/// The `scenes.lua` payload.
pub fn export_scenes(doc: &ProjectDocument, registry: &mut ComponentRegistry, ppu: f32) -> String {
    let mut lua = LuaWriter::default();
    lua.open("return {");
    for scene in doc.scenes() {
        lua.open(&format!("[{}] = {{", quote(scene.name())));
        for room in scene.rooms() {
            lua.open(&format!("[{}] = {{", quote(room.name())));
            let scope = ScriptScope::new(Some(scene.name()), Some(room.name()));
            for variant in room.variants() {
                lua.open(&format!("[{}] = {{", quote(variant.name())));
                let script = paths::variant_script(scene.name(), room.name(), variant.name());
                lua.line(&format!("script = {},", quote(&script)));
                lua.open("objects = {");
                for state in &variant.object_states {
                    write_object(&mut lua, state, registry, &scope, ppu);
                }
                lua.close("},");
                lua.close("},");
            }
            lua.close("},");
        }
        lua.close("},");
    }
    lua.close("}");
    lua.finish()
}

fn write_object(
    lua: &mut LuaWriter,
    state: &ObjectState,
    registry: &mut ComponentRegistry,
    scope: &ScriptScope,
    ppu: f32,
) {
    lua.open("{");
    lua.line(&format!("name = {},", quote(&state.name)));
    if state.is_root() {
        lua.line("parent = nil,");
    } else {
        lua.line(&format!("parent = {},", quote(&state.parent)));
    }
    lua.open("components = {");

    let transform = Transform::from_matrix(state.matrix_local);
    let rotation = transform.rotation;
    lua.open("[\"Transform\"] = {");
    lua.field("position", &vector(&to_screen_position(transform.translation, ppu).to_array()));
    lua.field(
        "rotation_quat",
        &vector(&[rotation.w, rotation.x, rotation.y, rotation.z]),
    );
    let size = Vec3::new(transform.scale.x * ppu, transform.scale.y * ppu, transform.scale.z);
    lua.field("size", &vector(&size.to_array()));
    lua.field("topleft", &vector(&to_screen_position(state.topleft, ppu).to_array()));
    lua.close("},");

    for stored in &state.components {
        let mut instance = stored.deserialize();
        registry.refresh_instance(scope, &mut instance);
        if !instance.file_exists {
            log::warn!(
                "Exporting '{}': component '{}' has no script",
                state.name,
                instance.name
            );
        }
        lua.open(&format!("[{}] = {{", quote(&instance.name)));
        for input in &instance.inputs {
            lua.field(&input.name, &lua_value(&input.value));
        }
        lua.close("},");
    }

    lua.close("},");
    lua.close("},");
}

/// The `components.lua` manifest: every component script referenced by any
/// stored object, global ones once, local ones grouped by scene.
pub fn export_component_manifest(doc: &ProjectDocument) -> String {
    let mut global = BTreeSet::new();
    let mut local: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
    for scene in doc.scenes() {
        for room in scene.rooms() {
            let scope = ScriptScope::new(Some(scene.name()), Some(room.name()));
            for state in room.variants().iter().flat_map(|v| &v.object_states) {
                for stored in &state.components {
                    let Some(script) = paths::component_script(&scope, &stored.name, stored.is_global)
                    else {
                        continue;
                    };
                    if stored.is_global {
                        global.insert(script);
                    } else {
                        local.entry(scene.name()).or_default().insert(script);
                    }
                }
            }
        }
    }

    let mut lua = LuaWriter::default();
    lua.open("return {");
    lua.open("global = {");
    for script in &global {
        lua.line(&manifest_entry(script));
    }
    lua.close("},");
    lua.open("scenes = {");
    for (scene, scripts) in &local {
        lua.open(&format!("[{}] = {{", quote(scene)));
        for script in scripts {
            lua.line(&manifest_entry(script));
        }
        lua.close("},");
    }
    lua.close("},");
    lua.close("}");
    lua.finish()
}

/// `scripts/Forest/Room/components/Door.lua` → `Forest/Room/components/Door`.
pub fn component_id(script: &str) -> &str {
    let id = script
        .strip_prefix(paths::SCRIPTS_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(script);
    id.strip_suffix(".lua").unwrap_or(id)
}

fn manifest_entry(script: &str) -> String {
    format!(
        "{{ id = {}, script = {} }},",
        quote(component_id(script)),
        quote(script)
    )
}

// ── Lua literals ────────────────────────────────────────────────────────

#[derive(Default)]
struct LuaWriter {
    out: String,
    depth: usize,
}

impl LuaWriter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    fn field(&mut self, key: &str, value: &str) {
        self.line(&format!("[{}]={},", quote(key), value));
    }

    fn finish(self) -> String {
        self.out
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn number(value: f64) -> String {
    if value.is_nan() {
        "0/0".to_string()
    } else if value == f64::INFINITY {
        "math.huge".to_string()
    } else if value == f64::NEG_INFINITY {
        "-math.huge".to_string()
    } else {
        round3(value).to_string()
    }
}

fn vector(components: &[f32]) -> String {
    let mut out = String::from("{");
    for (i, c) in components.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&number(f64::from(*c)));
    }
    out.push('}');
    out
}

fn lua_value(value: &InputValue) -> String {
    match value {
        InputValue::Int { value, .. } => value.to_string(),
        InputValue::Float { value, .. } => number(*value),
        InputValue::Vec2(v) => vector(&v.to_array()),
        InputValue::Vec3(v) => vector(&v.to_array()),
        InputValue::Vec4(v) => vector(&v.to_array()),
        InputValue::String(s) => quote(s),
        InputValue::Bool(b) => b.to_string(),
        InputValue::Enum { value, .. } => quote(value),
        InputValue::Object(name) if name.is_empty() => "nil".to_string(),
        InputValue::Object(name) => quote(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::input::InputValue;
    use crate::math::{Bounds, Quat};
    use crate::test_support::{temp_project, write_asset};

    #[test]
    fn numbers_are_rounded_and_clean() {
        assert_eq!(number(1.23456), "1.235");
        assert_eq!(number(120.0), "120");
        assert_eq!(number(-0.0001), "0");
        assert_eq!(number(f64::INFINITY), "math.huge");
        assert_eq!(vector(&[0.5, -2.0]), "{0.5,-2}");
    }

    #[test]
    fn values_become_lua_literals() {
        assert_eq!(lua_value(&InputValue::Bool(true)), "true");
        assert_eq!(lua_value(&InputValue::String("say \"hi\"".into())), "\"say \\\"hi\\\"\"");
        assert_eq!(lua_value(&InputValue::Object(String::new())), "nil");
        assert_eq!(lua_value(&InputValue::int(7)), "7");
    }

    #[test]
    fn component_ids_drop_prefix_and_extension() {
        assert_eq!(
            component_id("scripts/core/components/Health.lua"),
            "core/components/Health"
        );
        assert_eq!(
            component_id("scripts/Forest/Room/components/Door.lua"),
            "Forest/Room/components/Door"
        );
    }

    #[test]
    fn export_writes_transform_first_and_merged_inputs() {
        let (dir, mut project) = temp_project();
        project.add_scene("Forest").unwrap();
        write_asset(
            dir.path(),
            "scripts/core/components/Health.lua",
            "--$hp(int, 100)\n--$regen(float, 0.5)\n",
        );
        let hero = project.world_mut().spawn("Hero").unwrap();
        {
            let data = project.world_mut().get_mut(hero).unwrap();
            data.matrix_local = Transform {
                translation: Vec3::new(1.0, 2.0, 0.0),
                rotation: Quat::IDENTITY,
                scale: Vec3::new(0.5, 0.5, 1.0),
            }
            .matrix();
            data.bounds = Bounds::from_size(2.0, 2.0);
        }
        project
            .add_component(hero, "Health", true)
            .unwrap()
            .set_input("hp", &InputValue::int(40));

        let summary = project.export(None).unwrap();
        assert_eq!(summary.objects, 1);
        assert!(project.document().scenes().iter().all(|s| !s.dirty));

        let scenes = std::fs::read_to_string(&summary.scenes_file).unwrap();
        assert!(scenes.starts_with("return {\n\t[\"Forest\"] = {\n\t\t[\"Room\"] = {"));
        assert!(scenes.contains("script = \"scripts/Forest/Room/states/Default.lua\","));
        assert!(scenes.contains("name = \"Hero\","));
        assert!(scenes.contains("[\"position\"]={120,-240,0},"));
        assert!(scenes.contains("[\"rotation_quat\"]={1,0,0,0},"));
        assert!(scenes.contains("[\"size\"]={60,60,1},"));
        assert!(scenes.contains("[\"topleft\"]={-120,-120,0},"));
        assert!(scenes.contains("[\"hp\"]=40,"));
        assert!(scenes.contains("[\"regen\"]=0.5,"));
        let transform_at = scenes.find("[\"Transform\"]").unwrap();
        let health_at = scenes.find("[\"Health\"]").unwrap();
        assert!(transform_at < health_at);

        let manifest = std::fs::read_to_string(&summary.components_file).unwrap();
        assert!(manifest.contains(
            "{ id = \"core/components/Health\", script = \"scripts/core/components/Health.lua\" },"
        ));
        assert!(summary.scenes_file.starts_with(dir.path().join("export")));
    }

    #[test]
    fn manifest_groups_local_components_by_scene() {
        let (_dir, mut project) = temp_project();
        project.add_scene("Forest").unwrap();
        let hero = project.world_mut().spawn("Gate").unwrap();
        project.add_component(hero, "Door", false).unwrap();
        project.save_active_state().unwrap();

        let manifest = export_component_manifest(project.document());
        assert_eq!(
            manifest,
            "return {\n\tglobal = {\n\t},\n\tscenes = {\n\t\t[\"Forest\"] = {\n\t\t\t{ id = \"Forest/Room/components/Door\", script = \"scripts/Forest/Room/components/Door.lua\" },\n\t\t},\n\t},\n}\n"
        );
    }
}
