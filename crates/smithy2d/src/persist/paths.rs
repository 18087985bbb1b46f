//! # Asset Paths — Where Every Hierarchy Item Lives on Disk
//!
//! Asset paths are `/`-separated and relative to the project root. The
//! layout is fixed:
//!
//! ```text
//! scripts/                                  scripts root     (protected)
//! scripts/core/                             global namespace (protected)
//! scripts/core/components/<c>.lua           global component
//! scripts/<scene>/                          scene
//! scripts/<scene>/<room>/                   room
//! scripts/<scene>/<room>/states/<v>.lua     variant script
//! scripts/<scene>/<room>/components/<c>.lua room-local component
//! ```
//!
//! [`AssetPath::parse`] is the validator: any other shape is rejected before
//! a rename or delete touches the disk.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, SmithyError};

pub const SCRIPTS_DIR: &str = "scripts";
pub const CORE_DIR: &str = "core";
pub const STATES_DIR: &str = "states";
pub const COMPONENTS_DIR: &str = "components";
pub const SCRIPT_EXT: &str = "lua";

/// The scene and room used to resolve room-local component scripts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptScope {
    pub scene: Option<String>,
    pub room: Option<String>,
}

impl ScriptScope {
    pub fn new(scene: Option<&str>, room: Option<&str>) -> Self {
        Self {
            scene: scene.map(str::to_string),
            room: room.map(str::to_string),
        }
    }

    /// Only global components resolve in this scope.
    pub fn global() -> Self {
        Self::default()
    }
}

pub fn asset_abspath(root: &Path, assetpath: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    path.extend(assetpath.split('/').filter(|s| !s.is_empty()));
    path
}

/// `path` equals `prefix` or lies below it (segment-wise).
pub fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Replace the `old` prefix of `path` with `new`, if `path` is under `old`.
pub fn rebase(path: &str, old: &str, new: &str) -> Option<String> {
    is_under(path, old).then(|| format!("{new}{}", &path[old.len()..]))
}

pub fn scene_dir(scene: &str) -> String {
    format!("{SCRIPTS_DIR}/{scene}")
}

pub fn room_dir(scene: &str, room: &str) -> String {
    format!("{SCRIPTS_DIR}/{scene}/{room}")
}

pub fn variant_script(scene: &str, room: &str, variant: &str) -> String {
    format!("{SCRIPTS_DIR}/{scene}/{room}/{STATES_DIR}/{variant}.{SCRIPT_EXT}")
}

pub fn global_component_script(name: &str) -> String {
    format!("{SCRIPTS_DIR}/{CORE_DIR}/{COMPONENTS_DIR}/{name}.{SCRIPT_EXT}")
}

pub fn local_component_script(scene: &str, room: &str, name: &str) -> String {
    format!("{SCRIPTS_DIR}/{scene}/{room}/{COMPONENTS_DIR}/{name}.{SCRIPT_EXT}")
}

/// Resolve a component script. Local components need both a scene and a room.
pub fn component_script(scope: &ScriptScope, name: &str, is_global: bool) -> Option<String> {
    if is_global {
        return Some(global_component_script(name));
    }
    match (&scope.scene, &scope.room) {
        (Some(scene), Some(room)) => Some(local_component_script(scene, room, name)),
        _ => None,
    }
}

/// Names become path segments, so they are restricted.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name != name.trim() {
        Some("name has leading or trailing whitespace")
    } else if name.starts_with('.') {
        Some("name starts with '.'")
    } else if name.contains(['/', '\\', ',', '\t', '\n', '\r', ':']) {
        Some("name contains a reserved character")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(SmithyError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Scene names additionally may not shadow the global namespace.
pub fn validate_scene_name(name: &str) -> Result<()> {
    validate_name(name)?;
    if name == CORE_DIR {
        return Err(SmithyError::InvalidName {
            name: name.to_string(),
            reason: "reserved for global components",
        });
    }
    Ok(())
}

// ── AssetPath ───────────────────────────────────────────────────────────

/// A validated asset path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetPath {
    ScriptsRoot,
    CoreDir,
    GlobalComponent {
        name: String,
    },
    Scene {
        scene: String,
    },
    Room {
        scene: String,
        room: String,
    },
    Variant {
        scene: String,
        room: String,
        variant: String,
    },
    LocalComponent {
        scene: String,
        room: String,
        name: String,
    },
}

impl AssetPath {
    pub fn parse(path: &str) -> Result<Self> {
        let invalid = || SmithyError::InvalidPath(path.to_string());
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.first() != Some(&SCRIPTS_DIR) {
            return Err(invalid());
        }
        for segment in &segments[1..] {
            validate_name(segment).map_err(|_| invalid())?;
        }
        let script_stem = |file: &str| {
            file.strip_suffix(&format!(".{SCRIPT_EXT}"))
                .filter(|stem| validate_name(stem).is_ok())
                .map(str::to_string)
        };

        let parsed = match segments[1..] {
            [] => AssetPath::ScriptsRoot,
            [CORE_DIR] => AssetPath::CoreDir,
            [CORE_DIR, COMPONENTS_DIR, file] => AssetPath::GlobalComponent {
                name: script_stem(file).ok_or_else(invalid)?,
            },
            [CORE_DIR, ..] => return Err(invalid()),
            [scene] => AssetPath::Scene {
                scene: scene.to_string(),
            },
            [scene, room] => AssetPath::Room {
                scene: scene.to_string(),
                room: room.to_string(),
            },
            [scene, room, STATES_DIR, file] => AssetPath::Variant {
                scene: scene.to_string(),
                room: room.to_string(),
                variant: script_stem(file).ok_or_else(invalid)?,
            },
            [scene, room, COMPONENTS_DIR, file] => AssetPath::LocalComponent {
                scene: scene.to_string(),
                room: room.to_string(),
                name: script_stem(file).ok_or_else(invalid)?,
            },
            _ => return Err(invalid()),
        };
        Ok(parsed)
    }

    /// The scripts root and the global namespace can never be renamed or
    /// deleted.
    pub fn is_protected(&self) -> bool {
        matches!(self, AssetPath::ScriptsRoot | AssetPath::CoreDir)
    }

    /// The name the item at this path should carry in memory.
    pub fn derived_name(&self) -> Option<&str> {
        match self {
            AssetPath::ScriptsRoot | AssetPath::CoreDir => None,
            AssetPath::Scene { scene } => Some(scene),
            AssetPath::Room { room, .. } => Some(room),
            AssetPath::Variant { variant, .. } => Some(variant),
            AssetPath::GlobalComponent { name } | AssetPath::LocalComponent { name, .. } => {
                Some(name)
            }
        }
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetPath::ScriptsRoot => f.write_str(SCRIPTS_DIR),
            AssetPath::CoreDir => write!(f, "{SCRIPTS_DIR}/{CORE_DIR}"),
            AssetPath::GlobalComponent { name } => f.write_str(&global_component_script(name)),
            AssetPath::Scene { scene } => f.write_str(&scene_dir(scene)),
            AssetPath::Room { scene, room } => f.write_str(&room_dir(scene, room)),
            AssetPath::Variant {
                scene,
                room,
                variant,
            } => f.write_str(&variant_script(scene, room, variant)),
            AssetPath::LocalComponent { scene, room, name } => {
                f.write_str(&local_component_script(scene, room, name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_every_layout_entry() {
        let cases = [
            "scripts",
            "scripts/core",
            "scripts/core/components/Render.lua",
            "scripts/Forest",
            "scripts/Forest/Clearing",
            "scripts/Forest/Clearing/states/Night.lua",
            "scripts/Forest/Clearing/components/Door.lua",
        ];
        for case in cases {
            let parsed = AssetPath::parse(case).unwrap();
            assert_eq!(parsed.to_string(), case);
        }
    }

    #[test]
    fn rejects_everything_else() {
        for case in [
            "",
            "assets/Forest",
            "scripts/Forest/Clearing/states",
            "scripts/Forest/Clearing/states/Night.txt",
            "scripts/Forest/Clearing/other/Night.lua",
            "scripts/../etc",
            "scripts/core/states",
            "scripts//Forest",
        ] {
            assert!(
                matches!(AssetPath::parse(case), Err(SmithyError::InvalidPath(_))),
                "{case}"
            );
        }
    }

    #[test]
    fn only_root_and_core_are_protected() {
        assert!(AssetPath::parse("scripts").unwrap().is_protected());
        assert!(AssetPath::parse("scripts/core/").unwrap().is_protected());
        assert!(!AssetPath::parse("scripts/Forest").unwrap().is_protected());
    }

    #[test]
    fn prefix_checks_respect_segments() {
        assert!(is_under("scripts/A/B", "scripts/A"));
        assert!(is_under("scripts/A", "scripts/A"));
        assert!(!is_under("scripts/AB", "scripts/A"));
        assert_eq!(
            rebase("scripts/A/R/states/V.lua", "scripts/A", "scripts/Z").as_deref(),
            Some("scripts/Z/R/states/V.lua")
        );
        assert_eq!(rebase("scripts/AB", "scripts/A", "scripts/Z"), None);
    }

    #[test]
    fn local_components_need_a_room() {
        let scope = ScriptScope::new(Some("Forest"), None);
        assert_eq!(component_script(&scope, "Door", false), None);
        assert_eq!(
            component_script(&scope, "Render", true).as_deref(),
            Some("scripts/core/components/Render.lua")
        );
    }

    #[test]
    fn name_rules() {
        assert!(validate_name("Level 1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_scene_name("core").is_err());
    }
}
