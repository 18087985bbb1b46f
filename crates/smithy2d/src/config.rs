//! Project configuration.
//!
//! Every project root may carry an optional `smithy2d.toml`. Missing keys fall
//! back to [`ProjectConfig::default`], so an empty file and no file at all are
//! equivalent.
//!
//! ```toml
//! pixels_per_unit = 64.0
//! export_dir = "build/lua"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};

/// Name of the optional config file at the project root.
pub const CONFIG_FILE: &str = "smithy2d.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// GUID map, relative to the project root.
    pub guid_map_file: String,
    /// Scene hierarchy document, relative to the project root.
    pub project_file: String,
    /// Where deleted assets are moved to.
    pub archive_dir: String,
    /// Default output folder for `export`.
    pub export_dir: String,
    /// World units to screen pixels in the exported payload.
    pub pixels_per_unit: f32,
    pub default_room_name: String,
    pub default_variant_name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            guid_map_file: ".smithy2d/guids.tsv".to_string(),
            project_file: ".smithy2d/project.json".to_string(),
            archive_dir: ".smithy2d/archive".to_string(),
            export_dir: "export".to_string(),
            pixels_per_unit: 120.0,
            default_room_name: "Room".to_string(),
            default_variant_name: "Default".to_string(),
        }
    }
}

impl ProjectConfig {
    /// Read `<root>/smithy2d.toml`, or the defaults if the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).at(&path)?;
        let config = toml::from_str(&text)?;
        log::info!("Loaded project config from {}", path.display());
        Ok(config)
    }

    pub fn with_pixels_per_unit(mut self, ppu: f32) -> Self {
        self.pixels_per_unit = ppu;
        self
    }

    pub fn guid_map_path(&self, root: &Path) -> PathBuf {
        root.join(&self.guid_map_file)
    }

    pub fn project_file_path(&self, root: &Path) -> PathBuf {
        root.join(&self.project_file)
    }

    pub fn archive_path(&self, root: &Path) -> PathBuf {
        root.join(&self.archive_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.pixels_per_unit, 120.0);
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "pixels_per_unit = 64.0\nexport_dir = \"build/lua\"\n",
        )
        .unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.pixels_per_unit, 64.0);
        assert_eq!(config.export_dir, "build/lua");
        assert_eq!(config.guid_map_file, ".smithy2d/guids.tsv");
    }

    #[test]
    fn override_beats_the_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "pixels_per_unit = 64.0\n").unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap().with_pixels_per_unit(32.0);
        assert_eq!(config.pixels_per_unit, 32.0);
        assert_eq!(config.export_dir, "export");
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "pixels_per_unit = [").unwrap();
        assert!(matches!(
            ProjectConfig::load(dir.path()),
            Err(crate::error::SmithyError::Config(_))
        ));
    }
}
