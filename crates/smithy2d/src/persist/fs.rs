//! File operations behind rename, delete and sync.
//!
//! Everything that moves or creates files for the hierarchy goes through
//! [`AssetFs`]. [`DiskFs`] is the real thing; tests wrap it to simulate a
//! file held open by another program.
//!
//! ## Move-Merge
//!
//! Renaming a folder onto an existing folder merges the two: files from the
//! source replace same-named files in the target, everything else is kept,
//! and the emptied source is removed.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

pub trait AssetFs {
    fn exists(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Write `contents` to `path` unless something is already there.
    fn write_new(&self, path: &Path, contents: &str) -> io::Result<()>;

    /// Move a file or folder. A folder moved onto an existing folder is
    /// merged into it.
    fn move_merge(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Immediate children of `path`, sorted by name. A missing folder lists
    /// as empty.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFs;

impl AssetFs for DiskFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn write_new(&self, path: &Path, contents: &str) -> io::Result<()> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }

    fn move_merge(&self, from: &Path, to: &Path) -> io::Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if !from.is_dir() || !to.is_dir() {
            return std::fs::rename(from, to);
        }

        // Merge: recreate the tree under `to`, move every file across.
        for entry in WalkDir::new(from).min_depth(1) {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(from)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let target = to.join(relative);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)?;
            } else {
                std::fs::rename(entry.path(), &target)?;
            }
        }
        std::fs::remove_dir_all(from)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        if !path.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type()?.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

/// First free destination for `target`: itself, or `name_1`, `name_2`, ...
/// (the suffix goes before a file extension).
pub fn collision_free(fs: &dyn AssetFs, target: &Path) -> PathBuf {
    if !fs.exists(target) {
        return target.to_path_buf();
    }
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|n| target.with_file_name(format!("{stem}_{n}{extension}")))
        .find(|candidate| !fs.exists(candidate))
        .unwrap_or_else(|| target.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_merge_into_existing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("Old");
        let to = dir.path().join("New");
        std::fs::create_dir_all(from.join("states")).unwrap();
        std::fs::create_dir_all(to.join("states")).unwrap();
        std::fs::write(from.join("states/A.lua"), "from").unwrap();
        std::fs::write(to.join("states/A.lua"), "to").unwrap();
        std::fs::write(to.join("states/B.lua"), "kept").unwrap();

        DiskFs.move_merge(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(to.join("states/A.lua")).unwrap(), "from");
        assert_eq!(std::fs::read_to_string(to.join("states/B.lua")).unwrap(), "kept");
    }

    #[test]
    fn plain_rename_when_target_missing() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("a.lua");
        std::fs::write(&from, "x").unwrap();
        let to = dir.path().join("deep/b.lua");
        DiskFs.move_merge(&from, &to).unwrap();
        assert!(to.exists());
        assert!(!from.exists());
    }

    #[test]
    fn collision_suffix_goes_before_extension() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Night.lua");
        assert_eq!(collision_free(&DiskFs, &target), target);
        std::fs::write(&target, "").unwrap();
        std::fs::write(dir.path().join("Night_1.lua"), "").unwrap();
        assert_eq!(collision_free(&DiskFs, &target), dir.path().join("Night_2.lua"));
    }

    #[test]
    fn list_dir_sorted_and_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("a.lua"), "").unwrap();
        let listed = DiskFs.list_dir(dir.path()).unwrap();
        assert_eq!(
            listed,
            vec![
                DirEntry { name: "a.lua".into(), is_dir: false },
                DirEntry { name: "b".into(), is_dir: true },
            ]
        );
        assert!(DiskFs.list_dir(&dir.path().join("nope")).unwrap().is_empty());
    }
}
