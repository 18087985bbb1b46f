//! # Smithy2D — Level Editor State
//!
//! The editing model behind a 2D level editor: scenes made of rooms, rooms
//! made of variants, entities carrying script-backed components, and the
//! protocol that keeps the live entity graph, the stored states and the
//! script files on disk consistent.
//!
//! Start with `use smithy2d::prelude::*` and open a [`Project`](project::Project).

pub mod component;
pub mod config;
pub mod error;
pub mod export;
pub mod math;
pub mod persist;
pub mod prelude;
pub mod project;
pub mod state;
pub mod world;

#[cfg(test)]
pub(crate) mod test_support {
    use std::io;
    use std::path::{Path, PathBuf};

    use crate::persist::fs::{AssetFs, DirEntry, DiskFs};
    use crate::project::Project;

    /// Write a file under the project root, creating folders on the way.
    pub fn write_asset(root: &Path, assetpath: &str, contents: &str) {
        let path = crate::persist::paths::asset_abspath(root, assetpath);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    /// An empty project in a fresh temp dir.
    pub fn temp_project() -> (tempfile::TempDir, Project) {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::open(dir.path()).unwrap();
        (dir, project)
    }

    /// Disk access where everything at or below `locked` is held open by
    /// another process.
    pub struct LockedFs {
        locked: PathBuf,
    }

    impl LockedFs {
        pub fn new(locked: PathBuf) -> Self {
            Self { locked }
        }

        fn check(&self, path: &Path) -> io::Result<()> {
            if path.starts_with(&self.locked) {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "file is locked"))
            } else {
                Ok(())
            }
        }
    }

    impl AssetFs for LockedFs {
        fn exists(&self, path: &Path) -> bool {
            DiskFs.exists(path)
        }

        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            self.check(path)?;
            DiskFs.create_dir_all(path)
        }

        fn write_new(&self, path: &Path, contents: &str) -> io::Result<()> {
            self.check(path)?;
            DiskFs.write_new(path, contents)
        }

        fn move_merge(&self, from: &Path, to: &Path) -> io::Result<()> {
            self.check(from)?;
            self.check(to)?;
            DiskFs.move_merge(from, to)
        }

        fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
            DiskFs.list_dir(path)
        }
    }
}
