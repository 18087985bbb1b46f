//! # Script Watching — Poll-Based Change Detection
//!
//! Component scripts are edited in an external text editor while the project
//! is open. The registry asks a [`FileWatch`] once per tick whether the file
//! changed since the last look; there is no background thread and no event
//! queue.
//!
//! ## Signature
//!
//! ```text
//! look()
//!   1. stat the file: missing? → changed iff it existed before
//!   2. (mtime, len) equal to the cached ones → unchanged, no read
//!   3. otherwise read + md5 → changed iff the digest differs
//! ```
//!
//! Step 3 makes "touched but identical" saves a no-op, which matters because
//! editors performing atomic saves bump the mtime without changing content.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Something that can tell whether a file changed since the last call.
pub trait FileWatch {
    /// Returns `true` if the file changed (or appeared, or vanished) since the
    /// previous call. The very first call always returns `true`.
    fn look(&mut self) -> bool;

    /// Whether the file existed at the last [`look`](FileWatch::look).
    fn file_exists(&self) -> bool;
}

/// Builds the watcher for a script path. Swappable for tests.
pub type WatcherFactory = fn(PathBuf) -> Box<dyn FileWatch>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileSignature {
    modified: Option<SystemTime>,
    len: u64,
    digest: md5::Digest,
}

/// The default [`FileWatch`]: stat first, hash only when the stat moved.
#[derive(Debug)]
pub struct SignatureWatcher {
    path: PathBuf,
    signature: Option<FileSignature>,
    primed: bool,
}

impl SignatureWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            signature: None,
            primed: false,
        }
    }

    pub fn boxed(path: PathBuf) -> Box<dyn FileWatch> {
        Box::new(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current(&self) -> Option<FileSignature> {
        let meta = std::fs::metadata(&self.path).ok()?;
        if !meta.is_file() {
            return None;
        }
        let modified = meta.modified().ok();
        let len = meta.len();
        if let Some(cached) = self.signature {
            if cached.modified == modified && cached.len == len && modified.is_some() {
                return Some(cached);
            }
        }
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Failed to read {}: {e}", self.path.display());
                return None;
            }
        };
        Some(FileSignature {
            modified,
            len,
            digest: md5::compute(&bytes),
        })
    }
}

impl FileWatch for SignatureWatcher {
    fn look(&mut self) -> bool {
        let current = self.current();
        let changed = match (&self.signature, &current) {
            (Some(old), Some(new)) => old.digest != new.digest || old.len != new.len,
            (None, None) => false,
            _ => true,
        };
        let changed = changed || !self.primed;
        self.primed = true;
        self.signature = current;
        changed
    }

    fn file_exists(&self) -> bool {
        self.signature.is_some()
    }
}
