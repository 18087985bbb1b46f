//! Error types shared by every subsystem.
//!
//! Parse problems inside component scripts are *not* errors at this level:
//! they are collected into the component's error log and never abort a load.
//! [`SmithyError`] covers the failures a caller has to react to.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmithyError {
    #[error("could not parse '{input}': {reason}")]
    Parse { input: String, reason: String },

    /// A file or folder is held open by another process. Nothing was changed,
    /// the operation can be retried once the other process lets go.
    #[error("'{}' is in use by another process: {source}", path.display())]
    DiskContention {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid asset path '{0}'")]
    InvalidPath(String),

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("refusing to modify protected path '{0}'")]
    ProtectedPath(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("parent cycle detected involving '{0}'")]
    HierarchyCycle(String),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SmithyError>;

impl SmithyError {
    /// Classify an I/O failure on `path`. Lock and permission failures become
    /// [`SmithyError::DiskContention`], everything else [`SmithyError::Io`].
    pub fn from_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if is_contention(&source) {
            SmithyError::DiskContention { path, source }
        } else {
            SmithyError::Io { path, source }
        }
    }

    /// Whether the caller may retry the same operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SmithyError::DiskContention { .. })
    }
}

fn is_contention(err: &io::Error) -> bool {
    if matches!(
        err.kind(),
        io::ErrorKind::PermissionDenied | io::ErrorKind::ResourceBusy
    ) {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(err.raw_os_error(), Some(32) | Some(33))
}

/// Extension for attaching the offending path to raw I/O results.
pub(crate) trait IoResultExt<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| SmithyError::from_io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_retryable() {
        let err = SmithyError::from_io(
            "scripts/Level",
            io::Error::new(io::ErrorKind::PermissionDenied, "locked"),
        );
        assert!(err.is_retryable());
        assert!(err.to_string().contains("in use by another process"));
    }

    #[test]
    fn not_found_is_plain_io() {
        let err = SmithyError::from_io("x", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, SmithyError::Io { .. }));
        assert!(!err.is_retryable());
    }
}
