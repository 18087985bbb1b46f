//! Identity and persistence: asset paths, the guid map, file operations and
//! the rename / delete / sync protocols.

pub mod delete;
pub mod fs;
pub mod guid_map;
pub mod paths;
pub mod rename;
pub mod sync;

use std::io::Write;
use std::path::Path;

use crate::error::{IoResultExt, Result};

/// Write `contents` to `path` through a sibling temp file and a rename, so
/// readers only ever see the old or the new file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).at(parent)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut file = std::fs::File::create(&tmp).at(&tmp)?;
    file.write_all(contents.as_bytes()).at(&tmp)?;
    file.sync_all().at(&tmp)?;
    drop(file);
    std::fs::rename(&tmp, path).at(path)
}
