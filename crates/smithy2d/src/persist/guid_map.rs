//! # GUID Map — Identity ↔ Location
//!
//! Each scene, room and variant has a guid that never changes. The guid map
//! is the one place that knows where on disk each guid currently lives.
//!
//! ## File Format
//!
//! ```text
//! 3f2c…-…\tscripts/Forest
//! 9a01…-…\tscripts/Forest/Clearing
//! 77be…-…\tscripts/Forest/Clearing/states/Night.lua
//! ```
//!
//! One `guid<TAB>assetpath` record per line, UTF-8, no header.
//!
//! ## Writes
//!
//! A new binding is appended. Anything that changes or drops an existing
//! record (rebind, remove, prefix rewrite) rewrites the whole file through a
//! temp file and an atomic rename, so the file on disk is always either the
//! old or the new complete map.
//!
//! In memory, two maps (`guid → path`, `path → guid`) are kept in step on
//! every mutation, making both directions O(1).

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::{IoResultExt, Result};
use crate::persist::paths;
use crate::persist::write_atomic;
use crate::state::model::Guid;

#[derive(Debug, Clone)]
pub struct GuidMap {
    file: PathBuf,
    guid_to_path: HashMap<Guid, String>,
    path_to_guid: HashMap<String, Guid>,
}

impl GuidMap {
    /// An empty map that will persist to `file`.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            guid_to_path: HashMap::new(),
            path_to_guid: HashMap::new(),
        }
    }

    /// Read `file`. A missing file is an empty map; malformed lines are
    /// skipped with a warning. For a guid listed twice the last line wins.
    pub fn load(file: impl Into<PathBuf>) -> Result<Self> {
        let mut map = Self::new(file);
        if !map.file.exists() {
            return Ok(map);
        }
        let text = std::fs::read_to_string(&map.file).at(&map.file)?;
        for (number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed = line
                .split_once('\t')
                .and_then(|(guid, path)| Some((Uuid::parse_str(guid.trim()).ok()?, path)));
            match parsed {
                Some((guid, path)) if !path.is_empty() => map.insert(guid, path.to_string()),
                _ => log::warn!(
                    "{}:{}: skipping malformed guid record",
                    map.file.display(),
                    number + 1
                ),
            }
        }
        log::info!("Loaded {} guid bindings from {}", map.len(), map.file.display());
        Ok(map)
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn path(&self, guid: Guid) -> Option<&str> {
        self.guid_to_path.get(&guid).map(String::as_str)
    }

    pub fn guid(&self, path: &str) -> Option<Guid> {
        self.path_to_guid.get(path).copied()
    }

    pub fn contains(&self, guid: Guid) -> bool {
        self.guid_to_path.contains_key(&guid)
    }

    pub fn len(&self) -> usize {
        self.guid_to_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guid_to_path.is_empty()
    }

    /// All bindings, sorted by path.
    pub fn entries(&self) -> Vec<(Guid, &str)> {
        let mut entries: Vec<_> = self
            .guid_to_path
            .iter()
            .map(|(g, p)| (*g, p.as_str()))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(&b.0)));
        entries
    }

    /// Keep both directions consistent, evicting whatever `guid` or `path`
    /// was bound to before.
    fn insert(&mut self, guid: Guid, path: String) {
        if let Some(old_path) = self.guid_to_path.remove(&guid) {
            self.path_to_guid.remove(&old_path);
        }
        if let Some(old_guid) = self.path_to_guid.remove(&path) {
            self.guid_to_path.remove(&old_guid);
        }
        self.guid_to_path.insert(guid, path.clone());
        self.path_to_guid.insert(path, guid);
    }

    // ── Mutation (persisted immediately) ─────────────────────────────
    //
    // Memory changes only after the file write succeeded.

    /// Bind `guid` to `path`. Appends in the common case; rewrites when the
    /// guid or the path was already bound elsewhere.
    pub fn bind(&mut self, guid: Guid, path: &str) -> Result<()> {
        if self.path(guid) == Some(path) {
            return Ok(());
        }
        if self.guid_to_path.contains_key(&guid) || self.path_to_guid.contains_key(path) {
            return self.commit(|next| {
                next.insert(guid, path.to_string());
            });
        }
        self.append(guid, path)?;
        self.insert(guid, path.to_string());
        Ok(())
    }

    pub fn remove(&mut self, guid: Guid) -> Result<Option<String>> {
        let Some(path) = self.path(guid).map(str::to_string) else {
            return Ok(None);
        };
        self.commit(|next| {
            next.guid_to_path.remove(&guid);
            next.path_to_guid.remove(&path);
        })?;
        Ok(Some(path))
    }

    /// Drop every listed guid and every binding at or under `prefix`, with a
    /// single rewrite. Returns the number of records removed.
    pub fn remove_subtree(&mut self, guids: &[Guid], prefix: &str) -> Result<usize> {
        let listed: HashSet<&Guid> = guids.iter().collect();
        let doomed: Vec<Guid> = self
            .guid_to_path
            .iter()
            .filter(|(g, p)| listed.contains(g) || paths::is_under(p, prefix))
            .map(|(g, _)| *g)
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }
        self.commit(|next| {
            for guid in &doomed {
                if let Some(path) = next.guid_to_path.remove(guid) {
                    next.path_to_guid.remove(&path);
                }
            }
        })?;
        Ok(doomed.len())
    }

    /// Rewrite every path at or under `old` to live under `new`, in one pass
    /// and one file write. Returns the number of records changed.
    pub fn rewrite_prefix(&mut self, old: &str, new: &str) -> Result<usize> {
        self.relocate(None, old, new)
    }

    /// [`rewrite_prefix`](Self::rewrite_prefix), also making sure `guid` ends
    /// up bound to `new` itself. One file write.
    pub fn relocate(&mut self, guid: Option<Guid>, old: &str, new: &str) -> Result<usize> {
        let moved: Vec<(Guid, String)> = self
            .guid_to_path
            .iter()
            .filter_map(|(g, p)| Some((*g, paths::rebase(p, old, new)?)))
            .collect();
        let rebind = guid.filter(|g| {
            self.path(*g) != Some(new) && !moved.iter().any(|(m, p)| m == g && p == new)
        });
        if moved.is_empty() && rebind.is_none() {
            return Ok(0);
        }
        self.commit(|next| {
            for (guid, _) in &moved {
                if let Some(path) = next.guid_to_path.remove(guid) {
                    next.path_to_guid.remove(&path);
                }
            }
            for (guid, path) in &moved {
                next.insert(*guid, path.clone());
            }
            if let Some(guid) = rebind {
                next.insert(guid, new.to_string());
            }
        })?;
        Ok(moved.len())
    }

    /// Apply `change` to a copy, persist the copy, then adopt it.
    fn commit(&mut self, change: impl FnOnce(&mut Self)) -> Result<()> {
        let mut next = self.clone();
        change(&mut next);
        next.rewrite()?;
        *self = next;
        Ok(())
    }

    fn append(&self, guid: Guid, path: &str) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent).at(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .at(&self.file)?;
        writeln!(file, "{guid}\t{path}").at(&self.file)
    }

    fn rewrite(&self) -> Result<()> {
        let mut text = String::new();
        for (guid, path) in self.entries() {
            text.push_str(&format!("{guid}\t{path}\n"));
        }
        write_atomic(&self.file, &text)
    }
}
