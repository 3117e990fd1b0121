use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::sync::hash::Fingerprint;

/// What a path in a tree is, as seen without following links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// Fifo, socket, block or char device.
    Special,
}

impl EntryKind {
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Regular files are the only nodes the engine copies.
    pub fn is_regular(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Special => "special file",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path relative to the tree root. Identity of the node across trees.
    pub path: PathBuf,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Filled in lazily, only for files that get compared by content.
    pub fingerprint: Option<Fingerprint>,
}

impl FileEntry {
    pub fn new(path: PathBuf, kind: EntryKind, size: u64, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            path,
            kind,
            size,
            modified,
            fingerprint: None,
        }
    }

    /// Number of path components, root children are depth 1.
    pub fn depth(&self) -> usize {
        path_depth(&self.path)
    }
}

pub fn path_depth(path: &Path) -> usize {
    path.components().count()
}

/// One full walk of one root, keyed by relative path.
///
/// `BTreeMap` ordering on `PathBuf` is component-wise, so a directory always
/// sorts before everything it contains.
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    pub root: PathBuf,
    pub entries: BTreeMap<PathBuf, FileEntry>,
}

impl TreeSnapshot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, entry: FileEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn get(&self, path: &Path) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Absolute location of a relative path under this snapshot's root.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values().filter(|e| e.kind.is_regular())
    }

    pub fn total_bytes(&self) -> u64 {
        self.files().map(|e| e.size).sum()
    }
}
