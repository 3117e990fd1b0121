use chrono::{DateTime, Utc};
use jwalk::WalkDir;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::fs::types::{EntryKind, FileEntry, TreeSnapshot};

/// Local filesystem primitives used by the sync engine.
pub struct LocalFs;

impl LocalFs {
    /// Walk `root` recursively into a snapshot keyed by relative path.
    ///
    /// Hidden files are included and links are never traversed. With
    /// `follow_file_links`, a symlink whose target is a regular file is
    /// recorded as that file; every other link stays `EntryKind::Symlink`.
    ///
    /// Any error reading a directory fails the whole walk: a partial view
    /// of a tree cannot be diffed safely.
    pub fn scan(root: &Path, follow_file_links: bool) -> Result<TreeSnapshot> {
        let root_meta = fs::metadata(root).map_err(|e| SyncError::Enumeration {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !root_meta.is_dir() {
            return Err(SyncError::Enumeration {
                path: root.to_path_buf(),
                source: io::Error::other("not a directory"),
            });
        }

        let mut snapshot = TreeSnapshot::new(root);

        for entry_result in WalkDir::new(root)
            .parallelism(jwalk::Parallelism::RayonNewPool(0))
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
        {
            let entry = entry_result.map_err(|e| SyncError::Enumeration {
                path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
                source: io::Error::other(e.to_string()),
            })?;

            let path = entry.path();

            // jwalk parks a failed read_dir on the directory's own entry.
            if let Some(err) = entry.read_children_error.as_ref() {
                let vanished = err
                    .io_error()
                    .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
                if !vanished {
                    let source = match err.io_error() {
                        Some(e) => io::Error::new(e.kind(), e.to_string()),
                        None => io::Error::other(err.to_string()),
                    };
                    return Err(SyncError::Enumeration { path, source });
                }
            }

            let relative = match path.strip_prefix(root) {
                Ok(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
                _ => continue,
            };

            let metadata = match fs::symlink_metadata(&path) {
                Ok(m) => m,
                // Vanished between listing and stat; the next cycle sees the new state.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("Entry vanished during scan: {}", path.display());
                    continue;
                }
                Err(e) => {
                    return Err(SyncError::Enumeration { path, source: e });
                }
            };

            let file_type = metadata.file_type();
            let mut kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else if file_type.is_symlink() {
                EntryKind::Symlink
            } else {
                EntryKind::Special
            };
            let mut size = if kind.is_regular() { metadata.len() } else { 0 };
            let mut modified = to_datetime(metadata.modified().ok());

            if kind == EntryKind::Symlink && follow_file_links {
                if let Ok(target) = fs::metadata(&path) {
                    if target.is_file() {
                        kind = EntryKind::File;
                        size = target.len();
                        modified = to_datetime(target.modified().ok());
                    }
                }
            }

            snapshot.insert(FileEntry::new(relative, kind, size, modified));
        }

        debug!(
            "Scanned {}: {} entries, {} bytes",
            root.display(),
            snapshot.len(),
            snapshot.total_bytes()
        );
        Ok(snapshot)
    }

    /// Scan on the blocking pool.
    pub async fn scan_async(root: &Path, follow_file_links: bool) -> Result<TreeSnapshot> {
        let root = root.to_path_buf();
        let task_root = root.clone();
        tokio::task::spawn_blocking(move || Self::scan(&task_root, follow_file_links))
            .await
            .map_err(|e| SyncError::Enumeration {
                path: root,
                source: io::Error::other(e.to_string()),
            })?
    }

    /// Create a directory. Already present is not an error.
    pub async fn create_dir(path: &Path) -> Result<()> {
        match tokio::fs::create_dir(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                if tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false) {
                    Ok(())
                } else {
                    Err(SyncError::from_io_error(e, "creating directory", path))
                }
            }
            Err(e) => Err(SyncError::from_io_error(e, "creating directory", path)),
        }
    }

    /// Create a directory and all of its parents.
    pub async fn create_dir_all(path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| SyncError::from_io_error(e, "creating directory", path))
    }

    /// Remove a file, symlink or special node. Returns false if it was already gone.
    pub async fn remove_file(path: &Path) -> Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SyncError::from_io_error(e, "removing file", path)),
        }
    }

    /// Remove a directory and anything still inside it. Returns false if it was already gone.
    pub async fn remove_dir_all(path: &Path) -> Result<bool> {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SyncError::from_io_error(e, "removing directory", path)),
        }
    }

    /// Make `path` absolute against the working directory and drop `.`/`..` lexically.
    pub fn absolute(path: &Path) -> io::Result<PathBuf> {
        if path.is_absolute() {
            Ok(Self::normalize_path(path))
        } else {
            Ok(Self::normalize_path(&std::env::current_dir()?.join(path)))
        }
    }

    pub fn normalize_path(path: &Path) -> PathBuf {
        let mut normalized = PathBuf::new();

        for component in path.components() {
            match component {
                Component::ParentDir => {
                    normalized.pop();
                }
                Component::CurDir => {}
                _ => normalized.push(component),
            }
        }

        if normalized.as_os_str().is_empty() {
            normalized.push("/");
        }

        normalized
    }
}

fn to_datetime(time: Option<std::time::SystemTime>) -> Option<DateTime<Utc>> {
    time.map(DateTime::<Utc>::from)
}
