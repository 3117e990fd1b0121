//! Atomic single-file copy into the replica.
//!
//! Bytes are streamed into a temporary file created next to the destination
//! and renamed over it once complete, so a reader of the replica sees either
//! the old content or the new content, never a partial write. The rename is
//! only atomic when the temp file and the destination share a filesystem,
//! which creating the temp file in the destination's own directory ensures.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};

/// Prefix of in-flight temp files. A leftover from a crash is an extra
/// replica entry and gets removed by the next cycle.
pub const TEMP_PREFIX: &str = ".foldersync-";

/// Copy `src` over `dst` atomically and return the number of bytes written.
///
/// Permission bits and modification time follow the source on a best-effort
/// basis; ownership is not carried over.
pub fn copy_file_atomic(src: &Path, dst: &Path) -> Result<u64> {
    let mut reader =
        File::open(src).map_err(|e| SyncError::from_io_error(e, "opening source file", src))?;
    let metadata = reader
        .metadata()
        .map_err(|e| SyncError::from_io_error(e, "reading source metadata", src))?;

    let parent = dst.parent().ok_or_else(|| SyncError::Io {
        path: dst.to_path_buf(),
        operation: "resolving parent directory of".to_string(),
        source: io::Error::other("destination has no parent"),
    })?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| SyncError::from_io_error(e, "creating temporary file in", parent))?;

    let bytes = io::copy(&mut reader, tmp.as_file_mut())
        .map_err(|e| SyncError::from_io_error(e, "copying file to", dst))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| SyncError::from_io_error(e, "flushing file", dst))?;

    if let Ok(modified) = metadata.modified() {
        let _ = tmp.as_file().set_modified(modified);
    }
    let _ = fs::set_permissions(tmp.path(), metadata.permissions());

    tmp.persist(dst)
        .map_err(|e| SyncError::from_io_error(e.error, "replacing file", dst))?;

    Ok(bytes)
}

/// Run [`copy_file_atomic`] on the blocking pool. The copy always runs to
/// completion or failure even if the awaiting task goes away.
pub async fn copy_file_atomic_async(src: &Path, dst: &Path) -> Result<u64> {
    let (src, dst): (PathBuf, PathBuf) = (src.to_path_buf(), dst.to_path_buf());
    let err_path = dst.clone();
    tokio::task::spawn_blocking(move || copy_file_atomic(&src, &dst))
        .await
        .map_err(|e| SyncError::Io {
            path: err_path,
            operation: "copying file to".to_string(),
            source: io::Error::other(e.to_string()),
        })?
}
