//! Content comparison between a source file and its replica.
//!
//! Size is checked first; equal sizes fall through to a BLAKE3 fingerprint
//! of both files. Timestamps are never trusted for equality.

use std::path::Path;
use tracing::trace;

use crate::error::{Result, SyncError};
use crate::fs::FileEntry;
use crate::sync::hash::hash_file_async;

#[derive(Debug, Clone, Copy, Default)]
pub struct ContentComparator;

impl ContentComparator {
    pub fn new() -> Self {
        Self
    }

    /// Compare two existing regular files by size and content.
    pub async fn are_equal(&self, source: &Path, replica: &Path) -> Result<bool> {
        let src_len = file_len(source).await?;
        let rep_len = file_len(replica).await?;
        if src_len != rep_len {
            return Ok(false);
        }

        let src_fp = hash_file_async(source).await?;
        let rep_fp = hash_file_async(replica).await?;
        Ok(src_fp == rep_fp)
    }

    /// Compare two snapshot entries, using the sizes recorded at scan time
    /// and caching the fingerprints on the entries.
    pub async fn entries_equal(
        &self,
        source_root: &Path,
        source: &mut FileEntry,
        replica_root: &Path,
        replica: &mut FileEntry,
    ) -> Result<bool> {
        if source.size != replica.size {
            trace!("Size differs for {}", source.path.display());
            return Ok(false);
        }

        if source.fingerprint.is_none() {
            source.fingerprint = Some(hash_file_async(&source_root.join(&source.path)).await?);
        }
        if replica.fingerprint.is_none() {
            replica.fingerprint = Some(hash_file_async(&replica_root.join(&replica.path)).await?);
        }

        Ok(source.fingerprint == replica.fingerprint)
    }
}

async fn file_len(path: &Path) -> Result<u64> {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .map_err(|e| SyncError::from_io_error(e, "reading metadata of", path))
}
