//! Action applier: executes one [`SyncAction`] against the replica.
//!
//! Failures never escape as errors: each is captured in the returned
//! [`ActionOutcome`] and written to the logger, and the caller moves on to
//! the next action.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::fs::{copy_file_atomic_async, LocalFs};
use crate::sync::action::{ActionKind, SyncAction};
use crate::sync::record::{SyncLogger, SyncRecord};

/// Result of applying one action.
#[derive(Debug)]
pub struct ActionOutcome {
    pub action: SyncAction,
    /// Absolute path in the replica.
    pub replica_path: PathBuf,
    /// Bytes written, for copies and updates.
    pub bytes: Option<u64>,
    pub error: Option<SyncError>,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

pub struct ActionApplier {
    source_root: PathBuf,
    replica_root: PathBuf,
    dry_run: bool,
    logger: Arc<dyn SyncLogger>,
}

impl ActionApplier {
    pub fn new(
        source_root: impl Into<PathBuf>,
        replica_root: impl Into<PathBuf>,
        logger: Arc<dyn SyncLogger>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            dry_run: false,
            logger,
        }
    }

    /// Plan-only mode: report what would happen, touch nothing.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Apply one action and log exactly one record for it.
    pub async fn apply(&self, cycle: u64, action: &SyncAction) -> ActionOutcome {
        let replica_path = self.replica_root.join(action.path());

        if self.dry_run {
            info!(cycle, "[dry-run] would {}", action);
            return ActionOutcome {
                action: action.clone(),
                replica_path,
                bytes: None,
                error: None,
            };
        }

        let result = self.execute(action, &replica_path).await;

        let (bytes, error) = match result {
            Ok(bytes) => {
                self.logger
                    .log(&SyncRecord::applied(cycle, action.kind(), &replica_path, bytes));
                (bytes, None)
            }
            Err(err) => {
                self.logger
                    .log(&SyncRecord::failed(cycle, action.kind(), &replica_path, &err));
                (None, Some(err))
            }
        };

        ActionOutcome {
            action: action.clone(),
            replica_path,
            bytes,
            error,
        }
    }

    async fn execute(&self, action: &SyncAction, replica_path: &Path) -> Result<Option<u64>> {
        match action {
            SyncAction::CreateDirectory { .. } => {
                LocalFs::create_dir(replica_path).await?;
                Ok(None)
            }
            SyncAction::CopyFile { path } | SyncAction::UpdateFile { path } => {
                let source_path = self.source_root.join(path);
                let bytes = copy_file_atomic_async(&source_path, replica_path).await?;
                Ok(Some(bytes))
            }
            SyncAction::DeleteFile { .. } => {
                if !LocalFs::remove_file(replica_path).await? {
                    debug!("Already absent: {}", replica_path.display());
                }
                Ok(None)
            }
            SyncAction::DeleteDirectory { .. } => {
                if !LocalFs::remove_dir_all(replica_path).await? {
                    debug!("Already absent: {}", replica_path.display());
                }
                Ok(None)
            }
        }
    }
}
