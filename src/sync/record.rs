//! Mutation records and the logging capability the engine reports through.
//!
//! Every replica mutation, successful or failed, produces exactly one
//! [`SyncRecord`], handed to a [`SyncLogger`]. The binary wires
//! [`TracingLogger`], whose events reach both the console and the log file;
//! embedders can take the record stream with [`ChannelLogger`].

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::SyncError;
use crate::sync::action::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Create,
    Copy,
    Update,
    Delete,
    Error,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordKind::Create => "create",
            RecordKind::Copy => "copy",
            RecordKind::Update => "update",
            RecordKind::Delete => "delete",
            RecordKind::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    pub timestamp: DateTime<Utc>,
    /// Scheduler cycle the record belongs to, starting at 1.
    pub cycle: u64,
    pub kind: RecordKind,
    /// Absolute replica path (or the root that failed, for cycle-level errors).
    pub path: PathBuf,
    /// Bytes written, for copies and updates.
    pub bytes: Option<u64>,
    pub message: String,
}

impl SyncRecord {
    /// Record for a successfully applied action.
    pub fn applied(cycle: u64, action: ActionKind, path: &Path, bytes: Option<u64>) -> Self {
        let (kind, message) = match action {
            ActionKind::CreateDirectory => {
                (RecordKind::Create, format!("Created directory: {}", path.display()))
            }
            ActionKind::CopyFile => (
                RecordKind::Copy,
                format!("Copied file: {} ({} bytes)", path.display(), bytes.unwrap_or(0)),
            ),
            ActionKind::UpdateFile => (
                RecordKind::Update,
                format!("Updated file: {} ({} bytes)", path.display(), bytes.unwrap_or(0)),
            ),
            ActionKind::DeleteFile => {
                (RecordKind::Delete, format!("Removed file: {}", path.display()))
            }
            ActionKind::DeleteDirectory => {
                (RecordKind::Delete, format!("Removed directory: {}", path.display()))
            }
        };

        Self {
            timestamp: Utc::now(),
            cycle,
            kind,
            path: path.to_path_buf(),
            bytes,
            message,
        }
    }

    /// Record for a failed action.
    pub fn failed(cycle: u64, action: ActionKind, path: &Path, err: &SyncError) -> Self {
        Self::error(
            cycle,
            path,
            format!("Failed to {} {}: {}", action.describe(), path.display(), err),
        )
    }

    /// Record for a failure that is not tied to one action.
    pub fn error(cycle: u64, path: &Path, message: String) -> Self {
        Self {
            timestamp: Utc::now(),
            cycle,
            kind: RecordKind::Error,
            path: path.to_path_buf(),
            bytes: None,
            message,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == RecordKind::Error
    }
}

impl fmt::Display for SyncRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Append-only sink for mutation records. Shared by every step of a cycle.
pub trait SyncLogger: Send + Sync {
    fn log(&self, record: &SyncRecord);
}

/// Emits each record as one tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl SyncLogger for TracingLogger {
    fn log(&self, record: &SyncRecord) {
        if record.is_error() {
            error!(cycle = record.cycle, kind = %record.kind, "{}", record.message);
        } else {
            info!(cycle = record.cycle, kind = %record.kind, "{}", record.message);
        }
    }
}

/// Forwards records into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelLogger {
    tx: mpsc::UnboundedSender<SyncRecord>,
}

impl ChannelLogger {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SyncLogger for ChannelLogger {
    fn log(&self, record: &SyncRecord) {
        // Receiver gone means nobody is listening any more.
        let _ = self.tx.send(record.clone());
    }
}

/// Fans every record out to several loggers.
#[derive(Clone, Default)]
pub struct MultiLogger {
    sinks: Vec<Arc<dyn SyncLogger>>,
}

impl MultiLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn SyncLogger>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl SyncLogger for MultiLogger {
    fn log(&self, record: &SyncRecord) {
        for sink in &self.sinks {
            sink.log(record);
        }
    }
}
