// Centralized error handling module
// Error taxonomy shared by the tree walker, the applier and config validation

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Main error type for the sync engine.
/// Every variant carries the path it is about so log lines can be read without context.
#[derive(Debug)]
pub enum SyncError {
    /// A directory tree could not be walked. Aborts the current cycle.
    Enumeration { path: PathBuf, source: io::Error },

    /// Single-path failures. Abort only the action that hit them.
    NotFound { path: PathBuf, operation: String },
    PermissionDenied { path: PathBuf, operation: String },
    Io { path: PathBuf, operation: String, source: io::Error },

    /// Source node the engine refuses to mirror (symlink, fifo, socket, device).
    Unsupported { path: PathBuf, kind: String },

    /// Invalid startup configuration. Fatal.
    Config { message: String },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncError::Enumeration { path, source } => {
                write!(f, "Cannot enumerate directory tree {}: {}", path.display(), source)
            }
            SyncError::NotFound { path, operation } => {
                write!(f, "Path not found while {}: {}", operation, path.display())
            }
            SyncError::PermissionDenied { path, operation } => {
                write!(f, "Permission denied while {}: {}", operation, path.display())
            }
            SyncError::Io { path, operation, source } => {
                write!(f, "I/O error while {} {}: {}", operation, path.display(), source)
            }
            SyncError::Unsupported { path, kind } => {
                write!(f, "Unsupported file type ({}) skipped: {}", kind, path.display())
            }
            SyncError::Config { message } => {
                write!(f, "Invalid configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Enumeration { source, .. } => Some(source),
            SyncError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl SyncError {
    /// Create a path error with context about the operation.
    /// NotFound and PermissionDenied get their own variants.
    pub fn from_io_error(err: io::Error, operation: &str, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => SyncError::NotFound {
                path,
                operation: operation.to_string(),
            },
            io::ErrorKind::PermissionDenied => SyncError::PermissionDenied {
                path,
                operation: operation.to_string(),
            },
            _ => SyncError::Io {
                path,
                operation: operation.to_string(),
                source: err,
            },
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        SyncError::Config {
            message: message.into(),
        }
    }

    /// Path the error is about, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            SyncError::Enumeration { path, .. }
            | SyncError::NotFound { path, .. }
            | SyncError::PermissionDenied { path, .. }
            | SyncError::Io { path, .. }
            | SyncError::Unsupported { path, .. } => Some(path),
            SyncError::Config { .. } => None,
        }
    }

    pub fn is_enumeration(&self) -> bool {
        matches!(self, SyncError::Enumeration { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
