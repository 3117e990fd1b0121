use std::fmt;
use std::path::{Path, PathBuf};

use crate::fs::path_depth;

/// One filesystem operation against the replica, keyed by relative path.
///
/// Actions live for one cycle only; they are derived by the differ and
/// consumed by the applier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Create a directory in the replica.
    CreateDirectory { path: PathBuf },
    /// Copy a file that the replica does not have.
    CopyFile { path: PathBuf },
    /// Overwrite a replica file whose content differs from the source.
    UpdateFile { path: PathBuf },
    /// Remove a replica file, symlink or special node.
    DeleteFile { path: PathBuf },
    /// Remove a replica directory.
    DeleteDirectory { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CreateDirectory,
    CopyFile,
    UpdateFile,
    DeleteFile,
    DeleteDirectory,
}

impl SyncAction {
    /// Get the relative path associated with this action.
    pub fn path(&self) -> &Path {
        match self {
            Self::CreateDirectory { path }
            | Self::CopyFile { path }
            | Self::UpdateFile { path }
            | Self::DeleteFile { path }
            | Self::DeleteDirectory { path } => path,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CreateDirectory { .. } => ActionKind::CreateDirectory,
            Self::CopyFile { .. } => ActionKind::CopyFile,
            Self::UpdateFile { .. } => ActionKind::UpdateFile,
            Self::DeleteFile { .. } => ActionKind::DeleteFile,
            Self::DeleteDirectory { .. } => ActionKind::DeleteDirectory,
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, Self::DeleteFile { .. } | Self::DeleteDirectory { .. })
    }

    pub fn depth(&self) -> usize {
        path_depth(self.path())
    }
}

impl ActionKind {
    /// Verb phrase used in log lines.
    pub fn describe(&self) -> &'static str {
        match self {
            ActionKind::CreateDirectory => "create directory",
            ActionKind::CopyFile => "copy file",
            ActionKind::UpdateFile => "update file",
            ActionKind::DeleteFile => "delete file",
            ActionKind::DeleteDirectory => "delete directory",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind().describe(), self.path().display())
    }
}
