//! Tree differ: compares a source and a replica snapshot and derives the
//! ordered list of actions that makes the replica match the source.
//!
//! Ordering: every deletion comes first, deepest path first, so directories
//! are emptied before they are removed and a kind mismatch is cleared before
//! its replacement is created. Creations, copies and updates follow,
//! shallowest path first, so a parent directory always exists before any
//! child is written into it.

use std::cmp::Ordering;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::fs::{EntryKind, FileEntry, LocalFs, TreeSnapshot};
use crate::sync::action::SyncAction;
use crate::sync::compare::ContentComparator;
use crate::sync::engine::SymlinkPolicy;
use crate::sync::exclude::ExcludePatterns;

/// A problem found while planning that does not stop the cycle.
#[derive(Debug)]
pub struct PlanIssue {
    /// Relative path the issue is about.
    pub path: PathBuf,
    pub error: SyncError,
}

/// Output of one differ pass.
#[derive(Debug, Default)]
pub struct SyncPlan {
    /// Actions in the order they must be applied.
    pub actions: Vec<SyncAction>,
    /// Paths that could not be planned correctly. Each one is a reported failure.
    pub issues: Vec<PlanIssue>,
}

impl SyncPlan {
    /// True when the replica already mirrors the source.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeDiffer {
    comparator: ContentComparator,
    exclude: ExcludePatterns,
    symlinks: SymlinkPolicy,
}

impl TreeDiffer {
    pub fn new(exclude: ExcludePatterns, symlinks: SymlinkPolicy) -> Self {
        Self {
            comparator: ContentComparator::new(),
            exclude,
            symlinks,
        }
    }

    /// Walk both roots and diff them. A missing replica root diffs as empty.
    pub async fn diff(&self, source_root: &Path, replica_root: &Path) -> Result<SyncPlan> {
        let follow = self.symlinks == SymlinkPolicy::Follow;
        let source = LocalFs::scan_async(source_root, follow).await?;

        let replica_exists = tokio::fs::symlink_metadata(replica_root).await.is_ok();
        let replica = if replica_exists {
            LocalFs::scan_async(replica_root, false).await?
        } else {
            TreeSnapshot::new(replica_root)
        };

        Ok(self.diff_snapshots(source, replica).await)
    }

    /// Diff two snapshots taken earlier.
    pub async fn diff_snapshots(
        &self,
        mut source: TreeSnapshot,
        mut replica: TreeSnapshot,
    ) -> SyncPlan {
        let mut deletions = Vec::new();
        let mut creations = Vec::new();
        let mut issues = Vec::new();
        // Source paths we refuse to mirror; the replica under them is left alone.
        let mut unmirrored: Vec<PathBuf> = Vec::new();
        // Excluded replica paths. A directory above one is never removed wholesale.
        let protected: Vec<PathBuf> = replica
            .entries
            .keys()
            .filter(|path| self.exclude.is_excluded(path))
            .cloned()
            .collect();

        for (path, src) in source.entries.iter_mut() {
            if self.exclude.is_excluded(path) {
                continue;
            }

            if !matches!(src.kind, EntryKind::File | EntryKind::Directory) {
                issues.push(PlanIssue {
                    path: path.clone(),
                    error: SyncError::Unsupported {
                        path: source.root.join(path),
                        kind: src.kind.to_string(),
                    },
                });
                unmirrored.push(path.clone());
                continue;
            }

            match replica.entries.get_mut(path) {
                None => creations.push(creation_for(src)),
                Some(rep) if rep.kind == src.kind => {
                    if !src.kind.is_regular() {
                        continue;
                    }
                    match self
                        .comparator
                        .entries_equal(&source.root, src, &replica.root, rep)
                        .await
                    {
                        Ok(true) => {}
                        Ok(false) => creations.push(SyncAction::UpdateFile { path: path.clone() }),
                        Err(error) => {
                            // Cannot prove equality: re-copy and report.
                            issues.push(PlanIssue {
                                path: path.clone(),
                                error,
                            });
                            creations.push(SyncAction::UpdateFile { path: path.clone() });
                        }
                    }
                }
                Some(rep) => {
                    debug!(
                        "Kind mismatch at {}: source {}, replica {}",
                        path.display(),
                        src.kind,
                        rep.kind
                    );
                    if rep.kind.is_dir() && holds_excluded(path, &protected) {
                        issues.push(PlanIssue {
                            path: path.clone(),
                            error: SyncError::Io {
                                path: replica.root.join(path),
                                operation: "replacing directory".to_string(),
                                source: io::Error::other("it holds excluded entries"),
                            },
                        });
                        continue;
                    }
                    deletions.push(deletion_for(rep));
                    creations.push(creation_for(src));
                }
            }
        }

        for (path, rep) in &replica.entries {
            if self.exclude.is_excluded(path) || source.contains(path) {
                continue;
            }
            if unmirrored.iter().any(|u| path.starts_with(u)) {
                continue;
            }
            if rep.kind.is_dir() && holds_excluded(path, &protected) {
                // Its other contents are deleted one by one.
                debug!("Keeping {}: holds excluded entries", path.display());
                continue;
            }
            deletions.push(deletion_for(rep));
        }

        deletions.sort_by(|a, b| deepest_first(a, b));
        creations.sort_by(|a, b| shallowest_first(a, b));

        let mut actions = deletions;
        actions.extend(creations);

        debug!(
            "Planned {} actions ({} issues) for {} -> {}",
            actions.len(),
            issues.len(),
            source.root.display(),
            replica.root.display()
        );

        SyncPlan { actions, issues }
    }
}

fn creation_for(src: &FileEntry) -> SyncAction {
    if src.kind.is_dir() {
        SyncAction::CreateDirectory {
            path: src.path.clone(),
        }
    } else {
        SyncAction::CopyFile {
            path: src.path.clone(),
        }
    }
}

fn deletion_for(rep: &FileEntry) -> SyncAction {
    if rep.kind.is_dir() {
        SyncAction::DeleteDirectory {
            path: rep.path.clone(),
        }
    } else {
        SyncAction::DeleteFile {
            path: rep.path.clone(),
        }
    }
}

fn holds_excluded(dir: &Path, protected: &[PathBuf]) -> bool {
    protected.iter().any(|p| p != dir && p.starts_with(dir))
}

fn deepest_first(a: &SyncAction, b: &SyncAction) -> Ordering {
    b.depth().cmp(&a.depth()).then_with(|| a.path().cmp(b.path()))
}

fn shallowest_first(a: &SyncAction, b: &SyncAction) -> Ordering {
    a.depth().cmp(&b.depth()).then_with(|| a.path().cmp(b.path()))
}
