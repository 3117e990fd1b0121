//! Sync engine for one-way mirroring.
//!
//! One call to [`SyncEngine::run_cycle`] is one full pass: walk both trees,
//! plan the actions, apply them in order and aggregate the outcome.

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::SyncError;
use crate::fs::LocalFs;
use crate::sync::action::{ActionKind, SyncAction};
use crate::sync::apply::{ActionApplier, ActionOutcome};
use crate::sync::diff::{SyncPlan, TreeDiffer};
use crate::sync::exclude::ExcludePatterns;
use crate::sync::record::{SyncLogger, SyncRecord};
use crate::sync::scheduler::StopSignal;

/// Default interval between cycle starts.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// How source symlinks and special files are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SymlinkPolicy {
    /// Skip them and report each one as a failure.
    #[default]
    Report,
    /// Mirror links to regular files as plain files; report the rest.
    Follow,
}

/// Sync configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Authoritative tree. Never written to.
    pub source_root: PathBuf,
    /// Managed mirror. Created if absent.
    pub replica_root: PathBuf,
    /// Time between cycle starts.
    pub interval: Duration,
    /// Paths ignored on both sides.
    pub exclude: ExcludePatterns,
    pub symlinks: SymlinkPolicy,
    /// Plan and report only.
    pub dry_run: bool,
}

impl SyncConfig {
    pub fn new(source_root: impl Into<PathBuf>, replica_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            replica_root: replica_root.into(),
            interval: DEFAULT_INTERVAL,
            exclude: ExcludePatterns::new(),
            symlinks: SymlinkPolicy::Report,
            dry_run: false,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_exclude(mut self, exclude: ExcludePatterns) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_symlinks(mut self, symlinks: SymlinkPolicy) -> Self {
        self.symlinks = symlinks;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// One failure inside a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregated outcome of one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleResult {
    pub cycle: u64,
    /// Actions handed to the applier.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub bytes_copied: u64,
    /// Every failure of the cycle: failed actions, planning issues, or the abort reason.
    pub failures: Vec<CycleFailure>,
    /// The trees could not be walked; nothing was applied.
    pub aborted: bool,
    /// A stop request cut the action list short.
    pub interrupted: bool,
    pub dry_run: bool,
    pub duration: Duration,
}

impl CycleResult {
    fn new(cycle: u64, dry_run: bool) -> Self {
        Self {
            cycle,
            dry_run,
            ..Default::default()
        }
    }

    /// True when the replica is known to mirror the source after this cycle.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.aborted && !self.interrupted
    }

    fn record(&mut self, outcome: &ActionOutcome) {
        self.attempted += 1;
        match &outcome.error {
            None => {
                self.succeeded += 1;
                self.bytes_copied += outcome.bytes.unwrap_or(0);
            }
            Some(err) => {
                self.failed += 1;
                self.failures.push(CycleFailure {
                    path: outcome.replica_path.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
}

/// Sync engine for orchestrating sync cycles.
pub struct SyncEngine {
    config: SyncConfig,
    differ: TreeDiffer,
    applier: ActionApplier,
    logger: Arc<dyn SyncLogger>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, logger: Arc<dyn SyncLogger>) -> Self {
        let differ = TreeDiffer::new(config.exclude.clone(), config.symlinks);
        let applier = ActionApplier::new(&config.source_root, &config.replica_root, logger.clone())
            .with_dry_run(config.dry_run);

        Self {
            config,
            differ,
            applier,
            logger,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Compute the actions one cycle would apply right now.
    pub async fn plan(&self) -> Result<SyncPlan, SyncError> {
        self.differ
            .diff(&self.config.source_root, &self.config.replica_root)
            .await
    }

    /// Apply a single action, outside of a full cycle.
    pub async fn apply(&self, cycle: u64, action: &SyncAction) -> ActionOutcome {
        self.applier.apply(cycle, action).await
    }

    /// One cycle with no way to interrupt it.
    pub async fn run_once(&self) -> CycleResult {
        self.run_cycle(1, &StopSignal::never()).await
    }

    /// Run one full diff-and-apply pass.
    ///
    /// `stop` is checked between actions, so the action in flight when a
    /// stop is requested always completes.
    pub async fn run_cycle(&self, cycle: u64, stop: &StopSignal) -> CycleResult {
        let started = Instant::now();
        let mut result = CycleResult::new(cycle, self.config.dry_run);

        if !self.config.dry_run {
            if let Err(err) = self.ensure_replica_root(cycle, &mut result).await {
                self.abort(cycle, &mut result, &self.config.replica_root, err);
                result.duration = started.elapsed();
                return result;
            }
        }

        let plan = match self.plan().await {
            Ok(plan) => plan,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.config.source_root.clone());
                self.abort(cycle, &mut result, &path, err);
                result.duration = started.elapsed();
                return result;
            }
        };

        for issue in &plan.issues {
            let path = issue
                .error
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.config.replica_root.join(&issue.path));
            let message = match &issue.error {
                SyncError::Unsupported { .. } => issue.error.to_string(),
                other => format!("Cannot sync {}: {}", issue.path.display(), other),
            };
            self.logger.log(&SyncRecord::error(cycle, &path, message.clone()));
            result.failures.push(CycleFailure {
                path,
                reason: message,
            });
        }

        for (index, action) in plan.actions.iter().enumerate() {
            if stop.is_stopped() {
                info!(
                    cycle,
                    "Stop requested, leaving {} actions for the next run",
                    plan.actions.len() - index
                );
                result.interrupted = true;
                break;
            }
            let outcome = self.applier.apply(cycle, action).await;
            result.record(&outcome);
        }

        result.duration = started.elapsed();
        self.summarize(&result);
        result
    }

    /// Create the replica root if it does not exist yet.
    async fn ensure_replica_root(&self, cycle: u64, result: &mut CycleResult) -> Result<(), SyncError> {
        let root = &self.config.replica_root;
        match tokio::fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(SyncError::Enumeration {
                path: root.clone(),
                source: io::Error::other("replica root is not a directory"),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                result.attempted += 1;
                match LocalFs::create_dir_all(root).await {
                    Ok(()) => {
                        result.succeeded += 1;
                        self.logger
                            .log(&SyncRecord::applied(cycle, ActionKind::CreateDirectory, root, None));
                        Ok(())
                    }
                    Err(err) => {
                        result.failed += 1;
                        Err(err)
                    }
                }
            }
            Err(e) => Err(SyncError::Enumeration {
                path: root.clone(),
                source: e,
            }),
        }
    }

    fn abort(&self, cycle: u64, result: &mut CycleResult, path: &Path, err: SyncError) {
        let message = format!("Sync cycle {} aborted: {}", cycle, err);
        self.logger.log(&SyncRecord::error(cycle, path, message.clone()));
        result.aborted = true;
        result.failures.push(CycleFailure {
            path: path.to_path_buf(),
            reason: message,
        });
    }

    fn summarize(&self, result: &CycleResult) {
        let prefix = if result.dry_run { "[dry-run] " } else { "" };
        if result.failures.is_empty() {
            info!(
                cycle = result.cycle,
                "{}Synchronization complete: {} actions, {} bytes copied in {} ms",
                prefix,
                result.succeeded,
                result.bytes_copied,
                result.duration.as_millis()
            );
        } else {
            warn!(
                cycle = result.cycle,
                "{}Synchronization finished with {} failures: {} of {} actions applied",
                prefix,
                result.failures.len(),
                result.succeeded,
                result.attempted
            );
        }
    }
}
