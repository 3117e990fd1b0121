//! Startup configuration: command line merged over an optional TOML file,
//! then validated. Any problem here is fatal and reported before the first
//! cycle runs.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::Cli;
use crate::error::{Result, SyncError};
use crate::fs::LocalFs;
use crate::logging::LogLevel;
use crate::sync::{ExcludePatterns, SymlinkPolicy, SyncConfig};

/// Settings as read from a TOML file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub source: Option<PathBuf>,
    pub replica: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub exclude_from: Option<PathBuf>,
    pub symlinks: Option<SymlinkPolicy>,
    #[serde(default)]
    pub dry_run: bool,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| SyncError::config(format!("{} ({})", e, path.display())))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Fully validated runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub log_file: PathBuf,
    pub log_level: LogLevel,
    pub once: bool,
}

impl AppConfig {
    /// Load the config file named on the command line (if any), merge and validate.
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(cli, file)
    }

    /// Merge command line over file values and validate the result.
    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self> {
        let source = required(cli.source.or(file.source), "source folder")?;
        let replica = required(cli.replica.or(file.replica), "replica folder")?;
        let log_file = required(cli.log_file.or(file.log_file), "log file")?;
        let interval_secs = required(cli.interval_secs.or(file.interval_secs), "interval")?;

        if interval_secs == 0 {
            return Err(SyncError::config("interval must be a positive number of seconds"));
        }

        let (source_root, replica_root) = validate_roots(&source, &replica)?;
        let log_file = validate_log_file(&log_file, &source_root, &replica_root)?;

        let mut exclude = ExcludePatterns::from_patterns(&file.exclude)?;
        exclude.merge(&ExcludePatterns::from_patterns(&cli.exclude)?)?;
        if let Some(path) = cli.exclude_from.or(file.exclude_from) {
            let content = fs::read_to_string(&path).map_err(|e| {
                SyncError::config(format!("cannot read exclude file {}: {}", path.display(), e))
            })?;
            exclude.merge(&ExcludePatterns::parse_ignore_file(&content)?)?;
        }

        let sync = SyncConfig::new(source_root, replica_root)
            .with_interval(Duration::from_secs(interval_secs))
            .with_exclude(exclude)
            .with_symlinks(cli.symlinks.or(file.symlinks).unwrap_or_default())
            .with_dry_run(cli.dry_run || file.dry_run);

        Ok(Self {
            sync,
            log_file,
            log_level: cli.log_level,
            once: cli.once,
        })
    }
}

fn required<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| SyncError::config(format!("missing {}", what)))
}

/// Source must be an existing directory; replica must be a directory or
/// absent; neither may contain the other.
fn validate_roots(source: &Path, replica: &Path) -> Result<(PathBuf, PathBuf)> {
    let source = absolute(source)?;
    let meta = fs::metadata(&source).map_err(|e| {
        SyncError::config(format!("source folder {} is not accessible: {}", source.display(), e))
    })?;
    if !meta.is_dir() {
        return Err(SyncError::config(format!(
            "source {} is not a directory",
            source.display()
        )));
    }
    let source = source.canonicalize().map_err(|e| {
        SyncError::config(format!("cannot resolve source folder {}: {}", source.display(), e))
    })?;

    let replica = absolute(replica)?;
    if let Ok(meta) = fs::metadata(&replica) {
        if !meta.is_dir() {
            return Err(SyncError::config(format!(
                "replica {} exists and is not a directory",
                replica.display()
            )));
        }
    }
    let resolved_replica = resolve_existing_prefix(&replica);

    if resolved_replica.starts_with(&source) || source.starts_with(&resolved_replica) {
        return Err(SyncError::config(format!(
            "source {} and replica {} must not be the same or nested in each other",
            source.display(),
            replica.display()
        )));
    }

    Ok((source, replica))
}

fn validate_log_file(log_file: &Path, source: &Path, replica: &Path) -> Result<PathBuf> {
    let log_file = absolute(log_file)?;
    if log_file.is_dir() {
        return Err(SyncError::config(format!(
            "log file {} is a directory",
            log_file.display()
        )));
    }

    let resolved = resolve_existing_prefix(&log_file);
    let replica = resolve_existing_prefix(replica);
    if resolved.starts_with(source) || resolved.starts_with(&replica) {
        return Err(SyncError::config(format!(
            "log file {} must live outside the source and replica folders",
            log_file.display()
        )));
    }

    Ok(log_file)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    LocalFs::absolute(path).map_err(|e| {
        SyncError::config(format!("cannot resolve path {}: {}", path.display(), e))
    })
}

/// Canonicalize the longest existing ancestor of `path` and re-append the rest,
/// so nesting checks see through symlinks even for paths not created yet.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    for ancestor in path.ancestors() {
        if let Ok(canonical) = ancestor.canonicalize() {
            return match path.strip_prefix(ancestor) {
                Ok(rest) if !rest.as_os_str().is_empty() => canonical.join(rest),
                _ => canonical,
            };
        }
    }
    path.to_path_buf()
}
