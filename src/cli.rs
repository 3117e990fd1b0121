use clap::Parser;
use std::path::PathBuf;

use crate::logging::LogLevel;
use crate::sync::SymlinkPolicy;

/// Keep a replica folder an exact one-way mirror of a source folder.
///
/// Positional arguments may be omitted when a `--config` file supplies them;
/// values given on the command line win over the file.
#[derive(Debug, Clone, Parser)]
#[command(name = "foldersync", version, about)]
pub struct Cli {
    /// Path to the source folder
    pub source: Option<PathBuf>,

    /// Path to the replica folder
    pub replica: Option<PathBuf>,

    /// Path to the log file
    pub log_file: Option<PathBuf>,

    /// Synchronization interval in seconds
    pub interval_secs: Option<u64>,

    /// TOML file with the same settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Glob of paths to leave out of the mirror (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Ignore-file with one glob per line
    #[arg(long, value_name = "FILE")]
    pub exclude_from: Option<PathBuf>,

    /// How to treat symlinks and special files in the source
    #[arg(long, value_enum)]
    pub symlinks: Option<SymlinkPolicy>,

    /// Log what would change without touching the replica
    #[arg(long)]
    pub dry_run: bool,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}
