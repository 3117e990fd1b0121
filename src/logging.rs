//! Console + log file sinks for tracing events.

use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Timestamp layout of every log line.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Build a subscriber writing to stdout and appending to `log_file`.
///
/// `RUST_LOG` overrides `level`. The log file and its directory are created
/// if absent.
pub fn subscriber(
    log_file: &Path,
    level: LogLevel,
) -> Result<impl tracing::Subscriber + Send + Sync + 'static> {
    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level.as_directive()))?;
    let timer = ChronoLocal::new(TIME_FORMAT.to_string());

    let console_layer = fmt::layer().with_timer(timer.clone()).with_target(false);
    let file_layer = fmt::layer()
        .with_timer(timer)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file));

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer))
}

/// Install the console + file subscriber globally.
pub fn init(log_file: &Path, level: LogLevel) -> Result<()> {
    subscriber(log_file, level)?.try_init()?;
    Ok(())
}
