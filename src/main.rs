use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use foldersync::cli::Cli;
use foldersync::config::AppConfig;
use foldersync::logging;
use foldersync::sync::{stop_channel, Scheduler, SyncEngine, TracingLogger};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Configuration problems are fatal before any cycle or log file exists.
    let config = match AppConfig::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("foldersync: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    logging::init(&config.log_file, config.log_level)?;

    let sync = config.sync.clone();
    info!(
        "Mirroring {} -> {} every {}s{}",
        sync.source_root.display(),
        sync.replica_root.display(),
        sync.interval.as_secs(),
        if sync.dry_run { " (dry run)" } else { "" }
    );

    let engine = SyncEngine::new(sync, Arc::new(TracingLogger));
    let mut scheduler = Scheduler::new(engine);
    if config.once {
        scheduler = scheduler.with_max_cycles(1);
    }

    let (handle, signal) = stop_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, stopping after the current action");
                handle.stop();
            }
            Err(e) => error!("Cannot listen for interrupt: {}", e),
        }
    });

    let report = scheduler.run(signal).await;

    if config.once && report.unclean_cycles > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
