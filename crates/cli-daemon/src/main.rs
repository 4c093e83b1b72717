//! CLI entry point for the timelapse daemon
//!
//! Parses command line arguments, sets up logging and starts the daemon.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use timelapse_daemon::{init_logging, Config, Daemon, DaemonError};
use tracing::{error, info, warn};

/// Timelapse daemon - turns daily camera captures into one video per day
#[derive(Parser, Debug)]
#[command(name = "timelapsed")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single pipeline cycle and exit
    #[arg(long, default_value = "false")]
    once: bool,

    /// Run only the representative image selection and exit
    #[arg(long, default_value = "false", conflicts_with = "once")]
    select_only: bool,

    /// Skip startup checks (encoder, ledger). For testing only.
    #[arg(long, default_value = "false")]
    skip_checks: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    // Flushes the log file on drop, so it lives until main returns
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        config = %args.config.display(),
        mode = config.schedule.mode.as_str(),
        "Timelapse daemon starting"
    );

    let daemon_result = if args.skip_checks {
        warn!("Skipping startup checks (--skip-checks enabled)");
        Ok(Daemon::new_without_checks(config))
    } else {
        Daemon::with_config(config)
    };

    let mut daemon = match daemon_result {
        Ok(daemon) => daemon.watch_config(&args.config),
        Err(e) => {
            error!(error = %e, "Failed to initialize daemon");
            return ExitCode::FAILURE;
        }
    };

    match run(&mut daemon, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Daemon stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(daemon: &mut Daemon, args: &Args) -> Result<(), DaemonError> {
    if args.select_only {
        daemon.run_selection().await?;
        return Ok(());
    }

    if args.once {
        if daemon.config.selection.enabled {
            daemon.run_selection().await?;
        }
        let summary = daemon.run_once().await?;
        info!(
            processed = summary.processed,
            videos = summary.videos_encoded,
            "Single cycle complete"
        );
        return Ok(());
    }

    daemon.run().await
}
