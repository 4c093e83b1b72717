//! Daemon startup and poll loop for the timelapse pipeline
//!
//! Each cycle reloads the configuration, runs the blocking pipeline on the
//! blocking thread pool and waits out the poll interval alongside it.

use crate::config::{Config, ConfigError, PipelineMode};
use crate::encode::{EncoderRunner, FfmpegRunner};
use crate::ledger::Ledger;
use crate::orchestrator::{EncodeOrchestrator, OrchestratorError, OrchestratorSettings, RunSummary};
use crate::resize::{ImageCrateProcessor, ImageProcessor};
use crate::selector::{SelectionJob, SelectionResult};
use crate::startup::{run_startup_checks, StartupError};
use crate::status::{write_status, StatusSnapshot};
use crate::unsorted::ingest_unsorted;
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Error type for daemon operations
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Startup check failed
    #[error("Startup check failed: {0}")]
    Startup(#[from] StartupError),

    /// Pipeline run failed
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] OrchestratorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(String),
}

/// Daemon state: configuration plus the collaborators every cycle shares
pub struct Daemon {
    /// Configuration as of the latest reload
    pub config: Config,
    /// File the configuration is reloaded from; `None` keeps `config` fixed
    config_path: Option<PathBuf>,
    processor: Arc<dyn ImageProcessor>,
    encoder: Arc<dyn EncoderRunner>,
}

impl Daemon {
    /// Initialize the daemon with configuration from file
    ///
    /// Loads the config (file, then environment overrides, then validation)
    /// and runs the startup checks.
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self, DaemonError> {
        let config = Config::load(&config_path)?;
        run_startup_checks(&config)?;

        let mut daemon = Self::new_without_checks(config);
        daemon.config_path = Some(config_path.as_ref().to_path_buf());
        Ok(daemon)
    }

    /// Initialize the daemon with an existing configuration
    pub fn with_config(config: Config) -> Result<Self, DaemonError> {
        run_startup_checks(&config)?;
        Ok(Self::new_without_checks(config))
    }

    /// Initialize the daemon without running startup checks
    ///
    /// Useful for testing when ffmpeg is not available.
    pub fn new_without_checks(config: Config) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(ImageCrateProcessor::default()),
            Arc::new(FfmpegRunner),
        )
    }

    /// Initialize the daemon with custom image and encoder implementations
    pub fn with_collaborators(
        config: Config,
        processor: Arc<dyn ImageProcessor>,
        encoder: Arc<dyn EncoderRunner>,
    ) -> Self {
        Self {
            config,
            config_path: None,
            processor,
            encoder,
        }
    }

    /// Reload reads from `path` at the start of every cycle
    pub fn watch_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Re-read the configuration file, if there is one
    pub fn reload_config(&mut self) -> Result<(), DaemonError> {
        if let Some(path) = &self.config_path {
            let config = Config::load(path)?;
            if config != self.config {
                info!(path = %path.display(), "Configuration changed");
            }
            self.config = config;
        }
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.config.schedule.poll_interval_secs)
    }

    /// Run one pipeline cycle and publish its status
    pub async fn run_once(&mut self) -> Result<RunSummary, DaemonError> {
        self.reload_config()?;

        let config = self.config.clone();
        let processor = self.processor.clone();
        let encoder = self.encoder.clone();
        let today = Local::now().date_naive();

        let summary =
            tokio::task::spawn_blocking(move || run_cycle(&config, processor, encoder, today))
                .await
                .map_err(|e| DaemonError::Task(e.to_string()))??;

        self.publish_status(&summary);
        Ok(summary)
    }

    /// Run the representative-image selection batch once
    pub async fn run_selection(&self) -> Result<Vec<SelectionResult>, DaemonError> {
        let selection = &self.config.selection;
        let job = SelectionJob {
            source_root: self.config.selection_source_root().to_path_buf(),
            output_directory: selection.output_directory.clone(),
            target_hour: selection.target_hour,
            thumbnail_height: selection.thumbnail_height,
        };
        let processor = self.processor.clone();

        let results = tokio::task::spawn_blocking(move || job.run(processor.as_ref()))
            .await
            .map_err(|e| DaemonError::Task(e.to_string()))??;

        let chosen = results.iter().filter(|r| r.chosen.is_some()).count();
        info!(days = results.len(), chosen, "Selection complete");
        Ok(results)
    }

    /// Run the daemon main loop
    ///
    /// Runs the selection batch first when enabled, then pipeline cycles
    /// forever. A cycle and the poll interval run concurrently, so the next
    /// cycle starts once both have finished. Returns only on a fatal error.
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        if self.config.selection.enabled {
            self.run_selection().await?;
        }

        loop {
            let interval = self.poll_interval();
            let (result, ()) = tokio::join!(self.run_once(), tokio::time::sleep(interval));
            if let Err(e) = result {
                error!(error = %e, "Pipeline cycle failed");
                return Err(e);
            }
        }
    }

    fn publish_status(&self, summary: &RunSummary) {
        let Some(path) = &self.config.paths.status_file else {
            return;
        };
        let snapshot = StatusSnapshot::new(self.config.schedule.mode.as_str(), summary.clone());
        if let Err(e) = write_status(path, &snapshot) {
            warn!(path = %path.display(), error = %e, "Failed to write status file");
        }
    }
}

/// One blocking pipeline pass for the configured mode
fn run_cycle(
    config: &Config,
    processor: Arc<dyn ImageProcessor>,
    encoder: Arc<dyn EncoderRunner>,
    today: NaiveDate,
) -> Result<RunSummary, DaemonError> {
    let orchestrator = EncodeOrchestrator::new(
        OrchestratorSettings::from_config(config),
        Ledger::new(&config.paths.ledger_file),
        processor.clone(),
        encoder,
    );

    match config.schedule.mode {
        PipelineMode::Sorted => Ok(orchestrator.run(today)?),
        PipelineMode::Unsorted => {
            let unsorted_root = config.paths.unsorted_images_directory.as_deref().ok_or_else(|| {
                ConfigError::Invalid("paths.unsorted_images_directory is not set".to_string())
            })?;
            let report = ingest_unsorted(
                unsorted_root,
                &config.paths.local_image_location,
                today,
                processor.as_ref(),
            )?;

            let mut summary = orchestrator.encode_all(today)?;
            summary.processed += report.days_written;
            summary.frames_written += report.frames_written;
            summary.frames_failed += report.frames_failed;
            info!(
                discovered = report.discovered,
                days = report.days_written,
                videos = summary.videos_encoded,
                "Unsorted run complete"
            );
            Ok(summary)
        }
    }
}
