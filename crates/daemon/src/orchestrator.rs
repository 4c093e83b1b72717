//! Encode orchestrator
//!
//! Walks the per-day source directories and moves each one through
//! `Unprocessed -> Copied -> Encoded -> Finished`. The ledger is consulted
//! before anything destructive happens to a destination directory, and a day
//! is recorded as finished once its frames were copied, whatever the encoder
//! did (its output is kept in the per-day encode log).

use crate::config::Config;
use crate::encode::{append_encode_log, encode_log_path, EncodeRequest, EncoderRunner};
use crate::group::group_by_day;
use crate::ledger::{ledger_key, Ledger, LedgerError};
use crate::renamer::materialize;
use crate::resize::ImageProcessor;
use crate::scan::{has_images, list_images, list_subdirectories};
use crate::timestamp::NameFormat;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error type for orchestrator runs. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A configured source directory does not exist
    #[error("Source directory {0} does not exist")]
    MissingSource(PathBuf),

    /// Filesystem failure on a path the pipeline owns
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The ledger could not record a finished day
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> OrchestratorError + '_ {
    move |source| OrchestratorError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Why the encode step did not run the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeSkip {
    Disabled,
    OutputExists,
    NoFrames,
}

/// Result of the `Copied -> Encoded` step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeOutcome {
    Skipped(EncodeSkip),
    Succeeded,
    /// Encoder failed to start or exited unsuccessfully; not fatal
    Failed(String),
}

/// Day state representing the current stage in the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayState {
    Unprocessed,
    Copied { frames: usize },
    Encoded(EncodeOutcome),
    Finished,
}

impl DayState {
    /// Convert state to string for logging
    pub fn as_str(&self) -> &str {
        match self {
            DayState::Unprocessed => "unprocessed",
            DayState::Copied { .. } => "copied",
            DayState::Encoded(_) => "encoded",
            DayState::Finished => "finished",
        }
    }
}

/// One day's source, destination and output locations
#[derive(Debug, Clone)]
pub struct DayJob {
    /// Directory name, `yyyy-MM-dd`
    pub day: String,
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub output_path: PathBuf,
    pub state: DayState,
}

/// Counters for one orchestrator run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub days_seen: usize,
    pub skipped_today: usize,
    pub skipped_finished: usize,
    pub processed: usize,
    pub frames_written: usize,
    pub frames_failed: usize,
    pub videos_encoded: usize,
    pub videos_skipped: usize,
    pub encoder_failures: usize,
}

impl RunSummary {
    fn record_encode(&mut self, outcome: &EncodeOutcome) {
        match outcome {
            EncodeOutcome::Succeeded => self.videos_encoded += 1,
            EncodeOutcome::Skipped(_) => self.videos_skipped += 1,
            EncodeOutcome::Failed(_) => self.encoder_failures += 1,
        }
    }
}

/// Locations and encoder settings the orchestrator needs
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub source_root: PathBuf,
    pub local_root: PathBuf,
    pub mp4_output_directory: PathBuf,
    pub encode_log_directory: PathBuf,
    pub encoder_enabled: bool,
    pub encoder_program: String,
    pub framerate: u32,
    pub codec: String,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            source_root: config.paths.source_image_location.clone(),
            local_root: config.paths.local_image_location.clone(),
            mp4_output_directory: config.paths.mp4_output_directory.clone(),
            encode_log_directory: config.paths.encode_log_directory.clone(),
            encoder_enabled: config.encoder.enabled,
            encoder_program: config.encoder.program.clone(),
            framerate: config.encoder.framerate,
            codec: config.encoder.codec.clone(),
        }
    }

    /// Output video for `day`
    pub fn output_path(&self, day: &str) -> PathBuf {
        self.mp4_output_directory.join(format!("{}.mp4", day))
    }
}

/// Drives per-day directories through copy, encode and ledger update
pub struct EncodeOrchestrator {
    settings: OrchestratorSettings,
    ledger: Ledger,
    processor: Arc<dyn ImageProcessor>,
    encoder: Arc<dyn EncoderRunner>,
}

impl EncodeOrchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        ledger: Ledger,
        processor: Arc<dyn ImageProcessor>,
        encoder: Arc<dyn EncoderRunner>,
    ) -> Self {
        Self {
            settings,
            ledger,
            processor,
            encoder,
        }
    }

    #[cfg(test)]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Build the job for the source directory named `day`
    pub fn day_job(&self, day: &str) -> DayJob {
        DayJob {
            day: day.to_string(),
            source_dir: self.settings.source_root.join(day),
            destination_dir: self.settings.local_root.join(day),
            output_path: self.settings.output_path(day),
            state: DayState::Unprocessed,
        }
    }

    /// Process every day directory under the source root except `today`.
    ///
    /// Days run strictly one after another.
    pub fn run(&self, today: NaiveDate) -> Result<RunSummary, OrchestratorError> {
        let source_root = &self.settings.source_root;
        if !source_root.is_dir() {
            return Err(OrchestratorError::MissingSource(source_root.clone()));
        }

        let today = today.format("%Y-%m-%d").to_string();
        let mut summary = RunSummary::default();

        for dir in list_subdirectories(source_root).map_err(io_error(source_root))? {
            let Some(day) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            summary.days_seen += 1;

            if day.eq_ignore_ascii_case(&today) {
                debug!(day, "Skipping current day, still accumulating captures");
                summary.skipped_today += 1;
                continue;
            }

            let job = self.process_day(self.day_job(&day), &mut summary)?;
            debug!(day = %job.day, state = job.state.as_str(), "Day done");
        }

        info!(
            days = summary.days_seen,
            processed = summary.processed,
            frames = summary.frames_written,
            failed_frames = summary.frames_failed,
            encoder_failures = summary.encoder_failures,
            "Run complete"
        );
        Ok(summary)
    }

    /// Move one day through the state machine up to `Finished`.
    pub fn process_day(
        &self,
        mut job: DayJob,
        summary: &mut RunSummary,
    ) -> Result<DayJob, OrchestratorError> {
        let key = ledger_key(&job.source_dir);
        if self.ledger.is_finished(&key) {
            info!(source = %job.source_dir.display(), "Skipping copy files and resize for finished directory");
            summary.skipped_finished += 1;
            job.state = DayState::Finished;
            return Ok(job);
        }

        if !job.source_dir.is_dir() {
            return Err(OrchestratorError::MissingSource(job.source_dir.clone()));
        }

        // Unprocessed -> Copied
        let images = list_images(&job.source_dir, NameFormat::Standard)
            .map_err(io_error(&job.source_dir))?;
        let ordered: Vec<_> = group_by_day(images)
            .into_values()
            .flat_map(|group| group.images)
            .collect();
        info!(
            source = %job.source_dir.display(),
            total = ordered.len(),
            "Copying and resizing files"
        );

        let report = materialize(&job.destination_dir, &ordered, self.processor.as_ref())
            .map_err(io_error(&job.destination_dir))?;
        summary.frames_written += report.written;
        summary.frames_failed += report.failed.len();
        job.state = DayState::Copied {
            frames: report.written,
        };

        // Copied -> Encoded
        let outcome = self.encode_day(&job.day, &job.destination_dir, &job.output_path)?;
        summary.record_encode(&outcome);
        job.state = DayState::Encoded(outcome);

        // Encoded -> Finished
        self.ledger.mark_finished(&key)?;
        summary.processed += 1;
        job.state = DayState::Finished;
        Ok(job)
    }

    /// Encode `frames_dir` into `output_path` unless there is nothing to do.
    ///
    /// Encoder failures are logged and returned as [`EncodeOutcome::Failed`];
    /// only failing to create the output directory is an error.
    pub fn encode_day(
        &self,
        day: &str,
        frames_dir: &Path,
        output_path: &Path,
    ) -> Result<EncodeOutcome, OrchestratorError> {
        if !self.settings.encoder_enabled {
            return Ok(EncodeOutcome::Skipped(EncodeSkip::Disabled));
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error(parent))?;
        }

        if output_path.exists() {
            info!(output = %output_path.display(), "Movie already exists");
            return Ok(EncodeOutcome::Skipped(EncodeSkip::OutputExists));
        }

        if !has_images(frames_dir) {
            info!(frames = %frames_dir.display(), "No files to create movie");
            return Ok(EncodeOutcome::Skipped(EncodeSkip::NoFrames));
        }

        let request = EncodeRequest {
            program: self.settings.encoder_program.clone(),
            frames_dir: frames_dir.to_path_buf(),
            output_path: output_path.to_path_buf(),
            framerate: self.settings.framerate,
            codec: self.settings.codec.clone(),
        };
        info!(command = %request.command_line(), "Creating movie");

        let started = Instant::now();
        let result = self.encoder.run(&request);
        let elapsed = started.elapsed();

        let log_path = encode_log_path(&self.settings.encode_log_directory, day);
        if let Err(e) = append_encode_log(&log_path, &request, &result, elapsed) {
            warn!(log = %log_path.display(), error = %e, "Failed to write encode log");
        }

        let outcome = match result.and_then(|output| output.check()) {
            Ok(()) => {
                info!(day, elapsed_ms = elapsed.as_millis() as u64, "Finished creating movie");
                EncodeOutcome::Succeeded
            }
            Err(e) => {
                warn!(day, error = %e, log = %log_path.display(), "Encoder failed");
                EncodeOutcome::Failed(e.to_string())
            }
        };
        Ok(outcome)
    }

    /// Encode every frame directory under the local root except `today`.
    ///
    /// Used after unsorted ingestion, where there is no ledger.
    pub fn encode_all(&self, today: NaiveDate) -> Result<RunSummary, OrchestratorError> {
        let local_root = &self.settings.local_root;
        let mut summary = RunSummary::default();
        if !local_root.is_dir() {
            return Ok(summary);
        }

        let today = today.format("%Y-%m-%d").to_string();
        for dir in list_subdirectories(local_root).map_err(io_error(local_root))? {
            let Some(day) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            summary.days_seen += 1;
            if day == today {
                summary.skipped_today += 1;
                continue;
            }

            let outcome = self.encode_day(&day, &dir, &self.settings.output_path(&day))?;
            summary.record_encode(&outcome);
        }
        Ok(summary)
    }
}
