//! Timelapse Daemon
//!
//! Background service that turns a camera's still captures into one video per
//! day: scan, resize and renumber frames, encode, and record finished days.

pub mod daemon;
pub mod encode;
pub mod group;
pub mod ledger;
pub mod logging;
pub mod orchestrator;
pub mod renamer;
pub mod resize;
pub mod scan;
pub mod selector;
pub mod startup;
pub mod status;
pub mod timestamp;
pub mod unsorted;

pub use daemon::{Daemon, DaemonError};
pub use encode::{build_encoder_command, EncodeError, EncodeRequest, EncoderOutput, EncoderRunner, FfmpegRunner};
pub use group::{group_by_day, DayGroup};
pub use ledger::{ledger_key, Ledger, LedgerError};
pub use logging::init_logging;
pub use orchestrator::{
    DayJob, DayState, EncodeOrchestrator, EncodeOutcome, EncodeSkip, OrchestratorError,
    OrchestratorSettings, RunSummary,
};
pub use renamer::{materialize, MaterializeReport};
pub use resize::{ImageCrateProcessor, ImageProcessor, ResizeError, ResizeTarget};
pub use selector::{select_for_day, SelectionJob, SelectionResult};
pub use startup::{check_encoder_available, parse_ffmpeg_version, run_startup_checks, StartupError};
pub use status::{write_status, StatusSnapshot};
pub use timelapse_config as config;
pub use timelapse_config::Config;
pub use timestamp::{CapturedImage, NameFormat};
pub use unsorted::{ingest_unsorted, UnsortedReport};
