//! Core configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// A value parsed but is outside its allowed range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Filesystem locations used by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    /// Root holding one `yyyy-MM-dd` directory per captured day
    #[serde(default = "default_source_image_location")]
    pub source_image_location: PathBuf,
    /// Root for the resized, sequentially named frames of each day
    #[serde(default = "default_local_image_location")]
    pub local_image_location: PathBuf,
    /// Directory receiving `<date>.mp4`
    #[serde(default = "default_mp4_output_directory")]
    pub mp4_output_directory: PathBuf,
    /// Root of captures named by epoch milliseconds (unsorted mode only)
    #[serde(default)]
    pub unsorted_images_directory: Option<PathBuf>,
    /// Append-only record of finished source directories
    #[serde(default = "default_ledger_file")]
    pub ledger_file: PathBuf,
    /// Directory for the per-day `createOutput_<date>.log` files
    #[serde(default = "default_encode_log_directory")]
    pub encode_log_directory: PathBuf,
    /// Optional JSON snapshot written after every cycle
    #[serde(default)]
    pub status_file: Option<PathBuf>,
}

fn default_source_image_location() -> PathBuf {
    PathBuf::from("images")
}

fn default_local_image_location() -> PathBuf {
    PathBuf::from("frames")
}

fn default_mp4_output_directory() -> PathBuf {
    PathBuf::from("videos")
}

fn default_ledger_file() -> PathBuf {
    PathBuf::from("finishedPaths.log")
}

fn default_encode_log_directory() -> PathBuf {
    PathBuf::from(".")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_image_location: default_source_image_location(),
            local_image_location: default_local_image_location(),
            mp4_output_directory: default_mp4_output_directory(),
            unsorted_images_directory: None,
            ledger_file: default_ledger_file(),
            encode_log_directory: default_encode_log_directory(),
            status_file: None,
        }
    }
}

/// External video encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncoderConfig {
    /// Run the encoder at all (frames are still produced when false)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Encoder executable, resolved through PATH when not absolute
    #[serde(default = "default_encoder_program")]
    pub program: String,
    /// Input and output frame rate
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    /// Video codec passed to `-c:v`
    #[serde(default = "default_codec")]
    pub codec: String,
}

fn default_true() -> bool {
    true
}

fn default_encoder_program() -> String {
    "ffmpeg".to_string()
}

fn default_framerate() -> u32 {
    30
}

fn default_codec() -> String {
    "libx264".to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_encoder_program(),
            framerate: default_framerate(),
            codec: default_codec(),
        }
    }
}

/// Which ingestion path a poll cycle runs
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// One source directory per day, gated by the ledger
    #[default]
    Sorted,
    /// A single corpus of epoch-millisecond named captures
    Unsorted,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Sorted => "sorted",
            PipelineMode::Unsorted => "unsorted",
        }
    }
}

/// Poll loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    /// Minimum delay between the starts of two cycles
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub mode: PipelineMode,
}

fn default_poll_interval_secs() -> u64 {
    60 * 60
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            mode: PipelineMode::default(),
        }
    }
}

/// Representative image selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionConfig {
    /// Run the selection batch once at daemon start
    #[serde(default)]
    pub enabled: bool,
    /// Corpus scanned recursively; defaults to `paths.source_image_location`
    #[serde(default)]
    pub source_root: Option<PathBuf>,
    #[serde(default = "default_selection_output_directory")]
    pub output_directory: PathBuf,
    /// Hour of day (0-23) the chosen image should be closest to
    #[serde(default = "default_target_hour")]
    pub target_hour: u32,
    #[serde(default = "default_thumbnail_height")]
    pub thumbnail_height: u32,
}

fn default_selection_output_directory() -> PathBuf {
    PathBuf::from("1400HourFiles")
}

fn default_target_hour() -> u32 {
    14
}

fn default_thumbnail_height() -> u32 {
    200
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source_root: None,
            output_directory: default_selection_output_directory(),
            target_hour: default_target_hour(),
            thumbnail_height: default_thumbnail_height(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `timelapse_daemon=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional plain-text log file in addition to stdout
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Parses the config.toml file and handles missing optional fields with defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Overrides the following values if environment variables are set:
    /// - TIMELAPSE_SOURCE_IMAGE_LOCATION -> paths.source_image_location
    /// - TIMELAPSE_LOCAL_IMAGE_LOCATION -> paths.local_image_location
    /// - TIMELAPSE_MP4_OUTPUT_DIRECTORY -> paths.mp4_output_directory
    /// - TIMELAPSE_LEDGER_FILE -> paths.ledger_file
    /// - TIMELAPSE_ENCODER_PROGRAM -> encoder.program
    /// - TIMELAPSE_ENCODER_ENABLED -> encoder.enabled
    /// - TIMELAPSE_POLL_INTERVAL_SECS -> schedule.poll_interval_secs
    /// - TIMELAPSE_TARGET_HOUR -> selection.target_hour
    /// - TIMELAPSE_LOG_LEVEL -> logging.level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("TIMELAPSE_SOURCE_IMAGE_LOCATION") {
            if !val.is_empty() {
                self.paths.source_image_location = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("TIMELAPSE_LOCAL_IMAGE_LOCATION") {
            if !val.is_empty() {
                self.paths.local_image_location = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("TIMELAPSE_MP4_OUTPUT_DIRECTORY") {
            if !val.is_empty() {
                self.paths.mp4_output_directory = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("TIMELAPSE_LEDGER_FILE") {
            if !val.is_empty() {
                self.paths.ledger_file = PathBuf::from(val);
            }
        }

        if let Ok(val) = env::var("TIMELAPSE_ENCODER_PROGRAM") {
            if !val.is_empty() {
                self.encoder.program = val;
            }
        }

        if let Ok(val) = env::var("TIMELAPSE_ENCODER_ENABLED") {
            // Accept "true", "1", "yes" as true; "false", "0", "no" as false
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.encoder.enabled = true,
                "false" | "0" | "no" => self.encoder.enabled = false,
                _ => {} // Invalid value, keep existing
            }
        }

        if let Ok(val) = env::var("TIMELAPSE_POLL_INTERVAL_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.schedule.poll_interval_secs = secs;
            }
        }

        if let Ok(val) = env::var("TIMELAPSE_TARGET_HOUR") {
            if let Ok(hour) = val.parse::<u32>() {
                self.selection.target_hour = hour;
            }
        }

        if let Ok(val) = env::var("TIMELAPSE_LOG_LEVEL") {
            if !val.is_empty() {
                self.logging.level = val;
            }
        }
    }

    /// Reject values that parse but cannot drive the pipeline
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selection.target_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "selection.target_hour must be 0-23, got {}",
                self.selection.target_hour
            )));
        }
        if self.selection.thumbnail_height == 0 {
            return Err(ConfigError::Invalid(
                "selection.thumbnail_height must be positive".to_string(),
            ));
        }
        if self.encoder.framerate == 0 {
            return Err(ConfigError::Invalid(
                "encoder.framerate must be positive".to_string(),
            ));
        }
        if self.schedule.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "schedule.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.schedule.mode == PipelineMode::Unsorted
            && self.paths.unsorted_images_directory.is_none()
        {
            return Err(ConfigError::Invalid(
                "schedule.mode = \"unsorted\" requires paths.unsorted_images_directory".to_string(),
            ));
        }
        Ok(())
    }

    /// Corpus used by the selection batch
    pub fn selection_source_root(&self) -> &Path {
        self.selection
            .source_root
            .as_deref()
            .unwrap_or(&self.paths.source_image_location)
    }

    /// Load configuration from file, apply environment overrides and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
