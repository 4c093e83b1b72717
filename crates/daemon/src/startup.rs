//! Startup checks module for the timelapse daemon
//!
//! Provides preflight checks run before the first cycle:
//! - Encoder availability (`<program> -version`)
//! - Ledger location is writable
//!
//! Both would otherwise only surface after frames were already rewritten.

use crate::config::Config;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::info;

/// Error types for startup checks
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Encoder not available: {0}")]
    EncoderUnavailable(String),

    #[error("Ledger {path} is not writable: {source}")]
    LedgerNotWritable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Extract the version token from `ffmpeg -version` output
///
/// Handles both release (`ffmpeg version 6.1.1 ...`) and git builds
/// (`ffmpeg version n8.0-...` or `N-113000-g...`).
pub fn parse_ffmpeg_version(version_output: &str) -> Option<&str> {
    version_output
        .lines()
        .find_map(|line| line.trim().strip_prefix("ffmpeg version "))
        .and_then(|rest| rest.split_whitespace().next())
}

/// Check that the encoder runs, by executing `<program> -version`
pub fn check_encoder_available(program: &str) -> Result<(), StartupError> {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            StartupError::EncoderUnavailable(format!(
                "{} -version failed; is it installed and in PATH? Error: {}",
                program, e
            ))
        })?;

    if !output.status.success() {
        return Err(StartupError::EncoderUnavailable(format!(
            "{} -version exited with {}",
            program, output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    info!(
        program,
        version = parse_ffmpeg_version(&stdout).unwrap_or("unknown"),
        "Encoder available"
    );
    Ok(())
}

/// Check the ledger can be opened for appending, creating it if needed
pub fn check_ledger_writable(path: &Path) -> Result<(), StartupError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| StartupError::LedgerNotWritable {
            path: path.display().to_string(),
            source,
        })
}

/// Run all startup checks in order
///
/// The encoder check is skipped when encoding is disabled.
pub fn run_startup_checks(cfg: &Config) -> Result<(), StartupError> {
    check_ledger_writable(&cfg.paths.ledger_file)?;
    if cfg.encoder.enabled {
        check_encoder_available(&cfg.encoder.program)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_ffmpeg_version_release() {
        let output = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023 the FFmpeg developers\nbuilt with gcc 13\n";
        assert_eq!(parse_ffmpeg_version(output), Some("6.1.1-3ubuntu5"));
    }

    #[test]
    fn test_parse_ffmpeg_version_git_build() {
        assert_eq!(
            parse_ffmpeg_version("ffmpeg version n8.0-12-gabc Copyright"),
            Some("n8.0-12-gabc")
        );
        assert_eq!(
            parse_ffmpeg_version("ffmpeg version N-113000-g1234 Copyright"),
            Some("N-113000-g1234")
        );
    }

    #[test]
    fn test_parse_ffmpeg_version_garbage() {
        assert_eq!(parse_ffmpeg_version(""), None);
        assert_eq!(parse_ffmpeg_version("command not found"), None);
    }

    #[test]
    fn test_missing_encoder_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let program = temp_dir.path().join("no-such-ffmpeg");
        let result = check_encoder_available(&program.display().to_string());
        assert!(matches!(result, Err(StartupError::EncoderUnavailable(_))));
    }

    #[test]
    fn test_ledger_writable_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = temp_dir.path().join("finishedPaths.log");
        check_ledger_writable(&ledger).unwrap();
        assert!(ledger.exists());
    }

    #[test]
    fn test_ledger_in_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = temp_dir.path().join("missing").join("finishedPaths.log");
        assert!(matches!(
            check_ledger_writable(&ledger),
            Err(StartupError::LedgerNotWritable { .. })
        ));
    }

    #[test]
    fn test_startup_checks_skip_disabled_encoder() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.ledger_file = temp_dir.path().join("finishedPaths.log");
        config.encoder.enabled = false;
        config.encoder.program = temp_dir.path().join("nope").display().to_string();

        assert!(run_startup_checks(&config).is_ok());

        config.encoder.enabled = true;
        assert!(run_startup_checks(&config).is_err());
    }
}
