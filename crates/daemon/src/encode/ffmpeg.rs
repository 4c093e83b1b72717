//! FFmpeg encoder module
//!
//! Builds and runs the command that turns a directory of sequential frames
//! into one H.264 timelapse video, and keeps the per-day audit log of every
//! invocation.

use crate::renamer::FRAME_PATTERN;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use thiserror::Error;

/// Error type for encoding operations
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Encoder process exited with non-zero status
    #[error("Encoder failed with exit code: {0}")]
    EncoderFailed(i32),

    /// Encoder process was terminated by signal
    #[error("Encoder process was terminated by signal")]
    EncoderTerminated,

    /// IO error during encoding
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parameters for one timelapse encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    /// Encoder executable
    pub program: String,
    /// Directory holding `image_0000.jpg`, `image_0001.jpg`, ...
    pub frames_dir: PathBuf,
    /// Path of the video to create
    pub output_path: PathBuf,
    /// Input and output frame rate
    pub framerate: u32,
    /// Value for `-c:v`
    pub codec: String,
}

impl EncodeRequest {
    /// printf-style input pattern inside the frames directory
    pub fn input_pattern(&self) -> PathBuf {
        self.frames_dir.join(FRAME_PATTERN)
    }

    /// Argument vector, without the program
    pub fn args(&self) -> Vec<String> {
        vec![
            "-framerate".to_string(),
            self.framerate.to_string(),
            "-i".to_string(),
            self.input_pattern().display().to_string(),
            "-c:v".to_string(),
            self.codec.clone(),
            "-r".to_string(),
            self.framerate.to_string(),
            self.output_path.display().to_string(),
        ]
    }

    /// Human readable command line, as written to the encode log
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Build an encoder command for `request`
///
/// Stdin is closed so the encoder can never block on an interactive prompt;
/// stdout and stderr are piped for the encode log.
pub fn build_encoder_command(request: &EncodeRequest) -> Command {
    let mut cmd = Command::new(&request.program);
    cmd.arg("-framerate").arg(request.framerate.to_string());
    cmd.arg("-i").arg(request.input_pattern());
    cmd.arg("-c:v").arg(&request.codec);
    cmd.arg("-r").arg(request.framerate.to_string());
    cmd.arg(&request.output_path);

    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd
}

/// Everything a finished encoder process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl EncoderOutput {
    /// Map a non-success exit to an [`EncodeError`]
    pub fn check(&self) -> Result<(), EncodeError> {
        match self.exit_code {
            Some(0) => Ok(()),
            Some(code) => Err(EncodeError::EncoderFailed(code)),
            None => Err(EncodeError::EncoderTerminated),
        }
    }
}

/// Runs an encode to completion
///
/// Blocking; callers on an async runtime should wrap it in `spawn_blocking`.
pub trait EncoderRunner: Send + Sync {
    fn run(&self, request: &EncodeRequest) -> Result<EncoderOutput, EncodeError>;
}

/// [`EncoderRunner`] that spawns the configured ffmpeg executable
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegRunner;

impl EncoderRunner for FfmpegRunner {
    fn run(&self, request: &EncodeRequest) -> Result<EncoderOutput, EncodeError> {
        let output = build_encoder_command(request).output()?;
        Ok(EncoderOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Path of the encode log for `day`, e.g. `createOutput_2024-05-17.log`
pub fn encode_log_path(log_dir: &Path, day: &str) -> PathBuf {
    log_dir.join(format!("createOutput_{}.log", day))
}

/// Appends one invocation record to the per-day encode log.
///
/// The record always carries the command line and both captured streams,
/// followed by the outcome and elapsed time.
pub fn append_encode_log(
    log_path: &Path,
    request: &EncodeRequest,
    result: &Result<EncoderOutput, EncodeError>,
    elapsed: Duration,
) -> io::Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut record = format!("{}\n", request.command_line());
    match result {
        Ok(output) => {
            record.push_str(&output.stdout);
            record.push_str(&output.stderr);
            match output.check() {
                Ok(()) => record.push_str("\noutcome: success\n"),
                Err(e) => record.push_str(&format!("\noutcome: {}\n", e)),
            }
        }
        Err(e) => record.push_str(&format!("outcome: failed to run encoder: {}\n", e)),
    }
    record.push_str(&format!("elapsedMillis: {}\n", elapsed.as_millis()));

    let mut file = OpenOptions::new().create(true).append(true).open(log_path)?;
    file.write_all(record.as_bytes())
}
