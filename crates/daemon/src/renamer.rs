//! Sequential frame materialization.
//!
//! Writes a day's images into a clean directory as `image_0000.jpg`,
//! `image_0001.jpg`, ... in chronological order. The encoder's input pattern
//! ([`FRAME_PATTERN`]) depends on exactly this prefix and pad width.
//!
//! A frame that fails to resize does not consume an index, so the written
//! sequence is always contiguous from zero.

use crate::resize::{ImageProcessor, ResizeTarget};
use crate::timestamp::CapturedImage;
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Prefix of every materialized frame.
pub const FRAME_PREFIX: &str = "image_";

/// Extension of every materialized frame.
pub const FRAME_EXTENSION: &str = "jpg";

/// printf-style input pattern matching [`frame_file_name`].
pub const FRAME_PATTERN: &str = "image_%04d.jpg";

/// File name of the frame at `index`, e.g. `image_0042.jpg`.
pub fn frame_file_name(index: usize) -> String {
    format!("{}{:04}.{}", FRAME_PREFIX, index, FRAME_EXTENSION)
}

/// Outcome of one materialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Frames written; also the next free index
    pub written: usize,
    /// File names of sources that could not be resized
    pub failed: Vec<String>,
}

/// Removes every file directly inside `dir`, or creates it when absent.
///
/// Subdirectories are left alone.
pub fn prepare_destination(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return std::fs::create_dir_all(dir);
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Clears `destination_dir` and writes `images` into it as half-scale frames.
///
/// `images` must already be in chronological order. Errors only come from
/// preparing the directory; per-image failures are collected in the report.
pub fn materialize(
    destination_dir: &Path,
    images: &[CapturedImage],
    processor: &dyn ImageProcessor,
) -> io::Result<MaterializeReport> {
    prepare_destination(destination_dir)?;

    let total = images.len();
    let report = images
        .iter()
        .fold(MaterializeReport::default(), |mut report, image| {
            let destination = destination_dir.join(frame_file_name(report.written));
            match processor.resize_and_save(&image.source_path, &destination, ResizeTarget::Half) {
                Ok(()) => {
                    report.written += 1;
                    info!(
                        file = %image.file_name,
                        frame = report.written,
                        total,
                        "Copied and resized frame"
                    );
                }
                Err(e) => {
                    // The slot is reused by the next frame; drop any partial write
                    let _ = std::fs::remove_file(&destination);
                    warn!(file = %image.file_name, error = %e, "Skipping frame that failed to resize");
                    report.failed.push(image.file_name.clone());
                }
            }
            report
        });

    Ok(report)
}
