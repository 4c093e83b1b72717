//! Scanner module for discovering captured images and per-day directories.
//!
//! Files are filtered by the `.jpg` extension (case-insensitive) and parsed into
//! [`CapturedImage`]s; names that do not carry a valid timestamp are logged and
//! dropped so one stray file never stops a batch.

use crate::timestamp::{CapturedImage, NameFormat};
use chrono::NaiveDate;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Image extension accepted by the scanner (case-insensitive matching).
pub const IMAGE_EXTENSION: &str = "jpg";

/// Checks if a file has the image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(IMAGE_EXTENSION))
        .unwrap_or(false)
}

fn parse_or_warn(path: &Path, format: NameFormat) -> Option<CapturedImage> {
    let parsed = CapturedImage::from_path(path, format);
    if parsed.is_none() {
        warn!(path = %path.display(), "Skipping image without a valid capture timestamp");
    }
    parsed
}

/// Lists the images directly inside `dir`, in directory enumeration order.
pub fn list_images(dir: &Path, format: NameFormat) -> io::Result<Vec<CapturedImage>> {
    let mut images = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() || !is_image_file(&path) {
            continue;
        }
        if let Some(image) = parse_or_warn(&path, format) {
            images.push(image);
        }
    }

    debug!(dir = %dir.display(), count = images.len(), "Listed images");
    Ok(images)
}

/// Recursively lists images under `root`, skipping hidden directories.
///
/// A missing root yields an empty list; unreadable entries are skipped.
pub fn list_images_recursive(root: &Path, format: NameFormat) -> Vec<CapturedImage> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            // Allow the root directory even if it starts with '.'
            !(entry.file_type().is_dir()
                && entry.depth() > 0
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| name.starts_with('.'))
                    .unwrap_or(false))
        });

    walker
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file() && is_image_file(entry.path()))
        .filter_map(|entry| parse_or_warn(entry.path(), format))
        .collect()
}

/// Immediate subdirectories of `root`, sorted by name.
pub fn list_subdirectories(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Parses a `yyyy-MM-dd` directory name.
pub fn parse_day_directory(dir: &Path) -> Option<NaiveDate> {
    let name = dir.file_name()?.to_str()?;
    if name.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(name, "%Y-%m-%d").ok()
}

/// Whether `dir` holds at least one image file.
pub fn has_images(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|entry| is_image_file(&entry.path()))
        })
        .unwrap_or(false)
}
