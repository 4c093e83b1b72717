//! Ingestion of an unsorted capture dump.
//!
//! Some cameras upload into a single tree with epoch-millisecond file names
//! instead of one directory per day. Here the existence of a day's frame
//! directory is the "already done" signal: days that have one are never
//! rewritten, so there is no ledger on this path.

use crate::group::{group_by_day, sort_distinct};
use crate::renamer::materialize;
use crate::resize::ImageProcessor;
use crate::scan::{list_images_recursive, list_subdirectories, parse_day_directory};
use crate::timestamp::NameFormat;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use tracing::info;

/// Counters for one unsorted ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsortedReport {
    /// Images that parsed, after dropping duplicate instants
    pub discovered: usize,
    /// Images skipped because their day already has frames (or is today)
    pub already_done: usize,
    pub days_written: usize,
    pub frames_written: usize,
    pub frames_failed: usize,
}

/// Dates that already have a `yyyy-MM-dd` directory under `local_root`.
pub fn materialized_days(local_root: &Path) -> io::Result<BTreeSet<NaiveDate>> {
    if !local_root.exists() {
        return Ok(BTreeSet::new());
    }
    Ok(list_subdirectories(local_root)?
        .iter()
        .filter_map(|dir| parse_day_directory(dir))
        .collect())
}

/// Materialize every new day found under `unsorted_root` into `local_root`.
///
/// `today` is left alone because it is still being captured; writing it now
/// would block the rest of the day from ever being ingested.
pub fn ingest_unsorted(
    unsorted_root: &Path,
    local_root: &Path,
    today: NaiveDate,
    processor: &dyn ImageProcessor,
) -> io::Result<UnsortedReport> {
    let images = sort_distinct(list_images_recursive(unsorted_root, NameFormat::EpochMillis));
    let done = materialized_days(local_root)?;

    let mut report = UnsortedReport {
        discovered: images.len(),
        ..Default::default()
    };

    let pending: Vec<_> = images
        .into_iter()
        .filter(|image| {
            let date = image.date();
            let skip = date == today || done.contains(&date);
            if skip {
                report.already_done += 1;
            }
            !skip
        })
        .collect();

    info!(
        source = %unsorted_root.display(),
        total = report.discovered,
        pending = pending.len(),
        "Ingesting unsorted files"
    );

    for (date, group) in group_by_day(pending) {
        let destination = local_root.join(date.format("%Y-%m-%d").to_string());
        let day_report = materialize(&destination, &group.images, processor)?;
        report.days_written += 1;
        report.frames_written += day_report.written;
        report.frames_failed += day_report.failed.len();
        info!(%date, frames = day_report.written, "Materialized day");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renamer::tests::CopyingProcessor;
    use chrono::{Local, TimeZone};
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Epoch millis for a local wall-clock time
    fn millis(date: NaiveDate, h: u32, m: u32) -> i64 {
        Local
            .from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
            .earliest()
            .unwrap()
            .timestamp_millis()
    }

    fn write_epoch(dir: &Path, millis: i64) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join(format!("{}.jpg", millis));
        std::fs::write(&path, millis.to_string()).unwrap();
        path
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_materialized_days() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir(temp_dir.path().join("2024-05-17")).unwrap();
        std::fs::create_dir(temp_dir.path().join("misc")).unwrap();

        let days = materialized_days(temp_dir.path()).unwrap();
        assert_eq!(
            days.into_iter().collect::<Vec<_>>(),
            vec![NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()]
        );
        assert!(materialized_days(&temp_dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_ingest_groups_by_day_with_fresh_numbering() {
        let dump = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let d1 = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 5, 18).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();

        write_epoch(&dump.path().join("a"), millis(d1, 15, 0));
        write_epoch(&dump.path().join("b"), millis(d1, 9, 0));
        write_epoch(&dump.path().join("b"), millis(d2, 10, 0));
        // same instant under another folder is a duplicate
        write_epoch(&dump.path().join("c"), millis(d1, 9, 0));
        std::fs::write(dump.path().join("notes.jpg"), b"x").unwrap();

        let report =
            ingest_unsorted(dump.path(), local.path(), today, &CopyingProcessor::default()).unwrap();

        assert_eq!(report.discovered, 3);
        assert_eq!(report.days_written, 2);
        assert_eq!(report.frames_written, 3);

        let day1 = local.path().join("2024-05-17");
        assert_eq!(names(&day1), vec!["image_0000.jpg", "image_0001.jpg"]);
        assert_eq!(
            std::fs::read_to_string(day1.join("image_0000.jpg")).unwrap(),
            millis(d1, 9, 0).to_string()
        );
        assert_eq!(names(&local.path().join("2024-05-18")), vec!["image_0000.jpg"]);
    }

    #[test]
    fn test_ingest_skips_existing_days_and_today() {
        let dump = TempDir::new().unwrap();
        let local = TempDir::new().unwrap();
        let done = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();

        let existing = local.path().join("2024-05-17");
        std::fs::create_dir_all(&existing).unwrap();
        std::fs::write(existing.join("image_0000.jpg"), b"kept").unwrap();

        write_epoch(dump.path(), millis(done, 12, 0));
        write_epoch(dump.path(), millis(today, 8, 0));

        let report =
            ingest_unsorted(dump.path(), local.path(), today, &CopyingProcessor::default()).unwrap();

        assert_eq!(report.already_done, 2);
        assert_eq!(report.days_written, 0);
        assert_eq!(
            std::fs::read_to_string(existing.join("image_0000.jpg")).unwrap(),
            "kept"
        );
        assert!(!local.path().join("2024-05-20").exists());
    }
}
