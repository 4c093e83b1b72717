//! Representative image selection.
//!
//! Picks the one image per day that is closest to a target hour and exports a
//! half-scale copy plus a fixed-height thumbnail of it.
//!
//! Closeness is measured in whole hours. A side with no candidate counts as the
//! day boundary (hour 23 after, hour 0 before), and on an exact tie the image
//! *before* the target wins. Both rules are relied on by existing archives and
//! must not be changed to a symmetric nearest-neighbour rule.

use crate::group::{group_by_day, DayGroup};
use crate::resize::{ImageProcessor, ResizeError, ResizeTarget};
use crate::scan::list_images_recursive;
use crate::timestamp::{archive_stamp, CapturedImage, NameFormat};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Hour assumed for a missing "after" candidate.
const LAST_HOUR: i64 = 23;

/// Hour assumed for a missing "before" candidate.
const FIRST_HOUR: i64 = 0;

/// The image chosen for one day, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub date: NaiveDate,
    pub chosen: Option<CapturedImage>,
}

/// Choose the image of `group` nearest to `target_hour`.
///
/// Returns `None` for an empty group, and also when every image is at or after
/// the target and at least as far from it as midnight is.
pub fn select_for_day(group: &DayGroup, target_hour: u32) -> Option<&CapturedImage> {
    let after = group.images.iter().find(|image| image.hour() >= target_hour);
    let before = group.images.iter().rev().find(|image| image.hour() < target_hour);

    let target = target_hour as i64;
    let gap_after = after.map_or(LAST_HOUR, |image| image.hour() as i64) - target;
    let gap_before = target - before.map_or(FIRST_HOUR, |image| image.hour() as i64);

    // Both comparisons run; on equality the second one wins.
    let mut chosen = None;
    if gap_after <= gap_before {
        chosen = after;
    }
    if gap_after >= gap_before {
        chosen = before;
    }

    if chosen.is_none() && before.is_some() {
        chosen = before;
    }

    debug!(
        date = %group.date,
        gap_after,
        gap_before,
        chosen = chosen.map(|image| image.file_name.as_str()),
        "Selected representative image"
    );
    chosen
}

/// Output paths for a chosen image: `(half_scale_copy, thumbnail)`.
pub fn export_paths(output_dir: &Path, image: &CapturedImage) -> (PathBuf, PathBuf) {
    let stamp = archive_stamp(&image.captured_at);
    (
        output_dir.join(format!("{}.jpg", stamp)),
        output_dir.join(format!("{}_thumb.jpg", stamp)),
    )
}

/// Settings for a selection batch
#[derive(Debug, Clone)]
pub struct SelectionJob {
    pub source_root: PathBuf,
    pub output_directory: PathBuf,
    pub target_hour: u32,
    pub thumbnail_height: u32,
}

impl SelectionJob {
    /// Scan the corpus, pick one image per day and export it.
    ///
    /// A day whose export fails is logged and reported with `chosen: None`;
    /// it never stops the remaining days.
    pub fn run(&self, processor: &dyn ImageProcessor) -> std::io::Result<Vec<SelectionResult>> {
        std::fs::create_dir_all(&self.output_directory)?;

        let images = list_images_recursive(&self.source_root, NameFormat::Standard);
        let groups = group_by_day(images);
        info!(
            source = %self.source_root.display(),
            days = groups.len(),
            target_hour = self.target_hour,
            "Selecting representative images"
        );

        let results = groups
            .values()
            .map(|group| {
                let chosen = select_for_day(group, self.target_hour).and_then(|image| {
                    match self.export(image, processor) {
                        Ok(()) => Some(image.clone()),
                        Err(e) => {
                            warn!(date = %group.date, file = %image.file_name, error = %e, "Skipping day");
                            None
                        }
                    }
                });
                SelectionResult {
                    date: group.date,
                    chosen,
                }
            })
            .collect();

        Ok(results)
    }

    fn export(&self, image: &CapturedImage, processor: &dyn ImageProcessor) -> Result<(), ResizeError> {
        let (copy_path, thumb_path) = export_paths(&self.output_directory, image);
        processor.resize_and_save(&image.source_path, &copy_path, ResizeTarget::Half)?;
        processor.resize_and_save(
            &image.source_path,
            &thumb_path,
            ResizeTarget::FixedHeight(self.thumbnail_height),
        )?;
        info!(file = %image.file_name, output = %copy_path.display(), "Exported representative image");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renamer::tests::{write_capture, CopyingProcessor};
    use chrono::NaiveDateTime;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn day_with_hours(hours: &[u32]) -> DayGroup {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let images = hours
            .iter()
            .map(|h| {
                let captured_at = date.and_hms_opt(*h, 0, 0).unwrap();
                CapturedImage {
                    source_path: PathBuf::from(format!("/cam/{:02}.jpg", h)),
                    file_name: format!("{:02}.jpg", h),
                    captured_at,
                }
            })
            .collect();
        DayGroup { date, images }
    }

    fn chosen_hour(hours: &[u32], target: u32) -> Option<u32> {
        select_for_day(&day_with_hours(hours), target).map(|image| image.hour())
    }

    #[test]
    fn test_tie_prefers_before() {
        // gap_after = 15-14 = 1, gap_before = 14-13 = 1
        assert_eq!(chosen_hour(&[10, 13, 15, 18], 14), Some(13));
    }

    #[test]
    fn test_falls_back_to_before_when_nothing_after() {
        assert_eq!(chosen_hour(&[9, 12], 14), Some(12));
    }

    #[test]
    fn test_empty_day_selects_nothing() {
        assert_eq!(chosen_hour(&[], 14), None);
    }

    #[test]
    fn test_closer_after_wins() {
        assert_eq!(chosen_hour(&[10, 14, 18], 14), Some(14));
        assert_eq!(chosen_hour(&[11, 15], 14), Some(15));
    }

    #[test]
    fn test_missing_before_counts_as_midnight() {
        // gap_after = 20-14 = 6 < gap_before = 14-0
        assert_eq!(chosen_hour(&[20], 14), Some(20));
    }

    #[test]
    fn test_missing_after_counts_as_last_hour() {
        // gap_after 9 <= gap_before 13 picks the missing "after"; the fallback takes "before"
        assert_eq!(chosen_hour(&[1], 14), Some(1));
    }

    #[test]
    fn test_far_after_with_nothing_before_selects_nothing() {
        // gap_after = 20-5 = 15 >= gap_before = 5-0, so the missing "before" wins
        assert_eq!(chosen_hour(&[20], 5), None);
    }

    #[test]
    fn test_picks_earliest_after_and_latest_before() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        let mk = |h: u32, m: u32| CapturedImage {
            source_path: PathBuf::from(format!("/cam/{}{}.jpg", h, m)),
            file_name: format!("{}{}.jpg", h, m),
            captured_at: date.and_hms_opt(h, m, 0).unwrap(),
        };
        let group = DayGroup {
            date,
            images: vec![mk(13, 5), mk(13, 55), mk(14, 10), mk(14, 50)],
        };
        // hours 13 vs 14: gap_after 0 < gap_before 1 -> earliest image at/after 14:00
        assert_eq!(
            select_for_day(&group, 14).unwrap().captured_at,
            date.and_hms_opt(14, 10, 0).unwrap()
        );
        // target 15: after none (gap 8), before = 14:50 (gap 1) -> latest before
        assert_eq!(
            select_for_day(&group, 15).unwrap().captured_at,
            date.and_hms_opt(14, 50, 0).unwrap()
        );
    }

    #[test]
    fn test_export_paths() {
        let image = CapturedImage {
            source_path: PathBuf::from("/cam/2024-05-17 140312.jpg"),
            file_name: "2024-05-17 140312.jpg".to_string(),
            captured_at: NaiveDateTime::parse_from_str("2024-05-17 140312", "%Y-%m-%d %H%M%S")
                .unwrap(),
        };
        let (copy, thumb) = export_paths(Path::new("/out"), &image);
        assert_eq!(copy, PathBuf::from("/out/2024-05-17T140312.jpg"));
        assert_eq!(thumb, PathBuf::from("/out/2024-05-17T140312_thumb.jpg"));
    }

    #[test]
    fn test_selection_job_exports_copy_and_thumbnail() {
        let corpus = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let day1 = corpus.path().join("2024-05-17");
        let day2 = corpus.path().join("2024-05-18");
        std::fs::create_dir_all(&day1).unwrap();
        std::fs::create_dir_all(&day2).unwrap();
        write_capture(&day1, "2024-05-17 100000");
        write_capture(&day1, "2024-05-17 133000");
        write_capture(&day1, "2024-05-17 170000");
        write_capture(&day2, "2024-05-18 090000");

        let job = SelectionJob {
            source_root: corpus.path().to_path_buf(),
            output_directory: out.path().join("1400HourFiles"),
            target_hour: 14,
            thumbnail_height: 200,
        };
        let processor = CopyingProcessor::default();
        let results = job.run(&processor).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].chosen.as_ref().unwrap().file_name,
            "2024-05-17 133000.jpg"
        );
        assert_eq!(
            results[1].chosen.as_ref().unwrap().file_name,
            "2024-05-18 090000.jpg"
        );

        let out_dir = out.path().join("1400HourFiles");
        assert!(out_dir.join("2024-05-17T133000.jpg").exists());
        assert!(out_dir.join("2024-05-17T133000_thumb.jpg").exists());
        assert!(out_dir.join("2024-05-18T090000.jpg").exists());

        let calls = processor.calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[1].2, ResizeTarget::FixedHeight(200));
    }

    #[test]
    fn test_selection_job_skips_failing_day_and_continues() {
        let corpus = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let broken = corpus.path().join("2024-05-17 140000.jpg");
        std::fs::File::create(&broken).unwrap();
        write_capture(corpus.path(), "2024-05-18 140000");

        let job = SelectionJob {
            source_root: corpus.path().to_path_buf(),
            output_directory: out.path().to_path_buf(),
            target_hour: 14,
            thumbnail_height: 200,
        };
        let results = job.run(&CopyingProcessor::default()).unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].chosen.is_none());
        assert!(results[1].chosen.is_some());
        assert!(out.path().join("2024-05-18T140000.jpg").exists());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // *For any* day and target, the choice is either the earliest image at or
        // after the target hour or the latest image before it. Nothing is chosen
        // only when there is no image before the target and the first one after
        // it is at least as far away as midnight.
        #[test]
        fn prop_selection_is_one_of_the_neighbours(
            mut hours in proptest::collection::vec(0u32..24, 0..12),
            target in 0u32..24,
        ) {
            hours.sort();
            let group = day_with_hours(&hours);
            let chosen = select_for_day(&group, target);

            let after = hours.iter().find(|h| **h >= target).copied();
            let before = hours.iter().rev().find(|h| **h < target).copied();

            match chosen {
                None => prop_assert!(
                    before.is_none()
                        && after.map_or(true, |h| h as i64 - target as i64 >= target as i64)
                ),
                Some(image) => {
                    let h = image.hour();
                    prop_assert!(Some(h) == after || Some(h) == before);
                }
            }
        }
    }
}
