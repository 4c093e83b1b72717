//! Grouping of captured images into calendar days.

use crate::timestamp::CapturedImage;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// The chronologically ordered images captured on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    pub date: NaiveDate,
    /// Ascending by `captured_at`; equal instants keep enumeration order
    pub images: Vec<CapturedImage>,
}

impl DayGroup {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Partition `images` by the date of their capture instant.
///
/// Each group is stably sorted, so the result depends only on the input order
/// of images sharing an identical instant.
pub fn group_by_day<I>(images: I) -> BTreeMap<NaiveDate, DayGroup>
where
    I: IntoIterator<Item = CapturedImage>,
{
    let mut groups: BTreeMap<NaiveDate, DayGroup> = BTreeMap::new();

    for image in images {
        let date = image.date();
        groups
            .entry(date)
            .or_insert_with(|| DayGroup {
                date,
                images: Vec::new(),
            })
            .images
            .push(image);
    }

    for group in groups.values_mut() {
        group.images.sort_by_key(|image| image.captured_at);
    }

    groups
}

/// Sort ascending by capture instant and drop later images sharing an instant.
pub fn sort_distinct(mut images: Vec<CapturedImage>) -> Vec<CapturedImage> {
    images.sort_by_key(|image| image.captured_at);
    images.dedup_by_key(|image| image.captured_at);
    images
}
