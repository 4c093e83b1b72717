//! Capture timestamp parsing.
//!
//! Filenames are the only source of a photograph's capture instant. Two strict
//! conventions are recognised:
//!
//! - `yyyy-MM-dd HHmmss` (e.g. `2024-05-17 140312.jpg`), written by the camera
//!   into one directory per day
//! - thirteen digits of Unix epoch milliseconds (e.g. `1715954592000.jpg`),
//!   used by the unsorted capture dump
//!
//! Anything else is rejected with `None`; a bad name never aborts a batch.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use std::path::{Path, PathBuf};

/// Length of a `yyyy-MM-dd HHmmss` stem.
const STANDARD_STEM_LEN: usize = 17;

/// Length of an epoch-millisecond stem.
const EPOCH_MILLIS_STEM_LEN: usize = 13;

/// Filename convention used to recover the capture instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameFormat {
    /// `yyyy-MM-dd HHmmss`
    Standard,
    /// Unix epoch milliseconds, interpreted in local time
    EpochMillis,
}

impl NameFormat {
    pub fn parse(&self, stem: &str) -> Option<NaiveDateTime> {
        match self {
            NameFormat::Standard => parse_standard(stem),
            NameFormat::EpochMillis => parse_epoch_millis(stem),
        }
    }
}

/// A photograph discovered on disk with its parsed capture instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub source_path: PathBuf,
    pub file_name: String,
    pub captured_at: NaiveDateTime,
}

impl CapturedImage {
    /// Build from a path, or `None` when the file stem does not match `format`.
    pub fn from_path(path: &Path, format: NameFormat) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let stem = path.file_stem()?.to_str()?;
        let captured_at = format.parse(stem)?;

        Some(Self {
            source_path: path.to_path_buf(),
            file_name,
            captured_at,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.captured_at.date()
    }

    pub fn hour(&self) -> u32 {
        self.captured_at.hour()
    }
}

/// Parse a `yyyy-MM-dd HHmmss` stem.
///
/// Every field must be fully zero padded; chrono alone accepts short fields,
/// so the layout is checked byte by byte before handing off for range checks.
pub fn parse_standard(stem: &str) -> Option<NaiveDateTime> {
    let bytes = stem.as_bytes();
    if bytes.len() != STANDARD_STEM_LEN {
        return None;
    }

    let layout_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b' ',
        _ => b.is_ascii_digit(),
    });
    if !layout_ok {
        return None;
    }

    NaiveDateTime::parse_from_str(stem, "%Y-%m-%d %H%M%S").ok()
}

/// Parse a thirteen digit epoch-millisecond stem into local wall-clock time.
pub fn parse_epoch_millis(stem: &str) -> Option<NaiveDateTime> {
    if stem.len() != EPOCH_MILLIS_STEM_LEN || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let millis: i64 = stem.parse().ok()?;
    let utc = DateTime::from_timestamp_millis(millis)?;
    Some(Local.from_utc_datetime(&utc.naive_utc()).naive_local())
}

/// Format used when naming files after a capture instant, e.g. `2024-05-17T140312`.
pub fn archive_stamp(captured_at: &NaiveDateTime) -> String {
    captured_at.format("%Y-%m-%dT%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_parse_standard_valid() {
        assert_eq!(
            parse_standard("2024-05-17 140312"),
            Some(at(2024, 5, 17, 14, 3, 12))
        );
        assert_eq!(
            parse_standard("1999-12-31 235959"),
            Some(at(1999, 12, 31, 23, 59, 59))
        );
    }

    #[test]
    fn test_parse_standard_rejects_deviations() {
        // short fields
        assert_eq!(parse_standard("2024-5-17 140312"), None);
        assert_eq!(parse_standard("2024-05-17 14312"), None);
        // separators in the time part
        assert_eq!(parse_standard("2024-05-17 14:03:12"), None);
        // out of range
        assert_eq!(parse_standard("2024-13-17 140312"), None);
        assert_eq!(parse_standard("2024-02-30 140312"), None);
        assert_eq!(parse_standard("2024-05-17 250312"), None);
        // extra characters
        assert_eq!(parse_standard("2024-05-17 140312a"), None);
        assert_eq!(parse_standard(" 2024-05-17 140312"), None);
        assert_eq!(parse_standard("2024-05-17T140312"), None);
        assert_eq!(parse_standard(""), None);
    }

    #[test]
    fn test_parse_epoch_millis() {
        let expected = Local
            .timestamp_millis_opt(1_715_954_592_000)
            .single()
            .unwrap()
            .naive_local();
        assert_eq!(parse_epoch_millis("1715954592000"), Some(expected));

        assert_eq!(parse_epoch_millis("171595459200"), None);
        assert_eq!(parse_epoch_millis("17159545920000"), None);
        assert_eq!(parse_epoch_millis("-715954592000"), None);
        assert_eq!(parse_epoch_millis("1715954592OOO"), None);
    }

    #[test]
    fn test_formats_do_not_overlap() {
        assert_eq!(NameFormat::EpochMillis.parse("2024-05-17 140312"), None);
        assert_eq!(NameFormat::Standard.parse("1715954592000"), None);
    }

    #[test]
    fn test_captured_image_from_path() {
        let image = CapturedImage::from_path(
            Path::new("/cam/2024-05-17/2024-05-17 140312.jpg"),
            NameFormat::Standard,
        )
        .unwrap();

        assert_eq!(image.file_name, "2024-05-17 140312.jpg");
        assert_eq!(image.captured_at, at(2024, 5, 17, 14, 3, 12));
        assert_eq!(image.date(), NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
        assert_eq!(image.hour(), 14);

        assert!(CapturedImage::from_path(Path::new("/cam/notes.jpg"), NameFormat::Standard).is_none());
    }

    #[test]
    fn test_archive_stamp() {
        assert_eq!(archive_stamp(&at(2024, 5, 17, 9, 3, 2)), "2024-05-17T090302");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        // *For any* arbitrary string, parsing returns a value or None and never panics;
        // a returned value always formats back to the exact input.
        #[test]
        fn prop_parse_standard_is_strict(stem in "\\PC{0,24}") {
            if let Some(parsed) = parse_standard(&stem) {
                prop_assert_eq!(parsed.format("%Y-%m-%d %H%M%S").to_string(), stem);
            }
        }

        // *For any* valid instant, the canonical stem parses back to it.
        #[test]
        fn prop_parse_standard_accepts_canonical(
            y in 1000i32..9999,
            mo in 1u32..=12,
            d in 1u32..=28,
            h in 0u32..24,
            mi in 0u32..60,
            s in 0u32..60,
        ) {
            let expected = at(y, mo, d, h, mi, s);
            let stem = expected.format("%Y-%m-%d %H%M%S").to_string();
            prop_assert_eq!(parse_standard(&stem), Some(expected));
        }
    }
}
