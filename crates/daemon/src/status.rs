//! Status snapshot written after each cycle, for operators and monitoring.

use crate::orchestrator::RunSummary;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Outcome of the most recent cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusSnapshot {
    pub timestamp_unix_ms: i64,
    /// `sorted` or `unsorted`
    pub mode: String,
    pub summary: RunSummary,
}

impl StatusSnapshot {
    pub fn new(mode: &str, summary: RunSummary) -> Self {
        Self {
            timestamp_unix_ms: chrono::Utc::now().timestamp_millis(),
            mode: mode.to_string(),
            summary,
        }
    }
}

/// Write `snapshot` as pretty JSON, replacing the previous one.
///
/// Written to a sibling temp file first so readers never see a torn snapshot.
pub fn write_status(path: &Path, snapshot: &StatusSnapshot) -> io::Result<()> {
    let json = serde_json::to_string_pretty(snapshot).map_err(io::Error::other)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)
}

#[cfg(test)]
pub fn read_status(path: &Path) -> io::Result<StatusSnapshot> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_status_snapshot_serialization() {
        let summary = RunSummary {
            days_seen: 3,
            processed: 2,
            frames_written: 1440,
            ..Default::default()
        };
        let snapshot = StatusSnapshot::new("sorted", summary);

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"mode\":\"sorted\""));
        assert!(json.contains("\"frames_written\":1440"));
        assert!(snapshot.timestamp_unix_ms > 1_577_836_800_000); // after 2020
    }

    #[test]
    fn test_write_status_replaces_previous() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("status.json");

        write_status(&path, &StatusSnapshot::new("sorted", RunSummary::default())).unwrap();
        let second = StatusSnapshot::new(
            "unsorted",
            RunSummary {
                videos_encoded: 4,
                ..Default::default()
            },
        );
        write_status(&path, &second).unwrap();

        assert_eq!(read_status(&path).unwrap(), second);
        assert!(!temp_dir.path().join("status.json.tmp").exists());
    }
}
