//! Ledger of finished source directories.
//!
//! A plain text file with one directory path per line. Lines are only ever
//! appended; the file is never rewritten or compacted. A missing or unreadable
//! ledger means "nothing finished yet", while a failed append is an error the
//! caller must surface, since a lost entry silently brings back duplicate work.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

/// Error type for ledger writes
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to append to ledger {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Append-only record of finished source directories
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    /// Serializes appends when the ledger is shared between threads
    append_lock: Mutex<()>,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    /// Whether `entry` was recorded by an earlier `mark_finished`.
    ///
    /// Exact string comparison against each line; read failures count as
    /// "not finished".
    pub fn is_finished(&self, entry: &str) -> bool {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return false,
            Err(e) => {
                warn!(
                    ledger = %self.path.display(),
                    error = %e,
                    "Ledger unreadable, treating entry as unfinished"
                );
                return false;
            }
        };

        let found = content.lines().any(|line| line == entry);
        debug!(entry, found, "Ledger lookup");
        found
    }

    /// Append `entry` followed by a newline. Duplicates are not filtered.
    pub fn mark_finished(&self, entry: &str) -> Result<(), LedgerError> {
        // A poisoned lock only means another append panicked; the file is still usable
        let _guard = self
            .append_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let append = || -> io::Result<()> {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            file.write_all(format!("{}\n", entry).as_bytes())?;
            file.sync_data()
        };

        append().map_err(|source| LedgerError::Append {
            path: self.path.clone(),
            source,
        })
    }

    /// All recorded entries, in file order. Missing ledger yields an empty list.
    #[cfg(test)]
    pub fn entries(&self) -> Vec<String> {
        std::fs::read_to_string(&self.path)
            .map(|content| content.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Ledger key for a directory: its absolute path as text.
pub fn ledger_key(dir: &Path) -> String {
    std::path::absolute(dir)
        .unwrap_or_else(|_| dir.to_path_buf())
        .display()
        .to_string()
}
