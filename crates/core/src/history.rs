//! Quiz History Store
//!
//! Completed quizzes are kept as a newest-first list of immutable
//! [`HistoryEntry`] records under a single key in device-local storage.
//! Reads never fail: missing or corrupt data is treated as an empty history.

use crate::quiz::QuizOutcome;
use crate::selection::Selection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;

/// Storage key the history list is kept under.
pub const HISTORY_KEY: &str = "istanbul_history";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The outcome of one completed quiz. Never modified once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    #[serde(flatten)]
    pub selection: Selection,
    pub score: u32,
    pub total: u32,
}

impl HistoryEntry {
    /// Creates an entry for a just-finished quiz, stamped with a fresh id and
    /// the current time.
    pub fn from_outcome(outcome: QuizOutcome) -> Self {
        Self::with_id(Uuid::new_v4(), Utc::now(), outcome)
    }

    pub fn with_id(id: Uuid, date: DateTime<Utc>, outcome: QuizOutcome) -> Self {
        Self {
            id,
            date,
            selection: outcome.selection,
            score: outcome.score,
            total: outcome.total,
        }
    }
}

/// Persistence for the quiz history.
///
/// Calls are synchronous: a successful `append` is visible to the next `load`.
#[cfg_attr(test, mockall::automock)]
pub trait HistoryStore: Send + Sync {
    /// Returns all stored entries, newest first. Unreadable data yields an
    /// empty list.
    fn load(&self) -> Vec<HistoryEntry>;

    /// Inserts `entry` at the front of the list and persists the whole list.
    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError>;

    /// Removes every entry and erases the persisted state.
    fn clear(&self) -> Result<(), HistoryError>;
}

/// A `HistoryStore` backed by a JSON file in a storage directory.
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target, so a crash mid-write never leaves a truncated history behind.
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    /// Creates a store keeping its data in `dir`. The directory is created on
    /// the first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(format!("{HISTORY_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl HistoryStore for FileHistoryStore {
    fn load(&self) -> Vec<HistoryEntry> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read history, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Stored history is corrupt, starting empty");
                Vec::new()
            }
        }
    }

    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self.load();
        entries.insert(0, entry);
        self.write(&entries)?;
        debug!(count = entries.len(), "History saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), HistoryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A `HistoryStore` that lives only as long as the process.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl HistoryStore for InMemoryHistoryStore {
    fn load(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, entry);
        Ok(())
    }

    fn clear(&self) -> Result<(), HistoryError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
