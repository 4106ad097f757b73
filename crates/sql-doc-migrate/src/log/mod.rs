//! Append-only structured log of migration events.
//!
//! The log is the sole channel for failure reporting: every row either
//! appears in a `batch_written` entry or is accounted for in a
//! `batch_failed` entry. [`MigrationLog::record`] is the only mutator;
//! snapshots copy the current entries so recording is never blocked.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of event recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TableStarted,
    BatchWritten,
    BatchFailed,
    TableCompleted,
    TableFailed,
}

/// One log entry. Serializes to the exported format:
/// `{timestamp, table, event, detail}` with an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,

    /// Table the event belongs to.
    pub table: String,

    /// Event kind.
    pub event: EventKind,

    /// Event-specific detail object (row counts, errors, fallbacks).
    pub detail: serde_json::Value,
}

impl LogEntry {
    /// Create an entry timestamped now.
    pub fn new(table: impl Into<String>, event: EventKind, detail: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            table: table.into(),
            event,
            detail,
        }
    }
}

/// Append-only, in-memory migration log.
///
/// Interior locking lets the orchestrator hand out a shared handle so a
/// caller can snapshot mid-run while recording continues.
#[derive(Debug, Default)]
pub struct MigrationLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MigrationLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. The only mutator; entries are never edited or
    /// removed once recorded.
    pub fn record(&self, entry: LogEntry) {
        self.entries.lock().expect("log mutex poisoned").push(entry);
    }

    /// Copy-on-read snapshot of the current entries, in record order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.lock().expect("log mutex poisoned").clone()
    }

    /// Number of entries recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("log mutex poisoned").len()
    }

    /// Check if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export the current snapshot as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }
}
