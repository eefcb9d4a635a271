//! Structured JSONL audit log of workbox activity.
//!
//! Each line carries:
//! - a monotonic sequence number
//! - an ISO 8601 UTC timestamp with microsecond precision
//! - the session id and run id for correlation
//! - the emitting component and a JSON event

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::domain::{CommandId, StateId};
use crate::executor::ItemOutcome;

pub struct StructuredLogger {
    session_id: String,
    run_id: AtomicU64,
    seq: AtomicU64,
    log_file: Mutex<File>,
    log_path: PathBuf,
}

/// A single log entry in JSONL format.
#[derive(Serialize, serde::Deserialize)]
pub struct LogEntry {
    /// Monotonic sequence number (unique across the session)
    pub seq: u64,
    pub ts: String,
    pub session_id: String,
    /// Bumped each time the workbox is initialized within the session
    pub run_id: u64,
    pub component: String,
    pub event: Value,
}

impl StructuredLogger {
    /// Creates a logger appending to `<logs_dir>/events.jsonl`.
    ///
    /// # Errors
    ///
    /// Returns an error if the logs directory cannot be created or the log
    /// file cannot be opened.
    pub fn new(session_id: &str, logs_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(logs_dir)?;
        let log_path = logs_dir.join("events.jsonl");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            session_id: session_id.to_string(),
            run_id: AtomicU64::new(0),
            seq: AtomicU64::new(0),
            log_file: Mutex::new(file),
            log_path,
        })
    }

    /// Starts a new run and returns its id.
    pub fn begin_run(&self) -> u64 {
        self.run_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Writes one event as a single line. Thread-safe; write failures are ignored.
    pub fn log(&self, component: &str, event: impl Serialize) {
        let entry = LogEntry {
            seq: self.next_seq(),
            ts: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
            session_id: self.session_id.clone(),
            run_id: self.run_id.load(Ordering::SeqCst),
            component: component.to_string(),
            event: serde_json::to_value(event).unwrap_or(Value::Null),
        };

        if let Ok(mut file) = self.log_file.lock() {
            if let Ok(line) = serde_json::to_string(&entry) {
                let _ = writeln!(file, "{}", line);
                let _ = file.flush();
            }
        }
    }

    pub fn log_catalog_loaded(&self, workflows: usize, states: usize) {
        self.log(
            "Catalog",
            serde_json::json!({
                "type": "CatalogLoaded",
                "workflows": workflows,
                "states": states
            }),
        );
    }

    pub fn log_catalog_failed(&self, failures: &[String]) {
        self.log(
            "Catalog",
            serde_json::json!({
                "type": "CatalogLoadFailed",
                "failures": failures
            }),
        );
    }

    /// Logs a result page refresh and how it was resolved.
    pub fn log_refresh(&self, state_id: StateId, page_index: u32, outcome: &str, total: u64) {
        self.log(
            "Results",
            serde_json::json!({
                "type": "Refresh",
                "state_id": state_id,
                "page_index": page_index,
                "outcome": outcome,
                "total_count": total
            }),
        );
    }

    pub fn log_selection_changed(&self, action: &str, selected: usize, in_state: usize) {
        self.log(
            "Selection",
            serde_json::json!({
                "type": "SelectionChanged",
                "action": action,
                "selected": selected,
                "in_state": in_state
            }),
        );
    }

    pub fn log_command_started(&self, command_id: CommandId, state_id: StateId, items: usize) {
        self.log(
            "Command",
            serde_json::json!({
                "type": "CommandStarted",
                "command_id": command_id,
                "state_id": state_id,
                "items": items
            }),
        );
    }

    pub fn log_item_outcome(&self, outcome: &ItemOutcome) {
        self.log(
            "Command",
            serde_json::json!({
                "type": "ItemOutcome",
                "outcome": outcome
            }),
        );
    }

    pub fn log_command_finished(&self, succeeded: usize, failed: usize) {
        self.log(
            "Command",
            serde_json::json!({
                "type": "CommandFinished",
                "succeeded": succeeded,
                "failed": failed
            }),
        );
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_path
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[cfg(test)]
#[path = "tests/structured_logger_tests.rs"]
mod tests;
