use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::warn;

use super::events::HistoryEvent;
use super::HistorySink;
use crate::ping::{PingAttemptOutcome, PingTrigger};

/// Default rotation threshold (5MB)
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// History sink writing ndjson lines with single-file rotation
pub struct HistoryLog {
    max_size_bytes: u64,
    file_path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
}

impl HistoryLog {
    /// Create a history log at `file_path`.
    ///
    /// The file (and its directory) is created lazily on the first write.
    pub fn new(file_path: impl Into<PathBuf>, max_size_bytes: u64) -> Self {
        Self {
            max_size_bytes,
            file_path: file_path.into(),
            writer: Mutex::new(None),
        }
    }

    /// Path of the current (unrotated) file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Path the file is renamed to on rotation
    pub fn rotated_path(&self) -> PathBuf {
        rotated_path(&self.file_path)
    }

    /// Serialize and append one event
    pub fn log(&self, event: &HistoryEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize history event: {}", e);
                return;
            }
        };

        let mut guard = self.writer.lock();
        if guard.is_none() {
            *guard = open_writer(&self.file_path);
        }
        let Some(writer) = guard.as_mut() else {
            return;
        };

        if writeln!(writer, "{}", json).is_ok() {
            let _ = writer.flush();
        } else {
            // Write failed, try to reopen on next call
            *guard = None;
        }

        self.maybe_rotate(&mut guard);
    }

    /// Rotate the log file if it exceeds max_size_bytes
    fn maybe_rotate(&self, writer: &mut Option<BufWriter<File>>) {
        let metadata = match fs::metadata(&self.file_path) {
            Ok(m) => m,
            Err(_) => return,
        };

        if metadata.len() >= self.max_size_bytes {
            *writer = None;
            let _ = fs::rename(&self.file_path, self.rotated_path());
            *writer = open_writer(&self.file_path);
        }
    }
}

impl HistorySink for HistoryLog {
    fn record(&self, trigger: PingTrigger, outcome: &PingAttemptOutcome) {
        self.log(&HistoryEvent::from_outcome(trigger, outcome));
    }

    fn record_event(&self, message: &str) {
        self.log(&HistoryEvent::System {
            ts: Utc::now(),
            message: message.to_string(),
        });
    }
}

pub(crate) fn rotated_path(file_path: &Path) -> PathBuf {
    file_path.with_extension("ndjson.1")
}

/// Open or create the log file for appending
fn open_writer(file_path: &Path) -> Option<BufWriter<File>> {
    if let Some(dir) = file_path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!("Failed to create history directory {:?}: {}", dir, e);
            return None;
        }
    }

    match OpenOptions::new().create(true).append(true).open(file_path) {
        Ok(file) => Some(BufWriter::new(file)),
        Err(e) => {
            warn!("Failed to open history log {:?}: {}", file_path, e);
            None
        }
    }
}
