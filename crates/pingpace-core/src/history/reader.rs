//! History reader — reads ndjson events from the rotated and current files

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::events::HistoryEvent;
use super::logger::rotated_path;

/// Existing history files, oldest first
fn history_paths(file_path: &Path) -> Vec<PathBuf> {
    [rotated_path(file_path), file_path.to_path_buf()]
        .into_iter()
        .filter(|p| p.exists())
        .collect()
}

/// Read the newest `limit` events in chronological order.
///
/// Reads the rotated (.1) file first, then the current one. Malformed lines
/// are skipped with a warning.
pub fn read_recent_events(file_path: &Path, limit: usize) -> Vec<HistoryEvent> {
    let mut events = Vec::new();

    for path in history_paths(file_path) {
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Failed to open history log {:?}: {}", path, e);
                continue;
            }
        };

        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Failed to read line {} in {:?}: {}", line_num + 1, path, e);
                    continue;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<HistoryEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(
                        "Malformed history event at {:?}:{}: {}",
                        path,
                        line_num + 1,
                        e
                    );
                }
            }
        }
    }

    let skip = events.len().saturating_sub(limit);
    events.split_off(skip)
}
