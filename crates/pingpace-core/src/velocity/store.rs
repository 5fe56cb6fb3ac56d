//! Sample persistence.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use super::sample::Sample;

/// Errors from loading or saving the sample history
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed sample file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode samples: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Read-once, write-whole storage for the sample history
pub trait SampleStore: Send + Sync {
    /// Load every stored sample (ascending by timestamp)
    fn load(&self) -> Result<Vec<Sample>, StoreError>;

    /// Replace the stored history with `samples`
    fn save(&self, samples: &[Sample]) -> Result<(), StoreError>;
}

/// In-memory store, used when no path is configured
#[derive(Debug, Default)]
pub struct MemorySampleStore {
    samples: Mutex<Vec<Sample>>,
}

impl MemorySampleStore {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples: Mutex::new(samples),
        }
    }
}

impl SampleStore for MemorySampleStore {
    fn load(&self) -> Result<Vec<Sample>, StoreError> {
        Ok(self.samples.lock().clone())
    }

    fn save(&self, samples: &[Sample]) -> Result<(), StoreError> {
        *self.samples.lock() = samples.to_vec();
        Ok(())
    }
}

/// Pretty-printed JSON array on disk
#[derive(Debug, Clone)]
pub struct JsonSampleStore {
    path: PathBuf,
}

impl JsonSampleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleStore for JsonSampleStore {
    /// A missing file is an empty history. Entries that fail to parse are
    /// skipped; the remainder is sorted by timestamp.
    fn load(&self) -> Result<Vec<Sample>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let entries: Vec<serde_json::Value> =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        let total = entries.len();
        let mut samples: Vec<Sample> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        if samples.len() < total {
            debug!(
                "Skipped {} unreadable samples in {}",
                total - samples.len(),
                self.path.display()
            );
        }
        samples.sort_by_key(|s| s.timestamp);
        Ok(samples)
    }

    /// Writes to a sibling temp file, then renames over the target
    fn save(&self, samples: &[Sample]) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(samples)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)
    }
}
