//! The velocity tracker: sample intake, pruning, persistence and reports.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::compute::{is_duplicate, prune};
use super::models::detect_active_model;
use super::report::VelocityReport;
use super::sample::{model_breakdown, Sample};
use super::store::SampleStore;
use crate::api::CoreEvent;
use crate::usage::{UsageSnapshot, UsageSnapshotReceiver};

struct TrackerState {
    samples: Vec<Sample>,
    /// Cleared when the stored history could not be read, so it is never
    /// overwritten by the in-memory copy
    persist: bool,
    /// A persistence failure was already reported
    store_warned: bool,
}

/// Turns usage snapshots into a pruned sample history and derived metrics
pub struct VelocityTracker {
    state: Mutex<TrackerState>,
    store: Arc<dyn SampleStore>,
    report_tx: watch::Sender<VelocityReport>,
}

impl VelocityTracker {
    /// Load history from `store` once. Failures start an empty,
    /// memory-only history and leave the stored copy untouched.
    pub fn load(store: Arc<dyn SampleStore>) -> Self {
        let (samples, persist) = match store.load() {
            Ok(samples) => {
                debug!("Loaded {} usage samples", samples.len());
                (samples, true)
            }
            Err(e) => {
                warn!("Usage history unavailable, keeping it in memory only: {}", e);
                (Vec::new(), false)
            }
        };

        let report = VelocityReport::from_samples(&samples);
        let (report_tx, _) = watch::channel(report);
        Self {
            state: Mutex::new(TrackerState {
                samples,
                persist,
                store_warned: false,
            }),
            store,
            report_tx,
        }
    }

    /// Accept a snapshot into the history.
    ///
    /// Returns `false` when it is a duplicate of the newest sample or older
    /// than it. Saving goes through the store synchronously; async callers
    /// should run this on the blocking pool.
    pub fn record_sample(&self, snapshot: &UsageSnapshot) -> bool {
        let mut state = self.state.lock();

        if let Some(last) = state.samples.last() {
            if snapshot.fetched_at < last.timestamp {
                debug!("Ignoring out-of-order usage snapshot from {}", snapshot.fetched_at);
                return false;
            }
            if is_duplicate(last, snapshot.fetched_at, snapshot.session_utilization) {
                return false;
            }
        }

        let detected = detect_active_model(
            state.samples.last(),
            &model_breakdown(snapshot),
            snapshot.session_utilization,
        );
        if detected.is_some() && detected != state.samples.last().and_then(|s| s.detected_model) {
            info!("Active model now attributed to {:?}", detected);
        }

        state.samples.push(Sample::from_snapshot(snapshot, detected));
        let samples = std::mem::take(&mut state.samples);
        state.samples = prune(samples, snapshot.fetched_at);

        let saved = if state.persist {
            self.store.save(&state.samples)
        } else {
            Ok(())
        };
        if let Err(e) = saved {
            if state.store_warned {
                debug!("Saving usage history failed: {}", e);
            } else {
                warn!("Saving usage history failed, continuing in memory: {}", e);
                state.store_warned = true;
            }
        }

        let report = VelocityReport::from_samples(&state.samples);
        drop(state);
        self.report_tx.send_replace(report);
        true
    }

    /// Current sample history
    pub fn samples(&self) -> Vec<Sample> {
        self.state.lock().samples.clone()
    }

    /// Latest derived metrics
    pub fn report(&self) -> VelocityReport {
        self.report_tx.borrow().clone()
    }

    /// Watch report changes
    pub fn subscribe(&self) -> watch::Receiver<VelocityReport> {
        self.report_tx.subscribe()
    }

    /// Feed every snapshot from `usage` into the tracker until the channel
    /// closes, starting with the one already in it.
    pub fn spawn(
        self: &Arc<Self>,
        mut usage: UsageSnapshotReceiver,
        events: Option<broadcast::Sender<CoreEvent>>,
    ) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let snapshot = usage.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    let recorder = Arc::clone(&tracker);
                    let recorded = tokio::task::spawn_blocking(move || recorder.record_sample(&snapshot))
                        .await
                        .unwrap_or_else(|e| {
                            warn!("Recording usage sample failed: {}", e);
                            false
                        });
                    if recorded {
                        if let Some(events) = &events {
                            let _ = events.send(CoreEvent::VelocityUpdated);
                        }
                    }
                }
                if usage.changed().await.is_err() {
                    break;
                }
            }
            debug!("Velocity tracker stopped: usage feed closed");
        })
    }
}
