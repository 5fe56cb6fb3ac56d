//! PingPaceCore — the Facade entry-point for hosts.
//!
//! This struct owns every spawned service and exposes high-level methods.
//! Hosts never wire the scheduler, monitor and tracker themselves.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::schedule::{SchedulerHandle, SchedulerStatus};
use crate::usage::UsageMonitor;
use crate::velocity::{VelocityReport, VelocityTracker};

use super::events::CoreEvent;

/// Default broadcast channel capacity
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The Facade that wraps all pingpace-core services.
///
/// Constructed via [`PingPaceCoreBuilder`](super::builder::PingPaceCoreBuilder).
pub struct PingPaceCore {
    scheduler: SchedulerHandle,
    scheduler_task: JoinHandle<()>,
    tracker: Arc<VelocityTracker>,
    tracker_task: Option<JoinHandle<()>>,
    usage: Option<Arc<UsageMonitor>>,
    poll_interval: Duration,
    polling: Mutex<Option<JoinHandle<()>>>,
    event_tx: broadcast::Sender<CoreEvent>,
}

impl PingPaceCore {
    /// Create a new PingPaceCore instance (prefer `PingPaceCoreBuilder`)
    pub(crate) fn new(
        scheduler: SchedulerHandle,
        scheduler_task: JoinHandle<()>,
        tracker: Arc<VelocityTracker>,
        tracker_task: Option<JoinHandle<()>>,
        usage: Option<Arc<UsageMonitor>>,
        poll_interval: Duration,
        event_tx: broadcast::Sender<CoreEvent>,
    ) -> Self {
        Self {
            scheduler,
            scheduler_task,
            tracker,
            tracker_task,
            usage,
            poll_interval,
            polling: Mutex::new(None),
            event_tx,
        }
    }

    /// Handle for scheduler commands; also the host's [`PowerObserver`](crate::schedule::PowerObserver)
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    /// Latest scheduler status
    pub fn schedule_status(&self) -> SchedulerStatus {
        self.scheduler.status()
    }

    /// Latest velocity metrics
    pub fn velocity_report(&self) -> VelocityReport {
        self.tracker.report()
    }

    pub fn velocity_tracker(&self) -> &Arc<VelocityTracker> {
        &self.tracker
    }

    /// The usage monitor, if a source was configured
    pub fn usage_monitor(&self) -> Option<&Arc<UsageMonitor>> {
        self.usage.as_ref()
    }

    /// Start polling the usage source. Returns `false` when there is no
    /// source or polling already runs.
    pub fn start_polling(&self) -> bool {
        let Some(monitor) = &self.usage else {
            return false;
        };
        let mut polling = self.polling.lock();
        if polling.is_some() {
            return false;
        }
        debug!("Polling usage every {}s", self.poll_interval.as_secs());
        *polling = Some(monitor.spawn_polling(self.poll_interval));
        true
    }

    /// Stop polling, shut the scheduler down and wait for it to exit
    pub async fn shutdown(self) {
        if let Some(polling) = self.polling.lock().take() {
            polling.abort();
        }
        if self.scheduler.shutdown().is_ok() {
            let _ = self.scheduler_task.await;
        }
        if let Some(task) = self.tracker_task {
            task.abort();
        }
    }

    /// Get a clone of the broadcast event sender
    pub(crate) fn event_sender(&self) -> broadcast::Sender<CoreEvent> {
        self.event_tx.clone()
    }
}
