//! Builder for constructing a [`PingPaceCore`] instance.
//!
//! ```ignore
//! let core = PingPaceCoreBuilder::new(settings)
//!     .with_executor(executor)
//!     .with_history(history)
//!     .with_usage_source(source)
//!     .with_sample_store(store)
//!     .build()?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::ScheduleSettings;
use crate::error::CoreError;
use crate::history::{HistorySink, NoopHistory};
use crate::ping::PingExecutor;
use crate::schedule::{Clock, Scheduler, SchedulerDeps, SystemClock};
use crate::usage::{UsageMonitor, UsageSource};
use crate::velocity::{MemorySampleStore, SampleStore, VelocityTracker};

use super::core::{PingPaceCore, EVENT_CHANNEL_CAPACITY};

/// Default usage poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Builder for constructing a [`PingPaceCore`] Facade instance
pub struct PingPaceCoreBuilder {
    settings: ScheduleSettings,
    executor: Option<Arc<dyn PingExecutor>>,
    history: Option<Arc<dyn HistorySink>>,
    usage_source: Option<Arc<dyn UsageSource>>,
    sample_store: Option<Arc<dyn SampleStore>>,
    clock: Option<Arc<dyn Clock>>,
    poll_interval: Duration,
}

impl PingPaceCoreBuilder {
    /// Create a new builder with the given schedule settings
    pub fn new(settings: ScheduleSettings) -> Self {
        Self {
            settings,
            executor: None,
            history: None,
            usage_source: None,
            sample_store: None,
            clock: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the ping executor (required)
    pub fn with_executor(mut self, executor: Arc<dyn PingExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Set the history sink (defaults to discarding)
    pub fn with_history(mut self, history: Arc<dyn HistorySink>) -> Self {
        self.history = Some(history);
        self
    }

    /// Set the usage source; without one there are no reset pings and no
    /// velocity samples
    pub fn with_usage_source(mut self, source: Arc<dyn UsageSource>) -> Self {
        self.usage_source = Some(source);
        self
    }

    /// Set the sample store (defaults to in-memory)
    pub fn with_sample_store(mut self, store: Arc<dyn SampleStore>) -> Self {
        self.sample_store = Some(store);
        self
    }

    /// Override the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Interval for [`PingPaceCore::start_polling`]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Build the `PingPaceCore` instance and spawn its tasks.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn build(self) -> Result<PingPaceCore, CoreError> {
        let executor = self.executor.ok_or(CoreError::MissingExecutor)?;
        if self.settings.interval_minutes == 0 {
            return Err(CoreError::InvalidSettings {
                message: "interval_minutes must be at least 1".to_string(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::InvalidSettings {
                message: "usage poll interval must be positive".to_string(),
            });
        }

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let usage = self
            .usage_source
            .map(|source| Arc::new(UsageMonitor::new(source)));

        let store = self
            .sample_store
            .unwrap_or_else(|| Arc::new(MemorySampleStore::default()));
        let tracker = Arc::new(VelocityTracker::load(store));
        let tracker_task = usage
            .as_ref()
            .map(|monitor| tracker.spawn(monitor.subscribe(), Some(event_tx.clone())));

        let history = self.history.unwrap_or_else(|| Arc::new(NoopHistory));
        let mut deps = SchedulerDeps::new(executor, history)
            .with_clock(self.clock.unwrap_or_else(|| Arc::new(SystemClock)))
            .with_events(event_tx.clone());
        if let Some(monitor) = &usage {
            deps = deps.with_usage(Arc::clone(monitor));
        }
        let (scheduler, scheduler_task) = Scheduler::spawn(self.settings, deps);

        Ok(PingPaceCore::new(
            scheduler,
            scheduler_task,
            tracker,
            tracker_task,
            usage,
            self.poll_interval,
            event_tx,
        ))
    }
}
