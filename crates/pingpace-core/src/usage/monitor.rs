//! Usage monitor that polls a [`UsageSource`] and publishes snapshots.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::types::UsageSnapshot;

/// Sender for usage snapshot updates
pub type UsageSnapshotSender = watch::Sender<Option<UsageSnapshot>>;
/// Receiver for usage snapshot updates
pub type UsageSnapshotReceiver = watch::Receiver<Option<UsageSnapshot>>;

/// Initial backoff added to the poll interval after a failed fetch
const ERROR_BACKOFF_START: Duration = Duration::from_secs(5);
/// Upper bound for the poll backoff
const ERROR_BACKOFF_MAX: Duration = Duration::from_secs(300);
/// Identical fetch errors are logged at most this often
const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(60);

/// Create a watch channel for usage data
pub fn usage_channel() -> (UsageSnapshotSender, UsageSnapshotReceiver) {
    watch::channel(None)
}

/// Anything that can produce a fresh usage snapshot
#[async_trait]
pub trait UsageSource: Send + Sync {
    /// Fetch the current usage
    async fn fetch(&self) -> Result<UsageSnapshot>;
}

/// Owns the usage source and the snapshot channel.
///
/// Subscribers get the latest snapshot through [`UsageMonitor::subscribe`].
/// Snapshots arrive from the poll loop, from explicit [`UsageMonitor::refresh`]
/// calls, or from [`UsageMonitor::publish`] (e.g. usage returned by a ping).
pub struct UsageMonitor {
    source: Arc<dyn UsageSource>,
    tx: UsageSnapshotSender,
}

impl UsageMonitor {
    /// Create a monitor around a source
    pub fn new(source: Arc<dyn UsageSource>) -> Self {
        let (tx, _) = usage_channel();
        Self { source, tx }
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> UsageSnapshotReceiver {
        self.tx.subscribe()
    }

    /// Latest published snapshot, if any
    pub fn latest(&self) -> Option<UsageSnapshot> {
        self.tx.borrow().clone()
    }

    /// Publish a snapshot obtained elsewhere
    pub fn publish(&self, snapshot: UsageSnapshot) {
        self.tx.send_replace(Some(snapshot.normalized()));
    }

    /// Fetch from the source and publish the result
    pub async fn refresh(&self) -> Result<UsageSnapshot> {
        let snapshot = self.source.fetch().await?.normalized();
        self.tx.send_replace(Some(snapshot.clone()));
        Ok(snapshot)
    }

    /// Start the poll loop in a background task.
    ///
    /// Fetches immediately, then every `interval`. Failed fetches add a
    /// doubling backoff on top of the interval until the next success.
    pub fn spawn_polling(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            monitor.run_polling(interval).await;
        })
    }

    async fn run_polling(&self, interval: Duration) {
        let mut backoff = Duration::ZERO;
        let mut last_error: Option<String> = None;
        let mut last_error_at: Option<Instant> = None;
        let mut first = true;

        loop {
            if !first {
                tokio::time::sleep(interval.saturating_add(backoff)).await;
            }
            first = false;

            match self.refresh().await {
                Ok(snapshot) => {
                    debug!(
                        "Usage poll: session {:.1}%, reset {:?}",
                        snapshot.session_utilization, snapshot.session_reset_at
                    );
                    backoff = Duration::ZERO;
                    last_error = None;
                    last_error_at = None;
                }
                Err(e) => {
                    let err_str = format!("{e:#}");
                    let should_log = match &last_error {
                        Some(prev) if prev == &err_str => last_error_at
                            .map(|t| t.elapsed() >= ERROR_LOG_INTERVAL)
                            .unwrap_or(true),
                        _ => true,
                    };
                    if should_log {
                        warn!("Usage poll failed: {}", err_str);
                        last_error_at = Some(Instant::now());
                    }
                    last_error = Some(err_str);
                    backoff = if backoff.is_zero() {
                        ERROR_BACKOFF_START
                    } else {
                        (backoff * 2).min(ERROR_BACKOFF_MAX)
                    };
                }
            }
        }
    }
}
