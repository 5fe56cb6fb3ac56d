//! Ping history: the sink contract plus an ndjson file implementation.

pub mod events;
pub mod logger;
pub mod reader;

pub use events::HistoryEvent;
pub use logger::HistoryLog;
pub use reader::read_recent_events;

use crate::ping::{PingAttemptOutcome, PingTrigger};

/// Append-only record of ping attempts and free-text system events.
///
/// Calls are fire-and-forget: implementations swallow their own I/O errors.
pub trait HistorySink: Send + Sync {
    /// Record one attempt outcome, verbatim
    fn record(&self, trigger: PingTrigger, outcome: &PingAttemptOutcome);

    /// Record a free-text system event
    fn record_event(&self, message: &str);
}

/// Sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHistory;

impl HistorySink for NoopHistory {
    fn record(&self, _trigger: PingTrigger, _outcome: &PingAttemptOutcome) {}

    fn record_event(&self, _message: &str) {}
}
