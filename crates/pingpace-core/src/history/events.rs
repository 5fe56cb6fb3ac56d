use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ping::{PingAttemptOutcome, PingStatus, PingTrigger};

/// One line of the history log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum HistoryEvent {
    /// A ping attempt finished
    PingAttempt {
        ts: DateTime<Utc>,
        trigger: PingTrigger,
        status: PingStatus,
        duration_secs: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Free-text system event (retry scheduled, reset confirmed, ...)
    System { ts: DateTime<Utc>, message: String },
}

impl HistoryEvent {
    /// Build an attempt entry from an outcome
    pub fn from_outcome(trigger: PingTrigger, outcome: &PingAttemptOutcome) -> Self {
        HistoryEvent::PingAttempt {
            ts: outcome.timestamp,
            trigger,
            status: outcome.status,
            duration_secs: outcome.duration_secs,
            error: outcome.error_text.clone(),
        }
    }

    /// Timestamp of the entry
    pub fn ts(&self) -> DateTime<Utc> {
        match self {
            HistoryEvent::PingAttempt { ts, .. } | HistoryEvent::System { ts, .. } => *ts,
        }
    }
}
