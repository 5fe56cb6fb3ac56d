use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::usage::UsageSnapshot;

/// Result status of a single ping attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PingStatus {
    Success,
    Error,
}

/// What caused a ping to be dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PingTrigger {
    /// Regular interval deadline
    Scheduled,
    /// Startup network-retry protocol
    Startup,
    /// Post-wake network-retry protocol
    Wake,
    /// Predicted session reset
    Reset,
}

impl PingTrigger {
    /// Short lowercase name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            PingTrigger::Scheduled => "scheduled",
            PingTrigger::Startup => "startup",
            PingTrigger::Wake => "wake",
            PingTrigger::Reset => "reset",
        }
    }
}

impl std::fmt::Display for PingTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt and model for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingRequest {
    pub prompt: String,
    pub model: String,
}

/// Outcome of one ping attempt, produced by a [`PingExecutor`](super::PingExecutor)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingAttemptOutcome {
    pub status: PingStatus,
    /// When the attempt started
    pub timestamp: DateTime<Utc>,
    /// Wall time the attempt took
    pub duration_secs: f64,
    /// Free-text failure description (matched for retry classification)
    #[serde(default)]
    pub error_text: Option<String>,
    /// Usage reported alongside the ping, if the executor saw any
    #[serde(default)]
    pub usage_from_ping: Option<UsageSnapshot>,
}

impl PingAttemptOutcome {
    /// Successful attempt
    pub fn success(timestamp: DateTime<Utc>, duration_secs: f64) -> Self {
        Self {
            status: PingStatus::Success,
            timestamp,
            duration_secs,
            error_text: None,
            usage_from_ping: None,
        }
    }

    /// Failed attempt with an error description
    pub fn failure(timestamp: DateTime<Utc>, duration_secs: f64, error: impl Into<String>) -> Self {
        Self {
            status: PingStatus::Error,
            timestamp,
            duration_secs,
            error_text: Some(error.into()),
            usage_from_ping: None,
        }
    }

    /// Attach usage observed during the attempt
    pub fn with_usage(mut self, usage: UsageSnapshot) -> Self {
        self.usage_from_ping = Some(usage);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == PingStatus::Success
    }
}
