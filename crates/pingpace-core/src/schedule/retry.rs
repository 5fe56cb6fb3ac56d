//! Network-retry protocol state for wake and startup pings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::constants::NETWORK_RETRY_DELAYS;
use crate::ping::{classify_failure, FailureClass, PingAttemptOutcome, PingTrigger};

/// Which protocol run owns the retry sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryContext {
    Wake,
    Startup,
}

impl RetryContext {
    pub fn trigger(self) -> PingTrigger {
        match self {
            RetryContext::Wake => PingTrigger::Wake,
            RetryContext::Startup => PingTrigger::Startup,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RetryContext::Wake => "Wake",
            RetryContext::Startup => "Startup",
        }
    }
}

/// What to do after an attempt in the protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// The ping went through
    Succeeded,
    /// Connectivity failure; try again after the delay
    RetryAfter(Duration),
    /// Non-network failure; retrying will not help
    Aborted,
    /// Ran out of attempts
    Exhausted,
}

/// Transient state of one wake/startup protocol run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    pub context: RetryContext,
    /// Attempts made so far
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay_schedule: Vec<Duration>,
}

impl RetryState {
    /// Fresh run using the fixed backoff schedule
    pub fn new(context: RetryContext) -> Self {
        Self::with_schedule(context, NETWORK_RETRY_DELAYS.to_vec())
    }

    /// Fresh run with a custom schedule; one attempt per delay plus the first
    pub fn with_schedule(context: RetryContext, delay_schedule: Vec<Duration>) -> Self {
        Self {
            context,
            attempt: 0,
            max_attempts: delay_schedule.len() as u32 + 1,
            delay_schedule,
        }
    }

    /// Account for a finished attempt and decide the next step
    pub fn after_attempt(&mut self, outcome: &PingAttemptOutcome) -> RetryDecision {
        self.attempt += 1;

        match classify_failure(outcome) {
            None => RetryDecision::Succeeded,
            Some(FailureClass::Other) => RetryDecision::Aborted,
            Some(FailureClass::Network) => {
                if self.attempt >= self.max_attempts {
                    return RetryDecision::Exhausted;
                }
                match self.delay_schedule.get(self.attempt as usize - 1) {
                    Some(delay) => RetryDecision::RetryAfter(*delay),
                    None => RetryDecision::Exhausted,
                }
            }
        }
    }
}
