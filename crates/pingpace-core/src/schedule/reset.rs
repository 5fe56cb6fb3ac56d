//! Reset-triggered ping bookkeeping.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::constants::{
    RESET_ACTIVATION_THRESHOLD, RESET_CONFIRM_DROP_RATIO, RESET_MAX_RETRIES, RESET_RETRY_DELAY,
    RESET_TARGET_TOLERANCE_SECS,
};
use crate::usage::UsageSnapshot;

/// Outcome of re-reading utilization after a reset ping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetVerdict {
    /// Utilization dropped; the new window has started
    Confirmed,
    /// Not yet; ping again after the delay
    RetryAfter(Duration),
    /// Gave up after the maximum number of retries
    Exhausted,
}

/// State of the reset-triggered ping protocol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResetPingState {
    /// Most recently armed reset target
    pub scheduled_reset_at: Option<DateTime<Utc>>,
    /// Session utilization when the target was armed
    pub pre_reset_utilization: f64,
    /// Re-armed pings for the current target
    pub retry_count: u32,
}

impl ResetPingState {
    /// Evaluate a snapshot; returns the instant to arm a reset ping at, if any.
    ///
    /// A target within a minute of the armed one is the same target and is
    /// not re-armed. Low utilization never arms (nothing worth resetting).
    pub fn consider(&mut self, snapshot: &UsageSnapshot) -> Option<DateTime<Utc>> {
        let reset_at = snapshot.session_reset_at?;

        if let Some(armed) = self.scheduled_reset_at {
            if (reset_at - armed).num_seconds().abs() <= RESET_TARGET_TOLERANCE_SECS {
                return None;
            }
        }
        if snapshot.session_utilization <= RESET_ACTIVATION_THRESHOLD {
            return None;
        }

        self.scheduled_reset_at = Some(reset_at);
        self.pre_reset_utilization = snapshot.session_utilization;
        self.retry_count = 0;
        Some(reset_at)
    }

    /// Judge the post-ping utilization
    pub fn verdict(&mut self, current_utilization: f64) -> ResetVerdict {
        let confirm_level = self.pre_reset_utilization * (1.0 - RESET_CONFIRM_DROP_RATIO);
        if current_utilization <= confirm_level || current_utilization < RESET_ACTIVATION_THRESHOLD {
            return ResetVerdict::Confirmed;
        }
        if self.retry_count < RESET_MAX_RETRIES {
            self.retry_count += 1;
            ResetVerdict::RetryAfter(RESET_RETRY_DELAY)
        } else {
            ResetVerdict::Exhausted
        }
    }
}
