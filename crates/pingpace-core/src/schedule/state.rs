//! Observable scheduler state, published on a `watch` channel.

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

use super::retry::RetryContext;
use crate::config::ScheduleMode;

/// Lifecycle phase of the regular schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPhase {
    #[default]
    Stopped,
    /// Waiting for `next_fire_at`
    Scheduled,
    /// A regular ping is in flight
    Firing,
}

/// Regular schedule state. `next_fire_at` is `None` iff not running.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ScheduleState {
    pub enabled: bool,
    pub mode: ScheduleMode,
    pub interval_minutes: u32,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub next_fire_at: Option<DateTime<Utc>>,
    pub running: bool,
    pub phase: SchedulerPhase,
}

/// Progress of an active wake/startup retry run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryProgress {
    pub context: RetryContext,
    pub attempt: u32,
    pub max_attempts: u32,
}

/// Everything the scheduler exposes to observers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SchedulerStatus {
    pub schedule: ScheduleState,
    /// Between `on_suspend` and `on_resume`
    pub suspended: bool,
    /// Most recently armed reset target
    pub reset_target: Option<DateTime<Utc>>,
    /// A reset ping deadline is pending
    pub reset_armed: bool,
    pub reset_retry_count: u32,
    pub retry: Option<RetryProgress>,
}
