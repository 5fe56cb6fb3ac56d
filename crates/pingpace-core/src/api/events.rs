//! Core event system for push-based change notification.
//!
//! The scheduler and the velocity tracker both publish onto the same
//! broadcast channel; hosts subscribe through [`PingPaceCore::subscribe`].

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use super::core::PingPaceCore;
use crate::ping::{PingStatus, PingTrigger};

/// Events emitted by the core when state changes occur.
///
/// Receivers that fall behind lose the oldest events (lagged).
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// The regular deadline moved (`None` once stopped)
    ScheduleChanged {
        next_fire_at: Option<DateTime<Utc>>,
    },

    /// A ping attempt finished and was recorded
    PingCompleted {
        trigger: PingTrigger,
        status: PingStatus,
        error: Option<String>,
    },

    /// A reset-triggered ping was armed for a new target
    ResetArmed {
        target: DateTime<Utc>,
    },

    /// A reset ping was dropped because a regular ping was imminent
    ResetSkipped {
        target: Option<DateTime<Utc>>,
    },

    /// A new velocity report was computed
    VelocityUpdated,
}

impl PingPaceCore {
    /// Subscribe to core events.
    ///
    /// Returns a broadcast receiver that will receive [`CoreEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_sender().subscribe()
    }
}
