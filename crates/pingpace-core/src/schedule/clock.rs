use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Wall-clock source.
///
/// Deadlines themselves run on the monotonic tokio clock; the wall clock is
/// only consulted for window membership, reset targets and reported times.
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Convert an instant to local civil time for window checks
    fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&Local).naive_local()
    }
}

/// The host's real clock and time zone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
