//! Ping scheduling: the regular interval/window schedule, wake/startup
//! network retries and reset-triggered pings.

pub mod clock;
pub mod deadline;
pub mod reset;
pub mod retry;
mod scheduler;
pub mod state;
pub mod window;

pub use clock::{Clock, SystemClock};
pub use deadline::DeadlineQueue;
pub use reset::{ResetPingState, ResetVerdict};
pub use retry::{RetryContext, RetryDecision, RetryState};
pub use scheduler::{PowerObserver, Scheduler, SchedulerCommand, SchedulerDeps, SchedulerHandle};
pub use state::{RetryProgress, ScheduleState, SchedulerPhase, SchedulerStatus};
