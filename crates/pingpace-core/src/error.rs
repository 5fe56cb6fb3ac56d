use thiserror::Error;

/// Errors surfaced by the scheduler handle and the facade builder
#[derive(Debug, Error)]
pub enum CoreError {
    /// The scheduler task has exited and no longer accepts commands
    #[error("scheduler is not running")]
    SchedulerClosed,

    /// The builder was not given a ping executor
    #[error("no ping executor configured")]
    MissingExecutor,

    /// Settings failed validation
    #[error("invalid settings: {message}")]
    InvalidSettings { message: String },
}
