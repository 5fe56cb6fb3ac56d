use async_trait::async_trait;

use super::types::{PingAttemptOutcome, PingRequest};

/// Performs one ping attempt.
///
/// Implementations never return `Err`: every failure, including internal
/// ones such as a missing binary, is reported as an error outcome so that it
/// reaches the history sink like any other attempt.
#[async_trait]
pub trait PingExecutor: Send + Sync {
    /// Execute one attempt and describe how it went
    async fn execute(&self, request: &PingRequest) -> PingAttemptOutcome;
}
