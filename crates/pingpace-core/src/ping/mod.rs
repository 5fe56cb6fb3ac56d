//! Ping attempts: the executor contract, outcome types and failure
//! classification used by the network-retry protocol.

pub mod classify;
pub mod executor;
pub mod types;

pub use classify::{classify_failure, is_network_error, FailureClass, NETWORK_ERROR_KEYWORDS};
pub use executor::PingExecutor;
pub use types::{PingAttemptOutcome, PingRequest, PingStatus, PingTrigger};
