//! pingpace-core — ping scheduling and usage velocity engine.
//!
//! The crate has two stateful components:
//!
//! - [`schedule::Scheduler`] owns the single "next ping" deadline, the
//!   wake/startup network-retry protocol and the reset-triggered ping.
//! - [`velocity::VelocityTracker`] turns usage snapshots into a pruned sample
//!   history and derives velocity, time remaining and a model advisory.
//!
//! Everything they talk to is injected through narrow traits:
//! [`ping::PingExecutor`], [`usage::UsageSource`], [`history::HistorySink`],
//! [`velocity::SampleStore`] and [`schedule::Clock`]. The [`api`] facade wires
//! them together for hosts.

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod ping;
pub mod schedule;
pub mod usage;
pub mod velocity;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::CoreError;
