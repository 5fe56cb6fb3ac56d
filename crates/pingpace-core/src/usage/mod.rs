//! Usage monitoring — snapshot types, the `/usage` text parser and the
//! polling monitor that fans snapshots out over a `watch` channel.
//!
//! Both the scheduler (reset detection) and the velocity tracker subscribe
//! to the same [`UsageMonitor`] independently; neither relies on being
//! notified before the other.

pub mod monitor;
pub mod parser;
pub mod types;

pub use monitor::{usage_channel, UsageMonitor, UsageSnapshotReceiver, UsageSnapshotSender, UsageSource};
pub use parser::parse_usage_output;
pub use types::{UsageBreakdown, UsageSnapshot};
