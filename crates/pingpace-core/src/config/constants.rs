//! Fixed tuning constants shared by the scheduler protocols.

use std::time::Duration;

/// Session utilization (percent) above which a predicted reset arms a ping
pub const RESET_ACTIVATION_THRESHOLD: f64 = 20.0;

/// A new reset target closer than this to the armed one is the same target
pub const RESET_TARGET_TOLERANCE_SECS: i64 = 60;

/// Reset pings are skipped when a regular ping is due within this window
pub const RESET_COALESCE_WINDOW: Duration = Duration::from_secs(120);

/// Maximum number of re-armed reset pings after the first attempt
pub const RESET_MAX_RETRIES: u32 = 3;

/// Delay before re-arming an unconfirmed reset ping
pub const RESET_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Wait between a reset ping and re-reading utilization
pub const RESET_SETTLE_DELAY: Duration = Duration::from_secs(15);

/// Relative utilization drop that confirms a reset happened
pub const RESET_CONFIRM_DROP_RATIO: f64 = 0.5;

/// Delay after wake or startup before the first ping attempt
pub const WAKE_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Backoff between network-retry attempts (wake/startup only)
pub const NETWORK_RETRY_DELAYS: [Duration; 4] = [
    Duration::from_secs(15),
    Duration::from_secs(30),
    Duration::from_secs(60),
    Duration::from_secs(120),
];

/// Coalescing window for interval/mode/window edits
pub const SETTINGS_DEBOUNCE: Duration = Duration::from_millis(500);

/// Remaining hours below which a cheaper model is suggested
pub const ADVISORY_THRESHOLD_HOURS: f64 = 2.0;
