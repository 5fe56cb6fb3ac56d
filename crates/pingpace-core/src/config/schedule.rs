//! The narrow configuration snapshot consumed by the scheduler.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Whether pings run around the clock or only inside a daily window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    /// Ping every interval, any time of day
    #[default]
    AllDay,
    /// Ping only while local time is inside `[window_start, window_end)`
    TimeWindow,
}

/// Scheduling settings (read-only from the core's perspective)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Regular scheduling on/off
    #[serde(default)]
    pub enabled: bool,

    /// All-day or time-window mode
    #[serde(default)]
    pub mode: ScheduleMode,

    /// Minutes between regular pings
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    /// Local time the daily window opens
    #[serde(default = "default_window_start", with = "hhmm")]
    pub window_start: NaiveTime,

    /// Local time the daily window closes (exclusive, may wrap midnight)
    #[serde(default = "default_window_end", with = "hhmm")]
    pub window_end: NaiveTime,

    /// Run the network-retry ping protocol after system wake
    #[serde(default)]
    pub ping_on_wake: bool,

    /// Run the network-retry ping protocol at startup
    #[serde(default)]
    pub ping_on_startup: bool,

    /// Prompt sent with every ping
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Model requested for every ping
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_interval_minutes() -> u32 {
    300
}

fn default_window_start() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default()
}

fn default_window_end() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default()
}

fn default_prompt() -> String {
    "hi".to_string()
}

fn default_model() -> String {
    "haiku".to_string()
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ScheduleMode::default(),
            interval_minutes: default_interval_minutes(),
            window_start: default_window_start(),
            window_end: default_window_end(),
            ping_on_wake: false,
            ping_on_startup: false,
            prompt: default_prompt(),
            model: default_model(),
        }
    }
}

impl ScheduleSettings {
    /// True when interval, mode or window bounds differ.
    ///
    /// These are the fields whose edits are debounced and discard progress
    /// toward the current deadline.
    pub fn timing_differs(&self, other: &ScheduleSettings) -> bool {
        self.mode != other.mode
            || self.interval_minutes != other.interval_minutes
            || self.window_start != other.window_start
            || self.window_end != other.window_end
    }

    /// Copy interval, mode and window bounds from `other`
    pub fn apply_timing(&mut self, other: &ScheduleSettings) {
        self.mode = other.mode;
        self.interval_minutes = other.interval_minutes;
        self.window_start = other.window_start;
        self.window_end = other.window_end;
    }

    /// Interval as a chrono duration (never shorter than one minute)
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.interval_minutes.max(1)))
    }
}

/// `HH:MM` serde format for window bounds (also accepts `HH:MM:SS`)
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(serde::de::Error::custom)
    }
}
