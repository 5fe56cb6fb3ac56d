//! Usage data types produced by a usage source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-category long-window meter (e.g. "Current week (Opus)")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageBreakdown {
    /// Label as reported by the source
    pub label: String,
    /// Percentage used (0-100)
    pub utilization: f64,
    /// When this meter resets, if known
    #[serde(default)]
    pub reset_at: Option<DateTime<Utc>>,
}

/// Immutable usage reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Current session window percentage used (0-100)
    pub session_utilization: f64,
    /// When the current session window resets
    #[serde(default)]
    pub session_reset_at: Option<DateTime<Utc>>,
    /// Weekly (all models) percentage used
    #[serde(default)]
    pub weekly_utilization: Option<f64>,
    /// Per-category breakdowns, in source order
    #[serde(default)]
    pub breakdowns: Vec<UsageBreakdown>,
    /// When this snapshot was captured
    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl UsageSnapshot {
    /// Snapshot with only a session reading
    pub fn new(session_utilization: f64, fetched_at: DateTime<Utc>) -> Self {
        Self {
            session_utilization: clamp_percent(session_utilization),
            session_reset_at: None,
            weekly_utilization: None,
            breakdowns: Vec::new(),
            fetched_at,
        }
    }

    /// Set the predicted session reset instant
    pub fn with_reset_at(mut self, reset_at: DateTime<Utc>) -> Self {
        self.session_reset_at = Some(reset_at);
        self
    }

    /// Append a per-category breakdown
    pub fn with_breakdown(mut self, label: impl Into<String>, utilization: f64) -> Self {
        self.breakdowns.push(UsageBreakdown {
            label: label.into(),
            utilization: clamp_percent(utilization),
            reset_at: None,
        });
        self
    }

    /// Clamp every percentage into 0-100 (sources occasionally overshoot)
    pub fn normalized(mut self) -> Self {
        self.session_utilization = clamp_percent(self.session_utilization);
        self.weekly_utilization = self.weekly_utilization.map(clamp_percent);
        for breakdown in &mut self.breakdowns {
            breakdown.utilization = clamp_percent(breakdown.utilization);
        }
        self
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_snapshot() {
        let snapshot: UsageSnapshot =
            serde_json::from_str(r#"{"session_utilization": 42.5}"#).unwrap();
        assert_eq!(snapshot.session_utilization, 42.5);
        assert!(snapshot.session_reset_at.is_none());
        assert!(snapshot.breakdowns.is_empty());
    }

    #[test]
    fn test_normalized_clamps() {
        let mut snapshot = UsageSnapshot::new(50.0, Utc::now()).with_breakdown("Opus", 10.0);
        snapshot.session_utilization = 130.0;
        snapshot.weekly_utilization = Some(-4.0);
        snapshot.breakdowns[0].utilization = f64::NAN;

        let snapshot = snapshot.normalized();
        assert_eq!(snapshot.session_utilization, 100.0);
        assert_eq!(snapshot.weekly_utilization, Some(0.0));
        assert_eq!(snapshot.breakdowns[0].utilization, 0.0);
    }
}
