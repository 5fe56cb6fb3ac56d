//! Model families, their relative cost and active-model attribution.

use serde::{Deserialize, Serialize};

use super::sample::{ModelUtilization, Sample};

/// Smallest per-model breakdown increase that counts as activity
const MODEL_ACTIVITY_THRESHOLD: f64 = 0.05;

/// Session increase attributed to the fallback model when no meter moved
const FALLBACK_ACTIVITY_THRESHOLD: f64 = 0.5;

/// Model category with its own weekly meter (or the fallback without one)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Haiku,
    Sonnet,
    Opus,
}

impl ModelFamily {
    /// Cheapest first
    pub const ASCENDING_COST: [ModelFamily; 3] =
        [ModelFamily::Haiku, ModelFamily::Sonnet, ModelFamily::Opus];

    /// Category without a dedicated breakdown meter
    pub const FALLBACK: ModelFamily = ModelFamily::Haiku;

    /// Map a breakdown label like "Current week (Opus)" to a family
    pub fn from_label(label: &str) -> Option<Self> {
        let lowered = label.to_lowercase();
        if lowered.contains("opus") {
            Some(ModelFamily::Opus)
        } else if lowered.contains("sonnet") {
            Some(ModelFamily::Sonnet)
        } else if lowered.contains("haiku") {
            Some(ModelFamily::Haiku)
        } else {
            None
        }
    }

    /// Relative cost per unit of work (Sonnet = 1)
    pub fn cost_weight(self) -> f64 {
        match self {
            ModelFamily::Opus => 5.0,
            ModelFamily::Sonnet => 1.0,
            ModelFamily::Haiku => 1.0 / 3.0,
        }
    }

    /// Factor that converts a velocity observed on `self` into one on `target`
    pub fn cost_ratio(self, target: ModelFamily) -> f64 {
        target.cost_weight() / self.cost_weight()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Opus => "opus",
            ModelFamily::Sonnet => "sonnet",
            ModelFamily::Haiku => "haiku",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guess which model consumed usage since `previous`.
///
/// The breakdown that rose the most (above the activity threshold) wins. If
/// no breakdown moved but the session meter did, the fallback model is
/// credited. Otherwise the previous attribution sticks. This is a heuristic;
/// callers treat it as best-effort.
pub fn detect_active_model(
    previous: Option<&Sample>,
    breakdown: &[ModelUtilization],
    session_utilization: f64,
) -> Option<ModelFamily> {
    let previous = previous?;

    let mut best: Option<(ModelFamily, f64)> = None;
    for current in breakdown {
        let Some(before) = previous
            .per_model_breakdown
            .iter()
            .find(|m| m.model == current.model)
        else {
            continue;
        };
        let delta = current.utilization - before.utilization;
        if delta > MODEL_ACTIVITY_THRESHOLD && best.is_none_or(|(_, d)| delta > d) {
            best = Some((current.model, delta));
        }
    }

    if let Some((model, _)) = best {
        return Some(model);
    }
    if session_utilization - previous.session_utilization > FALLBACK_ACTIVITY_THRESHOLD {
        return Some(ModelFamily::FALLBACK);
    }
    previous.detected_model
}
