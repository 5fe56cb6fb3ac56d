//! Persisted usage samples.
//!
//! The on-disk schema is additive: unknown fields are ignored, missing ones
//! default, and model names this build does not know are dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::models::ModelFamily;
use crate::usage::UsageSnapshot;

/// Weekly meter reading for one model family
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelUtilization {
    pub model: ModelFamily,
    pub utilization: f64,
}

/// One accepted usage reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub session_utilization: f64,
    #[serde(default)]
    pub session_reset_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_breakdown")]
    pub per_model_breakdown: Vec<ModelUtilization>,
    #[serde(default, deserialize_with = "lenient_model")]
    pub detected_model: Option<ModelFamily>,
}

impl Sample {
    /// Build a sample from a snapshot, keeping the first meter per family
    pub fn from_snapshot(snapshot: &UsageSnapshot, detected_model: Option<ModelFamily>) -> Self {
        Self {
            timestamp: snapshot.fetched_at,
            session_utilization: snapshot.session_utilization,
            session_reset_at: snapshot.session_reset_at,
            per_model_breakdown: model_breakdown(snapshot),
            detected_model,
        }
    }
}

/// Per-family meters carried by a snapshot, in source order
pub fn model_breakdown(snapshot: &UsageSnapshot) -> Vec<ModelUtilization> {
    let mut out: Vec<ModelUtilization> = Vec::new();
    for breakdown in &snapshot.breakdowns {
        let Some(model) = ModelFamily::from_label(&breakdown.label) else {
            continue;
        };
        if out.iter().any(|m| m.model == model) {
            continue;
        }
        out.push(ModelUtilization {
            model,
            utilization: breakdown.utilization,
        });
    }
    out
}

#[derive(Deserialize)]
struct RawModelUtilization {
    #[serde(default)]
    model: String,
    #[serde(default)]
    utilization: f64,
}

fn lenient_breakdown<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<ModelUtilization>, D::Error> {
    let raw: Option<Vec<RawModelUtilization>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| {
            ModelFamily::from_label(&entry.model).map(|model| ModelUtilization {
                model,
                utilization: entry.utilization,
            })
        })
        .collect())
}

fn lenient_model<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ModelFamily>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ModelFamily::from_label))
}
