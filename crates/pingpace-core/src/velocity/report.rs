//! Derived metrics over the sample history.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::compute::{
    active_velocity, hours_remaining, session_start_index, trailing_window, FULL_RESOLUTION_WINDOW,
};
use super::models::ModelFamily;
use super::sample::Sample;
use crate::config::constants::ADVISORY_THRESHOLD_HOURS;

/// Session velocity rescaled as if another model were in use
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelProjection {
    pub model: ModelFamily,
    /// Projected points per hour
    pub velocity: f64,
    pub hours_remaining: Option<f64>,
}

/// Suggestion to switch to a cheaper model before the session runs out
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelAdvisory {
    pub current: ModelFamily,
    pub suggested: ModelFamily,
    pub current_hours: f64,
    pub suggested_hours: Option<f64>,
}

/// Snapshot of everything the tracker derives
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VelocityReport {
    pub sample_count: usize,
    pub current_utilization: Option<f64>,
    pub session_started_at: Option<DateTime<Utc>>,
    /// Points per hour within the current session
    pub session_velocity: Option<f64>,
    /// Points per hour over the trailing seven days
    pub weekly_velocity: Option<f64>,
    /// Points per hour over the whole history
    pub all_time_velocity: Option<f64>,
    pub hours_remaining: Option<f64>,
    pub estimated_exhaustion_at: Option<DateTime<Utc>>,
    pub detected_model: Option<ModelFamily>,
    pub projections: Vec<ModelProjection>,
    pub advisory: Option<ModelAdvisory>,
}

impl VelocityReport {
    /// Fewer than two samples: nothing can be derived yet
    pub fn is_calculating(&self) -> bool {
        self.sample_count < 2
    }

    /// Compute every metric from an ascending sample series
    pub fn from_samples(samples: &[Sample]) -> Self {
        let Some(newest) = samples.last() else {
            return Self::default();
        };
        if samples.len() < 2 {
            return Self {
                sample_count: samples.len(),
                current_utilization: Some(newest.session_utilization),
                detected_model: newest.detected_model,
                ..Self::default()
            };
        }

        let session = &samples[session_start_index(samples)..];
        let session_velocity = active_velocity(session);
        let remaining = hours_remaining(newest.session_utilization, session_velocity);
        let estimated_exhaustion_at = remaining.and_then(|hours| exhaustion_at(newest.timestamp, hours));

        let projections = match (newest.detected_model, session_velocity) {
            (Some(current), Some(velocity)) => project(current, velocity, newest.session_utilization),
            _ => Vec::new(),
        };
        let advisory = newest
            .detected_model
            .and_then(|current| advise(current, &projections));

        Self {
            sample_count: samples.len(),
            current_utilization: Some(newest.session_utilization),
            session_started_at: session.first().map(|s| s.timestamp),
            session_velocity,
            weekly_velocity: active_velocity(trailing_window(samples, FULL_RESOLUTION_WINDOW)),
            all_time_velocity: active_velocity(samples),
            hours_remaining: remaining,
            estimated_exhaustion_at,
            detected_model: newest.detected_model,
            projections,
            advisory,
        }
    }
}

/// `from` plus `hours`; `None` past chrono's representable range
pub fn exhaustion_at(from: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    Duration::try_milliseconds((hours * 3_600_000.0) as i64).and_then(|d| from.checked_add_signed(d))
}

/// Rescale the observed velocity for every model family
pub fn project(current: ModelFamily, session_velocity: f64, utilization: f64) -> Vec<ModelProjection> {
    ModelFamily::ASCENDING_COST
        .iter()
        .map(|&model| {
            let velocity = session_velocity * current.cost_ratio(model);
            ModelProjection {
                model,
                velocity,
                hours_remaining: hours_remaining(utilization, Some(velocity)),
            }
        })
        .collect()
}

/// Cheapest model that buys more time when the current one is running low
pub fn advise(current: ModelFamily, projections: &[ModelProjection]) -> Option<ModelAdvisory> {
    let hours_for = |model: ModelFamily| {
        projections
            .iter()
            .find(|p| p.model == model)
            .and_then(|p| p.hours_remaining)
    };

    let current_hours = hours_for(current)?;
    if current_hours <= 0.0 || current_hours >= ADVISORY_THRESHOLD_HOURS {
        return None;
    }

    ModelFamily::ASCENDING_COST
        .iter()
        .take_while(|&&model| model != current)
        .find(|&&model| hours_for(model).is_some_and(|hours| hours > current_hours))
        .map(|&suggested| ModelAdvisory {
            current,
            suggested,
            current_hours,
            suggested_hours: hours_for(suggested),
        })
}
