//! Pure velocity math over an ascending sample series.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};

use super::sample::Sample;

/// Increases at or below this are measurement noise
const NOISE_THRESHOLD: f64 = 0.1;
/// Minimum summed active time for a velocity to be meaningful
const MIN_ACTIVE_SECS: f64 = 60.0;
/// A drop larger than this between neighbours starts a new session
const SESSION_DROP_THRESHOLD: f64 = 10.0;
/// A reset-time jump larger than this starts a new session
const SESSION_RESET_JUMP: Duration = Duration::hours(1);
/// Samples newer than this (relative to the newest) are kept verbatim
pub const FULL_RESOLUTION_WINDOW: Duration = Duration::days(7);
/// Readings this close in time with a smaller change are duplicates
const DEDUP_WINDOW: Duration = Duration::seconds(30);
const DEDUP_EPSILON: f64 = 0.01;

/// Percentage points per hour, counting only intervals where usage rose.
///
/// Flat or falling intervals add to neither the numerator nor the
/// denominator. Returns `None` for insufficient data rather than zero.
pub fn active_velocity(samples: &[Sample]) -> Option<f64> {
    let mut total_delta = 0.0;
    let mut active_secs = 0.0;

    for pair in samples.windows(2) {
        let delta = pair[1].session_utilization - pair[0].session_utilization;
        if delta > NOISE_THRESHOLD {
            total_delta += delta;
            active_secs += (pair[1].timestamp - pair[0].timestamp).num_milliseconds() as f64 / 1000.0;
        }
    }

    if active_secs > MIN_ACTIVE_SECS && total_delta > 0.0 {
        Some(total_delta / (active_secs / 3600.0))
    } else {
        None
    }
}

/// Index of the first sample of the current session.
///
/// Scans newest to oldest for the nearest boundary: a utilization drop of
/// more than 10 points, or the reported reset time jumping forward by more
/// than an hour. Without a boundary the whole history is one session.
pub fn session_start_index(samples: &[Sample]) -> usize {
    for i in (1..samples.len()).rev() {
        let before = &samples[i - 1];
        let after = &samples[i];

        if before.session_utilization - after.session_utilization > SESSION_DROP_THRESHOLD {
            return i;
        }
        if let (Some(old_reset), Some(new_reset)) = (before.session_reset_at, after.session_reset_at) {
            if new_reset - old_reset > SESSION_RESET_JUMP {
                return i;
            }
        }
    }
    0
}

/// Hours until 100% at `velocity`; `None` when not consuming or already full
pub fn hours_remaining(utilization: f64, velocity: Option<f64>) -> Option<f64> {
    match velocity {
        Some(v) if v > 0.0 && utilization < 100.0 => Some((100.0 - utilization) / v),
        _ => None,
    }
}

/// Samples inside the trailing window ending at the newest sample
pub fn trailing_window(samples: &[Sample], window: Duration) -> &[Sample] {
    let Some(newest) = samples.last() else {
        return samples;
    };
    let cutoff = newest.timestamp - window;
    let start = samples.partition_point(|s| s.timestamp < cutoff);
    &samples[start..]
}

/// Downsample old history.
///
/// Everything within seven days of `reference` is kept; older samples keep
/// only the earliest reading per UTC (date, hour) bucket.
pub fn prune(samples: Vec<Sample>, reference: DateTime<Utc>) -> Vec<Sample> {
    let cutoff = reference - FULL_RESOLUTION_WINDOW;
    let mut seen: HashSet<(NaiveDate, u32)> = HashSet::new();

    samples
        .into_iter()
        .filter(|sample| {
            if sample.timestamp >= cutoff {
                return true;
            }
            seen.insert((sample.timestamp.date_naive(), sample.timestamp.hour()))
        })
        .collect()
}

/// Whether a reading adds nothing over the last stored sample
pub fn is_duplicate(last: &Sample, timestamp: DateTime<Utc>, utilization: f64) -> bool {
    (timestamp - last.timestamp).abs() <= DEDUP_WINDOW
        && (utilization - last.session_utilization).abs() < DEDUP_EPSILON
}
