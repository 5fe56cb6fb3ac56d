//! Parse Claude Code `/usage` output into a [`UsageSnapshot`].

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{UsageBreakdown, UsageSnapshot};

static RESET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)resets\s+(?:(?P<month>[a-z]{3})[a-z]*\.?\s+(?P<day>\d{1,2}),?\s*)?(?:at\s+)?(?:(?P<hour>\d{1,2})(?::(?P<minute>\d{2}))?\s*(?P<meridiem>am|pm))?",
    )
    .expect("Invalid RESET_PATTERN regex")
});

/// One meter block before it is mapped onto snapshot fields
struct Meter {
    label: String,
    percent: u8,
    reset_info: Option<String>,
}

/// Parse `/usage` output captured as plain text.
///
/// Expected format (each meter block):
/// ```text
///   Current session
///   ████████████████████████████████████               72% used
///   Resets 1am (Asia/Tokyo)
///
///   Current week (all models)
///   ███████████▌                                       23% used
///   Resets Mar 3, 12am (Asia/Tokyo)
/// ```
///
/// "Current session" fills the session fields, "Current week (all models)"
/// the weekly one, and every other "Current week (...)" meter becomes a
/// breakdown. Reset strings are resolved in the host's local time zone.
/// Returns `None` when no session meter is present.
pub fn parse_usage_output(text: &str, now: DateTime<Local>) -> Option<UsageSnapshot> {
    let meters = parse_meters(text);
    let now_local = now.naive_local();

    let session = meters
        .iter()
        .find(|m| m.label.starts_with("Current session"))?;

    let mut snapshot = UsageSnapshot::new(f64::from(session.percent), now.with_timezone(&Utc));
    snapshot.session_reset_at = session
        .reset_info
        .as_deref()
        .and_then(|info| resolve_reset(info, now_local))
        .and_then(local_to_utc);

    for meter in &meters {
        if !meter.label.starts_with("Current week") {
            continue;
        }
        if meter.label.contains("all models") {
            snapshot.weekly_utilization = Some(f64::from(meter.percent));
            continue;
        }
        snapshot.breakdowns.push(UsageBreakdown {
            label: meter.label.clone(),
            utilization: f64::from(meter.percent),
            reset_at: meter
                .reset_info
                .as_deref()
                .and_then(|info| resolve_reset(info, now_local))
                .and_then(local_to_utc),
        });
    }

    Some(snapshot)
}

fn parse_meters(text: &str) -> Vec<Meter> {
    let lines: Vec<&str> = text.lines().collect();
    let mut meters = Vec::new();

    for (i, raw) in lines.iter().enumerate() {
        // The "N% used" line is the bar; the label sits on the line above
        let Some(percent) = extract_percent(raw.trim()) else {
            continue;
        };
        let label = if i > 0 { lines[i - 1].trim() } else { "" };
        if label.is_empty() || label.starts_with("Settings:") {
            continue;
        }

        let reset_info = lines[i + 1..]
            .iter()
            .map(|l| l.trim())
            .take_while(|l| !l.is_empty())
            .find_map(|l| {
                l.find("Resets ")
                    .map(|idx| l[idx..].trim().to_string())
            });

        meters.push(Meter {
            label: label.to_string(),
            percent,
            reset_info,
        });
    }

    meters
}

/// Extract percentage from a line containing "N% used"
fn extract_percent(line: &str) -> Option<u8> {
    let idx = line.find("% used")?;
    let before = &line[..idx];
    let digits: String = before
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse::<u8>().ok().map(|p| p.min(100))
}

/// Resolve "Resets 1am", "Resets 2:30pm" or "Resets Mar 3, 12am" to the next
/// matching local instant after `now`.
fn resolve_reset(info: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let caps = RESET_PATTERN.captures(info)?;

    let time = match caps.name("hour") {
        Some(hour) => {
            let hour: u32 = hour.as_str().parse().ok()?;
            let minute: u32 = caps
                .name("minute")
                .map(|m| m.as_str().parse())
                .transpose()
                .ok()?
                .unwrap_or(0);
            if !(1..=12).contains(&hour) {
                return None;
            }
            let pm = caps
                .name("meridiem")
                .is_some_and(|m| m.as_str().eq_ignore_ascii_case("pm"));
            let hour24 = match (hour, pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            };
            Some(NaiveTime::from_hms_opt(hour24, minute, 0)?)
        }
        None => None,
    };

    match (caps.name("month"), caps.name("day")) {
        (Some(month), Some(day)) => {
            let month = month_number(month.as_str())?;
            let day: u32 = day.as_str().parse().ok()?;
            let time = time.unwrap_or_default();
            let this_year = NaiveDate::from_ymd_opt(now.year(), month, day)?.and_time(time);
            if this_year > now {
                Some(this_year)
            } else {
                Some(NaiveDate::from_ymd_opt(now.year() + 1, month, day)?.and_time(time))
            }
        }
        _ => {
            let time = time?;
            let today = now.date().and_time(time);
            if today > now {
                Some(today)
            } else {
                Some(today + Duration::days(1))
            }
        }
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}
