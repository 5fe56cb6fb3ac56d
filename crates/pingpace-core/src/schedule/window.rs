//! Daily time-window arithmetic on local civil time.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::config::{ScheduleMode, ScheduleSettings};

/// Whether `time` falls inside `[start, end)`.
///
/// When `start > end` the window wraps midnight. An empty window
/// (`start == end`) is treated as always open.
pub fn window_contains(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start == end {
        true
    } else if start < end {
        time >= start && time < end
    } else {
        time >= start || time < end
    }
}

/// The next instant at or after `now` whose time of day is `start`
pub fn next_window_start(now: NaiveDateTime, start: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(start);
    if today >= now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Next regular fire time evaluated at `anchor`.
///
/// `anchor + interval`, unless the schedule is windowed and `anchor` lies
/// outside the window, in which case the next window opening.
pub fn next_fire_at(anchor: NaiveDateTime, settings: &ScheduleSettings) -> NaiveDateTime {
    if settings.mode == ScheduleMode::TimeWindow
        && !window_contains(anchor.time(), settings.window_start, settings.window_end)
    {
        return next_window_start(anchor, settings.window_start);
    }
    anchor + settings.interval()
}

/// Whether a fire at `at` should actually ping
pub fn should_fire(at: NaiveDateTime, settings: &ScheduleSettings) -> bool {
    settings.mode == ScheduleMode::AllDay
        || window_contains(at.time(), settings.window_start, settings.window_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn on(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_time(hm(h, m))
    }

    fn windowed(start: NaiveTime, end: NaiveTime, interval_minutes: u32) -> ScheduleSettings {
        ScheduleSettings {
            enabled: true,
            mode: ScheduleMode::TimeWindow,
            interval_minutes,
            window_start: start,
            window_end: end,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_window_membership() {
        let (start, end) = (hm(6, 0), hm(10, 0));
        assert!(window_contains(hm(6, 0), start, end));
        assert!(window_contains(hm(9, 59), start, end));
        assert!(!window_contains(hm(10, 0), start, end));
        assert!(!window_contains(hm(5, 59), start, end));
    }

    #[test]
    fn test_window_wrapping_midnight() {
        let (start, end) = (hm(22, 0), hm(2, 0));
        assert!(window_contains(hm(23, 30), start, end));
        assert!(window_contains(hm(1, 0), start, end));
        assert!(!window_contains(hm(12, 0), start, end));
        assert!(!window_contains(hm(2, 0), start, end));
    }

    #[test]
    fn test_empty_window_is_always_open() {
        assert!(window_contains(hm(3, 0), hm(8, 0), hm(8, 0)));
    }

    #[test]
    fn test_outside_window_waits_for_tomorrow() {
        let settings = windowed(hm(6, 0), hm(10, 0), 60);
        assert_eq!(next_fire_at(on(1, 11, 0), &settings), on(2, 6, 0));
    }

    #[test]
    fn test_before_window_waits_for_today() {
        let settings = windowed(hm(6, 0), hm(10, 0), 60);
        assert_eq!(next_fire_at(on(1, 5, 0), &settings), on(1, 6, 0));
    }

    #[test]
    fn test_inside_window_uses_interval() {
        let settings = windowed(hm(6, 0), hm(10, 0), 45);
        assert_eq!(next_fire_at(on(1, 7, 0), &settings), on(1, 7, 45));
        // The fire may land outside; it is skipped at fire time
        assert_eq!(next_fire_at(on(1, 9, 30), &settings), on(1, 10, 15));
        assert!(!should_fire(on(1, 10, 15), &settings));
    }

    #[test]
    fn test_wrapping_window_next_start() {
        let settings = windowed(hm(22, 0), hm(2, 0), 30);
        assert_eq!(next_fire_at(on(1, 12, 0), &settings), on(1, 22, 0));
        assert_eq!(next_fire_at(on(1, 23, 30), &settings), on(2, 0, 0));
        assert_eq!(next_fire_at(on(2, 3, 0), &settings), on(2, 22, 0));
    }

    #[test]
    fn test_all_day_ignores_window() {
        let settings = ScheduleSettings {
            interval_minutes: 90,
            window_start: hm(6, 0),
            window_end: hm(10, 0),
            ..Default::default()
        };
        assert_eq!(next_fire_at(on(1, 11, 0), &settings), on(1, 12, 30));
        assert!(should_fire(on(1, 23, 0), &settings));
    }

    #[test]
    fn test_next_fire_is_pure() {
        let settings = windowed(hm(6, 0), hm(10, 0), 60);
        let anchor = on(1, 8, 17);
        assert_eq!(
            next_fire_at(anchor, &settings),
            next_fire_at(anchor, &settings)
        );
    }
}
