/*
Clock helpers for day-number and time-of-day checks.
Pure functions over an explicit `now` so the logic is testable;
callers capture the device-local clock with `now_fixed_offset`.
*/

use chrono::{DateTime, FixedOffset, TimeZone};

use crate::models::Task;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

// Local -> FixedOffset using the current system offset
pub fn now_fixed_offset() -> DateTime<FixedOffset> {
    let local = chrono::Local::now();
    let offset_seconds = local.offset().local_minus_utc();
    let fixed = FixedOffset::east_opt(offset_seconds).unwrap();
    local.with_timezone(&fixed)
}

// Elapsed day count since a batch's start date.
//
// Rules:
// - ceil(|now - start| / 1 day), never below 1
// - a future-dated start is day 1 regardless of how far out it is
// - no upper clamp: a batch past day 14 keeps counting
pub fn current_day_number_at(start: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> u32 {
    if now < start {
        return 1;
    }
    let diff_ms = (now - start).num_milliseconds().abs();
    let days = (diff_ms + DAY_MS - 1) / DAY_MS; // ceil
    days.max(1) as u32
}

// Parse "H:MM AM/PM" into 24-hour (hour, minute).
// 12-hour conversion: PM adds 12 unless the hour is already 12; 12 AM is hour 0.
fn parse_clock_time(time_str: &str) -> Option<(u32, u32)> {
    let mut parts = time_str.split_whitespace();
    let clock = parts.next()?;
    let meridiem = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let (h, m) = clock.split_once(':')?;
    let mut hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;

    match meridiem {
        "PM" if hours < 12 => hours += 12,
        "AM" if hours == 12 => hours = 0,
        "AM" | "PM" => {}
        _ => return None,
    }
    Some((hours, minutes))
}

/// Whether `now` is strictly past the given "H:MM AM/PM" wall-clock time
/// on `now`'s own date. Unparseable input counts as not yet passed.
pub fn is_time_passed_at(time_str: &str, now: DateTime<FixedOffset>) -> bool {
    let Some((hours, minutes)) = parse_clock_time(time_str) else {
        return false;
    };
    let Some(naive) = now.date_naive().and_hms_opt(hours, minutes, 0) else {
        return false;
    };
    match now.offset().from_local_datetime(&naive).single() {
        Some(scheduled) => now > scheduled,
        None => false,
    }
}

/// Convenience for the schedule sweeps.
pub fn task_time_passed_at(task: &Task, now: DateTime<FixedOffset>) -> bool {
    is_time_passed_at(&task.time, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 10, h, m, 0)
            .unwrap()
    }

    #[test]
    fn day_number_is_one_at_or_after_start() {
        let now = at(13, 0);
        assert_eq!(current_day_number_at(now, now), 1);
        assert_eq!(current_day_number_at(now - Duration::seconds(1), now), 1);
        // future-dated batch, no matter how far out
        assert_eq!(current_day_number_at(now + Duration::days(30), now), 1);
    }

    #[test]
    fn day_number_rolls_over_at_each_24h_boundary() {
        let now = at(13, 0);
        assert_eq!(current_day_number_at(now - Duration::hours(24), now), 1);
        assert_eq!(
            current_day_number_at(now - Duration::hours(24) - Duration::seconds(1), now),
            2
        );
        assert_eq!(current_day_number_at(now - Duration::hours(25), now), 2);
        // no upper clamp
        assert_eq!(current_day_number_at(now - Duration::days(20), now), 20);
    }

    #[test]
    fn day_number_is_monotonic_in_elapsed_time() {
        let start = at(9, 0);
        let mut last = 0;
        for hours in 0..100 {
            let day = current_day_number_at(start, start + Duration::hours(hours));
            assert!(day >= last);
            last = day;
        }
    }

    #[test]
    fn midnight_is_twelve_am() {
        assert!(is_time_passed_at("12:00 AM", at(0, 1)));
        assert!(is_time_passed_at("12:00 AM", at(23, 59)));
        // strictly after, so exactly midnight is not passed
        assert!(!is_time_passed_at("12:00 AM", at(0, 0)));
    }

    #[test]
    fn noon_is_twelve_pm() {
        assert!(!is_time_passed_at("12:00 PM", at(11, 59)));
        assert!(!is_time_passed_at("12:00 PM", at(12, 0)));
        assert!(is_time_passed_at("12:00 PM", at(12, 1)));
    }

    #[test]
    fn pm_hours_shift_by_twelve() {
        assert!(is_time_passed_at("05:00 PM", at(17, 1)));
        assert!(!is_time_passed_at("05:00 PM", at(16, 59)));
        assert!(is_time_passed_at("9:30 AM", at(9, 31)));
    }

    #[test]
    fn unparseable_time_never_counts_as_passed() {
        let now = at(23, 59);
        assert!(!is_time_passed_at("", now));
        assert!(!is_time_passed_at("9 AM", now));
        assert!(!is_time_passed_at("09:00", now));
        assert!(!is_time_passed_at("09:00 XM", now));
        assert!(!is_time_passed_at("nine thirty AM", now));
    }
}
