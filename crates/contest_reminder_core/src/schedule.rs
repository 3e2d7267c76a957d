//! crates/contest_reminder_core/src/schedule.rs
//!
//! The schedule calculator: turns a contest start time and a user's
//! `ReminderSpec` into the ordered sequence of reminder instants, and renders
//! instants in a user's local timezone.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::domain::ReminderSpec;
use crate::ports::{PortError, PortResult};

/// Display format for reminder times, e.g. `2026-02-16 03:45 PM`.
const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %I:%M %p";

/// Computes the reminder instants for one contest.
///
/// Returns an empty sequence when the start time is unknown (a contest with
/// no known start cannot be reminded about). Otherwise returns exactly
/// `spec.count` instants: the first `spec.lead_minutes` before the start,
/// each subsequent one `spec.interval_minutes` later. The chronological
/// order of this sequence is the canonical ordering for all downstream
/// dedup checks.
pub fn reminder_schedule(
    start_time_utc: Option<DateTime<Utc>>,
    spec: &ReminderSpec,
) -> Vec<DateTime<Utc>> {
    let Some(start) = start_time_utc else {
        return Vec::new();
    };

    let first = start - Duration::minutes(spec.lead_minutes as i64);
    (0..spec.count)
        .map(|i| first + Duration::minutes(spec.interval_minutes as i64 * i as i64))
        .collect()
}

/// A reminder instant is due once it is no longer in the future.
pub fn is_due(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    instant <= now
}

/// Renders UTC instants in the given IANA timezone.
///
/// An unknown timezone name is a configuration error surfaced to the
/// caller, never a silent fallback to UTC.
pub fn format_local_times(
    instants: &[DateTime<Utc>],
    timezone_name: &str,
) -> PortResult<Vec<String>> {
    let zone: Tz = timezone_name
        .parse()
        .map_err(|_| PortError::InvalidTimezone(timezone_name.to_string()))?;

    Ok(instants
        .iter()
        .map(|instant| instant.with_timezone(&zone).format(LOCAL_TIME_FORMAT).to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn spec(count: u32, lead: u32, interval: u32) -> ReminderSpec {
        ReminderSpec {
            count,
            lead_minutes: lead,
            interval_minutes: interval,
        }
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn schedule_counts_back_from_start_and_steps_by_interval() {
        let start = utc(2026, 2, 16, 15, 0);
        let schedule = reminder_schedule(Some(start), &spec(3, 30, 10));

        assert_eq!(
            schedule,
            vec![
                utc(2026, 2, 16, 14, 30),
                utc(2026, 2, 16, 14, 40),
                utc(2026, 2, 16, 14, 50),
            ]
        );
    }

    #[test]
    fn schedule_is_strictly_increasing_with_exact_count() {
        let start = utc(2026, 6, 1, 12, 0);
        let schedule = reminder_schedule(Some(start), &spec(7, 45, 5));

        assert_eq!(schedule.len(), 7);
        assert_eq!(schedule[0], start - Duration::minutes(45));
        for pair in schedule.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::minutes(5));
        }
    }

    #[test]
    fn schedule_with_zero_lead_starts_at_contest_start() {
        let start = utc(2026, 3, 1, 9, 30);
        let schedule = reminder_schedule(Some(start), &spec(1, 0, 15));
        assert_eq!(schedule, vec![start]);
    }

    #[test]
    fn missing_start_time_yields_empty_schedule() {
        assert!(reminder_schedule(None, &spec(5, 30, 10)).is_empty());
        assert!(reminder_schedule(None, &spec(1, 0, 1)).is_empty());
    }

    #[test]
    fn due_is_inclusive_of_now() {
        let now = utc(2026, 2, 16, 14, 35);
        assert!(is_due(utc(2026, 2, 16, 14, 30), now));
        assert!(is_due(now, now));
        assert!(!is_due(utc(2026, 2, 16, 14, 40), now));
    }

    #[test]
    fn local_formatting_uses_the_requested_zone() {
        let instants = vec![utc(2026, 2, 16, 14, 30)];
        let formatted = format_local_times(&instants, "Europe/Berlin").unwrap();
        // Berlin is UTC+1 in February.
        assert_eq!(formatted, vec!["2026-02-16 03:30 PM".to_string()]);
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let instants = vec![utc(2026, 2, 16, 14, 30)];
        let err = format_local_times(&instants, "Mars/Olympus_Mons").unwrap_err();
        assert!(matches!(err, PortError::InvalidTimezone(name) if name == "Mars/Olympus_Mons"));
    }
}
