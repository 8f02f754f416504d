use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, TimeZone, Utc};

use crate::error::{Result, SchedulerError};

/// Resolve a raw `runAt` string into an absolute UTC instant strictly after
/// `now`.
///
/// Two input shapes are accepted:
///
/// * `HH:mm` (24-hour, zero-padded) — the next occurrence of that wall-clock
///   time in the server's local zone. When today's candidate is already
///   at-or-before `now` the result is exactly one day later.
/// * A date-time string — RFC-3339 taken verbatim, a naive
///   `YYYY-MM-DDTHH:MM:SS[.fff]` (with `T` or space) interpreted as local
///   time.
///
/// `now` is injected so resolution stays a pure function.
pub fn resolve_run_at(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let resolved = if let Some((hours, minutes)) = split_hh_mm(raw) {
        if hours > 23 || minutes > 59 {
            return Err(SchedulerError::InvalidRunAt);
        }

        // Build today's candidate at HH:MM:00 local time.
        let local_now = now.with_timezone(&Local);
        let candidate = Local
            .with_ymd_and_hms(
                local_now.year(),
                local_now.month(),
                local_now.day(),
                hours,
                minutes,
                0,
            )
            .single()
            .ok_or(SchedulerError::InvalidRunAt)?
            .with_timezone(&Utc);

        if candidate <= now {
            // Today's window has passed — advance to tomorrow.
            candidate + Duration::days(1)
        } else {
            candidate
        }
    } else {
        parse_date_time(raw)?
    };

    if resolved <= now {
        return Err(SchedulerError::PastRunAt);
    }
    Ok(resolved)
}

/// Lexical `HH:mm` match: exactly five chars, digits around a colon.
/// Range checking happens in the caller so `"25:00"` still counts as this
/// shape (and is then rejected, never reinterpreted as a date).
fn split_hh_mm(raw: &str) -> Option<(u32, u32)> {
    let bytes = raw.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return None;
    }
    if ![0, 1, 3, 4]
        .iter()
        .all(|&i| bytes[i].is_ascii_digit())
    {
        return None;
    }
    let hours = raw[..2].parse().ok()?;
    let minutes = raw[3..].parse().ok()?;
    Some((hours, minutes))
}

fn parse_date_time(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Local
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or(SchedulerError::InvalidRunAt);
        }
    }

    Err(SchedulerError::InvalidRunAt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_instant(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn hh_mm_resolves_to_later_today() {
        let now = local_instant(2025, 1, 15, 10, 0);
        let resolved = resolve_run_at("23:59", now).unwrap();
        assert_eq!(resolved, local_instant(2025, 1, 15, 23, 59));
    }

    #[test]
    fn hh_mm_already_passed_rolls_forward_exactly_one_day() {
        let now = local_instant(2025, 1, 15, 10, 0);
        let same_day = local_instant(2025, 1, 15, 9, 0);
        let resolved = resolve_run_at("09:00", now).unwrap();
        assert_eq!(resolved, same_day + Duration::days(1));
        assert_eq!(resolved - same_day, Duration::hours(24));
    }

    #[test]
    fn hh_mm_equal_to_now_counts_as_passed() {
        let now = local_instant(2025, 1, 15, 9, 0);
        let resolved = resolve_run_at("09:00", now).unwrap();
        assert_eq!(resolved, now + Duration::days(1));
    }

    #[test]
    fn hh_mm_out_of_range_is_invalid_despite_matching_shape() {
        let now = local_instant(2025, 1, 15, 10, 0);
        assert!(matches!(
            resolve_run_at("24:00", now),
            Err(SchedulerError::InvalidRunAt)
        ));
        assert!(matches!(
            resolve_run_at("23:60", now),
            Err(SchedulerError::InvalidRunAt)
        ));
        assert!(matches!(
            resolve_run_at("99:99", now),
            Err(SchedulerError::InvalidRunAt)
        ));
    }

    #[test]
    fn unpadded_time_is_not_the_hh_mm_shape() {
        // "7:30" falls through to date-time parsing and fails there.
        let now = local_instant(2025, 1, 15, 10, 0);
        assert!(matches!(
            resolve_run_at("7:30", now),
            Err(SchedulerError::InvalidRunAt)
        ));
    }

    #[test]
    fn rfc3339_future_instant_is_taken_verbatim() {
        let now = local_instant(2025, 1, 15, 10, 0);
        let resolved = resolve_run_at("2099-06-01T12:30:00Z", now).unwrap();
        assert_eq!(
            resolved,
            Utc.with_ymd_and_hms(2099, 6, 1, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn past_instant_is_rejected() {
        let now = local_instant(2025, 1, 15, 10, 0);
        assert!(matches!(
            resolve_run_at("2000-01-01T00:00:00Z", now),
            Err(SchedulerError::PastRunAt)
        ));
    }

    #[test]
    fn garbage_is_invalid() {
        let now = local_instant(2025, 1, 15, 10, 0);
        for raw in ["soon", "", "2025-13-40T99:00:00Z", "12:34:56"] {
            assert!(
                matches!(resolve_run_at(raw, now), Err(SchedulerError::InvalidRunAt)),
                "expected InvalidRunAt for {raw:?}"
            );
        }
    }

    #[test]
    fn resolution_is_deterministic_for_a_fixed_now() {
        let now = local_instant(2025, 1, 15, 10, 0);
        assert_eq!(
            resolve_run_at("17:34", now).unwrap(),
            resolve_run_at("17:34", now).unwrap()
        );
    }
}
