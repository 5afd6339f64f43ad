//! Start-time parsing for organizer input.
//!
//! Accepts RFC 3339, a handful of common date/time layouts (24-hour and
//! am/pm), `today HH:MM`, `tomorrow HH:MM`, and `in N minutes|hours|days`.
//! Times typed without a zone are read in the configured fixed offset.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %I:%M %p",
    "%Y-%m-%d %I:%M%p",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%Y %I:%M%p",
];

const TIME_FORMATS: &[&str] = &["%H:%M", "%I:%M %p", "%I:%M%p"];

/// Parse a meeting start time relative to `now`. Returns `None` when unrecognized.
pub fn parse_start(input: &str, now: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    let lower = input.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("in ") {
        return parse_relative(rest, now);
    }

    let today = now.with_timezone(&offset).date_naive();
    if let Some(rest) = lower.strip_prefix("today") {
        return at_time_on(today, rest, offset);
    }
    if let Some(rest) = lower.strip_prefix("tomorrow") {
        return at_time_on(today.succ_opt()?, rest, offset);
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .and_then(|naive| localize(naive, offset))
}

/// `"2 hours"`, `"30 min"`, `"1 day"`.
fn parse_relative(rest: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut parts = rest.split_whitespace();
    let amount: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?;
    if parts.next().is_some() || amount < 0 {
        return None;
    }
    let delta = if unit.starts_with("min") {
        Duration::try_minutes(amount)
    } else if unit.starts_with("hour") || unit.starts_with("hr") {
        Duration::try_hours(amount)
    } else if unit.starts_with("day") {
        Duration::try_days(amount)
    } else {
        None
    }?;
    now.checked_add_signed(delta)
}

fn at_time_on(day: NaiveDate, rest: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let rest = rest.trim().trim_start_matches("at").trim();
    let time = TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(rest, fmt).ok())?;
    localize(day.and_time(time), offset)
}

fn localize(naive: NaiveDateTime, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    #[test]
    fn rfc3339_keeps_its_own_offset() {
        let parsed = parse_start("2026-03-01T18:00:00+02:00", now(), utc()).unwrap();
        assert_eq!(parsed, at(16, 0));
    }

    #[test]
    fn common_layouts() {
        for input in [
            "2026-03-01 18:30",
            "2026-03-01T18:30",
            "2026-03-01 18:30:00",
            "2026/03/01 18:30",
            "03/01/2026 18:30",
            "03/01/2026 6:30 PM",
            "03/01/2026 6:30pm",
            "2026-03-01 06:30 pm",
        ] {
            assert_eq!(parse_start(input, now(), utc()), Some(at(18, 30)), "{input}");
        }
    }

    #[test]
    fn naive_times_use_configured_offset() {
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(parse_start("2026-03-01 13:00", now(), est), Some(at(18, 0)));
    }

    #[test]
    fn today_and_tomorrow() {
        assert_eq!(parse_start("today 18:00", now(), utc()), Some(at(18, 0)));
        assert_eq!(parse_start("Today at 6:00 PM", now(), utc()), Some(at(18, 0)));
        assert_eq!(
            parse_start("tomorrow 09:15", now(), utc()),
            Some(at(9, 15) + Duration::days(1))
        );
    }

    #[test]
    fn relative_offsets() {
        assert_eq!(parse_start("in 10 minutes", now(), utc()), Some(at(12, 10)));
        assert_eq!(parse_start("in 2 hours", now(), utc()), Some(at(14, 0)));
        assert_eq!(
            parse_start("in 1 day", now(), utc()),
            Some(now() + Duration::days(1))
        );
        assert_eq!(parse_start("in 2 fortnights", now(), utc()), None);
        assert_eq!(parse_start("in -5 minutes", now(), utc()), None);
    }

    #[test]
    fn relative_offsets_out_of_range_are_rejected() {
        for input in [
            "in 999999999999 days",
            "in 9223372036854775807 minutes",
            "in 9223372036854775807 hours",
            "in 99999999999999999999 days",
        ] {
            assert_eq!(parse_start(input, now(), utc()), None, "{input}");
        }
    }

    #[test]
    fn garbage_is_rejected() {
        for input in ["", "not-a-date", "2026-13-45 99:99", "tomorrow", "in hours"] {
            assert_eq!(parse_start(input, now(), utc()), None, "{input}");
        }
    }
}
