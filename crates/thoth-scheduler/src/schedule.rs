use chrono::{DateTime, Duration, Utc};

use crate::types::Schedule;

/// First execution time for a freshly added job.
///
/// One-shot jobs keep their instant even when it is already in the past, so a
/// deadline of "now" still fires on the next tick.
pub fn first_run(schedule: &Schedule, now: DateTime<Utc>) -> DateTime<Utc> {
    match schedule {
        Schedule::Once { at } => *at,
        Schedule::Interval { every_secs } => after(now, *every_secs),
    }
}

/// Compute the next UTC execution time for `schedule` after it fired at `from`.
///
/// Returns `None` when the schedule is exhausted (a `Once` job after its single run).
pub fn compute_next_run(schedule: &Schedule, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match schedule {
        Schedule::Once { .. } => None,
        Schedule::Interval { every_secs } => Some(after(from, *every_secs)),
    }
}

/// The interval as a time delta, or `None` when it does not fit.
pub fn interval(every_secs: u64) -> Option<Duration> {
    i64::try_from(every_secs).ok().and_then(Duration::try_seconds)
}

/// `from + every_secs`, saturating at the latest representable instant.
fn after(from: DateTime<Utc>, every_secs: u64) -> DateTime<Utc> {
    interval(every_secs)
        .and_then(|d| from.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
