use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{MeetingError, Result};
use crate::time::parse_start;

/// Number of fields expected by [`MeetingDraft::from_fields`].
pub const MEETING_FIELD_COUNT: usize = 4;

/// Unique identifier of a meeting, used to tie scheduled jobs back to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingId(pub String);

impl MeetingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MeetingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MeetingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a meeting. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingState {
    Pending,
    Active,
    Closed,
}

impl fmt::Display for MeetingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MeetingState::Pending => "pending",
            MeetingState::Active => "active",
            MeetingState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// A scheduled meeting. Everything but `state` and `activated_at` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub start: DateTime<Utc>,
    pub duration_hours: f64,
    /// Always `start + duration_hours`.
    pub end: DateTime<Utc>,
    pub location: String,
    /// Check-in credential, only honoured while the meeting is active.
    pub password: String,
    pub state: MeetingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
}

impl Meeting {
    /// Build a pending meeting. Callers validate the fields first.
    pub fn new(
        start: DateTime<Utc>,
        duration_hours: f64,
        location: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            id: MeetingId::new(),
            start,
            duration_hours,
            end: end_of(start, duration_hours).unwrap_or(DateTime::<Utc>::MAX_UTC),
            location: location.into(),
            password: password.into(),
            state: MeetingState::Pending,
            activated_at: None,
        }
    }

    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }
}

/// `start + duration_hours`, or `None` when the end is not representable.
fn end_of(start: DateTime<Utc>, duration_hours: f64) -> Option<DateTime<Utc>> {
    let millis = (duration_hours * 3_600_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64).and_then(|d| start.checked_add_signed(d))
}

/// Raw, unvalidated meeting fields as typed by an organizer.
///
/// Field order: `[start, location, duration_hours, password]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingDraft {
    pub start: String,
    pub location: String,
    pub duration_hours: String,
    pub password: String,
}

impl MeetingDraft {
    pub fn new(
        start: impl Into<String>,
        location: impl Into<String>,
        duration_hours: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            start: start.into(),
            location: location.into(),
            duration_hours: duration_hours.into(),
            password: password.into(),
        }
    }

    /// Build a draft from a positional field list; anything but four fields is rejected.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        match fields {
            [start, location, duration, password] => Ok(Self::new(
                <S as AsRef<str>>::as_ref(start),
                <S as AsRef<str>>::as_ref(location),
                <S as AsRef<str>>::as_ref(duration),
                <S as AsRef<str>>::as_ref(password),
            )),
            _ => Err(MeetingError::WrongArgumentCount {
                expected: MEETING_FIELD_COUNT,
                got: fields.len(),
            }),
        }
    }

    /// Validate the draft against `now` and turn it into a pending [`Meeting`].
    ///
    /// A start equal to `now` is accepted; anything earlier is not.
    pub fn validate(&self, now: DateTime<Utc>, offset: FixedOffset) -> Result<Meeting> {
        let location = self.location.trim();
        if location.is_empty() {
            return Err(MeetingError::MissingField { field: "location" });
        }
        let password = self.password.trim();
        if password.is_empty() {
            return Err(MeetingError::MissingField { field: "password" });
        }

        let start = parse_start(&self.start, now, offset).ok_or_else(|| {
            MeetingError::InvalidDate {
                input: self.start.trim().to_string(),
            }
        })?;

        let invalid_duration = || MeetingError::InvalidDuration {
            input: self.duration_hours.trim().to_string(),
        };
        let duration_hours = self
            .duration_hours
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|h| h.is_finite() && *h > 0.0)
            .ok_or_else(invalid_duration)?;

        if start < now {
            return Err(MeetingError::StartInPast { start });
        }
        end_of(start, duration_hours).ok_or_else(invalid_duration)?;

        Ok(Meeting::new(start, duration_hours, location, password))
    }
}
