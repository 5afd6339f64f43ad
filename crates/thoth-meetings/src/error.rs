use chrono::{DateTime, Utc};
use thiserror::Error;
use thoth_core::MemberId;

/// Errors returned to callers of the meeting engine.
///
/// Every variant is recoverable: the engine stays live and ready for the
/// next command after returning one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeetingError {
    #[error("{input:?} could not be recognized as a valid date and time")]
    InvalidDate { input: String },

    #[error("expected {expected} arguments, got {got}")]
    WrongArgumentCount { expected: usize, got: usize },

    #[error("incorrect password")]
    InvalidCredential,

    #[error("there is no meeting in progress")]
    NoActiveMeeting,

    #[error("member not found: {member}")]
    MemberNotFound { member: MemberId },

    #[error("no meetings are scheduled")]
    QueueEmpty,

    #[error("{input:?} is not a positive number of hours")]
    InvalidDuration { input: String },

    #[error("missing {field}")]
    MissingField { field: &'static str },

    #[error("start time {} is in the past", start.to_rfc3339())]
    StartInPast { start: DateTime<Utc> },

    #[error("meeting engine is not running")]
    EngineUnavailable,
}

impl MeetingError {
    /// Short error code string for callers that render their own messages.
    pub fn code(&self) -> &'static str {
        match self {
            MeetingError::InvalidDate { .. } => "INVALID_DATE",
            MeetingError::WrongArgumentCount { .. } => "WRONG_ARGUMENT_COUNT",
            MeetingError::InvalidCredential => "INVALID_CREDENTIAL",
            MeetingError::NoActiveMeeting => "NO_ACTIVE_MEETING",
            MeetingError::MemberNotFound { .. } => "MEMBER_NOT_FOUND",
            MeetingError::QueueEmpty => "QUEUE_EMPTY",
            MeetingError::InvalidDuration { .. } => "INVALID_DURATION",
            MeetingError::MissingField { .. } => "MISSING_FIELD",
            MeetingError::StartInPast { .. } => "START_IN_PAST",
            MeetingError::EngineUnavailable => "ENGINE_UNAVAILABLE",
        }
    }
}

/// Failure reported by an external collaborator (roles, notifications).
///
/// Logged by the engine, never propagated to callers.
#[derive(Debug, Clone, Error)]
#[error("{collaborator}: {reason}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub reason: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, reason: impl Into<String>) -> Self {
        Self {
            collaborator,
            reason: reason.into(),
        }
    }
}

/// Errors from a snapshot store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MeetingError>;
