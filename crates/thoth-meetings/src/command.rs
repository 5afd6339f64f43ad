use thoth_core::MemberId;

use crate::engine::{AttendanceChange, MeetingEngine};
use crate::error::Result;
use crate::meeting::{Meeting, MeetingDraft};

/// Every operation the engine accepts from the outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Positional fields `[start, location, duration_hours, password]`.
    ScheduleMeeting { fields: Vec<String> },
    CancelNextMeeting,
    DescribeNextMeeting,
    ListPendingMeetings,
    SignIn { member: MemberId, password: String },
    ExcuseMember { member: MemberId },
}

impl Command {
    /// Whether the caller must hold organizer rights before dispatching.
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Command::ScheduleMeeting { .. }
                | Command::CancelNextMeeting
                | Command::ExcuseMember { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::ScheduleMeeting { .. } => "meeting.schedule",
            Command::CancelNextMeeting => "meeting.cancel_next",
            Command::DescribeNextMeeting => "meeting.next",
            Command::ListPendingMeetings => "meeting.list",
            Command::SignIn { .. } => "meeting.sign_in",
            Command::ExcuseMember { .. } => "meeting.excuse",
        }
    }
}

/// Successful result of a [`Command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Scheduled(Meeting),
    Cancelled(Meeting),
    NextMeeting(Meeting),
    Pending(Vec<Meeting>),
    SignedIn(AttendanceChange),
    Excused(AttendanceChange),
}

/// Apply `command` to `engine`.
pub fn dispatch(engine: &mut MeetingEngine, command: Command) -> Result<Outcome> {
    match command {
        // ------------------------------------------------------------------
        // Queue
        // ------------------------------------------------------------------
        Command::ScheduleMeeting { fields } => {
            let draft = MeetingDraft::from_fields(&fields)?;
            engine.schedule_meeting(draft).map(Outcome::Scheduled)
        }

        Command::CancelNextMeeting => engine.cancel_next_meeting().map(Outcome::Cancelled),

        Command::DescribeNextMeeting => engine.describe_next_meeting().map(Outcome::NextMeeting),

        Command::ListPendingMeetings => Ok(Outcome::Pending(engine.list_pending_meetings())),

        // ------------------------------------------------------------------
        // Attendance
        // ------------------------------------------------------------------
        Command::SignIn { member, password } => {
            engine.sign_in(&member, &password).map(Outcome::SignedIn)
        }

        Command::ExcuseMember { member } => engine.excuse_member(&member).map(Outcome::Excused),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_commands() {
        let member = MemberId::from("u1");
        assert!(Command::ScheduleMeeting { fields: vec![] }.is_privileged());
        assert!(Command::CancelNextMeeting.is_privileged());
        assert!(Command::ExcuseMember {
            member: member.clone()
        }
        .is_privileged());

        assert!(!Command::DescribeNextMeeting.is_privileged());
        assert!(!Command::ListPendingMeetings.is_privileged());
        assert!(!Command::SignIn {
            member,
            password: "abc".into()
        }
        .is_privileged());
    }
}
