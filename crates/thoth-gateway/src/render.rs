//! Reply text for the console adapter.

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use thoth_meetings::{Meeting, MeetingError, Outcome};

pub const NO_PERMISSION: &str = "You do not have permission to use that command.";

pub fn outcome(outcome: &Outcome, offset: FixedOffset) -> String {
    match outcome {
        Outcome::Scheduled(m) => format!("A meeting has been added on {}.", long_time(m.start, offset)),
        Outcome::Cancelled(m) => format!(
            "The next meeting ({}) has been deleted. Type '//meeting list' to see all upcoming meetings.",
            brief(m, offset)
        ),
        Outcome::NextMeeting(m) => next_meeting(m, offset),
        Outcome::Pending(list) if list.is_empty() => "No meetings are scheduled.".to_string(),
        Outcome::Pending(list) => list
            .iter()
            .map(|m| brief(m, offset))
            .collect::<Vec<_>>()
            .join("\n"),
        Outcome::SignedIn(change) if change.was_absent => {
            format!("{} has been signed in.", change.member)
        }
        Outcome::SignedIn(change) => format!("{} is already signed in.", change.member),
        Outcome::Excused(change) if change.was_absent => {
            format!("{} was excused from the current meeting.", change.member)
        }
        Outcome::Excused(change) => format!("{} is not marked absent.", change.member),
    }
}

pub fn error(err: &MeetingError) -> String {
    match err {
        MeetingError::InvalidDate { input } => {
            format!("\"{input}\" could not be recognized as a valid date and time.")
        }
        MeetingError::WrongArgumentCount { expected, got } if got < expected => format!(
            "Not enough arguments provided for command \"add\" (expected {expected}, got {got}). \
             Usage: //meeting add - <start> - <location> - <hours> - <password>"
        ),
        MeetingError::WrongArgumentCount { expected, got } => format!(
            "Too many arguments for command \"add\" (expected {expected}, got {got})."
        ),
        MeetingError::InvalidCredential => "Incorrect password or no password provided.".to_string(),
        MeetingError::NoActiveMeeting => "There is no meeting to sign into.".to_string(),
        MeetingError::MemberNotFound { member } => {
            format!("Could not excuse {member} from the meeting.")
        }
        MeetingError::QueueEmpty => "No meetings are scheduled.".to_string(),
        MeetingError::InvalidDuration { input } => {
            format!("\"{input}\" is not a valid number of hours.")
        }
        MeetingError::MissingField { field } => format!("The meeting needs a {field}."),
        MeetingError::StartInPast { .. } => "That start time has already passed.".to_string(),
        MeetingError::EngineUnavailable => "The meeting service is not running.".to_string(),
    }
}

/// The periodic ping for members who have not checked in.
pub fn reminder(members: &[String]) -> String {
    format!(
        "@Not Here ({}) there is a meeting right now. Get here as soon as possible and sign in \
         or leave a message explaining why you should be excused.",
        members.join(", ")
    )
}

fn next_meeting(m: &Meeting, offset: FixedOffset) -> String {
    format!(
        "There will be a meeting on {}. The meeting will take place at {}. \
         It will be {} hours long. Try not to be late!",
        long_time(m.start, offset),
        m.location,
        m.duration_hours
    )
}

fn brief(m: &Meeting, offset: FixedOffset) -> String {
    let local = m.start.with_timezone(&offset);
    format!("Time: {}, Place: {}", local.format("%-m/%-d/%Y %-I:%M %p"), m.location)
}

/// `Monday Mar 2nd at 6:00 PM`
fn long_time(at: DateTime<Utc>, offset: FixedOffset) -> String {
    let local = at.with_timezone(&offset);
    format!(
        "{} {} {}{} at {}",
        local.format("%A"),
        local.format("%b"),
        local.day(),
        ordinal_suffix(local.day()),
        local.format("%-I:%M %p")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use thoth_core::MemberId;
    use thoth_meetings::{AttendanceChange, MeetingId};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn meeting() -> Meeting {
        Meeting::new(
            Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap(),
            1.5,
            "Room 1",
            "abc",
        )
    }

    #[test]
    fn ordinals() {
        let got: Vec<_> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 23, 31]
            .into_iter()
            .map(ordinal_suffix)
            .collect();
        assert_eq!(got, ["st", "nd", "rd", "th", "th", "th", "th", "st", "nd", "rd", "st"]);
    }

    #[test]
    fn next_meeting_reads_naturally() {
        let text = outcome(&Outcome::NextMeeting(meeting()), utc());
        assert_eq!(
            text,
            "There will be a meeting on Monday Mar 2nd at 6:00 PM. The meeting will take place \
             at Room 1. It will be 1.5 hours long. Try not to be late!"
        );
    }

    #[test]
    fn list_uses_local_offset() {
        let est = FixedOffset::west_opt(5 * 3600).unwrap();
        let text = outcome(&Outcome::Pending(vec![meeting(), meeting()]), est);
        assert_eq!(
            text,
            "Time: 3/2/2026 1:00 PM, Place: Room 1\nTime: 3/2/2026 1:00 PM, Place: Room 1"
        );
        assert_eq!(outcome(&Outcome::Pending(vec![]), utc()), "No meetings are scheduled.");
    }

    #[test]
    fn sign_in_replies() {
        let change = AttendanceChange {
            member: MemberId::from("alice"),
            meeting: MeetingId::from("m1"),
            was_absent: true,
        };
        assert_eq!(
            outcome(&Outcome::SignedIn(change.clone()), utc()),
            "alice has been signed in."
        );
        let again = AttendanceChange {
            was_absent: false,
            ..change
        };
        assert_eq!(
            outcome(&Outcome::SignedIn(again), utc()),
            "alice is already signed in."
        );
    }

    #[test]
    fn argument_count_errors() {
        let few = error(&MeetingError::WrongArgumentCount { expected: 4, got: 2 });
        assert!(few.starts_with("Not enough arguments"));
        let many = error(&MeetingError::WrongArgumentCount { expected: 4, got: 6 });
        assert!(many.starts_with("Too many arguments"));
    }
}
