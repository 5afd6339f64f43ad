use thoth_scheduler::JobHandle;

use crate::meeting::MeetingId;

/// Payload of every job the meeting engine puts on the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingJob {
    /// Fires at the meeting's start.
    Activate { meeting: MeetingId },
    /// Repeats while the reminder window is open.
    Remind { meeting: MeetingId },
    /// Fires once at the end of the reminder window and cancels exactly `reminder`.
    StopReminders {
        meeting: MeetingId,
        reminder: JobHandle,
    },
    /// Fires at the meeting's end.
    Close { meeting: MeetingId },
}

impl MeetingJob {
    /// Label used for the scheduler job and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            MeetingJob::Activate { .. } => "meeting.activate",
            MeetingJob::Remind { .. } => "meeting.remind",
            MeetingJob::StopReminders { .. } => "meeting.stop_reminders",
            MeetingJob::Close { .. } => "meeting.close",
        }
    }

    pub fn meeting(&self) -> &MeetingId {
        match self {
            MeetingJob::Activate { meeting }
            | MeetingJob::Remind { meeting }
            | MeetingJob::StopReminders { meeting, .. }
            | MeetingJob::Close { meeting } => meeting,
        }
    }
}
