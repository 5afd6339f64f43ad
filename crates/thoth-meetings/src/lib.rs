//! `thoth-meetings`: meeting queue, attendance tracking and the lifecycle engine.
//!
//! # Overview
//!
//! Organizers queue meetings; each queued meeting has an activation job armed
//! on the scheduler. When it fires, the [`engine::MeetingEngine`] moves the
//! queue head into the active slot, marks the whole roster absent, starts
//! reminders, and arms a close job for the meeting's end.
//!
//! | State     | Entered by                      | Left by                    |
//! |-----------|---------------------------------|----------------------------|
//! | `Pending` | `schedule_meeting`              | activation or cancellation |
//! | `Active`  | activation job fires            | close job, or next activation |
//! | `Closed`  | close                           | terminal                   |
//!
//! The engine is owned by a single task ([`runtime::run_engine`]) that applies
//! [`command::Command`]s and fired jobs one at a time, and writes a
//! [`snapshot::Snapshot`] after every state change.

pub mod attendance;
pub mod collaborators;
pub mod command;
pub mod db;
pub mod engine;
pub mod error;
pub mod job;
pub mod meeting;
pub mod queue;
pub mod runtime;
pub mod snapshot;
pub mod time;

pub use attendance::AttendanceTracker;
pub use collaborators::{Notifier, Roster};
pub use command::{dispatch, Command, Outcome};
pub use engine::{AttendanceChange, EngineSettings, MeetingEngine};
pub use error::{CollaboratorError, MeetingError, Result, StoreError};
pub use job::MeetingJob;
pub use meeting::{Meeting, MeetingDraft, MeetingId, MeetingState};
pub use queue::MeetingQueue;
pub use runtime::{run_engine, EngineClient, EngineRequest};
pub use snapshot::{MemorySnapshotStore, Snapshot, SnapshotStore, SqliteSnapshotStore};
