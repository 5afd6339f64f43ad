//! Interfaces to the host chat platform, implemented outside this crate.
//!
//! Calls are synchronous and expected to return quickly; adapters talking to
//! a remote service should hand the work to their own task and report only
//! enqueue failures.

use std::collections::BTreeSet;

use thoth_core::MemberId;

use crate::error::CollaboratorError;
use crate::meeting::Meeting;

/// Member directory plus the visible "absent" marker (a role on most platforms).
pub trait Roster: Send + Sync {
    fn current_roster(&self) -> BTreeSet<MemberId>;

    fn set_absence_marker(&self, member: &MemberId, on: bool) -> Result<(), CollaboratorError>;

    fn is_member(&self, member: &MemberId) -> bool {
        self.current_roster().contains(member)
    }
}

/// Delivers the periodic "you are missing the meeting" ping.
pub trait Notifier: Send + Sync {
    fn notify_absentees(
        &self,
        members: &[MemberId],
        meeting: &Meeting,
    ) -> Result<(), CollaboratorError>;
}
