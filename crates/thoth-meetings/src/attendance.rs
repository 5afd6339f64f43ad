use std::collections::BTreeSet;
use std::sync::Arc;

use thoth_core::MemberId;
use tracing::{debug, warn};

use crate::collaborators::Roster;

/// Members still absent from the active meeting.
///
/// The set is authoritative. The roster's absence marker only mirrors it, and
/// a failed marker update is logged without undoing the set change.
pub struct AttendanceTracker {
    absent: BTreeSet<MemberId>,
    roster: Arc<dyn Roster>,
}

impl AttendanceTracker {
    pub fn new(roster: Arc<dyn Roster>) -> Self {
        Self {
            absent: BTreeSet::new(),
            roster,
        }
    }

    /// Replace the set with `roster_snapshot` and mark everyone absent.
    pub fn reset(&mut self, roster_snapshot: BTreeSet<MemberId>) {
        let previous = std::mem::replace(&mut self.absent, roster_snapshot);
        for member in previous.difference(&self.absent) {
            self.set_marker(member, false);
        }
        for member in &self.absent {
            self.set_marker(member, true);
        }
        debug!(absent = self.absent.len(), "attendance reset");
    }

    /// Record `member` as present. Returns `true` only if they were absent.
    pub fn mark_present(&mut self, member: &MemberId) -> bool {
        if !self.absent.remove(member) {
            return false;
        }
        self.set_marker(member, false);
        true
    }

    pub fn is_absent(&self, member: &MemberId) -> bool {
        self.absent.contains(member)
    }

    /// Empty the set, lifting the marker from anyone still absent.
    pub fn clear(&mut self) {
        let remaining = std::mem::take(&mut self.absent);
        for member in &remaining {
            self.set_marker(member, false);
        }
        debug!(cleared = remaining.len(), "attendance cleared");
    }

    /// Load a persisted set without touching markers; they already reflect it.
    pub fn restore(&mut self, absent: impl IntoIterator<Item = MemberId>) {
        self.absent = absent.into_iter().collect();
    }

    /// Absent members in sorted order.
    pub fn absentees(&self) -> Vec<MemberId> {
        self.absent.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.absent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.absent.is_empty()
    }

    fn set_marker(&self, member: &MemberId, on: bool) {
        if let Err(e) = self.roster.set_absence_marker(member, on) {
            warn!(member = %member, on, error = %e, "absence marker update failed");
        }
    }
}
