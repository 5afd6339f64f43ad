use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use thoth_core::config::{
    MeetingsConfig, DEFAULT_REMINDER_INTERVAL_SECS, DEFAULT_REMINDER_WINDOW_SECS,
};
use thoth_core::MemberId;
use thoth_scheduler::{Fired, JobHandle, SchedulerHandle};
use tracing::{debug, error, info, instrument, warn};

use crate::attendance::AttendanceTracker;
use crate::collaborators::{Notifier, Roster};
use crate::error::{MeetingError, Result, StoreError};
use crate::job::MeetingJob;
use crate::meeting::{Meeting, MeetingDraft, MeetingId, MeetingState};
use crate::queue::MeetingQueue;
use crate::snapshot::{Snapshot, SnapshotStore};

/// Timing settings for the lifecycle engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub reminder_interval: std::time::Duration,
    pub reminder_window: Duration,
    /// Offset for start times typed without a zone.
    pub utc_offset: FixedOffset,
}

impl EngineSettings {
    /// Build settings from config. Out-of-range values fall back to their defaults.
    pub fn from_config(config: &MeetingsConfig) -> Self {
        let utc_offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                warn!(
                    minutes = config.utc_offset_minutes,
                    "utc_offset_minutes out of range, using UTC"
                );
                Utc.fix()
            });
        let reminder_interval = seconds(config.reminder_interval_secs).unwrap_or_else(|| {
            warn!(
                secs = config.reminder_interval_secs,
                "reminder_interval_secs out of range, using default"
            );
            Duration::seconds(DEFAULT_REMINDER_INTERVAL_SECS as i64)
        });
        let reminder_window = seconds(config.reminder_window_secs).unwrap_or_else(|| {
            warn!(
                secs = config.reminder_window_secs,
                "reminder_window_secs out of range, using default"
            );
            Duration::seconds(DEFAULT_REMINDER_WINDOW_SECS as i64)
        });
        Self {
            reminder_interval: reminder_interval.to_std().unwrap_or_default(),
            reminder_window,
            utc_offset,
        }
    }
}

/// Seconds that fit in a time delta and still leave room to add it to a timestamp.
fn seconds(secs: u64) -> Option<Duration> {
    const MAX_SECS: i64 = 100 * 365 * 24 * 3600;
    i64::try_from(secs)
        .ok()
        .filter(|s| *s <= MAX_SECS)
        .and_then(Duration::try_seconds)
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&MeetingsConfig::default())
    }
}

/// Result of a check-in or excuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceChange {
    pub member: MemberId,
    pub meeting: MeetingId,
    /// `false` when the member had already checked in.
    pub was_absent: bool,
}

/// The active meeting and the jobs armed for it.
struct ActiveSlot {
    meeting: Meeting,
    reminder: Option<JobHandle>,
    reminder_stop: Option<JobHandle>,
    close: Option<JobHandle>,
}

/// Owns the meeting queue, the active slot and the attendance set, and
/// drives them through `Pending -> Active -> Closed`.
///
/// Every method is synchronous and never waits on I/O. Scheduler deadlines
/// come back in through [`MeetingEngine::handle_fired`]; the caller must
/// serialize those with commands (see `runtime::run_engine`).
pub struct MeetingEngine {
    queue: MeetingQueue,
    active: Option<ActiveSlot>,
    attendance: AttendanceTracker,
    scheduler: SchedulerHandle<MeetingJob>,
    roster: Arc<dyn Roster>,
    notifier: Arc<dyn Notifier>,
    store: Box<dyn SnapshotStore>,
    settings: EngineSettings,
}

impl MeetingEngine {
    /// Build an engine with empty state.
    pub fn new(
        scheduler: SchedulerHandle<MeetingJob>,
        roster: Arc<dyn Roster>,
        notifier: Arc<dyn Notifier>,
        store: Box<dyn SnapshotStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            queue: MeetingQueue::new(),
            active: None,
            attendance: AttendanceTracker::new(Arc::clone(&roster)),
            scheduler,
            roster,
            notifier,
            store,
            settings,
        }
    }

    /// Build an engine from the store's last snapshot and re-arm its jobs.
    ///
    /// Queued meetings get a fresh activation job each; starts already in the
    /// past fire on the next tick. A restored active meeting gets its close
    /// job back, and its reminders if the reminder window is still open.
    /// Reminders that were due while the process was down are not replayed.
    pub fn restore(
        scheduler: SchedulerHandle<MeetingJob>,
        roster: Arc<dyn Roster>,
        notifier: Arc<dyn Notifier>,
        store: Box<dyn SnapshotStore>,
        settings: EngineSettings,
    ) -> std::result::Result<Self, StoreError> {
        let snapshot = store.load()?;
        let mut engine = Self::new(scheduler, roster, notifier, store, settings);

        for mut meeting in snapshot.queue {
            if meeting.state != MeetingState::Pending {
                warn!(meeting_id = %meeting.id, state = %meeting.state, "queued meeting was not pending; resetting");
                meeting.state = MeetingState::Pending;
            }
            let activation = engine.arm_activation(&meeting.id, meeting.start);
            engine.queue.enqueue(meeting, Some(activation));
        }

        if let Some(mut meeting) = snapshot.active_meeting {
            meeting.state = MeetingState::Active;
            let activated_at = *meeting.activated_at.get_or_insert(meeting.start);
            engine.attendance.restore(snapshot.attendance);
            engine.active = Some(engine.arm_active(meeting, activated_at));
        }

        info!(
            queued = engine.queue.len(),
            active = engine.active.is_some(),
            absent = engine.attendance.len(),
            "meeting state restored"
        );
        Ok(engine)
    }

    // --- commands ----------------------------------------------------------

    /// Validate and enqueue a meeting, arming its activation job.
    #[instrument(skip(self, draft), fields(start = %draft.start))]
    pub fn schedule_meeting(&mut self, draft: MeetingDraft) -> Result<Meeting> {
        let meeting = draft.validate(self.now(), self.settings.utc_offset)?;
        let activation = self.arm_activation(&meeting.id, meeting.start);
        self.queue.enqueue(meeting.clone(), Some(activation));
        info!(
            meeting_id = %meeting.id,
            start = %meeting.start.to_rfc3339(),
            location = %meeting.location,
            queued = self.queue.len(),
            "meeting scheduled"
        );
        self.persist();
        Ok(meeting)
    }

    /// Drop the next queued meeting without activating it.
    #[instrument(skip(self))]
    pub fn cancel_next_meeting(&mut self) -> Result<Meeting> {
        let entry = self.queue.cancel_next().ok_or(MeetingError::QueueEmpty)?;
        if let Some(handle) = entry.activation {
            self.scheduler.cancel(handle);
        }
        info!(meeting_id = %entry.meeting.id, "next meeting cancelled");
        self.persist();
        Ok(entry.meeting)
    }

    pub fn describe_next_meeting(&self) -> Result<Meeting> {
        self.queue.peek_next().cloned().ok_or(MeetingError::QueueEmpty)
    }

    /// Pending meetings in the order they will be activated.
    pub fn list_pending_meetings(&self) -> Vec<Meeting> {
        self.queue.list_all().cloned().collect()
    }

    /// Check `member` in with the active meeting's password.
    #[instrument(skip(self, member, password), fields(member = %member))]
    pub fn sign_in(&mut self, member: &MemberId, password: &str) -> Result<AttendanceChange> {
        let slot = self.active.as_ref().ok_or(MeetingError::NoActiveMeeting)?;
        if !slot.meeting.password_matches(password) {
            debug!("check-in rejected: wrong password");
            return Err(MeetingError::InvalidCredential);
        }
        let meeting = slot.meeting.id.clone();
        Ok(self.record_presence(member, meeting))
    }

    /// Mark `member` present without a password. Authorization is the caller's job.
    #[instrument(skip(self, member), fields(member = %member))]
    pub fn excuse_member(&mut self, member: &MemberId) -> Result<AttendanceChange> {
        let meeting = self
            .active
            .as_ref()
            .map(|slot| slot.meeting.id.clone())
            .ok_or(MeetingError::NoActiveMeeting)?;
        if !self.roster.is_member(member) {
            return Err(MeetingError::MemberNotFound {
                member: member.clone(),
            });
        }
        Ok(self.record_presence(member, meeting))
    }

    fn record_presence(&mut self, member: &MemberId, meeting: MeetingId) -> AttendanceChange {
        let was_absent = self.attendance.mark_present(member);
        if was_absent {
            info!(member = %member, meeting_id = %meeting, remaining = self.attendance.len(), "member marked present");
            self.persist();
        }
        AttendanceChange {
            member: member.clone(),
            meeting,
            was_absent,
        }
    }

    // --- scheduler callbacks ----------------------------------------------

    /// Apply a fired scheduler job.
    pub fn handle_fired(&mut self, fired: Fired<MeetingJob>) {
        debug!(job = %fired.handle, name = fired.action.name(), meeting_id = %fired.action.meeting(), "handling fired job");
        match fired.action {
            MeetingJob::Activate { meeting } => self.activate(&meeting, fired.handle),
            MeetingJob::Remind { meeting } => self.remind(&meeting),
            MeetingJob::StopReminders { meeting, reminder } => {
                self.stop_reminders(&meeting, reminder)
            }
            MeetingJob::Close { meeting } => self.close(&meeting),
        }
    }

    fn activate(&mut self, fired_id: &MeetingId, fired_handle: JobHandle) {
        // A cancelled meeting, or a job superseded by a handle swap, must not activate anything.
        match self.queue.entry(fired_id) {
            Some(entry) if entry.activation == Some(fired_handle) => {}
            Some(_) => {
                warn!(meeting_id = %fired_id, job = %fired_handle, "stale activation job ignored");
                return;
            }
            None => {
                warn!(meeting_id = %fired_id, "activation for a meeting no longer queued ignored");
                return;
            }
        }
        let Some(mut head) = self.queue.pop_next() else {
            warn!("activation fired with an empty queue");
            return;
        };

        if head.meeting.id != *fired_id {
            // FIFO wins: the head activates now, and the meeting whose job
            // fired inherits the head's activation deadline.
            warn!(
                fired = %fired_id,
                head = %head.meeting.id,
                "meetings were queued out of chronological order; activating queue head"
            );
            if let Some(handle) = head.activation.take() {
                self.scheduler.cancel(handle);
            }
            let inherited = self.arm_activation(fired_id, head.meeting.start);
            self.queue.set_activation(fired_id, Some(inherited));
            if let Some(entry) = self.queue.entry(fired_id) {
                if entry.meeting.end <= head.meeting.start {
                    warn!(
                        meeting_id = %fired_id,
                        end = %entry.meeting.end.to_rfc3339(),
                        inherited_start = %head.meeting.start.to_rfc3339(),
                        "inherited start is past the meeting's own end; it will close on the next tick"
                    );
                }
            }
        }

        if let Some(previous) = self.close_active() {
            warn!(meeting_id = %previous.id, "active meeting closed early by the next activation");
        }

        let now = self.now();
        let mut meeting = head.meeting;
        meeting.state = MeetingState::Active;
        meeting.activated_at = Some(now);

        self.attendance.reset(self.roster.current_roster());
        info!(
            meeting_id = %meeting.id,
            location = %meeting.location,
            end = %meeting.end.to_rfc3339(),
            absent = self.attendance.len(),
            "meeting activated"
        );
        self.active = Some(self.arm_active(meeting, now));
        self.persist();
    }

    fn remind(&self, id: &MeetingId) {
        let Some(slot) = self.active_slot_for(id) else {
            warn!(meeting_id = %id, "reminder for a meeting that is not active ignored");
            return;
        };
        let absentees = self.attendance.absentees();
        if absentees.is_empty() {
            debug!(meeting_id = %id, "everyone is present; reminder skipped");
            return;
        }
        info!(meeting_id = %id, absent = absentees.len(), "reminding absent members");
        if let Err(e) = self.notifier.notify_absentees(&absentees, &slot.meeting) {
            warn!(meeting_id = %id, error = %e, "absentee notification failed");
        }
    }

    fn stop_reminders(&mut self, id: &MeetingId, reminder: JobHandle) {
        self.scheduler.cancel(reminder);
        if let Some(slot) = self.active.as_mut().filter(|s| s.meeting.id == *id) {
            if slot.reminder == Some(reminder) {
                slot.reminder = None;
            }
            slot.reminder_stop = None;
        }
        info!(meeting_id = %id, job = %reminder, "reminders stopped");
    }

    fn close(&mut self, id: &MeetingId) {
        if self.active_slot_for(id).is_none() {
            warn!(meeting_id = %id, "close for a meeting that is not active ignored");
            return;
        }
        self.close_active();
        self.persist();
    }

    /// Empty the active slot: disarm its jobs and clear attendance.
    fn close_active(&mut self) -> Option<Meeting> {
        let slot = self.active.take()?;
        for handle in [slot.reminder, slot.reminder_stop, slot.close]
            .into_iter()
            .flatten()
        {
            self.scheduler.cancel(handle);
        }
        self.attendance.clear();
        let mut meeting = slot.meeting;
        meeting.state = MeetingState::Closed;
        info!(meeting_id = %meeting.id, "meeting closed");
        Some(meeting)
    }

    // --- job bookkeeping ---------------------------------------------------

    fn arm_activation(&self, id: &MeetingId, start: DateTime<Utc>) -> JobHandle {
        let job = MeetingJob::Activate {
            meeting: id.clone(),
        };
        self.scheduler.schedule_once(job.name(), start, job)
    }

    /// Arm the reminder pair and the close job for a meeting that became
    /// active at `activated_at`.
    fn arm_active(&self, meeting: Meeting, activated_at: DateTime<Utc>) -> ActiveSlot {
        let id = meeting.id.clone();
        let window_end = activated_at
            .checked_add_signed(self.settings.reminder_window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let (reminder, reminder_stop) = if self.now() < window_end {
            let remind = MeetingJob::Remind {
                meeting: id.clone(),
            };
            match self
                .scheduler
                .schedule_repeating(remind.name(), self.settings.reminder_interval, remind)
            {
                Ok(reminder) => {
                    let stop = MeetingJob::StopReminders {
                        meeting: id.clone(),
                        reminder,
                    };
                    let stop = self.scheduler.schedule_once(stop.name(), window_end, stop);
                    (Some(reminder), Some(stop))
                }
                Err(e) => {
                    error!(meeting_id = %id, error = %e, "could not arm reminders");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        let close = MeetingJob::Close {
            meeting: id.clone(),
        };
        let close = self.scheduler.schedule_once(close.name(), meeting.end, close);

        ActiveSlot {
            meeting,
            reminder,
            reminder_stop,
            close: Some(close),
        }
    }

    fn active_slot_for(&self, id: &MeetingId) -> Option<&ActiveSlot> {
        self.active.as_ref().filter(|slot| slot.meeting.id == *id)
    }

    // --- state access ------------------------------------------------------

    pub fn active_meeting(&self) -> Option<&Meeting> {
        self.active.as_ref().map(|slot| &slot.meeting)
    }

    pub fn is_absent(&self, member: &MemberId) -> bool {
        self.attendance.is_absent(member)
    }

    pub fn absentees(&self) -> Vec<MemberId> {
        self.attendance.absentees()
    }

    /// Handle of the running reminder job, if reminders are still going.
    pub fn reminder_job(&self) -> Option<JobHandle> {
        self.active.as_ref().and_then(|slot| slot.reminder)
    }

    pub fn scheduler(&self) -> &SchedulerHandle<MeetingJob> {
        &self.scheduler
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            queue: self.list_pending_meetings(),
            active_meeting: self.active_meeting().cloned(),
            attendance: self.attendance.absentees(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.scheduler.clock().now()
    }

    /// Best-effort write after the in-memory state has already changed.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            error!(error = %e, "snapshot save failed; in-memory state kept");
        }
    }
}
