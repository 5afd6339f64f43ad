#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use thoth_core::MemberId;
use thoth_meetings::{
    CollaboratorError, EngineSettings, Meeting, MeetingEngine, MeetingJob, MemorySnapshotStore,
    Notifier, Roster, SnapshotStore,
};
use thoth_scheduler::{Clock, ManualClock, SchedulerHandle};

/// Fixed roster that remembers which members carry the absence marker.
pub struct RecordingRoster {
    members: BTreeSet<MemberId>,
    pub markers: Mutex<BTreeSet<MemberId>>,
}

impl RecordingRoster {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            members: ids.iter().map(|id| MemberId::from(*id)).collect(),
            markers: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn marked(&self) -> BTreeSet<MemberId> {
        self.markers.lock().unwrap().clone()
    }
}

impl Roster for RecordingRoster {
    fn current_roster(&self) -> BTreeSet<MemberId> {
        self.members.clone()
    }

    fn set_absence_marker(&self, member: &MemberId, on: bool) -> Result<(), CollaboratorError> {
        let mut markers = self.markers.lock().unwrap();
        if on {
            markers.insert(member.clone());
        } else {
            markers.remove(member);
        }
        Ok(())
    }
}

/// Records every reminder batch.
#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<Vec<MemberId>>>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<Vec<MemberId>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_absentees(
        &self,
        members: &[MemberId],
        _meeting: &Meeting,
    ) -> Result<(), CollaboratorError> {
        self.calls.lock().unwrap().push(members.to_vec());
        Ok(())
    }
}

/// Everything a test needs to drive an engine by hand.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub scheduler: SchedulerHandle<MeetingJob>,
    pub roster: Arc<RecordingRoster>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemorySnapshotStore>,
    pub engine: MeetingEngine,
}

impl Harness {
    pub fn new(members: &[&str]) -> Self {
        Self::with_store(members, Arc::new(MemorySnapshotStore::new()))
    }

    pub fn with_store(members: &[&str], store: Arc<MemorySnapshotStore>) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let scheduler = SchedulerHandle::new(clock.clone() as Arc<dyn Clock>);
        let roster = Arc::new(RecordingRoster::new(members));
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = MeetingEngine::new(
            scheduler.clone(),
            roster.clone(),
            notifier.clone(),
            Box::new(store.clone()),
            EngineSettings::default(),
        );
        Self {
            clock,
            scheduler,
            roster,
            notifier,
            store,
            engine,
        }
    }

    /// Rebuild an engine from whatever `store` holds, with the clock at `now`.
    pub fn restore(members: &[&str], store: Arc<MemorySnapshotStore>, now: DateTime<Utc>) -> Self {
        let clock = Arc::new(ManualClock::new(now));
        let scheduler = SchedulerHandle::new(clock.clone() as Arc<dyn Clock>);
        let roster = Arc::new(RecordingRoster::new(members));
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = MeetingEngine::restore(
            scheduler.clone(),
            roster.clone(),
            notifier.clone(),
            Box::new(store.clone()),
            EngineSettings::default(),
        )
        .unwrap();
        Self {
            clock,
            scheduler,
            roster,
            notifier,
            store,
            engine,
        }
    }

    /// Move the clock forward and apply every job that came due.
    pub fn advance(&mut self, by: Duration) {
        let now = self.clock.advance(by);
        for fired in self.scheduler.due(now) {
            self.engine.handle_fired(fired);
        }
    }

    /// Advance in `step` increments so repeating jobs fire at each interval.
    pub fn advance_in_steps(&mut self, total: Duration, step: Duration) {
        let mut elapsed = Duration::zero();
        while elapsed < total {
            self.advance(step);
            elapsed = elapsed + step;
        }
    }

    pub fn saved(&self) -> thoth_meetings::Snapshot {
        self.store.load().unwrap()
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 0).unwrap()
}

pub fn fields(start: DateTime<Utc>, location: &str, hours: &str, password: &str) -> Vec<String> {
    vec![
        start.to_rfc3339(),
        location.to_string(),
        hours.to_string(),
        password.to_string(),
    ]
}

pub fn member(id: &str) -> MemberId {
    MemberId::from(id)
}

pub fn members(ids: &[&str]) -> BTreeSet<MemberId> {
    ids.iter().map(|id| MemberId::from(*id)).collect()
}
