use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    error::{Result, SchedulerError},
    schedule::{compute_next_run, first_run},
    types::{Fired, Job, JobHandle, JobSummary, Schedule},
};

struct JobTable<A> {
    jobs: BTreeMap<JobHandle, Job<A>>,
    next_id: u64,
}

/// Shared handle for job management (add/cancel/list) while the engine loop runs.
///
/// Cloning is cheap; every clone edits the same job table. Jobs are kept in
/// memory only, so nothing survives a restart: owners re-arm what they need
/// when they rehydrate.
pub struct SchedulerHandle<A> {
    table: Arc<Mutex<JobTable<A>>>,
    clock: Arc<dyn Clock>,
}

impl<A> Clone for SchedulerHandle<A> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<A: Clone> SchedulerHandle<A> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Arc::new(Mutex::new(JobTable {
                jobs: BTreeMap::new(),
                next_id: 1,
            })),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Fire `action` once at `at`. A past `at` fires on the next tick.
    pub fn schedule_once(&self, name: &str, at: DateTime<Utc>, action: A) -> JobHandle {
        self.add_job(name, Schedule::Once { at }, action)
    }

    /// Fire `action` every `every` until the returned handle is cancelled.
    pub fn schedule_repeating(
        &self,
        name: &str,
        every: std::time::Duration,
        action: A,
    ) -> Result<JobHandle> {
        let every_secs = every.as_secs();
        if every_secs == 0 {
            return Err(SchedulerError::InvalidSchedule(format!(
                "repeat interval for {name} must be at least one second"
            )));
        }
        if crate::schedule::interval(every_secs).is_none() {
            return Err(SchedulerError::InvalidSchedule(format!(
                "repeat interval for {name} is too large"
            )));
        }
        Ok(self.add_job(name, Schedule::Interval { every_secs }, action))
    }

    fn add_job(&self, name: &str, schedule: Schedule, action: A) -> JobHandle {
        let now = self.clock.now();
        let next_run = first_run(&schedule, now);
        let mut table = self.lock();
        let handle = JobHandle(table.next_id);
        table.next_id += 1;
        debug!(job = %handle, %name, %schedule, next_run = %next_run.to_rfc3339(), "job added");
        table.jobs.insert(
            handle,
            Job {
                handle,
                name: name.to_string(),
                schedule,
                action,
                next_run,
                last_run: None,
                run_count: 0,
                created_at: now,
            },
        );
        handle
    }

    /// Cancel a job. Returns `false` when the handle is unknown or the
    /// one-shot job already fired, which is not an error.
    pub fn cancel(&self, handle: JobHandle) -> bool {
        match self.lock().jobs.remove(&handle) {
            Some(job) => {
                debug!(job = %handle, name = %job.name, "job cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, handle: JobHandle) -> bool {
        self.lock().jobs.contains_key(&handle)
    }

    /// Return all waiting jobs ordered by creation.
    pub fn list_jobs(&self) -> Vec<JobSummary> {
        self.lock()
            .jobs
            .values()
            .map(|job| JobSummary {
                handle: job.handle,
                name: job.name.clone(),
                schedule: job.schedule.clone(),
                next_run: job.next_run,
                run_count: job.run_count,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect every job whose deadline is at or before `now`.
    ///
    /// One-shot jobs leave the table; interval jobs are pushed to their next
    /// deadline. A repeating job fires at most once per call even if several
    /// intervals were missed.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<Fired<A>> {
        let mut table = self.lock();
        let ready: Vec<JobHandle> = table
            .jobs
            .values()
            .filter(|job| job.next_run <= now)
            .map(|job| job.handle)
            .collect();

        let mut fired = Vec::with_capacity(ready.len());
        for handle in ready {
            let Some(job) = table.jobs.get_mut(&handle) else {
                continue;
            };
            job.run_count += 1;
            job.last_run = Some(now);
            fired.push(Fired {
                handle,
                name: job.name.clone(),
                action: job.action.clone(),
                fired_at: now,
                run: job.run_count,
            });
            match compute_next_run(&job.schedule, now) {
                Some(next) => job.next_run = next,
                None => {
                    table.jobs.remove(&handle);
                }
            }
        }
        fired
    }

    fn lock(&self) -> MutexGuard<'_, JobTable<A>> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Core scheduler loop: drives job execution at tick precision (1 s by default).
pub struct SchedulerEngine<A> {
    handle: SchedulerHandle<A>,
    /// Fired jobs are sent here for execution by their owner.
    fired_tx: mpsc::Sender<Fired<A>>,
    tick: std::time::Duration,
}

impl<A: Clone + Send + 'static> SchedulerEngine<A> {
    pub fn new(handle: SchedulerHandle<A>, fired_tx: mpsc::Sender<Fired<A>>) -> Self {
        Self {
            handle,
            fired_tx,
            tick: std::time::Duration::from_secs(1),
        }
    }

    pub fn with_tick(mut self, tick: std::time::Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Main event loop. Polls every tick until `shutdown` broadcasts `true`
    /// (or its sender is dropped) or the receiving side of the fired channel
    /// goes away.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_ms = self.tick.as_millis() as u64, "scheduler engine started");

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !self.tick_once().await {
                        warn!("fired-job receiver closed; scheduler engine stopping");
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Forward all due jobs. Returns `false` when the receiver is gone.
    ///
    /// Waits for channel capacity instead of dropping, so every deadline is
    /// delivered exactly once.
    async fn tick_once(&self) -> bool {
        let now = self.handle.clock().now();
        for fired in self.handle.due(now) {
            info!(job = %fired.handle, name = %fired.name, run = fired.run, "job fired");
            if self.fired_tx.send(fired).await.is_err() {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;

    fn handle_at(t0: DateTime<Utc>) -> (Arc<ManualClock>, SchedulerHandle<&'static str>) {
        let clock = Arc::new(ManualClock::new(t0));
        let handle = SchedulerHandle::new(clock.clone() as Arc<dyn Clock>);
        (clock, handle)
    }

    #[test]
    fn once_fires_exactly_once() {
        let t0 = Utc::now();
        let (_clock, sched) = handle_at(t0);
        let h = sched.schedule_once("a", t0 + Duration::minutes(10), "a");

        assert!(sched.due(t0 + Duration::minutes(9)).is_empty());
        let fired = sched.due(t0 + Duration::minutes(10));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].handle, h);
        assert_eq!(fired[0].action, "a");
        assert!(sched.due(t0 + Duration::minutes(20)).is_empty());
        assert!(!sched.is_scheduled(h));
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let t0 = Utc::now();
        let (_clock, sched) = handle_at(t0);
        let h = sched.schedule_once("a", t0, "a");
        assert_eq!(sched.due(t0).len(), 1);
        assert!(!sched.cancel(h));
    }

    #[test]
    fn cancelled_job_never_fires() {
        let t0 = Utc::now();
        let (_clock, sched) = handle_at(t0);
        let h = sched.schedule_once("a", t0 + Duration::seconds(1), "a");
        assert!(sched.cancel(h));
        assert!(sched.due(t0 + Duration::hours(1)).is_empty());
    }

    #[test]
    fn repeating_fires_until_cancelled() {
        let t0 = Utc::now();
        let (_clock, sched) = handle_at(t0);
        let h = sched
            .schedule_repeating("tick", std::time::Duration::from_secs(60), "tick")
            .unwrap();

        let mut now = t0;
        for run in 1..=3 {
            now += Duration::seconds(60);
            let fired = sched.due(now);
            assert_eq!(fired.len(), 1);
            assert_eq!(fired[0].run, run);
        }
        assert!(sched.cancel(h));
        assert!(sched.due(now + Duration::hours(1)).is_empty());
    }

    #[test]
    fn zero_interval_rejected() {
        let (_clock, sched) = handle_at(Utc::now());
        let err = sched
            .schedule_repeating("bad", std::time::Duration::from_millis(500), "bad")
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidSchedule(_)));
        assert!(sched.is_empty());
    }

    #[test]
    fn oversized_interval_rejected() {
        let (_clock, sched) = handle_at(Utc::now());
        let err = sched
            .schedule_repeating("bad", std::time::Duration::from_secs(u64::MAX), "bad")
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidSchedule(_)));
        assert!(sched.is_empty());
    }

    #[test]
    fn same_deadline_each_fire_once_in_creation_order() {
        let t0 = Utc::now();
        let (_clock, sched) = handle_at(t0);
        sched.schedule_once("a", t0, "a");
        sched.schedule_once("b", t0, "b");
        let fired: Vec<_> = sched.due(t0).into_iter().map(|f| f.action).collect();
        assert_eq!(fired, vec!["a", "b"]);
    }

    #[test]
    fn list_jobs_reports_pending() {
        let t0 = Utc::now();
        let (_clock, sched) = handle_at(t0);
        sched.schedule_once("close", t0 + Duration::hours(1), "close");
        let jobs = sched.list_jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "close");
        assert_eq!(jobs[0].run_count, 0);
    }

    #[tokio::test]
    async fn engine_forwards_due_jobs_and_stops_on_shutdown() {
        let t0 = Utc::now();
        let (clock, sched) = handle_at(t0);
        let (tx, mut rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        sched.schedule_once("later", t0 + Duration::minutes(5), "later");
        let engine = SchedulerEngine::new(sched.clone(), tx)
            .with_tick(std::time::Duration::from_millis(10));
        let task = tokio::spawn(engine.run(shutdown_rx));

        clock.advance(Duration::minutes(5));
        let fired = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("job should fire")
            .expect("channel open");
        assert_eq!(fired.action, "later");

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(2), task)
            .await
            .expect("engine should stop")
            .unwrap();
    }
}
