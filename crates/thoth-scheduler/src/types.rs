use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Defines when and how often a job should run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Run exactly once at the given UTC instant. Instants in the past fire on the next tick.
    Once { at: DateTime<Utc> },

    /// Run repeatedly with a fixed interval in seconds until cancelled.
    Interval { every_secs: u64 },
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Once { at } => write!(f, "once at {}", at.to_rfc3339()),
            Schedule::Interval { every_secs } => write!(f, "every {every_secs}s"),
        }
    }
}

/// Opaque reference to a scheduled job, used to cancel it before it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(pub u64);

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// A job waiting in the table. Removed once it can no longer fire.
#[derive(Debug, Clone)]
pub struct Job<A> {
    pub handle: JobHandle,
    /// Human-readable label, used in logs only.
    pub name: String,
    pub schedule: Schedule,
    /// Payload handed back to the owner when the job fires.
    pub action: A,
    pub next_run: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Read-only view of a job for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub handle: JobHandle,
    pub name: String,
    pub schedule: Schedule,
    pub next_run: DateTime<Utc>,
    pub run_count: u32,
}

/// A job whose deadline has arrived, delivered to the owner for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Fired<A> {
    pub handle: JobHandle,
    pub name: String,
    pub action: A,
    pub fired_at: DateTime<Utc>,
    /// 1-based run number of this firing.
    pub run: u32,
}
