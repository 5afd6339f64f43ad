//! `thoth-scheduler`: Tokio-based deadline scheduler.
//!
//! # Overview
//!
//! Owners add jobs through a cloneable [`engine::SchedulerHandle`], each
//! carrying an arbitrary payload `A`. The [`engine::SchedulerEngine`] polls
//! the shared job table every tick and sends a [`types::Fired`] copy of every
//! due job over an mpsc channel, so the owner executes callbacks on its own
//! task. The scheduler knows nothing about what the payload means.
//!
//! # Schedule variants
//!
//! | Variant    | Behaviour                                      |
//! |------------|------------------------------------------------|
//! | `Once`     | Single fire at an absolute UTC instant         |
//! | `Interval` | Repeat every N seconds until cancelled         |

pub mod clock;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{SchedulerEngine, SchedulerHandle};
pub use error::{Result, SchedulerError};
pub use types::{Fired, Job, JobHandle, JobSummary, Schedule};
