//! The task that owns the [`MeetingEngine`].
//!
//! Commands and fired scheduler jobs arrive on two channels and are applied
//! one at a time, so no operation ever observes another half-done.

use thoth_scheduler::Fired;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::command::{dispatch, Command, Outcome};
use crate::engine::MeetingEngine;
use crate::error::{MeetingError, Result};
use crate::job::MeetingJob;

/// A command plus the channel its result goes back on.
#[derive(Debug)]
pub struct EngineRequest {
    pub command: Command,
    pub reply: oneshot::Sender<Result<Outcome>>,
}

/// Cloneable sender side used by adapters.
#[derive(Debug, Clone)]
pub struct EngineClient {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineClient {
    /// Send `command` to the engine task and wait for its result.
    ///
    /// Returns [`MeetingError::EngineUnavailable`] once the task has stopped.
    pub async fn send(&self, command: Command) -> Result<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineRequest { command, reply })
            .await
            .map_err(|_| MeetingError::EngineUnavailable)?;
        rx.await.map_err(|_| MeetingError::EngineUnavailable)?
    }
}

/// Create the request channel for [`run_engine`].
pub fn channel(capacity: usize) -> (EngineClient, mpsc::Receiver<EngineRequest>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EngineClient { tx }, rx)
}

/// Drive `engine` until shutdown or until both input channels close.
///
/// Returns the engine so the caller can inspect its final state.
pub async fn run_engine(
    mut engine: MeetingEngine,
    mut requests: mpsc::Receiver<EngineRequest>,
    mut fired: mpsc::Receiver<Fired<MeetingJob>>,
    mut shutdown: watch::Receiver<bool>,
) -> MeetingEngine {
    info!("meeting engine started");
    let mut requests_open = true;
    let mut fired_open = true;

    while requests_open || fired_open {
        tokio::select! {
            req = requests.recv(), if requests_open => match req {
                Some(EngineRequest { command, reply }) => {
                    let name = command.name();
                    let result = dispatch(&mut engine, command);
                    if let Err(ref e) = result {
                        debug!(command = name, code = e.code(), "command rejected");
                    }
                    if reply.send(result).is_err() {
                        warn!(command = name, "caller went away before the reply");
                    }
                }
                None => requests_open = false,
            },
            job = fired.recv(), if fired_open => match job {
                Some(job) => engine.handle_fired(job),
                None => {
                    warn!("scheduler channel closed; no more deadlines will fire");
                    fired_open = false;
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("meeting engine stopped");
    engine
}
