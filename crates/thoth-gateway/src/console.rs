//! Console stand-in for the chat platform.
//!
//! Each stdin line is `<member> <message>`. Roles live in memory and every
//! change is logged; reminders go to stdout.

use std::collections::BTreeSet;
use std::io::BufRead;
use std::sync::Mutex;

use chrono::FixedOffset;
use thoth_core::{config::RosterConfig, MemberId, ThothConfig};
use thoth_meetings::{CollaboratorError, EngineClient, Meeting, Notifier, Roster};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::render;
use crate::router::route;

/// Members from `[roster]`, with the "Not Here" role tracked in memory.
pub struct ConsoleRoster {
    members: BTreeSet<MemberId>,
    not_here: Mutex<BTreeSet<MemberId>>,
}

impl ConsoleRoster {
    pub fn new(config: &RosterConfig) -> Self {
        Self {
            members: config.members.iter().map(|m| MemberId::from(m.as_str())).collect(),
            not_here: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn has_role(&self, member: &MemberId) -> bool {
        self.not_here
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(member)
    }
}

impl Roster for ConsoleRoster {
    fn current_roster(&self) -> BTreeSet<MemberId> {
        self.members.clone()
    }

    fn set_absence_marker(&self, member: &MemberId, on: bool) -> Result<(), CollaboratorError> {
        if !self.members.contains(member) {
            return Err(CollaboratorError::new(
                "roster",
                format!("{member} is not on the roster"),
            ));
        }
        let mut roles = self.not_here.lock().unwrap_or_else(|e| e.into_inner());
        let changed = if on {
            roles.insert(member.clone())
        } else {
            roles.remove(member)
        };
        if changed {
            info!(member = %member, role = "Not Here", on, "role updated");
        }
        Ok(())
    }
}

/// Prints reminders to stdout.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_absentees(
        &self,
        members: &[MemberId],
        meeting: &Meeting,
    ) -> Result<(), CollaboratorError> {
        let names: Vec<String> = members.iter().map(|m| m.to_string()).collect();
        debug!(meeting_id = %meeting.id, count = names.len(), "printing reminder");
        println!("{}", render::reminder(&names));
        Ok(())
    }
}

/// Handle one console line. Returns the reply, or `None` when there is nothing to say.
pub async fn handle_line(
    config: &ThothConfig,
    offset: FixedOffset,
    client: &EngineClient,
    line: &str,
) -> Option<String> {
    let line = line.trim();
    let (author, text) = match line.split_once(char::is_whitespace) {
        Some((author, text)) => (MemberId::from(author), text.trim()),
        None => return None,
    };

    let command = match route(&config.commands.prefix, &author, text)? {
        Ok(command) => command,
        Err(e) => return Some(e.to_string()),
    };

    if command.is_privileged() && !config.is_organizer(author.as_str()) {
        warn!(member = %author, command = command.name(), "unauthorized command");
        return Some(render::NO_PERMISSION.to_string());
    }

    let reply = match client.send(command).await {
        Ok(outcome) => render::outcome(&outcome, offset),
        Err(e) => render::error(&e),
    };
    Some(reply)
}

/// Read stdin until EOF or Ctrl-C.
///
/// Lines are read on a plain thread so a pending read never holds up runtime
/// shutdown.
pub async fn run(
    config: &ThothConfig,
    offset: FixedOffset,
    client: EngineClient,
) -> anyhow::Result<()> {
    let (line_tx, mut line_rx) = mpsc::channel::<String>(32);
    std::thread::Builder::new()
        .name("thoth-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.blocking_send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
        })?;

    println!(
        "thoth console ready. Type `<member> {}meeting <add|signin|next|excuse|cancel|list> ...`",
        config.commands.prefix
    );

    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else {
                    info!("stdin closed");
                    break;
                };
                if let Some(reply) = handle_line(config, offset, &client, &line).await {
                    println!("{reply}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use thoth_meetings::runtime::{channel, run_engine};
    use thoth_meetings::{EngineSettings, MeetingEngine, MemorySnapshotStore};
    use thoth_scheduler::{Clock, SchedulerHandle, SystemClock};
    use tokio::sync::watch;

    fn config() -> ThothConfig {
        ThothConfig {
            roster: RosterConfig {
                members: vec!["alice".into(), "bob".into()],
                organizers: vec!["alice".into()],
            },
            ..Default::default()
        }
    }

    #[test]
    fn roster_tracks_roles() {
        let roster = ConsoleRoster::new(&config().roster);
        let bob = MemberId::from("bob");
        roster.set_absence_marker(&bob, true).unwrap();
        assert!(roster.has_role(&bob));
        roster.set_absence_marker(&bob, false).unwrap();
        assert!(!roster.has_role(&bob));
        assert!(roster
            .set_absence_marker(&MemberId::from("mallory"), true)
            .is_err());
    }

    #[tokio::test]
    async fn lines_round_trip_through_engine() {
        let config = config();
        let offset = FixedOffset::east_opt(0).unwrap();
        let scheduler = SchedulerHandle::new(Arc::new(SystemClock) as Arc<dyn Clock>);
        let engine = MeetingEngine::new(
            scheduler,
            Arc::new(ConsoleRoster::new(&config.roster)),
            Arc::new(ConsoleNotifier),
            Box::new(MemorySnapshotStore::new()),
            EngineSettings::default(),
        );
        let (_fired_tx, fired_rx) = mpsc::channel(1);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (client, requests) = channel(4);
        tokio::spawn(run_engine(engine, requests, fired_rx, shutdown_rx));

        let reply = |line: &'static str| {
            let config = config.clone();
            let client = client.clone();
            async move { handle_line(&config, offset, &client, line).await }
        };

        assert_eq!(reply("alice hello").await, None);
        assert_eq!(
            reply("bob //meeting add - in 2 hours - Room 1 - 1 - abc").await.unwrap(),
            render::NO_PERMISSION
        );
        assert!(reply("alice //meeting add - in 2 hours - Room 1 - 1 - abc")
            .await
            .unwrap()
            .starts_with("A meeting has been added on"));
        assert!(reply("bob //meeting list").await.unwrap().contains("Place: Room 1"));
        assert_eq!(
            reply("bob //meeting signin abc").await.unwrap(),
            "There is no meeting to sign into."
        );
        assert!(reply("alice //meeting cancel")
            .await
            .unwrap()
            .starts_with("The next meeting"));
        assert_eq!(
            reply("alice //meeting next").await.unwrap(),
            "No meetings are scheduled."
        );
    }
}
