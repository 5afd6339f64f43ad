use std::sync::Arc;

use clap::Parser;
use thoth_core::ThothConfig;
use thoth_meetings::{
    runtime, EngineSettings, MeetingEngine, MeetingJob, MemorySnapshotStore, SnapshotStore,
    SqliteSnapshotStore,
};
use thoth_scheduler::{Clock, SchedulerEngine, SchedulerHandle, SystemClock};
use tracing::info;

mod console;
mod render;
mod router;

#[derive(Parser)]
#[command(name = "thoth-gateway", version, about = "Meeting lifecycle bot (console adapter)")]
struct Cli {
    /// Config file (defaults to $THOTH_CONFIG, then ~/.thoth/thoth.toml)
    #[arg(long)]
    config: Option<String>,

    /// SQLite database path, overriding [database].path
    #[arg(long)]
    db: Option<String>,

    /// Keep state in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "thoth_gateway=info,thoth_meetings=info,thoth_scheduler=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > THOTH_CONFIG env > ~/.thoth/thoth.toml
    let config_path = cli.config.or_else(|| std::env::var("THOTH_CONFIG").ok());
    let mut config = ThothConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        ThothConfig::default()
    });
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    if config.roster.members.is_empty() {
        tracing::warn!("[roster].members is empty; activations will mark nobody absent");
    }

    let store = open_store(&config, cli.ephemeral)?;
    let settings = EngineSettings::from_config(&config.meetings);
    let offset = settings.utc_offset;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = SchedulerHandle::<MeetingJob>::new(clock);
    let engine = MeetingEngine::restore(
        scheduler.clone(),
        Arc::new(console::ConsoleRoster::new(&config.roster)),
        Arc::new(console::ConsoleNotifier),
        store,
        settings,
    )?;

    // Fired-job channel: SchedulerEngine → engine task
    let (fired_tx, fired_rx) = tokio::sync::mpsc::channel(256);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let tick = std::time::Duration::from_millis(config.meetings.tick_millis.max(10));
    let scheduler_engine = SchedulerEngine::new(scheduler, fired_tx).with_tick(tick);
    let scheduler_task = tokio::spawn(scheduler_engine.run(shutdown_rx.clone()));

    let (client, requests) = runtime::channel(64);
    let engine_task = tokio::spawn(runtime::run_engine(engine, requests, fired_rx, shutdown_rx));

    console::run(&config, offset, client).await?;

    // signal scheduler and engine to stop
    let _ = shutdown_tx.send(true);
    scheduler_task.await?;
    let engine = engine_task.await?;
    info!(
        pending = engine.list_pending_meetings().len(),
        active = engine.active_meeting().is_some(),
        "thoth gateway stopped"
    );
    Ok(())
}

/// SQLite store at the configured path, or an in-memory one for `--ephemeral`.
fn open_store(config: &ThothConfig, ephemeral: bool) -> anyhow::Result<Box<dyn SnapshotStore>> {
    if ephemeral {
        info!("ephemeral mode: meeting state will not be saved");
        return Ok(Box::new(MemorySnapshotStore::new()));
    }

    config.database.ensure_parent_dir()?;
    let db_path = &config.database.path;
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(Box::new(SqliteSnapshotStore::new(db)?))
}
