use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How often absent members are pinged while a meeting is active (3 minutes).
pub const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 180;
/// How long after activation the reminders keep going (20 minutes).
pub const DEFAULT_REMINDER_WINDOW_SECS: u64 = 20 * 60;
/// Scheduler polling cadence.
pub const DEFAULT_TICK_MILLIS: u64 = 1_000;
pub const DEFAULT_COMMAND_PREFIX: &str = "//";

/// Top-level config (thoth.toml + THOTH_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThothConfig {
    #[serde(default)]
    pub meetings: MeetingsConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub roster: RosterConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

/// Timing knobs for the meeting lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingsConfig {
    #[serde(default = "default_reminder_interval")]
    pub reminder_interval_secs: u64,
    /// Reminders stop this long after activation, independent of the meeting end.
    #[serde(default = "default_reminder_window")]
    pub reminder_window_secs: u64,
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
    /// Fixed offset applied to start times typed without a zone (e.g. "2026-03-01 18:00").
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for MeetingsConfig {
    fn default() -> Self {
        Self {
            reminder_interval_secs: DEFAULT_REMINDER_INTERVAL_SECS,
            reminder_window_secs: DEFAULT_REMINDER_WINDOW_SECS,
            tick_millis: DEFAULT_TICK_MILLIS,
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl DatabaseConfig {
    /// Create the directory holding the database file if it is missing.
    pub fn ensure_parent_dir(&self) -> crate::error::Result<()> {
        if let Some(parent) = std::path::Path::new(&self.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

/// Members known to the console adapter.
///
/// `organizers` may schedule, cancel and excuse. They must also appear in
/// `members` to be counted for attendance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub organizers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

fn default_reminder_interval() -> u64 {
    DEFAULT_REMINDER_INTERVAL_SECS
}
fn default_reminder_window() -> u64 {
    DEFAULT_REMINDER_WINDOW_SECS
}
fn default_tick_millis() -> u64 {
    DEFAULT_TICK_MILLIS
}
fn default_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.thoth/thoth.db", home)
}

impl ThothConfig {
    /// Load config from a TOML file with THOTH_* env var overrides.
    ///
    /// Nested keys use a double underscore so that field names keep their own
    /// underscores: `THOTH_MEETINGS__REMINDER_INTERVAL_SECS=60`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        debug!(path = %path, "loading config");

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::ThothError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("THOTH_").split("__"))
    }

    pub fn is_organizer(&self, member: &str) -> bool {
        self.roster.organizers.iter().any(|o| o == member)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.thoth/thoth.toml", home)
}
