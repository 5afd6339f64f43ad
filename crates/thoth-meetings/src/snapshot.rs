use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

use rusqlite::{Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thoth_core::MemberId;
use tracing::{debug, instrument};

use crate::db::init_db;
use crate::error::StoreError;
use crate::meeting::Meeting;

pub const SLOT_QUEUE: &str = "queue";
pub const SLOT_ACTIVE_MEETING: &str = "active_meeting";
pub const SLOT_ATTENDANCE: &str = "attendance";

/// Durable copy of the engine state: the queue in order, the active meeting
/// if any, and the members still absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub queue: Vec<Meeting>,
    #[serde(default)]
    pub active_meeting: Option<Meeting>,
    #[serde(default)]
    pub attendance: Vec<MemberId>,
}

/// Key-value store for the engine snapshot. Read once at startup, written
/// after every state change.
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, or an empty one if nothing was saved yet.
    fn load(&self) -> Result<Snapshot, StoreError>;

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Snapshot store backed by the `meeting_slots` table.
pub struct SqliteSnapshotStore {
    db: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Wrap a connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self, StoreError> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    #[instrument(skip(self))]
    fn load(&self) -> Result<Snapshot, StoreError> {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = Snapshot {
            queue: read_slot(&db, SLOT_QUEUE)?.unwrap_or_default(),
            active_meeting: read_slot(&db, SLOT_ACTIVE_MEETING)?.flatten(),
            attendance: read_slot(&db, SLOT_ATTENDANCE)?.unwrap_or_default(),
        };
        debug!(
            queued = snapshot.queue.len(),
            active = snapshot.active_meeting.is_some(),
            "snapshot loaded"
        );
        Ok(snapshot)
    }

    #[instrument(skip(self, snapshot))]
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        let tx = db.transaction()?;
        write_slot(&tx, SLOT_QUEUE, &snapshot.queue, &now)?;
        write_slot(&tx, SLOT_ACTIVE_MEETING, &snapshot.active_meeting, &now)?;
        write_slot(&tx, SLOT_ATTENDANCE, &snapshot.attendance, &now)?;
        tx.commit()?;
        Ok(())
    }
}

fn read_slot<T: DeserializeOwned>(db: &Connection, slot: &str) -> Result<Option<T>, StoreError> {
    let raw: Option<String> = db
        .query_row(
            "SELECT value FROM meeting_slots WHERE slot = ?1",
            [slot],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

fn write_slot<T: Serialize>(
    db: &Connection,
    slot: &str,
    value: &T,
    now: &str,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value)?;
    db.execute(
        "INSERT INTO meeting_slots (slot, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(slot) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![slot, json, now],
    )?;
    Ok(())
}

/// In-process store holding the serialized snapshot. Used for ephemeral runs and tests.
#[derive(Default)]
pub struct MemorySnapshotStore {
    json: Mutex<Option<String>>,
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, as if it had been saved earlier.
    pub fn with_snapshot(snapshot: &Snapshot) -> Result<Self, StoreError> {
        let store = Self::new();
        *store.json.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(serde_json::to_string(snapshot)?);
        Ok(store)
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self) -> Result<Snapshot, StoreError> {
        match self.json.lock().unwrap_or_else(|e| e.into_inner()).as_deref() {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Snapshot::default()),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)?;
        *self.json.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Lets one store be shared between the engine and whoever inspects it.
impl<S: SnapshotStore + ?Sized> SnapshotStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Snapshot, StoreError> {
        (**self).load()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        (**self).save(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meeting::MeetingState;
    use chrono::{Duration, TimeZone, Utc};

    fn sample() -> Snapshot {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut active = Meeting::new(t0, 1.0, "Room 1", "abc");
        active.state = MeetingState::Active;
        active.activated_at = Some(t0);
        Snapshot {
            queue: vec![
                Meeting::new(t0 + Duration::days(7), 1.5, "Room 2", "def"),
                Meeting::new(t0 + Duration::days(1), 0.5, "Hall", "ghi"),
            ],
            active_meeting: Some(active),
            attendance: vec![MemberId::from("u2"), MemberId::from("u3")],
        }
    }

    fn sqlite_store() -> SqliteSnapshotStore {
        SqliteSnapshotStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn sqlite_empty_store_loads_default() {
        assert_eq!(sqlite_store().load().unwrap(), Snapshot::default());
    }

    #[test]
    fn sqlite_save_load_is_fixed_point() {
        let store = sqlite_store();
        let snap = sample();
        store.save(&snap).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, snap);

        store.save(&loaded).unwrap();
        assert_eq!(store.load().unwrap(), loaded);
    }

    #[test]
    fn sqlite_overwrites_slots() {
        let store = sqlite_store();
        store.save(&sample()).unwrap();
        store.save(&Snapshot::default()).unwrap();
        assert_eq!(store.load().unwrap(), Snapshot::default());
    }

    #[test]
    fn memory_save_load_is_fixed_point() {
        let store = MemorySnapshotStore::new();
        let snap = sample();
        store.save(&snap).unwrap();
        let loaded = store.load().unwrap();
        store.save(&loaded).unwrap();
        assert_eq!(store.load().unwrap(), snap);
        assert_eq!(store.save_count(), 2);
    }

    #[test]
    fn snapshot_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json["queue"].is_array());
        assert_eq!(json["attendance"], serde_json::json!(["u2", "u3"]));
        assert_eq!(json["active_meeting"]["location"], "Room 1");
        let empty = serde_json::to_value(Snapshot::default()).unwrap();
        assert!(empty["active_meeting"].is_null());
    }
}
