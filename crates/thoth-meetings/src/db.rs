use rusqlite::Connection;

use crate::error::StoreError;

/// Initialise the meeting snapshot schema in `conn`.
///
/// One row per named slot (`queue`, `active_meeting`, `attendance`), each
/// holding the JSON encoding of its current value. Idempotent.
pub fn init_db(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS meeting_slots (
            slot        TEXT    NOT NULL PRIMARY KEY,
            value       TEXT    NOT NULL,   -- JSON
            updated_at  TEXT    NOT NULL    -- ISO-8601
        ) STRICT;
        ",
    )?;
    Ok(())
}
