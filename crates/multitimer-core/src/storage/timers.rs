//! SQLite-backed timer store.
//!
//! The store is the single source of truth for timer records. Writes are
//! per-field: callers compose an action out of the small setters and then
//! recompute the alarm from a fresh read, so two views never disagree
//! about what is persisted.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::warn;

use crate::error::{InvalidRecord, StoreError};
use crate::timer::{TimerRecord, MAX_DURATION_MS};

use super::{data_dir, migrations, DB_FILE};

/// Persistent store of timer records.
pub struct TimerStore {
    conn: Connection,
}

impl TimerStore {
    /// Opens (or creates) the store in the data directory.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join(DB_FILE);
        Self::open_at(&path)
    }

    /// Opens (or creates) the store at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = open_connection(path)?;
        Ok(Self { conn })
    }

    /// In-memory store, for tests.
    #[cfg(any(test, feature = "test-support"))]
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// In-memory store without a schema, for exercising read failures.
    #[cfg(any(test, feature = "test-support"))]
    pub fn open_memory_unmigrated() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Creates a timer: stopped, notifications on, full time remaining.
    pub fn create(&self, name: &str, duration_ms: i64) -> Result<TimerRecord, StoreError> {
        validate_definition(name, duration_ms)?;
        self.conn.execute(
            "INSERT INTO timers (name, duration_ms, remaining_ms, is_running, notify_enabled, started_at)
             VALUES (?1, ?2, ?2, 0, 1, NULL)",
            params![name, duration_ms],
        )?;
        Ok(TimerRecord {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            duration_ms,
            remaining_ms: duration_ms,
            is_running: false,
            notify_enabled: true,
            started_at: None,
        })
    }

    /// All timers, ordered by id (creation order).
    pub fn list(&self) -> Result<Vec<TimerRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, duration_ms, remaining_ms, is_running, notify_enabled, started_at
             FROM timers ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_record)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get(&self, id: i64) -> Result<TimerRecord, StoreError> {
        match self.conn.query_row(
            "SELECT id, name, duration_ms, remaining_ms, is_running, notify_enabled, started_at
             FROM timers WHERE id = ?1",
            [id],
            row_to_record,
        ) {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_running(&self, id: i64, running: bool) -> Result<(), StoreError> {
        let n = self.conn.execute(
            "UPDATE timers SET is_running = ?1 WHERE id = ?2",
            params![running, id],
        )?;
        ensure_found(n, id)
    }

    pub fn set_remaining(&self, id: i64, remaining_ms: i64) -> Result<(), StoreError> {
        if remaining_ms < 0 {
            return Err(InvalidRecord::NegativeRemaining { remaining_ms }.into());
        }
        let n = self.conn.execute(
            "UPDATE timers SET remaining_ms = ?1 WHERE id = ?2",
            params![remaining_ms, id],
        )?;
        ensure_found(n, id)
    }

    pub fn set_started_at(
        &self,
        id: i64,
        started_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let n = self.conn.execute(
            "UPDATE timers SET started_at = ?1 WHERE id = ?2",
            params![started_at.map(|t| t.to_rfc3339()), id],
        )?;
        ensure_found(n, id)
    }

    pub fn set_notify_enabled(&self, id: i64, enabled: bool) -> Result<(), StoreError> {
        let n = self.conn.execute(
            "UPDATE timers SET notify_enabled = ?1 WHERE id = ?2",
            params![enabled, id],
        )?;
        ensure_found(n, id)
    }

    /// Renames a timer and replaces its duration.
    ///
    /// Applies reset semantics: the countdown stops and winds back to the
    /// new full duration, since a remaining time carried over from the old
    /// definition would be meaningless.
    pub fn update_definition(
        &self,
        id: i64,
        name: &str,
        duration_ms: i64,
    ) -> Result<TimerRecord, StoreError> {
        validate_definition(name, duration_ms)?;
        let n = self.conn.execute(
            "UPDATE timers
             SET name = ?1, duration_ms = ?2, remaining_ms = ?2, is_running = 0, started_at = NULL
             WHERE id = ?3",
            params![name, duration_ms, id],
        )?;
        ensure_found(n, id)?;
        self.get(id)
    }

    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        let n = self.conn.execute("DELETE FROM timers WHERE id = ?1", [id])?;
        ensure_found(n, id)
    }
}

/// Opens a connection and brings the schema up to date.
pub(crate) fn open_connection(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
        path: PathBuf::from(path),
        source,
    })?;
    migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
    Ok(conn)
}

fn ensure_found(rows_changed: usize, id: i64) -> Result<(), StoreError> {
    if rows_changed == 0 {
        Err(StoreError::NotFound(id))
    } else {
        Ok(())
    }
}

fn validate_definition(name: &str, duration_ms: i64) -> Result<(), InvalidRecord> {
    if name.trim().is_empty() {
        return Err(InvalidRecord::EmptyName);
    }
    if duration_ms <= 0 {
        return Err(InvalidRecord::NonPositiveDuration { duration_ms });
    }
    if duration_ms > MAX_DURATION_MS {
        return Err(InvalidRecord::DurationTooLong { duration_ms });
    }
    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<TimerRecord> {
    let started_at: Option<String> = row.get(6)?;
    Ok(TimerRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        duration_ms: row.get(2)?,
        remaining_ms: row.get(3)?,
        is_running: row.get(4)?,
        notify_enabled: row.get(5)?,
        started_at: started_at.and_then(parse_anchor),
    })
}

fn parse_anchor(raw: String) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            warn!(timestamp = %raw, error = %e, "ignoring unparseable start anchor");
            None
        }
    }
}
