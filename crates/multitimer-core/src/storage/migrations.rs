//! Database schema migrations.
//!
//! Migrations are versioned and applied automatically when a connection
//! is opened. The `schema_version` table tracks the current version, so
//! upgrades run exactly once and reopening is idempotent.

use rusqlite::{Connection, Result as SqliteResult};

/// Schema version the code expects.
pub const SCHEMA_VERSION: i32 = 2;

/// Applies any pending migrations to the database.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;
    let current = get_schema_version(conn)?;
    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }
    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    Ok(())
}

fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0)) {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// v1: the timers table.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS timers (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            name           TEXT NOT NULL,
            duration_ms    INTEGER NOT NULL,
            remaining_ms   INTEGER NOT NULL,
            is_running     INTEGER NOT NULL DEFAULT 0,
            notify_enabled INTEGER NOT NULL DEFAULT 1,
            started_at     TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_timers_running ON timers(is_running);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// v2: the single-row wake-up slot.
///
/// The CHECK pins the key to 0 so `INSERT OR REPLACE` can never grow the
/// table past one pending wake-up.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS wake_slot (
            slot     INTEGER PRIMARY KEY CHECK (slot = 0),
            deadline TEXT NOT NULL,
            label    TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
