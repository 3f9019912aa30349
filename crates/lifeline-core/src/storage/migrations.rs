//! Database schema migrations for lifeline.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use indoc::indoc;
use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < CURRENT_SCHEMA_VERSION {
        debug!(from = current_version, to = CURRENT_SCHEMA_VERSION, "schema migrated");
    }
    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: habits, their relapse log, and the kv table.
///
/// Relapses live in their own append-only table keyed by `(habit_id, seq)`
/// so a patch only ever inserts rows past the current end.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(indoc! {"
        CREATE TABLE IF NOT EXISTS habits (
            id                      TEXT PRIMARY KEY,
            user_id                 TEXT NOT NULL,
            name                    TEXT NOT NULL,
            motivation              TEXT NOT NULL DEFAULT '',
            difficulty              INTEGER NOT NULL DEFAULT 1,
            start_time              INTEGER NOT NULL,
            current_lives           INTEGER NOT NULL,
            max_lives               INTEGER NOT NULL DEFAULT 3,
            last_regeneration_time  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS relapses (
            habit_id  TEXT NOT NULL,
            seq       INTEGER NOT NULL,
            at        INTEGER NOT NULL,
            PRIMARY KEY (habit_id, seq)
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_habits_user_id ON habits(user_id);
    "})?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: index for listing a user's habits newest first.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_habits_user_start ON habits(user_id, start_time DESC);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
