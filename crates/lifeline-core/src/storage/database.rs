//! SQLite-based habit storage.
//!
//! Provides persistent storage for:
//! - Habit records and their append-only relapse log
//! - Key-value store for per-user state (rank watermark)
//!
//! Patches run inside an `IMMEDIATE` transaction: the row is read, guarded
//! and written while SQLite holds the write lock, so two processes sharing
//! the file cannot interleave a relapse and a regeneration on stale state.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tokio::sync::broadcast;
use tracing::debug;

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result, StoreError};
use crate::habit::{Difficulty, HabitPatch, HabitRecord};
use crate::store::{ChangeNotice, HabitStore, PreferenceStore, CHANGE_CHANNEL_CAPACITY};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_HABIT: &str = "SELECT id, user_id, name, motivation, difficulty, start_time,
        current_lives, max_lives, last_regeneration_time
 FROM habits";

/// SQLite database for habit storage.
pub struct Database {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<ChangeNotice>,
}

impl Database {
    /// Open the database at `<data_dir>/lifeline.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("lifeline.db");
        Ok(Self::open_at(&path)?)
    }

    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            conn: Mutex::new(conn),
            changes,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notice: ChangeNotice) {
        let _ = self.changes.send(notice);
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HabitRecord> {
    Ok(HabitRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        motivation: row.get(3)?,
        difficulty: Difficulty::from(row.get::<_, i64>(4)?),
        start_time: row.get(5)?,
        current_lives: row.get(6)?,
        max_lives: row.get(7)?,
        relapse_history: Vec::new(),
        last_regeneration_anchor: row.get(8)?,
    })
}

/// Type mismatches in a row mean the stored data is bad, not the query.
fn decode_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => StoreError::Corrupt(err.to_string()),
        other => other.into(),
    }
}

fn load_relapses(conn: &Connection, habit_id: &str) -> rusqlite::Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT at FROM relapses WHERE habit_id = ?1 ORDER BY seq")?;
    let rows = stmt.query_map(params![habit_id], |row| row.get::<_, i64>(0))?;
    rows.collect()
}

fn load_habit(conn: &Connection, id: &str) -> Result<Option<HabitRecord>, StoreError> {
    let sql = format!("{SELECT_HABIT} WHERE id = ?1");
    let found = conn
        .query_row(&sql, params![id], record_from_row)
        .optional()
        .map_err(decode_error)?;
    match found {
        Some(mut record) => {
            record.relapse_history = load_relapses(conn, &record.id).map_err(decode_error)?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

fn insert_relapses(
    conn: &Connection,
    habit_id: &str,
    history: &[i64],
    from: usize,
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare("INSERT INTO relapses (habit_id, seq, at) VALUES (?1, ?2, ?3)")?;
    for (seq, at) in history.iter().enumerate().skip(from) {
        stmt.execute(params![habit_id, seq as i64, at])?;
    }
    Ok(())
}

impl HabitStore for Database {
    fn create(&self, record: &HabitRecord) -> Result<(), StoreError> {
        {
            let mut conn = self.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM habits WHERE id = ?1)",
                params![record.id],
                |row| row.get(0),
            )?;
            if exists {
                return Err(StoreError::AlreadyExists(record.id.clone()));
            }
            tx.execute(
                "INSERT INTO habits (id, user_id, name, motivation, difficulty, start_time,
                                     current_lives, max_lives, last_regeneration_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.owner_id,
                    record.name,
                    record.motivation,
                    i64::from(record.difficulty),
                    record.start_time,
                    record.current_lives,
                    record.max_lives,
                    record.last_regeneration_anchor,
                ],
            )?;
            insert_relapses(&tx, &record.id, &record.relapse_history, 0)?;
            tx.commit()?;
        }
        debug!(habit_id = %record.id, "habit created");
        self.notify(ChangeNotice::Upserted(record.clone()));
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<HabitRecord>, StoreError> {
        let conn = self.lock();
        load_habit(&conn, id)
    }

    fn list_for_owner(&self, owner_id: &str) -> Result<Vec<HabitRecord>, StoreError> {
        let conn = self.lock();
        let sql = format!("{SELECT_HABIT} WHERE user_id = ?1 ORDER BY start_time DESC, id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner_id], record_from_row)?;
        let mut records = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(decode_error)?;
        for record in &mut records {
            record.relapse_history = load_relapses(&conn, &record.id).map_err(decode_error)?;
        }
        Ok(records)
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let owner_id = {
            let mut conn = self.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let owner_id: Option<String> = tx
                .query_row(
                    "SELECT user_id FROM habits WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            if owner_id.is_some() {
                tx.execute("DELETE FROM relapses WHERE habit_id = ?1", params![id])?;
                tx.execute("DELETE FROM habits WHERE id = ?1", params![id])?;
            }
            tx.commit()?;
            owner_id
        };
        match owner_id {
            Some(owner_id) => {
                debug!(habit_id = id, "habit deleted");
                self.notify(ChangeNotice::Removed {
                    id: id.to_string(),
                    owner_id,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn apply(&self, id: &str, patch: &HabitPatch) -> Result<HabitRecord, StoreError> {
        let updated = {
            let mut conn = self.lock();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut record =
                load_habit(&tx, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let logged = record.relapse_history.len();
            patch
                .apply_to(&mut record)
                .map_err(|reason| StoreError::Rejected {
                    id: id.to_string(),
                    reason,
                })?;
            tx.execute(
                "UPDATE habits SET current_lives = ?2, last_regeneration_time = ?3 WHERE id = ?1",
                params![id, record.current_lives, record.last_regeneration_anchor],
            )?;
            insert_relapses(&tx, id, &record.relapse_history, logged)?;
            tx.commit()?;
            record
        };
        self.notify(ChangeNotice::Upserted(updated.clone()));
        Ok(updated)
    }

    fn changes(&self) -> broadcast::Receiver<ChangeNotice> {
        self.changes.subscribe()
    }
}

impl PreferenceStore for Database {
    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock().execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}
