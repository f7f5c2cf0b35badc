//! SQLite backend shared by the group registry and the counter store.

use countbot_core::error::{CountBotError, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS groups (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS selected_groups (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS group_members (
        group_id TEXT NOT NULL,
        participant_id TEXT NOT NULL,
        PRIMARY KEY (group_id, participant_id)
    );
    CREATE TABLE IF NOT EXISTS member_snapshots (
        group_id TEXT PRIMARY KEY,
        taken_on TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS daily_counters (
        group_id TEXT NOT NULL,
        date TEXT NOT NULL,
        entries INTEGER NOT NULL DEFAULT 0 CHECK (entries >= 0),
        exits INTEGER NOT NULL DEFAULT 0 CHECK (exits >= 0),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (group_id, date)
    );
    CREATE INDEX IF NOT EXISTS idx_daily_counters_date ON daily_counters(date);
";

/// Registry and counter store in one SQLite database.
///
/// The connection mutex is held for a single statement (or a single
/// transaction for group sync) and never across an await point.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    group_prefix: String,
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path, group_prefix: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        conn.busy_timeout(std::time::Duration::from_secs(5)).map_err(db_err)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(db_err)?;
        let store = Self::with_connection(conn, group_prefix)?;
        tracing::debug!("🗄️ Counter store opened: {}", path.display());
        Ok(store)
    }

    /// Throwaway database, mostly for tests and dry runs.
    pub fn open_in_memory(group_prefix: &str) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn, group_prefix)
    }

    fn with_connection(conn: Connection, group_prefix: &str) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            group_prefix: group_prefix.trim().to_lowercase(),
        })
    }

    /// Trimmed, lower-cased registry prefix.
    pub fn group_prefix(&self) -> &str {
        &self.group_prefix
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| CountBotError::Store(e.to_string()))
    }
}

pub(crate) fn db_err(e: rusqlite::Error) -> CountBotError {
    CountBotError::Store(e.to_string())
}

/// Timestamp format for `created_at`/`updated_at`; sorts lexicographically.
pub(crate) fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
