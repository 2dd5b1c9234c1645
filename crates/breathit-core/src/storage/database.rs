//! SQLite-based practice history.
//!
//! Only sessions that ran their whole budget are stored; a session the
//! user stops early leaves no trace.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::clock::SessionConfig;
use crate::error::{CoreError, DatabaseError};

/// Mode name recorded for the standard Inhale/Hold/Exhale/Hold pattern.
pub const DEFAULT_MODE: &str = "health-breath";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub cycles: u64,
    pub total_ms: u64,
    pub mode: String,
    pub inhale_ms: u64,
    pub hold_ms: u64,
    pub exhale_ms: u64,
}

impl SessionRecord {
    /// A record for a session that just finished with `cycles` breaths.
    pub fn from_config(config: &SessionConfig, cycles: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date: Utc::now(),
            cycles,
            total_ms: config.total_ms,
            mode: DEFAULT_MODE.to_string(),
            inhale_ms: config.inhale_ms,
            hold_ms: config.hold_ms,
            exhale_ms: config.exhale_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub total_sessions: u64,
    pub total_cycles: u64,
    pub total_minutes: u64,
}

/// SQLite database for practice history.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/breathit/breathit.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory or database cannot be opened.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("breathit.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id         TEXT PRIMARY KEY,
                date       TEXT NOT NULL,
                cycles     INTEGER NOT NULL,
                total_ms   INTEGER NOT NULL,
                mode       TEXT NOT NULL DEFAULT 'health-breath',
                inhale_ms  INTEGER NOT NULL,
                hold_ms    INTEGER NOT NULL,
                exhale_ms  INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_date ON sessions(date);",
        )?;
        Ok(())
    }

    /// Append a finished session.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including a duplicate id).
    pub fn record_session(&self, record: &SessionRecord) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (id, date, cycles, total_ms, mode, inhale_ms, hold_ms, exhale_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.date.to_rfc3339_opts(SecondsFormat::Millis, true),
                record.cycles,
                record.total_ms,
                record.mode,
                record.inhale_ms,
                record.hold_ms,
                record.exhale_ms,
            ],
        )?;
        Ok(())
    }

    /// All recorded sessions, newest first.
    pub fn list_sessions(&self) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, cycles, total_ms, mode, inhale_ms, hold_ms, exhale_ms
             FROM sessions
             ORDER BY date DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u64>(2)?,
                row.get::<_, u64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, u64>(5)?,
                row.get::<_, u64>(6)?,
                row.get::<_, u64>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, date, cycles, total_ms, mode, inhale_ms, hold_ms, exhale_ms) = row?;
            let date = DateTime::parse_from_rfc3339(&date)
                .map_err(|e| DatabaseError::CorruptRow {
                    table: "sessions".into(),
                    message: format!("bad date '{date}': {e}"),
                })?
                .with_timezone(&Utc);
            records.push(SessionRecord {
                id,
                date,
                cycles,
                total_ms,
                mode,
                inhale_ms,
                hold_ms,
                exhale_ms,
            });
        }
        Ok(records)
    }

    /// Delete every recorded session. Returns how many were removed.
    pub fn clear_history(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM sessions", [])?)
    }

    pub fn stats(&self) -> Result<HistoryStats, DatabaseError> {
        let (total_sessions, total_cycles, total_ms) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(cycles), 0), COALESCE(SUM(total_ms), 0)
             FROM sessions",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?, row.get::<_, u64>(2)?)),
        )?;
        Ok(HistoryStats {
            total_sessions,
            total_cycles,
            total_minutes: crate::format::to_minutes(total_ms),
        })
    }
}
