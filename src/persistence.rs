//! SQLite-backed odometer store.
//!
//! Keeps a single row (`id = 1`) holding the latest odometer state. The last
//! accepted fix is stored as a JSON column so the schema does not need to
//! track `FixSample` field changes.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};

use crate::engine::{OdometerState, OdometerStore};
use crate::{FixSample, Result};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS odometer_state (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        total_distance REAL NOT NULL,
        error_bound REAL NOT NULL,
        sample_count INTEGER NOT NULL,
        last_fix TEXT,
        updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
    );
";

/// Odometer store in a SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("[SqliteStore] opened {}", path.display());
        Self::from_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl OdometerStore for SqliteStore {
    fn load(&self) -> Result<Option<OdometerState>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let row = conn
            .query_row(
                "SELECT total_distance, error_bound, sample_count, last_fix
                 FROM odometer_state WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, f64>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((total_distance, error_bound, sample_count, last_fix)) = row else {
            return Ok(None);
        };

        let last_accepted_fix = match last_fix {
            Some(json) => Some(serde_json::from_str::<FixSample>(&json)?),
            None => None,
        };

        Ok(Some(OdometerState {
            total_distance,
            error_bound,
            last_accepted_fix,
            sample_count: sample_count.max(0) as u64,
        }))
    }

    fn save(&self, state: &OdometerState) -> Result<()> {
        let last_fix = state
            .last_accepted_fix
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute(
            "INSERT INTO odometer_state (id, total_distance, error_bound, sample_count, last_fix)
             VALUES (1, ?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                total_distance = excluded.total_distance,
                error_bound = excluded.error_bound,
                sample_count = excluded.sample_count,
                last_fix = excluded.last_fix,
                updated_at = strftime('%s', 'now')",
            params![
                state.total_distance,
                state.error_bound,
                state.sample_count as i64,
                last_fix
            ],
        )?;
        debug!("[SqliteStore] saved {:.1}m", state.total_distance);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute("DELETE FROM odometer_state", [])?;
        Ok(())
    }
}
