//! SQLite persistence gateway
//!
//! Single-file relational store shared by every component. One connection
//! lives behind a mutex; mutating operations run inside a `BEGIN IMMEDIATE`
//! transaction so the select-then-update sequences in `park`/`exit` are a
//! single atomic read-modify-write against the store. Commit happens only
//! when the whole closure succeeds; any error rolls everything back.
//!
//! No component opens its own connection - the store handle is injected.

use crate::domain::ParkingError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default busy timeout when the config does not override it
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS slots (
    slot_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    zone        TEXT NOT NULL,
    is_occupied INTEGER NOT NULL DEFAULT 0,
    vehicle_num TEXT,
    entry_time  TEXT
);

CREATE TABLE IF NOT EXISTS active_vehicles (
    vehicle_number TEXT PRIMARY KEY,
    slot_id        INTEGER NOT NULL,
    zone           TEXT NOT NULL,
    entry_time     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parking_history (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_num  TEXT NOT NULL,
    slot_id      INTEGER NOT NULL,
    zone         TEXT NOT NULL,
    entry_time   TEXT NOT NULL,
    exit_time    TEXT,
    duration_min INTEGER
);

CREATE INDEX IF NOT EXISTS idx_history_vehicle
    ON parking_history (vehicle_num, exit_time);

CREATE TABLE IF NOT EXISTS vehicles_master (
    vehicle_number  TEXT PRIMARY KEY,
    vehicle_type    TEXT NOT NULL,
    category        TEXT NOT NULL,
    first_entry     TEXT NOT NULL,
    last_slot       INTEGER,
    avg_duration    REAL NOT NULL DEFAULT 0,
    closed_sessions INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS users (
    username      TEXT PRIMARY KEY,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL DEFAULT 'staff'
);
";

/// Handle to the shared store. Cheap to clone; all clones serialize on the
/// same underlying connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self, ParkingError> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "wal")?;
        Self::configure(&conn, busy_timeout)?;
        debug!(path = %path.as_ref().display(), "store_opened");
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, ParkingError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn, DEFAULT_BUSY_TIMEOUT)?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure(conn: &Connection, busy_timeout: Duration) -> Result<(), ParkingError> {
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "on")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Run `f` inside an exclusive write transaction. The transaction holds
    /// the write lock from the start (`BEGIN IMMEDIATE`), so a select
    /// followed by an update inside `f` cannot interleave with another
    /// writer. Commits on `Ok`, rolls back on `Err`.
    pub fn with_write_tx<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> Result<T, ParkingError>,
    ) -> Result<T, ParkingError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Run a read-only closure against the connection.
    pub fn with_read<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, ParkingError>,
    ) -> Result<T, ParkingError> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

/// Timestamps are stored as RFC 3339 text.
pub(crate) fn ts_to_sql(t: DateTime<Utc>) -> String {
    t.to_rfc3339()
}

pub(crate) fn ts_from_sql(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
