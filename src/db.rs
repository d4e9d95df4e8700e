//! Clinic Database
//! Mission: Single SQLite store for accounts, patients, appointments, sessions
//!
//! Key points:
//! - WAL mode for concurrent reads during writes
//! - foreign_keys = ON so appointment/session rows cascade with their referents
//! - Typed StoreError: unique-constraint violations and missing rows are the
//!   only interpreted faults, everything else propagates

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{info, warn};

/// Schema applied on every open (idempotent)
const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    specialization TEXT NOT NULL DEFAULT '',
    is_staff INTEGER NOT NULL DEFAULT 0,
    is_superuser INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    gender TEXT NOT NULL,
    medical_history TEXT NOT NULL DEFAULT '',
    email TEXT UNIQUE NOT NULL,
    phone TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'S',
    notes TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    revoked INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_appointments_account
    ON appointments(account_id, date DESC, time DESC);

CREATE INDEX IF NOT EXISTS idx_appointments_patient
    ON appointments(patient_id);

CREATE INDEX IF NOT EXISTS idx_sessions_account
    ON sessions(account_id);
"#;

/// Shared database handle. Domain stores hang their operations off this
/// type in their own modules (`impl Database` blocks).
pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the clinic database and apply the schema.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path))?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize database schema")?;

        // foreign_keys is per-connection; verify it actually took
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap_or(0);
        if fk != 1 {
            warn!("foreign_keys pragma not active, cascade deletes will not work");
        }

        info!("📊 Clinic database ready at: {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

/// Persistence faults the rest of the crate is allowed to react to.
///
/// `Constraint` carries the driver message (a unique violation names the
/// failed index, e.g. "UNIQUE constraint failed: accounts.username") so
/// callers can tell which constraint lost a race. Anything unexpected stays
/// in `Sqlite` and surfaces as a server fault.
#[derive(Debug)]
pub enum StoreError {
    Constraint(String),
    NotFound,
    Sqlite(rusqlite::Error),
}

impl StoreError {
    /// Whether this unique violation is on the given qualified column
    /// ("table.column" as SQLite reports it).
    pub fn violates(&self, column: &str) -> bool {
        matches!(self, StoreError::Constraint(msg) if msg.contains(column))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Constraint(msg) => write!(f, "Constraint violation: {}", msg),
            StoreError::NotFound => write!(f, "Row not found"),
            StoreError::Sqlite(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::QueryReturnedNoRows = err {
            return StoreError::NotFound;
        }
        if let rusqlite::Error::SqliteFailure(ref e, ref msg) = err {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                return StoreError::Constraint(msg.clone().unwrap_or_default());
            }
        }
        StoreError::Sqlite(err)
    }
}
