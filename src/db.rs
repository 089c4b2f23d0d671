//! SQLite Database Handle
//! Mission: Own the single connection, the schema, and the static role data
//!
//! Key choices:
//! - One connection behind a parking_lot mutex, shared by every store
//! - WAL journal for concurrent readers on disk
//! - Foreign keys enforced; cascades still run explicitly in application code

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::sync::Arc;
use tracing::info;

/// Base role granted when a user is created without explicit roles
pub const ROLE_USER: &str = "ROLE_USER";
/// Role required for user management
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

const SCHEMA_SQL: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS roles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id INTEGER NOT NULL REFERENCES users(id),
    role_id INTEGER NOT NULL REFERENCES roles(id),
    PRIMARY KEY (user_id, role_id)
);

CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_notes_owner_updated
    ON notes(user_id, updated_at DESC, id DESC);
"#;

/// Shared handle to the application database
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) an on-disk database and apply the schema
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();

        let db = Self::init(conn)?;
        info!("📦 Database ready at {}", db_path);
        Ok(db)
    }

    /// Private in-memory database (tests, ephemeral runs)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to apply schema")?;

        for role in [ROLE_USER, ROLE_ADMIN] {
            conn.execute("INSERT OR IGNORE INTO roles (name) VALUES (?1)", [role])
                .with_context(|| format!("Failed to seed role {}", role))?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Exclusive access to the connection for one read-modify-write
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

/// Canonical on-disk timestamp: fixed-width RFC 3339 so text order is time order
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}
