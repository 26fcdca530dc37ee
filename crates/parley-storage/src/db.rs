//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access and
//! creates the schema on open. WAL mode keeps readers unblocked while the
//! write-through session store inserts.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use parley_core::error::ParleyError;

/// Thread-safe SQLite database wrapper.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, ParleyError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| ParleyError::Storage(format!("Failed to open database: {}", e)))?;

        configure(&conn)?;
        create_schema(&conn)?;
        info!("Database opened at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, ParleyError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ParleyError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        configure(&conn)?;
        create_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure, which is what
    /// serializes all writers.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ParleyError>
    where
        F: FnOnce(&Connection) -> Result<T, ParleyError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ParleyError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

fn configure(conn: &Connection) -> Result<(), ParleyError> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )
    .map_err(|e| ParleyError::Storage(format!("Failed to set pragmas: {}", e)))
}

fn create_schema(conn: &Connection) -> Result<(), ParleyError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS messages (
             id         INTEGER PRIMARY KEY AUTOINCREMENT,
             role       TEXT NOT NULL,
             text       TEXT NOT NULL,
             timestamp  TEXT NOT NULL,
             audio_url  TEXT
         );
         CREATE TABLE IF NOT EXISTS preferences (
             key    TEXT PRIMARY KEY,
             value  TEXT NOT NULL
         );",
    )
    .map_err(|e| ParleyError::Storage(format!("Failed to create schema: {}", e)))
}

// =============================================================================
// Tests
// =============================================================================
