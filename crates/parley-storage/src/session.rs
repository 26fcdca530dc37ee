//! Session store: the ordered message history.
//!
//! Every append is a single synchronous INSERT (write-through), so the only
//! window of loss is a crash between the in-process mutation and the insert
//! returning. `load` fails open: a missing or unreadable store yields an
//! empty session rather than an error.

use std::sync::Arc;

use tracing::warn;

use parley_core::error::ParleyError;
use parley_core::types::{Message, Role, Session};

use crate::db::Database;

/// SQLite-backed store for the single client session.
pub struct SessionStore {
    db: Arc<Database>,
}

impl SessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Load the persisted session.
    ///
    /// Never fails hard: storage errors return an empty session, and rows
    /// with unknown roles are skipped. No welcome message is seeded here;
    /// that is an application-level concern.
    pub fn load(&self) -> Session {
        let result = self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT role, text, timestamp, audio_url
                     FROM messages ORDER BY id",
                )
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })
                .map_err(|e| ParleyError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let (role, text, timestamp, audio_url) =
                    row.map_err(|e| ParleyError::Storage(e.to_string()))?;
                match Role::parse(&role) {
                    Some(role) => messages.push(Message {
                        role,
                        text,
                        timestamp,
                        audio_url,
                    }),
                    None => warn!(role = %role, "Skipping message with unknown role"),
                }
            }
            Ok(messages)
        });

        match result {
            Ok(messages) => Session {
                messages,
                loading: false,
            },
            Err(e) => {
                warn!(error = %e, "Failed to load session; starting empty");
                Session::default()
            }
        }
    }

    /// Append a message to the end of the history.
    ///
    /// Persists before returning (write-through).
    pub fn append(&self, message: &Message) -> Result<(), ParleyError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (role, text, timestamp, audio_url)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    message.role.as_str(),
                    message.text,
                    message.timestamp,
                    message.audio_url,
                ],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to append message: {}", e)))?;
            Ok(())
        })
    }

    /// Empty the history.
    ///
    /// A single DELETE statement, so no reader ever observes a partially
    /// cleared session.
    pub fn clear(&self) -> Result<(), ParleyError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM messages", [])
                .map_err(|e| ParleyError::Storage(format!("Failed to clear session: {}", e)))?;
            Ok(())
        })
    }

    /// Number of persisted messages.
    pub fn len(&self) -> usize {
        self.db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM messages", [], |row| {
                    row.get::<_, i64>(0)
                })
                .map_err(|e| ParleyError::Storage(e.to_string()))
            })
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Tests
// =============================================================================
