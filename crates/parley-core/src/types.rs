//! Shared domain types: roles, messages, sessions, and order payloads.

use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// Who authored a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Storage representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }

    /// Parse a stored role string. Unknown values return `None` so that
    /// readers can skip rows they do not understand.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "bot" => Some(Role::Bot),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single entry in the conversation history.
///
/// Messages are immutable once appended; ordering is insertion order and
/// uniqueness is not required, so there is no id field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Wall-clock time the message was created, formatted `HH:MM` local time.
    pub timestamp: String,
    /// Reference to a stored audio clip, set only by the voice capture path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl Message {
    /// Create a user message stamped with the current local time.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: clock_timestamp(),
            audio_url: None,
        }
    }

    /// Create a user message carrying a reference to its source audio clip.
    pub fn user_with_audio(text: impl Into<String>, audio_url: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: clock_timestamp(),
            audio_url: Some(audio_url.into()),
        }
    }

    /// Create a bot message stamped with the current local time.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
            timestamp: clock_timestamp(),
            audio_url: None,
        }
    }
}

/// Format the current local time as the client displays it.
fn clock_timestamp() -> String {
    Local::now().format("%H:%M").to_string()
}

/// Snapshot of the conversation: the ordered history plus the in-flight flag.
///
/// `loading` is false in snapshots returned by the session store; the live
/// flag is owned by the request orchestrator for the duration of a dispatch.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub messages: Vec<Message>,
    pub loading: bool,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// Structured order payload returned by the support backend.
///
/// Transient: used only to format a bot message, never stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub status: String,
    pub customer_name: String,
    pub items: String,
    pub total_price: f64,
    pub shipping_address: String,
    pub created_at: String,
}

// =============================================================================
// Tests
// =============================================================================
