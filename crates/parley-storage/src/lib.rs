//! Parley storage crate - durable session, preference, and clip stores.
//!
//! All persistence goes through a single SQLite database (messages and
//! preferences) plus a directory of WAV files for recorded audio clips.
//! Storage scope is durable across client restarts; the stores are injected
//! into the orchestration layer so tests can substitute in-memory databases.

pub mod clips;
pub mod db;
pub mod preferences;
pub mod session;

pub use clips::ClipStore;
pub use db::Database;
pub use preferences::{PreferenceStore, Preferences};
pub use session::SessionStore;
