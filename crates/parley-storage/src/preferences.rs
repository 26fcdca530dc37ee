//! Preference store: durable per-user settings.
//!
//! One row per key in the `preferences` table. Getters fail open to
//! defaults; setters persist immediately. Language codes are passed through
//! to the backend as-is, so no validation beyond non-emptiness of the key.

use std::sync::Arc;

use tracing::warn;

use parley_core::error::ParleyError;

use crate::db::Database;

const KEY_LANGUAGE: &str = "language";
const KEY_DARK_MODE: &str = "dark_mode";
const KEY_ONBOARDING_COMPLETE: &str = "onboarding_complete";

/// Snapshot of all user preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub language: String,
    pub dark_mode: bool,
    pub onboarding_complete: bool,
}

/// SQLite-backed key-value store for user preferences.
pub struct PreferenceStore {
    db: Arc<Database>,
}

impl PreferenceStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The preferred reply language (ISO code).
    ///
    /// Defaults to the system locale's language, falling back to `"en"`.
    pub fn language(&self) -> String {
        self.get(KEY_LANGUAGE).unwrap_or_else(system_language)
    }

    pub fn set_language(&self, code: &str) -> Result<(), ParleyError> {
        self.set(KEY_LANGUAGE, code)
    }

    /// Whether the dark theme is selected. Defaults to light mode.
    pub fn dark_mode(&self) -> bool {
        self.get(KEY_DARK_MODE).map(|v| v == "true").unwrap_or(false)
    }

    pub fn set_dark_mode(&self, enabled: bool) -> Result<(), ParleyError> {
        self.set(KEY_DARK_MODE, if enabled { "true" } else { "false" })
    }

    /// Whether the user has completed onboarding. Defaults to pending.
    pub fn onboarding_complete(&self) -> bool {
        self.get(KEY_ONBOARDING_COMPLETE)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    pub fn set_onboarding_complete(&self, complete: bool) -> Result<(), ParleyError> {
        self.set(
            KEY_ONBOARDING_COMPLETE,
            if complete { "true" } else { "false" },
        )
    }

    /// All preferences at once, for display.
    pub fn snapshot(&self) -> Preferences {
        Preferences {
            language: self.language(),
            dark_mode: self.dark_mode(),
            onboarding_complete: self.onboarding_complete(),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        let result = self.db.with_conn(|conn| {
            use rusqlite::OptionalExtension;
            conn.query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                rusqlite::params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| ParleyError::Storage(e.to_string()))
        });

        match result {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Preference read failed; using default");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ParleyError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .map_err(|e| ParleyError::Storage(format!("Failed to set preference: {}", e)))?;
            Ok(())
        })
    }
}

/// Language of the system locale, from `LANG` (e.g. `en_US.UTF-8` -> `en`).
fn system_language() -> String {
    match std::env::var("LANG") {
        Ok(lang) if !lang.is_empty() => lang
            .split(['_', '.'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("en")
            .to_string(),
        _ => "en".to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PreferenceStore {
        PreferenceStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn test_defaults_on_fresh_store() {
        let store = store();
        assert!(!store.language().is_empty());
        assert!(!store.dark_mode());
        assert!(!store.onboarding_complete());
    }

    #[test]
    fn test_set_and_get_language() {
        let store = store();
        store.set_language("de").unwrap();
        assert_eq!(store.language(), "de");
    }

    #[test]
    fn test_unknown_language_code_passes_through() {
        let store = store();
        store.set_language("tlh").unwrap();
        assert_eq!(store.language(), "tlh");
    }

    #[test]
    fn test_toggle_dark_mode() {
        let store = store();
        store.set_dark_mode(true).unwrap();
        assert!(store.dark_mode());
        store.set_dark_mode(false).unwrap();
        assert!(!store.dark_mode());
    }

    #[test]
    fn test_onboarding_complete() {
        let store = store();
        store.set_onboarding_complete(true).unwrap();
        assert!(store.onboarding_complete());
    }

    #[test]
    fn test_preferences_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parley.db");

        {
            let store = PreferenceStore::new(Arc::new(Database::open(&path).unwrap()));
            store.set_language("fr").unwrap();
            store.set_dark_mode(true).unwrap();
        }

        let store = PreferenceStore::new(Arc::new(Database::open(&path).unwrap()));
        assert_eq!(store.language(), "fr");
        assert!(store.dark_mode());
        assert!(!store.onboarding_complete());
    }

    #[test]
    fn test_each_key_is_independent() {
        let store = store();
        store.set_language("es").unwrap();
        // Setting one key leaves the others at their defaults.
        assert!(!store.dark_mode());
        assert!(!store.onboarding_complete());

        let snap = store.snapshot();
        assert_eq!(
            snap,
            Preferences {
                language: "es".to_string(),
                dark_mode: false,
                onboarding_complete: false,
            }
        );
    }

    #[test]
    fn test_set_overwrites_previous_value() {
        let store = store();
        store.set_language("en").unwrap();
        store.set_language("ja").unwrap();
        assert_eq!(store.language(), "ja");
    }
}
