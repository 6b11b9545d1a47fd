//! Namespaced preference storage.
//!
//! Generic JSON get/set plus typed wrappers for the preferences the engine
//! itself reads and writes.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use rookery_types::Shortcut;

use crate::database::Database;
use crate::error::Result;
use crate::models::TimelineSettings;

impl Database {
    // ------------------------------------------------------------------
    // Generic key-value surface
    // ------------------------------------------------------------------

    /// Store a JSON-serializable value under `(namespace, name)`,
    /// overwriting any previous value.
    pub fn set_pref<T: Serialize>(&self, namespace: &str, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.conn().execute(
            "INSERT OR REPLACE INTO prefs (namespace, name, json, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![namespace, name, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Fetch a value, or `None` when it was never written.
    pub fn get_pref<T: DeserializeOwned>(&self, namespace: &str, name: &str) -> Result<Option<T>> {
        let json: Option<String> = self
            .conn()
            .query_row(
                "SELECT json FROM prefs WHERE namespace = ?1 AND name = ?2",
                params![namespace, name],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Delete a preference. Returns whether a row existed.
    pub fn delete_pref(&self, namespace: &str, name: &str) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM prefs WHERE namespace = ?1 AND name = ?2",
            params![namespace, name],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Typed wrappers
    // ------------------------------------------------------------------

    /// The account's configured shortcut set (empty when unset).
    pub fn shortcuts(&self, namespace: &str) -> Result<Vec<Shortcut>> {
        Ok(self
            .get_pref(namespace, "shortcuts")?
            .unwrap_or_default())
    }

    pub fn set_shortcuts(&self, namespace: &str, shortcuts: &[Shortcut]) -> Result<()> {
        self.set_pref(namespace, "shortcuts", &shortcuts)
    }

    /// Timeline presentation settings, falling back to defaults.
    pub fn timeline_settings(&self, namespace: &str) -> Result<TimelineSettings> {
        Ok(self
            .get_pref(namespace, "timeline-settings")?
            .unwrap_or_default())
    }

    pub fn set_timeline_settings(
        &self,
        namespace: &str,
        settings: &TimelineSettings,
    ) -> Result<()> {
        self.set_pref(namespace, "timeline-settings", settings)
    }

    /// Id of the last notification the account has seen.
    pub fn notifications_last(&self, namespace: &str) -> Result<Option<String>> {
        self.get_pref(namespace, "notifications-last")
    }

    pub fn set_notifications_last(&self, namespace: &str, id: &str) -> Result<()> {
        self.set_pref(namespace, "notifications-last", &id)
    }
}
