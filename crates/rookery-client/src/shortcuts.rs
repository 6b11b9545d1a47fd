//! Shortcut management on top of the preference store.

use rookery_store::{Database, StoreError, TimelineSettings};
use rookery_types::{shortcuts::validate_shortcuts, Shortcut, ShortcutError, SHORTCUTS_LIMIT};

use crate::error::ShortcutsError;

/// Validated access to one account's shortcut set and timeline settings.
pub struct ShortcutManager {
    db: Database,
    namespace: String,
}

impl ShortcutManager {
    pub fn new(db: Database, namespace: impl Into<String>) -> Self {
        Self {
            db,
            namespace: namespace.into(),
        }
    }

    pub fn list(&self) -> Result<Vec<Shortcut>, StoreError> {
        self.db.shortcuts(&self.namespace)
    }

    /// Replace the whole set, validating size and parameters first.
    pub fn replace(&self, shortcuts: &[Shortcut]) -> Result<(), ShortcutsError> {
        validate_shortcuts(shortcuts)?;
        self.db.set_shortcuts(&self.namespace, shortcuts)?;
        Ok(())
    }

    /// Append one shortcut, enforcing the set limit.
    pub fn add(&self, shortcut: Shortcut) -> Result<(), ShortcutsError> {
        shortcut.validate()?;
        let mut shortcuts = self.db.shortcuts(&self.namespace)?;
        if shortcuts.len() >= SHORTCUTS_LIMIT {
            return Err(ShortcutsError::Invalid(ShortcutError::TooMany {
                count: shortcuts.len() + 1,
            }));
        }
        shortcuts.push(shortcut);
        self.db.set_shortcuts(&self.namespace, &shortcuts)?;
        Ok(())
    }

    pub fn settings(&self) -> Result<TimelineSettings, StoreError> {
        self.db.timeline_settings(&self.namespace)
    }

    pub fn set_settings(&self, settings: &TimelineSettings) -> Result<(), StoreError> {
        self.db.set_timeline_settings(&self.namespace, settings)
    }
}
