//! Preference value types persisted in the local database.

use serde::{Deserialize, Serialize};

/// Per-account timeline presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineSettings {
    /// Collapse runs of boosts into a single carousel group.
    #[serde(default = "default_true")]
    pub boosts_carousel: bool,
    /// Render shortcuts as side-by-side columns instead of tabs.
    #[serde(default)]
    pub shortcuts_columns_mode: bool,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            boosts_carousel: true,
            shortcuts_columns_mode: false,
        }
    }
}

fn default_true() -> bool {
    true
}
