//! Shortcut column definitions.
//!
//! A shortcut pins a timeline (or notifications) to the app's quick-access
//! bar / multi-column view. The set is persisted per account and capped at
//! [`SHORTCUTS_LIMIT`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of shortcuts an account may configure.
pub const SHORTCUTS_LIMIT: usize = 9;

/// One configured shortcut.
///
/// Serialized with a `type` tag (`following`, `list`, `hashtag`, ...) so the
/// stored form stays readable and forward-compatible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Shortcut {
    Following,
    Notifications,
    List {
        id: String,
    },
    Public {
        #[serde(default)]
        local: bool,
        #[serde(default)]
        instance: Option<String>,
    },
    Bookmarks,
    Favourites,
    Hashtag {
        hashtag: String,
        #[serde(default)]
        instance: Option<String>,
    },
}

impl Shortcut {
    /// Human-readable label for settings screens.
    pub fn label(&self) -> &'static str {
        match self {
            Shortcut::Following => "Home / Following",
            Shortcut::Notifications => "Notifications",
            Shortcut::List { .. } => "List",
            Shortcut::Public { .. } => "Public",
            Shortcut::Bookmarks => "Bookmarks",
            Shortcut::Favourites => "Favourites",
            Shortcut::Hashtag { .. } => "Hashtag",
        }
    }

    /// Reject shortcuts whose required parameter is blank.
    pub fn validate(&self) -> Result<(), ShortcutError> {
        match self {
            Shortcut::List { id } if id.trim().is_empty() => {
                Err(ShortcutError::EmptyParam { name: "id" })
            }
            Shortcut::Hashtag { hashtag, .. } if hashtag.trim().is_empty() => {
                Err(ShortcutError::EmptyParam { name: "hashtag" })
            }
            _ => Ok(()),
        }
    }
}

/// Validate a whole shortcut set before persisting it.
pub fn validate_shortcuts(shortcuts: &[Shortcut]) -> Result<(), ShortcutError> {
    if shortcuts.len() > SHORTCUTS_LIMIT {
        return Err(ShortcutError::TooMany {
            count: shortcuts.len(),
        });
    }
    for shortcut in shortcuts {
        shortcut.validate()?;
    }
    Ok(())
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ShortcutError {
    #[error("{count} shortcuts exceed the limit of {SHORTCUTS_LIMIT}")]
    TooMany { count: usize },

    #[error("shortcut parameter `{name}` must not be empty")]
    EmptyParam { name: &'static str },
}
