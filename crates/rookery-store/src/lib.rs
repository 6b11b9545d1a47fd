//! # rookery-store
//!
//! Local persistence for small per-account preferences: shortcut sets,
//! timeline settings, and last-read markers.
//!
//! Values are JSON blobs keyed by `(namespace, name)`, where the namespace
//! is the authenticated account's handle (`acct@host`) so multiple logins
//! on one machine never bleed preferences into each other. The crate
//! exposes a synchronous `Database` handle wrapping a
//! `rusqlite::Connection` with versioned migrations.

pub mod database;
pub mod migrations;
pub mod models;
pub mod prefs;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::TimelineSettings;
