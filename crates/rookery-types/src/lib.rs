//! # rookery-types
//!
//! Data model shared by every Rookery crate: the Mastodon wire types
//! (statuses, accounts, polls, attachments), the cache key scheme, and
//! shortcut column definitions.
//!
//! Wire structs deserialize straight from the REST API's snake_case JSON;
//! fields the server omits for unauthenticated requests are `Option`s.

pub mod account;
pub mod key;
pub mod shortcuts;
pub mod status;

pub use account::Account;
pub use key::{InstanceHost, StatusKey};
pub use shortcuts::{Shortcut, ShortcutError, SHORTCUTS_LIMIT};
pub use status::{MediaAttachment, Poll, PollOption, Status, Visibility};
