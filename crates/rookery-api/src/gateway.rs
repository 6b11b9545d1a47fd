//! The [`Gateway`] trait: every remote operation the client consumes.
//!
//! Interaction endpoints (`reblog`, `favourite`, ...) return the server's
//! canonical [`Status`] so callers can reconcile optimistic local state
//! against it.

use async_trait::async_trait;
use serde::Serialize;

use rookery_types::{Account, Poll, Status, Visibility};

use crate::error::Result;
use crate::page::{Page, PageQuery, TimelineSource};

/// Payload for publishing or editing a status.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct NewStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoiler_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub sensitive: bool,
}

/// Authenticated resource operations against a single remote instance.
#[async_trait]
pub trait Gateway: Send + Sync {
    // -- Statuses ----------------------------------------------------------

    async fn fetch_status(&self, id: &str) -> Result<Status>;
    async fn publish_status(&self, new_status: &NewStatus) -> Result<Status>;
    async fn edit_status(&self, id: &str, new_status: &NewStatus) -> Result<Status>;
    /// Deletes and returns the removed status (with source text, so the
    /// client can offer delete-and-redraft).
    async fn delete_status(&self, id: &str) -> Result<Status>;

    // -- Interactions ------------------------------------------------------

    async fn reblog(&self, id: &str) -> Result<Status>;
    async fn unreblog(&self, id: &str) -> Result<Status>;
    async fn favourite(&self, id: &str) -> Result<Status>;
    async fn unfavourite(&self, id: &str) -> Result<Status>;
    async fn bookmark(&self, id: &str) -> Result<Status>;
    async fn unbookmark(&self, id: &str) -> Result<Status>;
    async fn mute_conversation(&self, id: &str) -> Result<Status>;
    async fn unmute_conversation(&self, id: &str) -> Result<Status>;

    // -- Polls -------------------------------------------------------------

    async fn fetch_poll(&self, id: &str) -> Result<Poll>;
    async fn vote(&self, poll_id: &str, choices: &[usize]) -> Result<Poll>;

    // -- Accounts ----------------------------------------------------------

    async fn fetch_account(&self, id: &str) -> Result<Account>;
    async fn lookup_account(&self, acct: &str) -> Result<Account>;

    // -- Timelines ---------------------------------------------------------

    /// Fetch one page of the given timeline.
    async fn timeline(&self, source: &TimelineSource, query: &PageQuery) -> Result<Page>;
}
