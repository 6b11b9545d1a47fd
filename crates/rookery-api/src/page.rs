//! Timeline sources and pagination.
//!
//! The server pages status timelines with `max_id` / `since_id` / `min_id`
//! cursors. [`Paginator`] owns the cursor for one timeline and reports
//! exhaustion when a page comes back empty, mirroring an async iterator's
//! `done` signal.

use std::sync::Arc;

use rookery_types::{Shortcut, Status};

use crate::error::Result;
use crate::gateway::Gateway;

/// A status timeline the gateway can page through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineSource {
    Home,
    Public { local: bool },
    Hashtag { hashtag: String },
    List { id: String },
    AccountStatuses { account_id: String },
    Bookmarks,
    Favourites,
}

impl TimelineSource {
    /// REST path for this timeline.
    pub fn endpoint(&self) -> String {
        match self {
            TimelineSource::Home => "/api/v1/timelines/home".into(),
            TimelineSource::Public { .. } => "/api/v1/timelines/public".into(),
            TimelineSource::Hashtag { hashtag } => {
                format!("/api/v1/timelines/tag/{hashtag}")
            }
            TimelineSource::List { id } => format!("/api/v1/timelines/list/{id}"),
            TimelineSource::AccountStatuses { account_id } => {
                format!("/api/v1/accounts/{account_id}/statuses")
            }
            TimelineSource::Bookmarks => "/api/v1/bookmarks".into(),
            TimelineSource::Favourites => "/api/v1/favourites".into(),
        }
    }

    /// Query parameters implied by the source itself.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            TimelineSource::Public { local: true } => vec![("local", "true".into())],
            _ => Vec::new(),
        }
    }

    /// Map a configured shortcut to the timeline it opens.
    ///
    /// `None` for shortcuts that do not resolve to a status timeline
    /// (notifications).
    pub fn from_shortcut(shortcut: &Shortcut) -> Option<Self> {
        match shortcut {
            Shortcut::Following => Some(TimelineSource::Home),
            Shortcut::Notifications => None,
            Shortcut::List { id } => Some(TimelineSource::List { id: id.clone() }),
            Shortcut::Public { local, .. } => Some(TimelineSource::Public { local: *local }),
            Shortcut::Bookmarks => Some(TimelineSource::Bookmarks),
            Shortcut::Favourites => Some(TimelineSource::Favourites),
            Shortcut::Hashtag { hashtag, .. } => Some(TimelineSource::Hashtag {
                hashtag: hashtag.clone(),
            }),
        }
    }
}

/// Cursor parameters for one page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: Option<u32>,
    /// Return results older than this id.
    pub max_id: Option<String>,
    /// Return results newer than this id.
    pub since_id: Option<String>,
    /// Return results immediately newer than this id.
    pub min_id: Option<String>,
}

impl PageQuery {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Flatten into query parameters, skipping unset cursors.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(ref max_id) = self.max_id {
            params.push(("max_id", max_id.clone()));
        }
        if let Some(ref since_id) = self.since_id {
            params.push(("since_id", since_id.clone()));
        }
        if let Some(ref min_id) = self.min_id {
            params.push(("min_id", min_id.clone()));
        }
        params
    }
}

/// One fetched page of a timeline.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub statuses: Vec<Status>,
    /// Cursor for the next (older) page, when the gateway knows it.
    pub next_max_id: Option<String>,
}

/// Caller-owned pagination state for one timeline.
pub struct Paginator {
    gateway: Arc<dyn Gateway>,
    source: TimelineSource,
    limit: u32,
    next_max_id: Option<String>,
    exhausted: bool,
}

impl Paginator {
    pub fn new(gateway: Arc<dyn Gateway>, source: TimelineSource, limit: u32) -> Self {
        Self {
            gateway,
            source,
            limit,
            next_max_id: None,
            exhausted: false,
        }
    }

    /// Whether a previous page already signalled the end of the timeline.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetch the next page and advance the cursor.
    ///
    /// After exhaustion every further call returns an empty page without
    /// touching the network.
    pub async fn next_page(&mut self) -> Result<Page> {
        if self.exhausted {
            return Ok(Page::default());
        }

        let query = PageQuery {
            limit: Some(self.limit),
            max_id: self.next_max_id.clone(),
            ..PageQuery::default()
        };
        let page = self.gateway.timeline(&self.source, &query).await?;

        if page.statuses.is_empty() {
            self.exhausted = true;
        } else {
            self.next_max_id = page
                .next_max_id
                .clone()
                .or_else(|| page.statuses.last().map(|s| s.id.clone()));
        }
        Ok(page)
    }
}
