//! Status (post) wire types.
//!
//! Field names match the Mastodon REST representation, so the structs
//! deserialize without rename attributes. Interaction flags (`reblogged`,
//! `favourited`, ...) are `Option<bool>` because the server omits them on
//! unauthenticated requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::Account;

/// Who can see a status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
    Direct,
}

impl Default for Visibility {
    fn default() -> Self {
        Visibility::Public
    }
}

/// A single post, boost, or reply.
///
/// `reblog` carries the boosted status embedded, the way the server sends
/// it; consumers that cache statuses store the inner one separately as well.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Status {
    /// Server-issued identifier, unique per origin instance.
    pub id: String,
    /// The author.
    pub account: Account,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    /// Id of the status this replies to, if any.
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
    /// Id of the account this replies to, if any.
    #[serde(default)]
    pub in_reply_to_account_id: Option<String>,
    /// The boosted status, when this status is a boost.
    #[serde(default)]
    pub reblog: Option<Box<Status>>,
    /// Rendered HTML body.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub spoiler_text: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub media_attachments: Vec<MediaAttachment>,
    #[serde(default)]
    pub poll: Option<Poll>,
    #[serde(default)]
    pub replies_count: u64,
    #[serde(default)]
    pub reblogs_count: u64,
    #[serde(default)]
    pub favourites_count: u64,
    #[serde(default)]
    pub reblogged: Option<bool>,
    #[serde(default)]
    pub favourited: Option<bool>,
    #[serde(default)]
    pub bookmarked: Option<bool>,
    /// Whether the viewer muted this conversation.
    #[serde(default)]
    pub muted: Option<bool>,
    #[serde(default)]
    pub pinned: Option<bool>,

    // Client-derived flags, never part of the wire format.
    /// Tombstone: the status was deleted but the cache entry stays in place
    /// so live views keep resolving.
    #[serde(skip)]
    pub deleted: bool,
    /// Hidden by a client-side content filter.
    #[serde(skip)]
    pub filtered: bool,
    /// Shown in a pinned-posts section of a profile view.
    #[serde(skip)]
    pub pinned_locally: bool,
}

impl Status {
    /// Whether this status replies to some account (any account, not just
    /// the author's own).
    pub fn is_reply(&self) -> bool {
        self.in_reply_to_account_id.is_some()
    }

    pub fn is_reblogged(&self) -> bool {
        self.reblogged.unwrap_or(false)
    }

    pub fn is_favourited(&self) -> bool {
        self.favourited.unwrap_or(false)
    }

    pub fn is_bookmarked(&self) -> bool {
        self.bookmarked.unwrap_or(false)
    }

    pub fn is_muted(&self) -> bool {
        self.muted.unwrap_or(false)
    }

    /// True when at least one attachment lacks an alt description.
    pub fn media_missing_description(&self) -> bool {
        self.media_attachments
            .iter()
            .any(MediaAttachment::missing_description)
    }
}

/// An attached image, video, or audio file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaAttachment {
    pub id: String,
    /// `image`, `video`, `gifv`, `audio`, or `unknown`.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub blurhash: Option<String>,
}

impl MediaAttachment {
    /// Whether the attachment has no usable alt description.
    pub fn missing_description(&self) -> bool {
        self.description
            .as_deref()
            .map(str::trim)
            .map_or(true, str::is_empty)
    }
}

/// A poll attached to a status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poll {
    pub id: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expired: bool,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub votes_count: u64,
    #[serde(default)]
    pub voters_count: Option<u64>,
    #[serde(default)]
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub voted: Option<bool>,
    /// Indexes into `options` the viewer picked.
    #[serde(default)]
    pub own_votes: Option<Vec<usize>>,
}

impl Poll {
    pub fn has_voted(&self) -> bool {
        self.voted.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollOption {
    pub title: String,
    /// `None` while the poll hides tallies from non-voters.
    #[serde(default)]
    pub votes_count: Option<u64>,
}
