//! Shared test fixtures: status builders and a programmable mock gateway.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use rookery_api::{ApiError, Gateway, NewStatus, Page, PageQuery, TimelineSource};
use rookery_types::{
    Account, InstanceHost, MediaAttachment, Poll, PollOption, Status, Visibility,
};

use crate::actions::{BoostPrompt, Prompter};
use crate::session::{AuthContext, Session};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
}

pub(crate) fn account(id: &str) -> Account {
    Account {
        id: id.into(),
        username: id.into(),
        acct: id.into(),
        display_name: String::new(),
        url: None,
        avatar: None,
        bot: false,
        followers_count: 0,
        following_count: 0,
        statuses_count: 0,
    }
}

pub(crate) fn status_at(id: &str, author: &str, minutes: i64) -> Status {
    Status {
        id: id.into(),
        account: account(author),
        created_at: base_time() + Duration::minutes(minutes),
        edited_at: None,
        in_reply_to_id: None,
        in_reply_to_account_id: None,
        reblog: None,
        content: format!("<p>status {id}</p>"),
        spoiler_text: String::new(),
        visibility: Visibility::Public,
        sensitive: false,
        language: None,
        url: None,
        media_attachments: Vec::new(),
        poll: None,
        replies_count: 0,
        reblogs_count: 0,
        favourites_count: 0,
        reblogged: None,
        favourited: None,
        bookmarked: None,
        muted: None,
        pinned: None,
        deleted: false,
        filtered: false,
        pinned_locally: false,
    }
}

pub(crate) fn status(id: &str, author: &str) -> Status {
    status_at(id, author, 0)
}

pub(crate) fn reply(id: &str, author: &str, parent_id: &str, parent_author: &str) -> Status {
    let mut status = status(id, author);
    status.in_reply_to_id = Some(parent_id.into());
    status.in_reply_to_account_id = Some(parent_author.into());
    status
}

pub(crate) fn boost(id: &str, author: &str, inner: Status) -> Status {
    let mut status = status(id, author);
    status.created_at = inner.created_at;
    status.reblog = Some(Box::new(inner));
    status
}

pub(crate) fn media(id: &str, description: Option<&str>) -> MediaAttachment {
    MediaAttachment {
        id: id.into(),
        kind: "image".into(),
        url: None,
        preview_url: None,
        description: description.map(Into::into),
        blurhash: None,
    }
}

pub(crate) fn poll(id: &str, options: &[&str]) -> Poll {
    Poll {
        id: id.into(),
        expires_at: None,
        expired: false,
        multiple: false,
        votes_count: 10,
        voters_count: Some(10),
        options: options
            .iter()
            .map(|title| PollOption {
                title: (*title).into(),
                votes_count: Some(5),
            })
            .collect(),
        voted: Some(false),
        own_votes: None,
    }
}

/// Build a session authenticated as `account_id` on `corvid.social`,
/// backed by a fresh [`MockGateway`].
pub(crate) fn session_with(account_id: &str) -> (Arc<MockGateway>, Session) {
    let gateway = Arc::new(MockGateway::new());
    let auth = AuthContext::authenticated(
        InstanceHost::new("corvid.social"),
        account_id,
        account_id,
    );
    let session = Session::new(gateway.clone(), auth);
    (gateway, session)
}

pub(crate) struct AlwaysConfirm;

impl Prompter for AlwaysConfirm {
    fn confirm_boost(&self, _prompt: &BoostPrompt) -> bool {
        true
    }
}

pub(crate) struct NeverConfirm;

impl Prompter for NeverConfirm {
    fn confirm_boost(&self, _prompt: &BoostPrompt) -> bool {
        false
    }
}

/// Records the prompt it was shown, then declines.
pub(crate) struct RecordingPrompter {
    last: Mutex<Option<BoostPrompt>>,
}

impl RecordingPrompter {
    pub(crate) fn declining() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    pub(crate) fn last_prompt(&self) -> Option<BoostPrompt> {
        self.last.lock().clone()
    }
}

impl Prompter for RecordingPrompter {
    fn confirm_boost(&self, prompt: &BoostPrompt) -> bool {
        *self.last.lock() = Some(prompt.clone());
        false
    }
}

fn not_found() -> ApiError {
    ApiError::Status { status: 404 }
}

/// A programmable in-memory [`Gateway`].
///
/// Fetches resolve from the maps below; interaction endpoints consume
/// responses staged with [`stage_interaction`](Self::stage_interaction)
/// and fail when nothing is staged, so tests state the server's canonical
/// answer explicitly.
pub(crate) struct MockGateway {
    statuses: Mutex<HashMap<String, Status>>,
    accounts: Mutex<HashMap<String, Account>>,
    polls: Mutex<HashMap<String, Poll>>,
    pages: Mutex<VecDeque<Vec<Status>>>,
    queries: Mutex<Vec<PageQuery>>,
    staged: Mutex<HashMap<String, Status>>,
    staged_publish: Mutex<Option<Status>>,
    fail_interactions: AtomicBool,
    fetch_calls: AtomicUsize,
    interaction_calls: AtomicUsize,
}

impl MockGateway {
    pub(crate) fn new() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            polls: Mutex::new(HashMap::new()),
            pages: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            staged: Mutex::new(HashMap::new()),
            staged_publish: Mutex::new(None),
            fail_interactions: AtomicBool::new(false),
            fetch_calls: AtomicUsize::new(0),
            interaction_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn insert_status(&self, status: Status) {
        self.statuses.lock().insert(status.id.clone(), status);
    }

    pub(crate) fn insert_account(&self, account: Account) {
        self.accounts.lock().insert(account.id.clone(), account);
    }

    /// Queue one timeline page; pages are served in insertion order.
    pub(crate) fn push_page(&self, statuses: Vec<Status>) {
        self.pages.lock().push_back(statuses);
    }

    /// Stage the canonical status an interaction endpoint will return for
    /// `id`.
    pub(crate) fn stage_interaction(&self, id: &str, status: Status) {
        self.staged.lock().insert(id.to_string(), status);
    }

    pub(crate) fn stage_poll(&self, id: &str, poll: Poll) {
        self.polls.lock().insert(id.to_string(), poll);
    }

    #[allow(dead_code)]
    pub(crate) fn stage_publish(&self, status: Status) {
        *self.staged_publish.lock() = Some(status);
    }

    pub(crate) fn fail_interactions(&self, fail: bool) {
        self.fail_interactions.store(fail, Ordering::Relaxed);
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::Relaxed)
    }

    pub(crate) fn interaction_count(&self) -> usize {
        self.interaction_calls.load(Ordering::Relaxed)
    }

    /// Every [`PageQuery`] the timeline endpoint has seen, in order.
    pub(crate) fn recorded_queries(&self) -> Vec<PageQuery> {
        self.queries.lock().clone()
    }

    fn interaction(&self, id: &str) -> Result<Status, ApiError> {
        self.interaction_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_interactions.load(Ordering::Relaxed) {
            return Err(ApiError::Status { status: 500 });
        }
        self.staged
            .lock()
            .remove(id)
            .ok_or(ApiError::Status { status: 422 })
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn fetch_status(&self, id: &str) -> Result<Status, ApiError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        self.statuses.lock().get(id).cloned().ok_or_else(not_found)
    }

    async fn publish_status(&self, _new_status: &NewStatus) -> Result<Status, ApiError> {
        self.staged_publish
            .lock()
            .take()
            .ok_or(ApiError::Status { status: 422 })
    }

    async fn edit_status(&self, _id: &str, _new_status: &NewStatus) -> Result<Status, ApiError> {
        self.staged_publish
            .lock()
            .take()
            .ok_or(ApiError::Status { status: 422 })
    }

    async fn delete_status(&self, id: &str) -> Result<Status, ApiError> {
        self.statuses.lock().remove(id).ok_or_else(not_found)
    }

    async fn reblog(&self, id: &str) -> Result<Status, ApiError> {
        self.interaction(id)
    }

    async fn unreblog(&self, id: &str) -> Result<Status, ApiError> {
        self.interaction(id)
    }

    async fn favourite(&self, id: &str) -> Result<Status, ApiError> {
        self.interaction(id)
    }

    async fn unfavourite(&self, id: &str) -> Result<Status, ApiError> {
        self.interaction(id)
    }

    async fn bookmark(&self, id: &str) -> Result<Status, ApiError> {
        self.interaction(id)
    }

    async fn unbookmark(&self, id: &str) -> Result<Status, ApiError> {
        self.interaction(id)
    }

    async fn mute_conversation(&self, id: &str) -> Result<Status, ApiError> {
        self.interaction(id)
    }

    async fn unmute_conversation(&self, id: &str) -> Result<Status, ApiError> {
        self.interaction(id)
    }

    async fn fetch_poll(&self, id: &str) -> Result<Poll, ApiError> {
        self.polls.lock().get(id).cloned().ok_or_else(not_found)
    }

    async fn vote(&self, poll_id: &str, _choices: &[usize]) -> Result<Poll, ApiError> {
        self.interaction_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_interactions.load(Ordering::Relaxed) {
            return Err(ApiError::Status { status: 500 });
        }
        self.polls
            .lock()
            .get(poll_id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn fetch_account(&self, id: &str) -> Result<Account, ApiError> {
        self.accounts.lock().get(id).cloned().ok_or_else(not_found)
    }

    async fn lookup_account(&self, acct: &str) -> Result<Account, ApiError> {
        self.accounts
            .lock()
            .values()
            .find(|a| a.acct == acct)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn timeline(
        &self,
        _source: &TimelineSource,
        query: &PageQuery,
    ) -> Result<Page, ApiError> {
        self.queries.lock().push(query.clone());
        let statuses = self.pages.lock().pop_front().unwrap_or_default();
        let next_max_id = statuses.last().map(|s| s.id.clone());
        Ok(Page {
            statuses,
            next_max_id,
        })
    }
}
