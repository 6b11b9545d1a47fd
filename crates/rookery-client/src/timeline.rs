//! Timeline assembly.
//!
//! Pulls pages from the gateway, pushes every status through the cache,
//! and derives a lightweight ordered view-model for rendering, collapsing
//! runs of boosts into a carousel group when the setting is on.
//!
//! Page loads are debounced on the leading edge so scroll-driven bursts
//! trigger a single fetch.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use rookery_api::{ApiError, Gateway, PageQuery, Paginator, TimelineSource};
use rookery_store::TimelineSettings;
use rookery_types::{InstanceHost, Status};

use crate::cache::{SaveOptions, StatusCache};
use crate::session::Session;

/// Statuses requested per page.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Minimum interval between page loads.
const FETCH_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Boost runs at least this long collapse into a carousel.
const SERIAL_BOOST_THRESHOLD: usize = 3;

/// One status reference in the view-model.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimelineEntry {
    pub id: String,
    /// Id of the boosted status when this entry is a boost.
    pub reblog: Option<String>,
    /// Whether the status replies to some account.
    pub reply: bool,
}

impl TimelineEntry {
    fn from_status(status: &Status) -> Self {
        Self {
            id: status.id.clone(),
            reblog: status.reblog.as_ref().map(|r| r.id.clone()),
            reply: status.is_reply(),
        }
    }
}

/// A renderable timeline item: a plain entry, or a collapsed group of
/// boosts.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TimelineItem {
    Entry(TimelineEntry),
    Carousel {
        ids: Vec<String>,
        boosts: Vec<TimelineEntry>,
    },
}

/// Result of one page fetch.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub items: Vec<TimelineItem>,
    /// The underlying iterator is exhausted; stop requesting pages.
    pub done: bool,
}

/// Assembles one timeline (home, hashtag, list, ...) page by page.
pub struct Timeline {
    gateway: Arc<dyn Gateway>,
    cache: StatusCache,
    source: TimelineSource,
    instance: Option<InstanceHost>,
    settings: TimelineSettings,
    paginator: Paginator,
    debounce: Debouncer,
    limit: u32,
    items: Vec<TimelineItem>,
    new_entries: Vec<TimelineEntry>,
    newest_seen: Option<String>,
}

impl Timeline {
    pub fn new(
        session: &Session,
        source: TimelineSource,
        instance: Option<InstanceHost>,
        settings: TimelineSettings,
    ) -> Self {
        let gateway = session.gateway().clone();
        let paginator = Paginator::new(gateway.clone(), source.clone(), DEFAULT_PAGE_LIMIT);
        Self {
            gateway,
            cache: session.cache().clone(),
            source,
            instance,
            settings,
            paginator,
            debounce: Debouncer::new(FETCH_DEBOUNCE),
            limit: DEFAULT_PAGE_LIMIT,
            items: Vec::new(),
            new_entries: Vec::new(),
            newest_seen: None,
        }
    }

    /// Debounced [`fetch_page`](Self::fetch_page); `Ok(None)` when the
    /// call fell inside the debounce window and was dropped.
    pub async fn load(&mut self, first_load: bool) -> Result<Option<FetchedPage>, ApiError> {
        if !self.debounce.allow() {
            debug!("timeline load debounced");
            return Ok(None);
        }
        Ok(Some(self.fetch_page(first_load).await?))
    }

    /// Fetch exactly one page.
    ///
    /// `first_load` discards the pagination cursor and the new-items side
    /// buffer. Every fetched status is written into the cache, overriding
    /// stale copies and scheduling thread resolution; the returned items
    /// are re-sorted by `created_at` descending first, since delivery
    /// order drifts under federation delay.
    pub async fn fetch_page(&mut self, first_load: bool) -> Result<FetchedPage, ApiError> {
        if first_load {
            self.paginator =
                Paginator::new(self.gateway.clone(), self.source.clone(), self.limit);
            self.new_entries.clear();
        }

        let page = self.paginator.next_page().await?;
        let done = self.paginator.is_exhausted();

        let mut statuses = page.statuses;
        statuses.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if first_load {
            if let Some(first) = statuses.first() {
                self.newest_seen = Some(first.id.clone());
            }
        }

        let mut entries = Vec::with_capacity(statuses.len());
        for status in statuses {
            let entry = TimelineEntry::from_status(&status);
            self.cache
                .save(status, self.instance.as_ref(), SaveOptions::default());
            entries.push(entry);
        }

        let items = if self.settings.boosts_carousel {
            group_boosts(entries)
        } else {
            entries.into_iter().map(TimelineItem::Entry).collect()
        };

        if first_load {
            self.items = items.clone();
        } else {
            self.items.extend(items.iter().cloned());
        }

        debug!(
            source = ?self.source,
            items = items.len(),
            done,
            "assembled timeline page"
        );
        Ok(FetchedPage { items, done })
    }

    /// The assembled items of every page fetched so far.
    pub fn items(&self) -> &[TimelineItem] {
        &self.items
    }

    /// Check for statuses newer than the last first-page load and stash
    /// them in the side buffer. Returns the buffer size; failures are
    /// logged and ignored.
    pub async fn poll_new(&mut self) -> usize {
        let Some(since) = self.newest_seen.clone() else {
            return self.new_entries.len();
        };

        let query = PageQuery {
            limit: Some(self.limit),
            since_id: Some(since),
            ..PageQuery::default()
        };
        match self.gateway.timeline(&self.source, &query).await {
            Ok(page) => {
                let mut statuses = page.statuses;
                statuses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                if let Some(first) = statuses.first() {
                    self.newest_seen = Some(first.id.clone());
                }
                for status in statuses {
                    if self.new_entries.iter().any(|e| e.id == status.id) {
                        continue;
                    }
                    let entry = TimelineEntry::from_status(&status);
                    self.cache
                        .save(status, self.instance.as_ref(), SaveOptions::default());
                    self.new_entries.push(entry);
                }
            }
            Err(e) => {
                debug!(error = %e, "new-items check failed");
            }
        }
        self.new_entries.len()
    }

    pub fn has_new(&self) -> bool {
        !self.new_entries.is_empty()
    }

    /// Drain the new-items side buffer.
    pub fn take_new(&mut self) -> Vec<TimelineEntry> {
        std::mem::take(&mut self.new_entries)
    }
}

/// Collapse boost entries into a single carousel group when they dominate
/// the page: more than a quarter of it, or three or more in a row. A group
/// covering more than three quarters goes to the end of the page,
/// otherwise it is spliced into the middle of the remaining entries. The
/// heuristic is page-local and never merges groups across pages.
fn group_boosts(entries: Vec<TimelineEntry>) -> Vec<TimelineItem> {
    let total = entries.len();
    let mut originals: Vec<TimelineEntry> = Vec::new();
    let mut stash: Vec<TimelineEntry> = Vec::new();
    let mut serial_boosts = 0usize;

    for entry in &entries {
        if entry.reblog.is_some() {
            stash.push(entry.clone());
            serial_boosts += 1;
        } else {
            originals.push(entry.clone());
            // A run that already hit the threshold keeps its flag.
            if serial_boosts < SERIAL_BOOST_THRESHOLD {
                serial_boosts = 0;
            }
        }
    }

    let grouped = stash.len() * 4 > total || serial_boosts >= SERIAL_BOOST_THRESHOLD;
    if !grouped {
        return entries.into_iter().map(TimelineItem::Entry).collect();
    }

    let ids: Vec<String> = stash.iter().map(|e| e.id.clone()).collect();
    let dominant = stash.len() * 4 > total * 3;
    let group = TimelineItem::Carousel { ids, boosts: stash };

    let mut items: Vec<TimelineItem> =
        originals.into_iter().map(TimelineItem::Entry).collect();
    if dominant {
        items.push(group);
    } else {
        let middle = items.len() / 2;
        items.insert(middle, group);
    }
    items
}

/// Leading-edge rate guard: the first call passes immediately, calls
/// within the interval are dropped.
pub(crate) struct Debouncer {
    interval: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub(crate) fn allow(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(prev) if now.duration_since(prev) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{boost, session_with, status_at};

    fn entry(id: &str) -> TimelineEntry {
        TimelineEntry {
            id: id.into(),
            reblog: None,
            reply: false,
        }
    }

    fn boost_entry(id: &str) -> TimelineEntry {
        TimelineEntry {
            id: id.into(),
            reblog: Some(format!("inner-{id}")),
            reply: false,
        }
    }

    #[test]
    fn mostly_boosts_append_the_group_at_the_end() {
        // 16 boosts out of 20 (80%): all originals first, one trailing
        // group holding the boosts in their original relative order.
        let mut entries = Vec::new();
        for i in 0..20 {
            if i % 5 == 0 {
                entries.push(entry(&format!("o{i}")));
            } else {
                entries.push(boost_entry(&format!("b{i}")));
            }
        }

        let items = group_boosts(entries);
        assert_eq!(items.len(), 5);
        for item in &items[..4] {
            assert!(matches!(item, TimelineItem::Entry(e) if e.reblog.is_none()));
        }
        match &items[4] {
            TimelineItem::Carousel { ids, boosts } => {
                assert_eq!(boosts.len(), 16);
                assert_eq!(ids.len(), 16);
                assert_eq!(boosts[0].id, "b1");
                assert_eq!(boosts[15].id, "b19");
            }
            other => panic!("expected trailing carousel, got {other:?}"),
        }
    }

    #[test]
    fn three_consecutive_boosts_suffice_below_the_ratio() {
        // 3 boosts in a row out of 16 (under 25%) still trigger grouping,
        // spliced into the middle of the remaining entries.
        let mut entries: Vec<TimelineEntry> =
            (0..6).map(|i| entry(&format!("a{i}"))).collect();
        entries.extend((0..3).map(|i| boost_entry(&format!("b{i}"))));
        entries.extend((0..7).map(|i| entry(&format!("c{i}"))));

        let items = group_boosts(entries);
        assert_eq!(items.len(), 14);

        let carousel_at = items
            .iter()
            .position(|i| matches!(i, TimelineItem::Carousel { .. }))
            .expect("grouping triggered");
        assert_eq!(carousel_at, 13 / 2);
    }

    #[test]
    fn scattered_boosts_below_thresholds_stay_inline() {
        let entries = vec![
            entry("a"),
            boost_entry("b"),
            entry("c"),
            entry("d"),
            boost_entry("e"),
            entry("f"),
            entry("g"),
            entry("h"),
            entry("i"),
        ];
        let expected: Vec<TimelineItem> = entries
            .iter()
            .cloned()
            .map(TimelineItem::Entry)
            .collect();

        assert_eq!(group_boosts(entries), expected);
    }

    #[test]
    fn a_trailing_run_keeps_its_threshold() {
        // The run never meets a later original entry, so the counter is
        // still >= 3 when the scan ends.
        let entries = vec![
            entry("a"),
            entry("b"),
            entry("c"),
            entry("d"),
            entry("e"),
            entry("f"),
            entry("g"),
            entry("h"),
            entry("i"),
            boost_entry("x"),
            boost_entry("y"),
            boost_entry("z"),
        ];
        let items = group_boosts(entries);
        assert!(items
            .iter()
            .any(|i| matches!(i, TimelineItem::Carousel { .. })));
    }

    #[tokio::test]
    async fn pages_are_sorted_by_created_at_descending() {
        let (gateway, session) = session_with("alice");
        gateway.push_page(vec![
            status_at("1", "bob", 10),
            status_at("2", "bob", 30),
            status_at("3", "bob", 20),
        ]);

        let mut timeline = Timeline::new(
            &session,
            TimelineSource::Home,
            None,
            TimelineSettings::default(),
        );
        let page = timeline.fetch_page(true).await.unwrap();

        let ids: Vec<&str> = page
            .items
            .iter()
            .map(|i| match i {
                TimelineItem::Entry(e) => e.id.as_str(),
                TimelineItem::Carousel { .. } => panic!("no boosts here"),
            })
            .collect();
        assert_eq!(ids, ["2", "3", "1"]);
    }

    #[tokio::test]
    async fn fetched_statuses_land_in_the_cache_and_queue() {
        let (gateway, session) = session_with("alice");
        gateway.push_page(vec![
            status_at("1", "bob", 1),
            boost("2", "carol", status_at("9", "bob", 0)),
        ]);

        let mut timeline = Timeline::new(
            &session,
            TimelineSource::Home,
            None,
            TimelineSettings::default(),
        );
        timeline.fetch_page(true).await.unwrap();

        assert!(session.cache().get("1", None).is_some());
        assert!(session.cache().get("2", None).is_some());
        // The boosted post is cached under its own key too.
        assert!(session.cache().get("9", None).is_some());
    }

    #[tokio::test]
    async fn pagination_advances_the_cursor() {
        let (gateway, session) = session_with("alice");
        gateway.push_page(vec![status_at("9", "bob", 9), status_at("8", "bob", 8)]);
        gateway.push_page(vec![status_at("7", "bob", 7)]);

        let mut timeline = Timeline::new(
            &session,
            TimelineSource::Home,
            None,
            TimelineSettings::default(),
        );
        timeline.fetch_page(true).await.unwrap();
        timeline.fetch_page(false).await.unwrap();

        let queries = gateway.recorded_queries();
        assert_eq!(queries[0].max_id, None);
        assert_eq!(queries[1].max_id.as_deref(), Some("8"));
        assert_eq!(queries[1].limit, Some(DEFAULT_PAGE_LIMIT));
    }

    #[tokio::test]
    async fn empty_page_signals_done() {
        let (gateway, session) = session_with("alice");
        gateway.push_page(vec![status_at("1", "bob", 0)]);
        // Second pull finds nothing.

        let mut timeline = Timeline::new(
            &session,
            TimelineSource::Home,
            None,
            TimelineSettings::default(),
        );

        let first = timeline.fetch_page(true).await.unwrap();
        assert!(!first.done);

        let second = timeline.fetch_page(false).await.unwrap();
        assert!(second.done);
        assert!(second.items.is_empty());
    }

    #[tokio::test]
    async fn first_load_resets_the_cursor_and_side_buffer() {
        let (gateway, session) = session_with("alice");
        gateway.push_page(vec![status_at("5", "bob", 50)]);
        gateway.push_page(vec![status_at("4", "bob", 40)]);
        gateway.push_page(vec![status_at("6", "bob", 60)]);

        let mut timeline = Timeline::new(
            &session,
            TimelineSource::Home,
            None,
            TimelineSettings::default(),
        );

        timeline.fetch_page(true).await.unwrap();
        timeline.fetch_page(false).await.unwrap();
        assert_eq!(timeline.items().len(), 2);

        // Simulate buffered new items, then reload from the top.
        timeline.new_entries.push(entry("x"));
        timeline.fetch_page(true).await.unwrap();
        assert!(!timeline.has_new());
        assert_eq!(timeline.items().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn load_debounces_rapid_calls() {
        let (gateway, session) = session_with("alice");
        gateway.push_page(vec![status_at("1", "bob", 0)]);
        gateway.push_page(vec![status_at("2", "bob", 1)]);

        let mut timeline = Timeline::new(
            &session,
            TimelineSource::Home,
            None,
            TimelineSettings::default(),
        );

        assert!(timeline.load(true).await.unwrap().is_some());
        assert!(timeline.load(false).await.unwrap().is_none());

        tokio::time::advance(Duration::from_millis(1600)).await;
        assert!(timeline.load(false).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn poll_new_buffers_unique_newer_statuses() {
        let (gateway, session) = session_with("alice");
        gateway.push_page(vec![status_at("10", "bob", 10)]);

        let mut timeline = Timeline::new(
            &session,
            TimelineSource::Home,
            None,
            TimelineSettings::default(),
        );
        timeline.fetch_page(true).await.unwrap();

        gateway.push_page(vec![status_at("12", "bob", 12), status_at("11", "bob", 11)]);
        assert_eq!(timeline.poll_new().await, 2);
        assert!(timeline.has_new());

        let new = timeline.take_new();
        assert_eq!(new[0].id, "12");
        assert!(!timeline.has_new());
    }

    #[tokio::test]
    async fn carousel_disabled_returns_plain_entries() {
        let (gateway, session) = session_with("alice");
        gateway.push_page(vec![
            boost("1", "carol", status_at("7", "bob", 3)),
            boost("2", "carol", status_at("8", "bob", 2)),
            boost("3", "carol", status_at("9", "bob", 1)),
        ]);

        let settings = TimelineSettings {
            boosts_carousel: false,
            ..TimelineSettings::default()
        };
        let mut timeline = Timeline::new(&session, TimelineSource::Home, None, settings);
        let page = timeline.fetch_page(true).await.unwrap();

        assert_eq!(page.items.len(), 3);
        assert!(page
            .items
            .iter()
            .all(|i| matches!(i, TimelineItem::Entry(_))));
    }

    #[test]
    fn view_model_serializes_like_the_rendered_shape() {
        let items = vec![
            TimelineItem::Entry(TimelineEntry {
                id: "1".into(),
                reblog: None,
                reply: true,
            }),
            TimelineItem::Carousel {
                ids: vec!["2".into()],
                boosts: vec![boost_entry("2")],
            },
        ];
        let json = serde_json::to_string(&items).unwrap();
        assert!(json.contains(r#""reply":true"#));
        assert!(json.contains(r#""boosts":[{"#));
    }

    #[test]
    fn debouncer_is_leading_edge() {
        // Outside a paused runtime this exercises only the immediate path.
        let mut debouncer = Debouncer::new(Duration::from_secs(60));
        assert!(debouncer.allow());
        assert!(!debouncer.allow());
    }
}
