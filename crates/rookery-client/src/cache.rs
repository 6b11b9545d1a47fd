//! The process-wide status cache.
//!
//! Single source of truth for every view of a status. The cache is a
//! cheaply clonable handle constructed once per session and passed by
//! reference to all consumers; writes go through [`StatusCache::save`] and
//! each write is broadcast synchronously to subscribers.
//!
//! Entries are never removed. Deletion is modelled by tombstoning the
//! entry in place (`deleted = true`) so components holding a key keep
//! resolving it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use rookery_types::{Account, InstanceHost, Status, StatusKey};

use crate::queue::ThreadingQueue;

/// Broadcast capacity; sized to absorb a full page of saves in one burst.
const EVENT_CAPACITY: usize = 64;

/// A cache write, delivered to subscribers right after it lands.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub key: StatusKey,
    pub status: Arc<Status>,
}

/// Knobs for [`StatusCache::save`].
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Overwrite an existing entry at the same key. On by default.
    pub override_existing: bool,
    /// Skip scheduling thread resolution for the saved status.
    pub skip_threading: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            override_existing: true,
            skip_threading: false,
        }
    }
}

impl SaveOptions {
    /// Save without scheduling thread resolution. Used by the thread
    /// resolver itself, which owns the recursion.
    pub fn unthreaded() -> Self {
        Self {
            skip_threading: true,
            ..Self::default()
        }
    }

    /// Keep an existing entry instead of overwriting it.
    pub fn keep_existing() -> Self {
        Self {
            override_existing: false,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct CacheInner {
    statuses: HashMap<StatusKey, Arc<Status>>,
    accounts: HashMap<StatusKey, Arc<Account>>,
    /// 1-based position of a status within its reconstructed thread.
    /// Absence means "not part of a known thread".
    thread_numbers: HashMap<StatusKey, u32>,
}

/// Reactive mapping from [`StatusKey`] to the latest known status object.
#[derive(Clone)]
pub struct StatusCache {
    inner: Arc<Mutex<CacheInner>>,
    events: broadcast::Sender<CacheEvent>,
    queue: ThreadingQueue,
}

impl StatusCache {
    pub fn new(queue: ThreadingQueue) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            events,
            queue,
        }
    }

    /// Write a status into the cache under `key(status.id, instance)`.
    ///
    /// An embedded `reblog` is additionally cached under its own key so the
    /// boosted post can be rendered and interacted with on its own. Unless
    /// [`SaveOptions::skip_threading`] is set, thread resolution is
    /// scheduled for both; the queue coalesces bursts from a single page
    /// fetch into one downstream pass.
    ///
    /// Returns the stored entry.
    pub fn save(
        &self,
        status: Status,
        instance: Option<&InstanceHost>,
        opts: SaveOptions,
    ) -> Arc<Status> {
        let key = StatusKey::new(&status.id, instance);

        if !opts.override_existing {
            if let Some(existing) = self.inner.lock().statuses.get(&key) {
                debug!(key = %key, "keeping existing cache entry");
                return existing.clone();
            }
        }

        let reblog = status.reblog.as_deref().cloned();
        let outer = Arc::new(status);
        self.inner.lock().statuses.insert(key.clone(), outer.clone());
        self.emit(key, outer.clone());

        let reblog = reblog.map(|inner_status| {
            let reblog_key = StatusKey::new(&inner_status.id, instance);
            let entry = Arc::new(inner_status);
            self.inner
                .lock()
                .statuses
                .insert(reblog_key.clone(), entry.clone());
            self.emit(reblog_key, entry.clone());
            entry
        });

        if !opts.skip_threading {
            let _ = self.queue.schedule(outer.clone(), instance.cloned());
            if let Some(entry) = reblog {
                let _ = self.queue.schedule(entry, instance.cloned());
            }
        }

        outer
    }

    /// [`save`](Self::save) for an optional status; `None` is a no-op.
    pub fn save_opt(
        &self,
        status: Option<Status>,
        instance: Option<&InstanceHost>,
        opts: SaveOptions,
    ) -> Option<Arc<Status>> {
        status.map(|s| self.save(s, instance, opts))
    }

    /// Pure lookup; never fetches remotely.
    pub fn get(&self, id: &str, instance: Option<&InstanceHost>) -> Option<Arc<Status>> {
        self.get_by_key(&StatusKey::new(id, instance))
    }

    pub fn get_by_key(&self, key: &StatusKey) -> Option<Arc<Status>> {
        self.inner.lock().statuses.get(key).cloned()
    }

    /// Overwrite a single entry without reblog expansion or threading.
    /// This is the optimistic-mutation write path.
    pub fn replace(&self, key: StatusKey, status: Status) -> Arc<Status> {
        let entry = Arc::new(status);
        self.inner.lock().statuses.insert(key.clone(), entry.clone());
        self.emit(key, entry.clone());
        entry
    }

    /// Put a previously obtained entry back, restoring the exact original
    /// allocation. This is the rollback path of optimistic mutation.
    pub(crate) fn restore(&self, key: &StatusKey, status: Arc<Status>) {
        self.inner
            .lock()
            .statuses
            .insert(key.clone(), status.clone());
        self.emit(key.clone(), status);
    }

    /// Swap the poll on a cached status, leaving the rest untouched.
    /// No-op when the key is absent or the status carries no poll.
    pub(crate) fn update_poll(&self, key: &StatusKey, poll: rookery_types::Poll) -> bool {
        let updated = {
            let inner = self.inner.lock();
            match inner.statuses.get(key) {
                Some(entry) if entry.poll.is_some() => {
                    let mut next = (**entry).clone();
                    next.poll = Some(poll);
                    Some(next)
                }
                _ => None,
            }
        };
        match updated {
            Some(next) => {
                self.replace(key.clone(), next);
                true
            }
            None => false,
        }
    }

    /// Tombstone an entry in place. Returns whether the key existed.
    pub fn mark_deleted(&self, id: &str, instance: Option<&InstanceHost>) -> bool {
        let key = StatusKey::new(id, instance);
        let tombstone = {
            let inner = self.inner.lock();
            inner.statuses.get(&key).map(|entry| {
                let mut next = (**entry).clone();
                next.deleted = true;
                next
            })
        };
        match tombstone {
            Some(next) => {
                debug!(key = %key, "tombstoning deleted status");
                self.replace(key, next);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Thread numbers
    // ------------------------------------------------------------------

    pub fn thread_number(&self, key: &StatusKey) -> Option<u32> {
        self.inner.lock().thread_numbers.get(key).copied()
    }

    pub(crate) fn set_thread_number(&self, key: StatusKey, number: u32) {
        self.inner.lock().thread_numbers.insert(key, number);
    }

    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    pub fn save_account(&self, account: Account, instance: Option<&InstanceHost>) -> Arc<Account> {
        let key = StatusKey::new(&account.id, instance);
        let entry = Arc::new(account);
        self.inner.lock().accounts.insert(key, entry.clone());
        entry
    }

    pub fn get_account(&self, id: &str, instance: Option<&InstanceHost>) -> Option<Arc<Account>> {
        self.inner
            .lock()
            .accounts
            .get(&StatusKey::new(id, instance))
            .cloned()
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Subscribe to every cache write.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    /// Subscribe to writes of a single key.
    pub fn watch(&self, id: &str, instance: Option<&InstanceHost>) -> KeyWatch {
        KeyWatch {
            key: StatusKey::new(id, instance),
            rx: self.events.subscribe(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().statuses.is_empty()
    }

    fn emit(&self, key: StatusKey, status: Arc<Status>) {
        // Send fails only when nobody subscribed, which is fine.
        let _ = self.events.send(CacheEvent { key, status });
    }
}

/// Filtered subscription to a single cache key.
pub struct KeyWatch {
    key: StatusKey,
    rx: broadcast::Receiver<CacheEvent>,
}

impl KeyWatch {
    /// Wait for the next write to the watched key.
    ///
    /// Returns `None` once the cache has been dropped. A lagged receiver
    /// skips intermediate writes and keeps waiting for the next one; the
    /// cache itself always holds the latest state.
    pub async fn changed(&mut self) -> Option<Arc<Status>> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.key == self.key => return Some(event.status),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{boost, status};

    fn cache() -> StatusCache {
        StatusCache::new(ThreadingQueue::new())
    }

    #[test]
    fn save_and_get() {
        let cache = cache();
        cache.save(status("1", "alice"), None, SaveOptions::default());

        let entry = cache.get("1", None).expect("cached");
        assert_eq!(entry.id, "1");
        assert!(cache.get("1", Some(&InstanceHost::new("other.example"))).is_none());
    }

    #[test]
    fn save_opt_none_is_a_noop() {
        let cache = cache();
        assert!(cache.save_opt(None, None, SaveOptions::default()).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn keep_existing_leaves_entry_untouched() {
        let cache = cache();
        let mut first = status("1", "alice");
        first.content = "<p>original</p>".into();
        cache.save(first, None, SaveOptions::default());

        let mut second = status("1", "alice");
        second.content = "<p>newer</p>".into();
        cache.save(second, None, SaveOptions::keep_existing());

        assert_eq!(cache.get("1", None).unwrap().content, "<p>original</p>");
    }

    #[test]
    fn reblog_is_cached_under_its_own_key() {
        let cache = cache();
        let boosted = status("10", "bob");
        cache.save(boost("20", "alice", boosted), None, SaveOptions::default());

        assert!(cache.get("20", None).is_some());
        let inner = cache.get("10", None).expect("boosted post cached");
        assert_eq!(inner.account.id, "bob");
    }

    #[test]
    fn instance_keys_are_distinct() {
        let cache = cache();
        let host = InstanceHost::new("corvid.social");
        cache.save(status("1", "alice"), Some(&host), SaveOptions::default());

        assert!(cache.get("1", None).is_none());
        assert!(cache.get("1", Some(&host)).is_some());
    }

    #[test]
    fn mark_deleted_tombstones_in_place() {
        let cache = cache();
        cache.save(status("1", "alice"), None, SaveOptions::default());

        assert!(cache.mark_deleted("1", None));
        let entry = cache.get("1", None).expect("entry still present");
        assert!(entry.deleted);

        assert!(!cache.mark_deleted("missing", None));
    }

    #[test]
    fn save_schedules_threading_unless_skipped() {
        let queue = ThreadingQueue::new();
        let cache = StatusCache::new(queue.clone());

        cache.save(status("1", "alice"), None, SaveOptions::unthreaded());
        assert!(queue.is_empty());

        cache.save(status("2", "alice"), None, SaveOptions::default());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn subscribers_receive_saves_synchronously() {
        let cache = cache();
        let mut rx = cache.subscribe();

        cache.save(status("1", "alice"), None, SaveOptions::default());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.key.as_str(), "1");
        assert_eq!(event.status.id, "1");
    }

    #[tokio::test]
    async fn watch_filters_to_one_key() {
        let cache = cache();
        let mut watch = cache.watch("2", None);

        cache.save(status("1", "alice"), None, SaveOptions::default());
        cache.save(status("2", "bob"), None, SaveOptions::default());

        let seen = watch.changed().await.unwrap();
        assert_eq!(seen.id, "2");
    }
}
