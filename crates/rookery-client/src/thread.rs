//! Thread reconstruction.
//!
//! Given a freshly saved status, walk its reply chain backwards through
//! same-author replies to the thread root, using cached data where possible
//! and a bounded number of remote fetches otherwise, then annotate each
//! member's position in the cache's thread-number table.
//!
//! Resolution is best-effort: every abort and error is logged and swallowed
//! here, and never reaches the save path that triggered it.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use rookery_api::{ApiError, Gateway};
use rookery_types::{InstanceHost, Status, StatusKey};

use crate::cache::{SaveOptions, StatusCache};

/// Remote fetches allowed per traversal. Revived old threads can drag a
/// long tail of ancestors behind them; anything deeper stays unnumbered.
pub const THREAD_FETCH_BUDGET: usize = 3;

/// Base delay before each remote ancestor fetch, multiplied by the fetch
/// number as a simple backoff.
const FETCH_BACKOFF: Duration = Duration::from_millis(500);

/// Ids memoized across traversals; ancestors shared by several statuses in
/// one drain are fetched once.
const FETCH_MEMO_CAPACITY: usize = 256;

/// Result of one traversal.
#[derive(Debug, Clone)]
pub enum ThreadOutcome {
    /// The reconstructed chain, root-first. A single-element chain means
    /// the status heads its own (possibly trivial) thread.
    Chain(Vec<Arc<Status>>),
    /// The reply link crosses authors; the traversal was abandoned.
    NotAThread,
    /// Reconstruction would have needed a fourth remote fetch.
    FetchBudgetExceeded,
}

/// Walks reply chains and maintains the thread-number table.
pub struct ThreadResolver {
    gateway: Arc<dyn Gateway>,
    cache: StatusCache,
    memo: Mutex<LruCache<String, Arc<Status>>>,
}

impl ThreadResolver {
    pub fn new(gateway: Arc<dyn Gateway>, cache: StatusCache) -> Self {
        let capacity = NonZeroUsize::new(FETCH_MEMO_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            gateway,
            cache,
            memo: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Resolve the chain for `status` and write thread numbers for chains
    /// of two or more. Never fails: aborts and network errors degrade to
    /// "no annotation".
    pub async fn annotate(&self, status: Arc<Status>, instance: Option<&InstanceHost>) {
        match self.walk(status.clone(), instance).await {
            Ok(ThreadOutcome::Chain(chain)) if chain.len() > 1 => {
                debug!(
                    root = %chain[0].id,
                    len = chain.len(),
                    "reconstructed self-reply chain"
                );
                for (index, member) in chain.iter().enumerate() {
                    let key = StatusKey::new(&member.id, instance);
                    self.cache.set_thread_number(key, (index + 1) as u32);
                }
            }
            // A chain of one is ambiguous between "not a thread" and "not
            // fetched yet"; it leaves no annotation either way.
            Ok(ThreadOutcome::Chain(_)) => {}
            Ok(ThreadOutcome::NotAThread) => {
                debug!(id = %status.id, "reply chain crosses authors; not a thread");
            }
            Ok(ThreadOutcome::FetchBudgetExceeded) => {
                debug!(id = %status.id, "thread reconstruction hit the fetch budget");
            }
            Err(e) => {
                warn!(id = %status.id, error = %e, "thread reconstruction failed");
            }
        }
    }

    /// Walk from `status` to the head of its same-author reply chain.
    ///
    /// The returned chain is ordered root-first, leaf-last.
    pub async fn walk(
        &self,
        status: Arc<Status>,
        instance: Option<&InstanceHost>,
    ) -> Result<ThreadOutcome, ApiError> {
        let mut chain: Vec<Arc<Status>> = Vec::new();
        let mut current = status;
        let mut fetches = 0usize;

        loop {
            let same_author = current.in_reply_to_account_id.as_deref()
                == Some(current.account.id.as_str());

            // A status with no parent link, or replying to another account,
            // heads the chain considered here. Replying to someone else is
            // a normal terminator, not an error.
            if current.in_reply_to_id.is_none() || !same_author {
                chain.push(current);
                break;
            }

            // Mixed-author parent links abort instead of threading. The
            // head check above already terminates on that combination, so
            // this cannot fire today; it stays so no reordering of these
            // checks can mis-number a chain that crosses authors.
            if current.in_reply_to_id.is_some() && !same_author {
                return Ok(ThreadOutcome::NotAThread);
            }

            let Some(parent_id) = current.in_reply_to_id.clone() else {
                chain.push(current);
                break;
            };

            let parent_key = StatusKey::new(&parent_id, instance);
            let parent = match self.cache.get_by_key(&parent_key) {
                Some(parent) => parent,
                None => {
                    if fetches == THREAD_FETCH_BUDGET {
                        return Ok(ThreadOutcome::FetchBudgetExceeded);
                    }
                    fetches += 1;
                    // Spread ancestor fetches out rather than hammering the
                    // origin server when an old thread is revived.
                    sleep(FETCH_BACKOFF * fetches as u32).await;

                    let parent = self.fetch_memoized(&parent_id).await?;
                    // The traversal owns the recursion; do not reschedule.
                    self.cache
                        .save((*parent).clone(), instance, SaveOptions::unthreaded());
                    parent
                }
            };

            chain.push(current);
            current = parent;
        }

        chain.reverse();
        Ok(ThreadOutcome::Chain(chain))
    }

    /// Fetch a status by id, memoizing the result for the resolver's
    /// lifetime. Traversals run sequentially off the queue drain, so a
    /// plain resolved-value memo suffices.
    pub(crate) async fn fetch_memoized(&self, id: &str) -> Result<Arc<Status>, ApiError> {
        if let Some(hit) = self.memo.lock().get(id) {
            return Ok(hit.clone());
        }

        debug!(id, "fetching thread ancestor");
        let fetched = Arc::new(self.gateway.fetch_status(id).await?);
        self.memo.lock().put(id.to_string(), fetched.clone());
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::ThreadingQueue;
    use crate::testutil::{reply, status, MockGateway};

    fn setup() -> (Arc<MockGateway>, StatusCache, ThreadResolver) {
        let gateway = Arc::new(MockGateway::new());
        let cache = StatusCache::new(ThreadingQueue::new());
        let resolver = ThreadResolver::new(gateway.clone(), cache.clone());
        (gateway, cache, resolver)
    }

    #[tokio::test]
    async fn cached_chain_numbers_without_fetches() {
        let (gateway, cache, resolver) = setup();

        // root <- mid <- leaf, all by alice, all cached.
        let root = status("1", "alice");
        let mid = reply("2", "alice", "1", "alice");
        let leaf = reply("3", "alice", "2", "alice");
        for s in [&root, &mid, &leaf] {
            cache.save(s.clone(), None, SaveOptions::unthreaded());
        }

        let leaf = cache.get("3", None).unwrap();
        resolver.annotate(leaf, None).await;

        assert_eq!(cache.thread_number(&StatusKey::new("1", None)), Some(1));
        assert_eq!(cache.thread_number(&StatusKey::new("2", None)), Some(2));
        assert_eq!(cache.thread_number(&StatusKey::new("3", None)), Some(3));
        assert_eq!(gateway.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_ancestors_are_fetched_and_cached() {
        let (gateway, cache, resolver) = setup();

        gateway.insert_status(status("1", "alice"));
        gateway.insert_status(reply("2", "alice", "1", "alice"));
        let leaf = cache.save(
            reply("3", "alice", "2", "alice"),
            None,
            SaveOptions::unthreaded(),
        );

        resolver.annotate(leaf, None).await;

        assert_eq!(gateway.fetch_count(), 2);
        assert!(cache.get("1", None).is_some());
        assert_eq!(cache.thread_number(&StatusKey::new("3", None)), Some(3));
    }

    /// Chain with four uncached ancestors; the fourth required fetch is
    /// one past the budget.
    fn deep_chain(gateway: &MockGateway, cache: &StatusCache) -> Arc<Status> {
        gateway.insert_status(reply("4", "alice", "3", "alice"));
        gateway.insert_status(reply("3", "alice", "2", "alice"));
        gateway.insert_status(reply("2", "alice", "1", "alice"));
        cache.save(
            reply("5", "alice", "4", "alice"),
            None,
            SaveOptions::unthreaded(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_budget_aborts_without_annotation() {
        let (gateway, cache, resolver) = setup();
        let leaf = deep_chain(&gateway, &cache);

        // Must not panic or error out of the save path.
        resolver.annotate(leaf, None).await;

        assert_eq!(gateway.fetch_count(), THREAD_FETCH_BUDGET);
        for id in ["1", "2", "3", "4", "5"] {
            assert_eq!(cache.thread_number(&StatusKey::new(id, None)), None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn walk_reports_the_budget_abort() {
        let (gateway, cache, resolver) = setup();
        let leaf = deep_chain(&gateway, &cache);

        match resolver.walk(leaf, None).await.unwrap() {
            ThreadOutcome::FetchBudgetExceeded => {}
            other => panic!("expected budget abort, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_scales_with_fetch_number() {
        let (gateway, cache, resolver) = setup();

        gateway.insert_status(status("1", "alice"));
        gateway.insert_status(reply("2", "alice", "1", "alice"));
        let leaf = cache.save(
            reply("3", "alice", "2", "alice"),
            None,
            SaveOptions::unthreaded(),
        );

        let before = tokio::time::Instant::now();
        resolver.annotate(leaf, None).await;
        let elapsed = before.elapsed();

        // 500 ms before the first fetch, 1000 ms before the second.
        assert!(elapsed >= Duration::from_millis(1500), "elapsed {elapsed:?}");
    }

    #[tokio::test]
    async fn reply_to_another_author_is_a_chain_head() {
        let (gateway, cache, resolver) = setup();

        let leaf = cache.save(
            reply("2", "alice", "1", "bob"),
            None,
            SaveOptions::unthreaded(),
        );

        match resolver.walk(leaf.clone(), None).await.unwrap() {
            ThreadOutcome::Chain(chain) => assert_eq!(chain.len(), 1),
            other => panic!("expected single-element chain, got {other:?}"),
        }

        resolver.annotate(leaf, None).await;
        assert_eq!(cache.thread_number(&StatusKey::new("2", None)), None);
        assert_eq!(gateway.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn network_errors_never_escape_annotate() {
        let (_gateway, cache, resolver) = setup();

        // Parent neither cached nor known to the gateway: fetch fails.
        let leaf = cache.save(
            reply("2", "alice", "1", "alice"),
            None,
            SaveOptions::unthreaded(),
        );

        resolver.annotate(leaf, None).await;
        assert_eq!(cache.thread_number(&StatusKey::new("2", None)), None);
    }

    #[tokio::test]
    async fn ancestor_fetches_are_memoized() {
        let (gateway, _cache, resolver) = setup();
        gateway.insert_status(status("1", "alice"));

        let first = resolver.fetch_memoized("1").await.unwrap();
        let second = resolver.fetch_memoized("1").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(gateway.fetch_count(), 1);
    }
}
