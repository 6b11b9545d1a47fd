//! The threading job queue.
//!
//! Saves do not resolve threads inline; they enqueue a job here. The host
//! drains the queue at its own pace ([`crate::session::Session::flush_threading`]),
//! which coalesces a burst of saves from one page fetch into a single
//! resolution pass and gives tests a deterministic flush point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use rookery_types::{InstanceHost, Status, StatusKey};

/// One scheduled thread resolution.
pub struct ThreadJob {
    pub status: Arc<Status>,
    pub instance: Option<InstanceHost>,
    key: StatusKey,
    canceled: Arc<AtomicBool>,
}

impl ThreadJob {
    pub fn key(&self) -> &StatusKey {
        &self.key
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }
}

/// Handle returned by [`ThreadingQueue::schedule`]; canceling it makes the
/// drain skip the job.
#[derive(Clone)]
pub struct JobHandle {
    canceled: Arc<AtomicBool>,
}

impl JobHandle {
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }
}

/// Pending thread resolutions, deduplicated by cache key.
#[derive(Clone, Default)]
pub struct ThreadingQueue {
    pending: Arc<Mutex<Vec<ThreadJob>>>,
}

impl ThreadingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a resolution for `status`. A live job for the same key is
    /// reused instead of queuing a duplicate.
    pub fn schedule(&self, status: Arc<Status>, instance: Option<InstanceHost>) -> JobHandle {
        let key = StatusKey::new(&status.id, instance.as_ref());
        let mut pending = self.pending.lock();

        if let Some(job) = pending.iter().find(|j| j.key == key && !j.is_canceled()) {
            return JobHandle {
                canceled: job.canceled.clone(),
            };
        }

        debug!(key = %key, "scheduling thread resolution");
        let canceled = Arc::new(AtomicBool::new(false));
        pending.push(ThreadJob {
            status,
            instance,
            key,
            canceled: canceled.clone(),
        });
        JobHandle { canceled }
    }

    /// Take every pending job, leaving the queue empty. Canceled jobs are
    /// included so the caller can skip and drop them.
    pub fn drain(&self) -> Vec<ThreadJob> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::status;

    #[test]
    fn schedule_and_drain() {
        let queue = ThreadingQueue::new();
        queue.schedule(Arc::new(status("1", "alice")), None);
        queue.schedule(Arc::new(status("2", "alice")), None);

        assert_eq!(queue.len(), 2);
        let jobs = queue.drain();
        assert_eq!(jobs.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn duplicate_keys_coalesce() {
        let queue = ThreadingQueue::new();
        queue.schedule(Arc::new(status("1", "alice")), None);
        queue.schedule(Arc::new(status("1", "alice")), None);

        assert_eq!(queue.len(), 1);

        // Same id on another instance is a different key.
        queue.schedule(
            Arc::new(status("1", "alice")),
            Some(InstanceHost::new("corvid.social")),
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn canceled_jobs_are_flagged() {
        let queue = ThreadingQueue::new();
        let handle = queue.schedule(Arc::new(status("1", "alice")), None);
        handle.cancel();

        let jobs = queue.drain();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].is_canceled());
    }

    #[test]
    fn coalescing_shares_the_cancel_flag() {
        let queue = ThreadingQueue::new();
        let first = queue.schedule(Arc::new(status("1", "alice")), None);
        let second = queue.schedule(Arc::new(status("1", "alice")), None);

        second.cancel();
        drop(first);

        let jobs = queue.drain();
        assert!(jobs[0].is_canceled());
    }
}
