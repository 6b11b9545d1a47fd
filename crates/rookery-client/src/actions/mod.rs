//! Interaction actions: boost, favourite, bookmark, conversation mute,
//! and poll voting.
//!
//! Every action follows the same optimistic protocol:
//!
//! 1. check preconditions synchronously (authenticated, same instance);
//! 2. overwrite the cache entry with the toggled flag and adjusted counter
//!    before the remote call, so all subscribed views update immediately;
//! 3. issue the remote call and reconcile with the server's canonical
//!    status via `save`;
//! 4. on failure, restore the exact pre-mutation object and surface the
//!    error — no automatic retry.
//!
//! Mutations on the same key are not serialized across the await boundary:
//! a second action started before the first settles will have its
//! optimistic write superseded by whichever call settles last.

pub mod bookmark;
pub mod boost;
pub mod favourite;
pub mod mute;
pub mod vote;

pub use boost::{BoostOutcome, BoostPrompt, Prompter};

use std::sync::Arc;

use rookery_types::{InstanceHost, Status, StatusKey};

use crate::error::ActionError;
use crate::session::Session;

impl Session {
    /// Interactions require an authenticated session on the status's own
    /// instance.
    pub(crate) fn require_interactive(
        &self,
        instance: Option<&InstanceHost>,
    ) -> Result<(), ActionError> {
        if !self.auth.is_authenticated() || !self.auth.same_instance(instance) {
            return Err(ActionError::ReadOnly);
        }
        Ok(())
    }

    /// Look up the cached entry an action will mutate.
    pub(crate) fn cached_for_action(
        &self,
        id: &str,
        instance: Option<&InstanceHost>,
    ) -> Result<(StatusKey, Arc<Status>), ActionError> {
        let key = StatusKey::new(id, instance);
        let status = self
            .cache
            .get_by_key(&key)
            .ok_or(ActionError::NotCached)?;
        Ok((key, status))
    }

    pub(crate) fn is_author(&self, status: &Status) -> bool {
        self.auth.account_id.as_deref() == Some(status.account.id.as_str())
    }
}

/// `count + (currently_set ? -1 : +1)`, saturating at zero since remote
/// counters can already disagree with the local flag.
pub(crate) fn toggled_count(count: u64, currently_set: bool) -> u64 {
    if currently_set {
        count.saturating_sub(1)
    } else {
        count + 1
    }
}
