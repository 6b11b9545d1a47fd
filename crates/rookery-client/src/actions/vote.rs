//! Poll voting and refreshing.

use tracing::{debug, warn};

use rookery_api::Gateway;
use rookery_types::InstanceHost;

use crate::error::ActionError;
use crate::session::Session;

impl Session {
    /// Cast the viewer's vote on the poll attached to a status.
    ///
    /// The optimistic write marks the poll voted with the chosen options
    /// and bumps the tally; the server's poll object then replaces it.
    pub async fn vote(
        &self,
        id: &str,
        instance: Option<&InstanceHost>,
        choices: &[usize],
    ) -> Result<(), ActionError> {
        self.require_interactive(instance)?;
        let (key, original) = self.cached_for_action(id, instance)?;
        let poll = original.poll.clone().ok_or(ActionError::NoPoll)?;

        let mut optimistic_poll = poll.clone();
        optimistic_poll.voted = Some(true);
        optimistic_poll.own_votes = Some(choices.to_vec());
        optimistic_poll.votes_count += choices.len() as u64;
        for &choice in choices {
            if let Some(option) = optimistic_poll.options.get_mut(choice) {
                option.votes_count = Some(option.votes_count.unwrap_or(0) + 1);
            }
        }

        let mut optimistic = (*original).clone();
        optimistic.poll = Some(optimistic_poll);
        self.cache.replace(key.clone(), optimistic);

        match self.gateway.vote(&poll.id, choices).await {
            Ok(canonical) => {
                self.cache.update_poll(&key, canonical);
                Ok(())
            }
            Err(e) => {
                warn!(id, poll = %poll.id, error = %e, "vote failed; rolling back");
                self.cache.restore(&key, original);
                Err(e.into())
            }
        }
    }

    /// Re-fetch the poll on a cached status, e.g. when it expires or the
    /// user asks for fresh tallies. Failures are logged and swallowed;
    /// stale tallies are an acceptable degraded state.
    pub async fn refresh_poll(&self, id: &str, instance: Option<&InstanceHost>) {
        let Some(status) = self.cache.get(id, instance) else {
            return;
        };
        let Some(poll_id) = status.poll.as_ref().map(|p| p.id.clone()) else {
            return;
        };

        match self.gateway.fetch_poll(&poll_id).await {
            Ok(poll) => {
                let key = rookery_types::StatusKey::new(id, instance);
                self.cache.update_poll(&key, poll);
            }
            Err(e) => {
                debug!(id, poll = %poll_id, error = %e, "poll refresh failed; keeping tallies");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SaveOptions;
    use crate::testutil::{poll, session_with, status};

    #[tokio::test]
    async fn vote_is_optimistic_then_reconciled() {
        let (gateway, session) = session_with("alice");

        let mut post = status("1", "bob");
        post.poll = Some(poll("p1", &["yes", "no"]));
        session.cache().save(post, None, SaveOptions::unthreaded());

        // Server tallies moved on since the optimistic +1.
        let mut canonical = poll("p1", &["yes", "no"]);
        canonical.voted = Some(true);
        canonical.own_votes = Some(vec![0]);
        canonical.votes_count = 25;
        gateway.stage_poll("p1", canonical);

        session.vote("1", None, &[0]).await.unwrap();

        let entry = session.cache().get("1", None).unwrap();
        let entry_poll = entry.poll.as_ref().unwrap();
        assert!(entry_poll.has_voted());
        assert_eq!(entry_poll.votes_count, 25);
    }

    #[tokio::test]
    async fn failed_vote_restores_the_unvoted_poll() {
        let (gateway, session) = session_with("alice");

        let mut post = status("1", "bob");
        post.poll = Some(poll("p1", &["yes", "no"]));
        session.cache().save(post, None, SaveOptions::unthreaded());

        gateway.fail_interactions(true);
        assert!(session.vote("1", None, &[1]).await.is_err());

        let entry = session.cache().get("1", None).unwrap();
        assert!(!entry.poll.as_ref().unwrap().has_voted());
    }

    #[tokio::test]
    async fn vote_without_a_poll_is_rejected() {
        let (_gateway, session) = session_with("alice");
        session
            .cache()
            .save(status("1", "bob"), None, SaveOptions::unthreaded());

        assert!(matches!(
            session.vote("1", None, &[0]).await,
            Err(ActionError::NoPoll)
        ));
    }

    #[tokio::test]
    async fn refresh_poll_swallows_errors() {
        let (_gateway, session) = session_with("alice");

        let mut post = status("1", "bob");
        post.poll = Some(poll("p1", &["yes", "no"]));
        session.cache().save(post, None, SaveOptions::unthreaded());

        // Gateway has no such poll; the refresh must not panic or error.
        session.refresh_poll("1", None).await;
        assert_eq!(
            session
                .cache()
                .get("1", None)
                .unwrap()
                .poll
                .as_ref()
                .unwrap()
                .votes_count,
            10
        );
    }

    #[tokio::test]
    async fn refresh_poll_updates_tallies() {
        let (gateway, session) = session_with("alice");

        let mut post = status("1", "bob");
        post.poll = Some(poll("p1", &["yes", "no"]));
        session.cache().save(post, None, SaveOptions::unthreaded());

        let mut fresh = poll("p1", &["yes", "no"]);
        fresh.votes_count = 42;
        gateway.stage_poll("p1", fresh);

        session.refresh_poll("1", None).await;
        assert_eq!(
            session
                .cache()
                .get("1", None)
                .unwrap()
                .poll
                .as_ref()
                .unwrap()
                .votes_count,
            42
        );
    }
}
