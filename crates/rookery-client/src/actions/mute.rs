//! Muting and unmuting a conversation.

use tracing::warn;

use rookery_api::Gateway;
use rookery_types::InstanceHost;

use crate::cache::SaveOptions;
use crate::error::ActionError;
use crate::session::Session;

impl Session {
    /// Toggle the conversation mute on a status the viewer participates
    /// in. Returns the new flag state.
    pub async fn toggle_conversation_mute(
        &self,
        id: &str,
        instance: Option<&InstanceHost>,
    ) -> Result<bool, ActionError> {
        self.require_interactive(instance)?;
        let (key, original) = self.cached_for_action(id, instance)?;

        let muted = original.is_muted();
        let mut optimistic = (*original).clone();
        optimistic.muted = Some(!muted);
        self.cache.replace(key.clone(), optimistic);

        let call = if muted {
            self.gateway.unmute_conversation(id).await
        } else {
            self.gateway.mute_conversation(id).await
        };

        match call {
            Ok(canonical) => {
                self.cache.save(canonical, instance, SaveOptions::default());
                Ok(!muted)
            }
            Err(e) => {
                warn!(id, error = %e, "conversation mute failed; rolling back");
                self.cache.restore(&key, original);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{session_with, status};

    #[tokio::test]
    async fn mute_round_trip() {
        let (gateway, session) = session_with("alice");
        session
            .cache()
            .save(status("1", "alice"), None, SaveOptions::unthreaded());

        let mut canonical = status("1", "alice");
        canonical.muted = Some(true);
        gateway.stage_interaction("1", canonical);

        assert!(session.toggle_conversation_mute("1", None).await.unwrap());
        assert!(session.cache().get("1", None).unwrap().is_muted());
    }

    #[tokio::test]
    async fn failed_mute_rolls_back() {
        let (gateway, session) = session_with("alice");
        session
            .cache()
            .save(status("1", "alice"), None, SaveOptions::unthreaded());

        gateway.fail_interactions(true);
        assert!(session.toggle_conversation_mute("1", None).await.is_err());
        assert!(!session.cache().get("1", None).unwrap().is_muted());
    }
}
