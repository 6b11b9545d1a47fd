//! Boosting and unboosting.

use tracing::warn;

use rookery_api::Gateway;
use rookery_types::{InstanceHost, Status, Visibility};

use crate::actions::toggled_count;
use crate::cache::SaveOptions;
use crate::error::ActionError;
use crate::session::Session;

/// Asks the user to confirm an action before it runs. Boosting is the only
/// interaction that prompts, because it republishes the post to followers.
pub trait Prompter: Send + Sync {
    /// `true` proceeds with the boost; `false` is a normal abort.
    fn confirm_boost(&self, prompt: &BoostPrompt) -> bool;
}

/// Context shown alongside the boost confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoostPrompt {
    /// At least one attached media lacks an alt description; the prompt
    /// warns so the user can reconsider amplifying it.
    pub media_missing_description: bool,
}

/// What a [`Session::toggle_boost`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostOutcome {
    Boosted,
    Unboosted,
    /// The user declined the confirmation prompt; nothing changed.
    Declined,
}

impl Session {
    /// Boost the status if the viewer has not boosted it, unboost it
    /// otherwise.
    pub async fn toggle_boost(
        &self,
        id: &str,
        instance: Option<&InstanceHost>,
        prompter: &dyn Prompter,
    ) -> Result<BoostOutcome, ActionError> {
        self.require_interactive(instance)?;
        let (key, original) = self.cached_for_action(id, instance)?;

        if !self.can_boost(&original) {
            return Err(ActionError::NotBoostable);
        }

        let reblogged = original.is_reblogged();
        if !reblogged {
            let prompt = BoostPrompt {
                media_missing_description: original.media_missing_description(),
            };
            if !prompter.confirm_boost(&prompt) {
                return Ok(BoostOutcome::Declined);
            }
        }

        let mut optimistic = (*original).clone();
        optimistic.reblogged = Some(!reblogged);
        optimistic.reblogs_count = toggled_count(optimistic.reblogs_count, reblogged);
        self.cache.replace(key.clone(), optimistic);

        let call = if reblogged {
            self.gateway.unreblog(id).await
        } else {
            self.gateway.reblog(id).await
        };

        match call {
            Ok(canonical) => {
                self.cache.save(canonical, instance, SaveOptions::default());
                Ok(if reblogged {
                    BoostOutcome::Unboosted
                } else {
                    BoostOutcome::Boosted
                })
            }
            Err(e) => {
                warn!(id, error = %e, "boost failed; rolling back");
                self.cache.restore(&key, original);
                Err(e.into())
            }
        }
    }

    /// Direct posts are never boostable; private posts only by their
    /// author.
    fn can_boost(&self, status: &Status) -> bool {
        match status.visibility {
            Visibility::Direct => false,
            Visibility::Private => self.is_author(status),
            Visibility::Public | Visibility::Unlisted => true,
        }
    }
}
