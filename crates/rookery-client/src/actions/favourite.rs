//! Favouriting and unfavouriting.

use tracing::warn;

use rookery_api::Gateway;
use rookery_types::InstanceHost;

use crate::actions::toggled_count;
use crate::cache::SaveOptions;
use crate::error::ActionError;
use crate::session::Session;

impl Session {
    /// Toggle the viewer's favourite on a status. Returns the new flag
    /// state.
    pub async fn toggle_favourite(
        &self,
        id: &str,
        instance: Option<&InstanceHost>,
    ) -> Result<bool, ActionError> {
        self.require_interactive(instance)?;
        let (key, original) = self.cached_for_action(id, instance)?;

        let favourited = original.is_favourited();
        let mut optimistic = (*original).clone();
        optimistic.favourited = Some(!favourited);
        optimistic.favourites_count = toggled_count(optimistic.favourites_count, favourited);
        self.cache.replace(key.clone(), optimistic);

        let call = if favourited {
            self.gateway.unfavourite(id).await
        } else {
            self.gateway.favourite(id).await
        };

        match call {
            Ok(canonical) => {
                self.cache.save(canonical, instance, SaveOptions::default());
                Ok(!favourited)
            }
            Err(e) => {
                warn!(id, error = %e, "favourite failed; rolling back");
                self.cache.restore(&key, original);
                Err(e.into())
            }
        }
    }
}
