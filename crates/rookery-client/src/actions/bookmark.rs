//! Bookmarking and unbookmarking.
//!
//! Bookmarks carry no public counter on the wire, so only the flag is
//! toggled optimistically.

use tracing::warn;

use rookery_api::Gateway;
use rookery_types::InstanceHost;

use crate::cache::SaveOptions;
use crate::error::ActionError;
use crate::session::Session;

impl Session {
    /// Toggle the viewer's bookmark on a status. Returns the new flag
    /// state.
    pub async fn toggle_bookmark(
        &self,
        id: &str,
        instance: Option<&InstanceHost>,
    ) -> Result<bool, ActionError> {
        self.require_interactive(instance)?;
        let (key, original) = self.cached_for_action(id, instance)?;

        let bookmarked = original.is_bookmarked();
        let mut optimistic = (*original).clone();
        optimistic.bookmarked = Some(!bookmarked);
        self.cache.replace(key.clone(), optimistic);

        let call = if bookmarked {
            self.gateway.unbookmark(id).await
        } else {
            self.gateway.bookmark(id).await
        };

        match call {
            Ok(canonical) => {
                self.cache.save(canonical, instance, SaveOptions::default());
                Ok(!bookmarked)
            }
            Err(e) => {
                warn!(id, error = %e, "bookmark failed; rolling back");
                self.cache.restore(&key, original);
                Err(e.into())
            }
        }
    }
}
