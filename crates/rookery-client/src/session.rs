//! Session wiring.
//!
//! A [`Session`] ties one gateway, one status cache, and one thread
//! resolver together for the lifetime of a running client. It is the
//! single construction point for the engine; views receive the cache
//! handle from here and actions are methods on the session.

use std::sync::Arc;

use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use rookery_api::{ApiError, Gateway, GatewayConfig, HttpGateway, NewStatus};
use rookery_types::{InstanceHost, Status};

use crate::cache::{SaveOptions, StatusCache};
use crate::queue::ThreadingQueue;
use crate::thread::ThreadResolver;

/// Who the session is, and where.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The instance this session is connected to.
    pub instance: InstanceHost,
    /// Id of the authenticated account, if logged in.
    pub account_id: Option<String>,
    /// Webfinger handle of the authenticated account, if logged in.
    pub acct: Option<String>,
}

impl AuthContext {
    pub fn unauthenticated(instance: InstanceHost) -> Self {
        Self {
            instance,
            account_id: None,
            acct: None,
        }
    }

    pub fn authenticated(
        instance: InstanceHost,
        account_id: impl Into<String>,
        acct: impl Into<String>,
    ) -> Self {
        Self {
            instance,
            account_id: Some(account_id.into()),
            acct: Some(acct.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.account_id.is_some()
    }

    /// `None` means "the current instance", so it always matches.
    pub fn same_instance(&self, instance: Option<&InstanceHost>) -> bool {
        instance.map_or(true, |host| *host == self.instance)
    }

    /// Preference-store namespace for this login, `acct@host`.
    pub fn namespace(&self) -> Option<String> {
        self.acct
            .as_ref()
            .map(|acct| format!("{}@{}", acct, self.instance))
    }
}

/// One running client session.
pub struct Session {
    pub(crate) gateway: Arc<dyn Gateway>,
    pub(crate) cache: StatusCache,
    pub(crate) queue: ThreadingQueue,
    pub(crate) resolver: ThreadResolver,
    pub(crate) auth: AuthContext,
}

impl Session {
    pub fn new(gateway: Arc<dyn Gateway>, auth: AuthContext) -> Self {
        let queue = ThreadingQueue::new();
        let cache = StatusCache::new(queue.clone());
        let resolver = ThreadResolver::new(gateway.clone(), cache.clone());
        Self {
            gateway,
            cache,
            queue,
            resolver,
            auth,
        }
    }

    /// Build an unauthenticated session against the instance configured in
    /// the environment. Applications that complete a login upgrade the
    /// context with [`Session::with_account`].
    pub fn from_env() -> anyhow::Result<Self> {
        let config = GatewayConfig::from_env();
        let auth = AuthContext::unauthenticated(config.host.clone());
        let gateway = Arc::new(HttpGateway::new(&config)?);
        Ok(Self::new(gateway, auth))
    }

    /// Attach the logged-in account to the session.
    pub fn with_account(mut self, account_id: impl Into<String>, acct: impl Into<String>) -> Self {
        self.auth.account_id = Some(account_id.into());
        self.auth.acct = Some(acct.into());
        self
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Run every pending thread resolution, sequentially.
    ///
    /// This is the host event loop's drain point: saves enqueue jobs, and a
    /// burst of saves from one page fetch coalesces into a single pass
    /// here. Returns the number of jobs run.
    pub async fn flush_threading(&self) -> usize {
        let jobs = self.queue.drain();
        let mut run = 0;
        for job in jobs {
            if job.is_canceled() {
                continue;
            }
            self.resolver
                .annotate(job.status.clone(), job.instance.as_ref())
                .await;
            run += 1;
        }
        run
    }

    /// Background enrichment of an account profile. Failures are logged
    /// and ignored; a missing profile is an acceptable degraded state.
    pub async fn refresh_account(&self, id: &str, instance: Option<&InstanceHost>) {
        match self.gateway.fetch_account(id).await {
            Ok(account) => {
                self.cache.save_account(account, instance);
            }
            Err(e) => {
                debug!(id, error = %e, "account refresh failed; keeping cached copy");
            }
        }
    }

    /// Publish a new status and cache the server's copy.
    pub async fn publish_status(&self, new_status: &NewStatus) -> Result<Arc<Status>, ApiError> {
        let status = self.gateway.publish_status(new_status).await?;
        Ok(self.cache.save(status, None, SaveOptions::default()))
    }

    /// Edit an existing status and cache the server's copy.
    pub async fn edit_status(
        &self,
        id: &str,
        new_status: &NewStatus,
    ) -> Result<Arc<Status>, ApiError> {
        let status = self.gateway.edit_status(id, new_status).await?;
        Ok(self.cache.save(status, None, SaveOptions::default()))
    }

    /// Delete a status remotely, then tombstone the cache entry in place
    /// so live views see the deletion without losing the object.
    pub async fn delete_status(
        &self,
        id: &str,
        instance: Option<&InstanceHost>,
    ) -> Result<(), ApiError> {
        self.gateway.delete_status(id).await?;
        self.cache.mark_deleted(id, instance);
        Ok(())
    }
}

/// Initialise tracing for an embedding application.
///
/// Honors `RUST_LOG`; defaults to debug for the engine crates and warn for
/// everything else. Safe to call more than once (later calls are no-ops).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("rookery_client=debug,rookery_api=debug,rookery_store=info,warn")
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
