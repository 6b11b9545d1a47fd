//! HTTP implementation of the [`Gateway`] trait.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use rookery_types::{Account, InstanceHost, Poll, Status};

use crate::error::{ApiError, Result};
use crate::gateway::{Gateway, NewStatus};
use crate::page::{Page, PageQuery, TimelineSource};

/// Gateway configuration loaded from the embedding application or from
/// environment variables.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Instance host to talk to.
    /// Env: `ROOKERY_INSTANCE`
    pub host: InstanceHost,

    /// OAuth bearer token for authenticated endpoints.
    /// Env: `ROOKERY_ACCESS_TOKEN`
    /// Default: none (read-only public access).
    pub access_token: Option<String>,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl GatewayConfig {
    pub fn new(host: InstanceHost) -> Self {
        Self {
            host,
            access_token: None,
            user_agent: format!("rookery/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let host = std::env::var("ROOKERY_INSTANCE")
            .map(|h| InstanceHost::new(&h))
            .unwrap_or_else(|_| InstanceHost::new("mastodon.social"));

        let mut config = Self::new(host);

        if let Ok(token) = std::env::var("ROOKERY_ACCESS_TOKEN") {
            if !token.is_empty() {
                config.access_token = Some(token);
            }
        }

        config
    }
}

/// A [`Gateway`] speaking the Mastodon REST API over HTTPS.
pub struct HttpGateway {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .build()?;
        let base = Url::parse(&format!("https://{}/", config.host))?;

        Ok(Self {
            http,
            base,
            token: config.access_token.clone(),
        })
    }

    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.base.join(path.trim_start_matches('/'))?;
        debug!(method = %method, url = %url, "gateway request");

        let mut req = self.http.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
            });
        }
        Ok(resp.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        self.request::<T, ()>(Method::GET, path, params, None).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request::<T, ()>(Method::POST, path, &[], None).await
    }
}

#[derive(Serialize)]
struct VoteBody<'a> {
    choices: &'a [usize],
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn fetch_status(&self, id: &str) -> Result<Status> {
        self.get(&format!("/api/v1/statuses/{id}"), &[]).await
    }

    async fn publish_status(&self, new_status: &NewStatus) -> Result<Status> {
        self.request(Method::POST, "/api/v1/statuses", &[], Some(new_status))
            .await
    }

    async fn edit_status(&self, id: &str, new_status: &NewStatus) -> Result<Status> {
        self.request(
            Method::PUT,
            &format!("/api/v1/statuses/{id}"),
            &[],
            Some(new_status),
        )
        .await
    }

    async fn delete_status(&self, id: &str) -> Result<Status> {
        self.request::<Status, ()>(Method::DELETE, &format!("/api/v1/statuses/{id}"), &[], None)
            .await
    }

    async fn reblog(&self, id: &str) -> Result<Status> {
        self.post(&format!("/api/v1/statuses/{id}/reblog")).await
    }

    async fn unreblog(&self, id: &str) -> Result<Status> {
        self.post(&format!("/api/v1/statuses/{id}/unreblog")).await
    }

    async fn favourite(&self, id: &str) -> Result<Status> {
        self.post(&format!("/api/v1/statuses/{id}/favourite")).await
    }

    async fn unfavourite(&self, id: &str) -> Result<Status> {
        self.post(&format!("/api/v1/statuses/{id}/unfavourite"))
            .await
    }

    async fn bookmark(&self, id: &str) -> Result<Status> {
        self.post(&format!("/api/v1/statuses/{id}/bookmark")).await
    }

    async fn unbookmark(&self, id: &str) -> Result<Status> {
        self.post(&format!("/api/v1/statuses/{id}/unbookmark"))
            .await
    }

    async fn mute_conversation(&self, id: &str) -> Result<Status> {
        self.post(&format!("/api/v1/statuses/{id}/mute")).await
    }

    async fn unmute_conversation(&self, id: &str) -> Result<Status> {
        self.post(&format!("/api/v1/statuses/{id}/unmute")).await
    }

    async fn fetch_poll(&self, id: &str) -> Result<Poll> {
        self.get(&format!("/api/v1/polls/{id}"), &[]).await
    }

    async fn vote(&self, poll_id: &str, choices: &[usize]) -> Result<Poll> {
        self.request(
            Method::POST,
            &format!("/api/v1/polls/{poll_id}/votes"),
            &[],
            Some(&VoteBody { choices }),
        )
        .await
    }

    async fn fetch_account(&self, id: &str) -> Result<Account> {
        self.get(&format!("/api/v1/accounts/{id}"), &[]).await
    }

    async fn lookup_account(&self, acct: &str) -> Result<Account> {
        self.get("/api/v1/accounts/lookup", &[("acct", acct.to_string())])
            .await
    }

    async fn timeline(&self, source: &TimelineSource, query: &PageQuery) -> Result<Page> {
        let mut params = source.params();
        params.extend(query.params());

        let statuses: Vec<Status> = self.get(&source.endpoint(), &params).await?;
        let next_max_id = statuses.last().map(|s| s.id.clone());

        Ok(Page {
            statuses,
            next_max_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_base_url_from_host() {
        let config = GatewayConfig::new(InstanceHost::new("Corvid.Social"));
        let gateway = HttpGateway::new(&config).unwrap();
        assert_eq!(gateway.base.as_str(), "https://corvid.social/");
    }

    #[test]
    fn default_config_is_unauthenticated() {
        let config = GatewayConfig::new(InstanceHost::new("corvid.social"));
        assert!(config.access_token.is_none());
        assert!(config.user_agent.starts_with("rookery/"));
    }
}
