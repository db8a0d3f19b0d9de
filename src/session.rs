use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::{Token, TokenManager, DEFAULT_AGENT};
use crate::error::{transport_error_kind, Error, Result};
use crate::params::{
    normalize_sierra_numbers, prep_keywords, prep_record_id, BibListQuery, ItemListQuery,
    Keywords, QueryParams, Source,
};
use crate::timeout::Timeout;

/// Production platform endpoint
pub const PROD_BASE_URL: &str = "https://platform.nypl.org/api/v0.1";

/// Development platform endpoint
pub const DEV_BASE_URL: &str = "https://dev-platform.nypl.org/api/v0.1";

/// Platform environment a session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Prod,
    Dev,
}

impl Target {
    pub fn base_url(&self) -> &'static str {
        match self {
            Target::Prod => PROD_BASE_URL,
            Target::Dev => DEV_BASE_URL,
        }
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "prod" => Ok(Target::Prod),
            "dev" => Ok(Target::Dev),
            _ => Err(Error::Configuration(
                "Invalid `target` argument passed into a Platform session.".to_string(),
            )),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Prod => f.write_str("prod"),
            Target::Dev => f.write_str("dev"),
        }
    }
}

/// Build the default header set for a token
fn build_headers(agent: &str, token: &Token) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(agent).map_err(|_| {
            Error::Configuration("Argument `agent` is not a valid header value.".to_string())
        })?,
    );

    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.value()))
        .map_err(|_| Error::auth("Access token is not a valid header value."))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);

    Ok(headers)
}

fn carries_token(headers: &HeaderMap, token: &Token) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|v| v == token.value())
}

/// Builder for [`AuthorizedSession`]
pub struct AuthorizedSessionBuilder {
    token_manager: Arc<TokenManager>,
    target: Target,
    base_url: Option<String>,
    agent: Option<String>,
    timeout: Timeout,
    client: Option<Client>,
}

impl AuthorizedSessionBuilder {
    /// Platform environment (default production)
    pub fn target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Point the session at a different base URL, such as a local mock server
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Custom `User-Agent` header
    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Timeout for platform requests (default 3s connect / 3s read)
    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = timeout.into();
        self
    }

    /// Use a preconfigured HTTP client instead of building one
    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub async fn build(self) -> Result<AuthorizedSession> {
        let agent = match self.agent {
            None => DEFAULT_AGENT.to_string(),
            Some(agent) if agent.trim().is_empty() => {
                return Err(Error::Configuration(
                    "Argument `agent` must be a non-empty string.".to_string(),
                ));
            }
            Some(agent) => agent,
        };

        let base_url = self
            .base_url
            .unwrap_or_else(|| self.target.base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        let client = match self.client {
            Some(client) => client,
            None => self.timeout.client()?,
        };

        let token = self.token_manager.current_token().await;
        let headers = build_headers(&agent, &token)?;

        tracing::debug!(base_url = %base_url, agent = %agent, "Platform session opened");

        Ok(AuthorizedSession {
            token_manager: self.token_manager,
            client,
            base_url,
            agent,
            timeout: self.timeout,
            headers: RwLock::new(Arc::new(headers)),
        })
    }
}

/// Session with the NYPL Platform API
///
/// Every request carries `Authorization: Bearer <token>`; a stale token is
/// replaced through the shared [`TokenManager`] before the request goes out.
/// Dropping the session (or calling [`close`](AuthorizedSession::close))
/// releases its HTTP client; the token manager stays usable elsewhere.
pub struct AuthorizedSession {
    /// Shared token manager
    token_manager: Arc<TokenManager>,

    /// HTTP client with connection pooling
    client: Client,

    /// Platform base URL
    base_url: String,

    /// `User-Agent` header value
    agent: String,

    /// Timeout for platform requests
    timeout: Timeout,

    /// Default headers, rebuilt whenever the token changes
    headers: RwLock<Arc<HeaderMap>>,
}

impl AuthorizedSession {
    /// Open a production session with default agent and timeout
    pub async fn new(token_manager: Arc<TokenManager>) -> Result<Self> {
        Self::builder(token_manager).build().await
    }

    pub fn builder(token_manager: Arc<TokenManager>) -> AuthorizedSessionBuilder {
        AuthorizedSessionBuilder {
            token_manager,
            target: Target::default(),
            base_url: None,
            agent: None,
            timeout: Timeout::default(),
            client: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    /// Snapshot of the default request headers
    pub async fn headers(&self) -> Arc<HeaderMap> {
        self.headers.read().await.clone()
    }

    /// Close the session and release its HTTP client
    pub fn close(self) {
        tracing::debug!(base_url = %self.base_url, "Platform session closed");
    }

    /// Make sure the Authorization header carries a fresh token
    /// Refreshes through the token manager when the current token is stale
    pub(crate) async fn ensure_fresh_authorization(&self) -> Result<()> {
        let mut token = self.token_manager.current_token().await;

        if self.token_manager.is_expired(&token) {
            tracing::warn!(
                "Access token expired at {}, refreshing",
                token.expires_at().to_rfc3339()
            );
            token = self.token_manager.refresh_if_expired().await?;
        }

        // The manager may also have been refreshed through another session
        let current = self.headers().await;
        if !carries_token(&current, &token) {
            let rebuilt = build_headers(&self.agent, &token)?;
            *self.headers.write().await = Arc::new(rebuilt);
            tracing::debug!("Authorization header updated");
        }

        Ok(())
    }

    /// Authorize and send a GET request; the response is returned as-is
    async fn get(&self, path: &str, query: &QueryParams) -> Result<Response> {
        let url = format!("{}/{}", self.base_url, path);

        self.ensure_fresh_authorization().await?;
        let headers = self.headers().await;

        tracing::debug!(
            method = "GET",
            url = %url,
            query = ?query,
            "Sending platform request"
        );

        let response = self
            .client
            .get(&url)
            .query(query)
            .headers((*headers).clone())
            .send()
            .await
            .map_err(|e| {
                let error_kind = transport_error_kind(&e);
                tracing::warn!(
                    error_kind = error_kind,
                    error = %e,
                    url = %url,
                    "Platform request error"
                );
                Error::request(format!("Trouble connecting: {} ({})", url, error_kind), e)
            })?;

        tracing::debug!(status = %response.status(), url = %url, "Received platform response");

        Ok(response)
    }

    /// Retrieve a single bib: `GET /bibs/{source}/{id}`
    pub async fn get_bib(&self, id: &str, source: Source) -> Result<Response> {
        let id = prep_record_id(id, source)?;
        self.get(&format!("bibs/{}/{}", source, id), &QueryParams::new())
            .await
    }

    /// Search bibs: `GET /bibs`
    pub async fn get_bib_list(&self, query: &BibListQuery) -> Result<Response> {
        let params = query.to_query()?;
        self.get("bibs", &params).await
    }

    /// Retrieve items attached to a bib: `GET /bibs/{source}/{id}/items`
    pub async fn get_bib_items(&self, id: &str, source: Source) -> Result<Response> {
        let id = prep_record_id(id, source)?;
        self.get(&format!("bibs/{}/{}/items", source, id), &QueryParams::new())
            .await
    }

    /// Retrieve a single item: `GET /items/{source}/{id}`
    pub async fn get_item(&self, id: &str, source: Source) -> Result<Response> {
        let id = prep_record_id(id, source)?;
        self.get(&format!("items/{}/{}", source, id), &QueryParams::new())
            .await
    }

    /// Search items: `GET /items`
    pub async fn get_item_list(&self, query: &ItemListQuery) -> Result<Response> {
        let params = query.to_query()?;
        self.get("items", &params).await
    }

    /// Check if a bib belongs to the research collection:
    /// `GET /bibs/{source}/{id}/is-research`
    pub async fn check_bib_is_research(&self, id: &str, source: Source) -> Result<Response> {
        let id = prep_record_id(id, source)?;
        self.get(
            &format!("bibs/{}/{}/is-research", source, id),
            &QueryParams::new(),
        )
        .await
    }

    /// Find bibs by ISBN/UPC/ISSN
    pub async fn search_standard_numbers(
        &self,
        keywords: impl Into<Keywords>,
        deleted: bool,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Response> {
        let keywords = keywords.into();
        if prep_keywords(Some(&keywords)).is_none() {
            return Err(Error::Validation(
                "Missing required argument: keywords".to_string(),
            ));
        }

        self.get_bib_list(&BibListQuery {
            standard_number: Some(keywords),
            deleted: Some(deleted),
            limit,
            offset,
            ..Default::default()
        })
        .await
    }

    /// Find bibs by OCLC/control number
    pub async fn search_control_numbers(
        &self,
        keywords: impl Into<Keywords>,
        deleted: bool,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Response> {
        let keywords = keywords.into();
        if prep_keywords(Some(&keywords)).is_none() {
            return Err(Error::Validation(
                "Missing required argument: keywords".to_string(),
            ));
        }

        self.get_bib_list(&BibListQuery {
            control_number: Some(keywords),
            deleted: Some(deleted),
            limit,
            offset,
            ..Default::default()
        })
        .await
    }

    /// Find bibs by record number; Sierra numbers are normalized
    pub async fn search_bib_numbers(
        &self,
        keywords: impl Into<Keywords>,
        source: Source,
        deleted: bool,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Response> {
        let keywords = keywords.into();
        let ids = match source {
            Source::SierraNypl => normalize_sierra_numbers(&keywords)?,
            _ => prep_keywords(Some(&keywords)),
        }
        .ok_or_else(|| Error::Validation("Missing required argument: keywords".to_string()))?;

        self.get_bib_list(&BibListQuery {
            id: Some(Keywords::from(ids)),
            nypl_source: Some(source),
            deleted: Some(deleted),
            limit,
            offset,
            ..Default::default()
        })
        .await
    }
}

impl fmt::Debug for AuthorizedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedSession")
            .field("base_url", &self.base_url)
            .field("agent", &self.agent)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
