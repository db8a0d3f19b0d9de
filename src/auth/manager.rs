use chrono::{Duration, Utc};
use reqwest::header::HeaderValue;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};

use super::credentials::Credentials;
use super::exchange;
use super::types::{Token, DEFAULT_EXPIRY_MARGIN_SECS};
use crate::error::{Error, Result};
use crate::timeout::Timeout;

/// Default `User-Agent` sent with every request
pub const DEFAULT_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Token manager
/// Owns the client credentials and the current access token for the NYPL Platform
///
/// Construction performs the first token exchange, so a `TokenManager` always
/// holds a valid token. Share it between sessions with `Arc`.
pub struct TokenManager {
    /// Client id, secret and OAuth server
    credentials: Credentials,

    /// `User-Agent` header for token requests
    agent: String,

    /// Timeout for token requests
    timeout: Timeout,

    /// Subtracted from the server-declared lifetime
    expiry_margin: Duration,

    /// HTTP client for token requests
    client: Client,

    /// Current access token
    token: RwLock<Token>,

    /// Serializes refreshes so concurrent callers share one round-trip
    refresh_lock: Mutex<()>,
}

/// Builder for [`TokenManager`]
pub struct TokenManagerBuilder {
    client_id: String,
    client_secret: String,
    oauth_server: String,
    agent: Option<String>,
    timeout: Timeout,
    expiry_margin: std::time::Duration,
    client: Option<Client>,
}

impl TokenManagerBuilder {
    /// Custom `User-Agent` for token requests
    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Timeout for token requests (default 3s connect / 3s read)
    pub fn timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = timeout.into();
        self
    }

    /// Safety margin subtracted from `expires_in` (default one second)
    pub fn expiry_margin(mut self, margin: std::time::Duration) -> Self {
        self.expiry_margin = margin;
        self
    }

    /// Use a preconfigured HTTP client instead of building one
    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Validate the arguments and fetch the first token
    pub async fn build(self) -> Result<TokenManager> {
        let credentials = Credentials::new(self.client_id, self.client_secret, self.oauth_server)?;

        let agent = match self.agent {
            None => DEFAULT_AGENT.to_string(),
            Some(agent) if agent.trim().is_empty() => {
                return Err(Error::Configuration(
                    "Argument `agent` must be a non-empty string.".to_string(),
                ));
            }
            Some(agent) if HeaderValue::from_str(&agent).is_err() => {
                return Err(Error::Configuration(
                    "Argument `agent` is not a valid header value.".to_string(),
                ));
            }
            Some(agent) => agent,
        };

        let expiry_margin = Duration::from_std(self.expiry_margin).map_err(|_| {
            Error::Configuration(format!("Invalid expiry margin: {:?}", self.expiry_margin))
        })?;

        let client = match self.client {
            Some(client) => client,
            None => self.timeout.client()?,
        };

        tracing::info!("Requesting initial access token from {}", credentials.oauth_server());
        let token = exchange::request_token(&client, &credentials, &agent, expiry_margin).await?;

        Ok(TokenManager {
            credentials,
            agent,
            timeout: self.timeout,
            expiry_margin,
            client,
            token: RwLock::new(token),
            refresh_lock: Mutex::new(()),
        })
    }
}

impl TokenManager {
    /// Create a TokenManager with default agent and timeout
    pub async fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        oauth_server: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(client_id, client_secret, oauth_server)
            .build()
            .await
    }

    /// Start configuring a TokenManager
    pub fn builder(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        oauth_server: impl Into<String>,
    ) -> TokenManagerBuilder {
        TokenManagerBuilder {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            oauth_server: oauth_server.into(),
            agent: None,
            timeout: Timeout::default(),
            expiry_margin: std::time::Duration::from_secs(DEFAULT_EXPIRY_MARGIN_SECS),
            client: None,
        }
    }

    /// Request a new token from the OAuth server
    ///
    /// Does not touch the stored token; see [`TokenManager::refresh`].
    pub async fn fetch_token(&self) -> Result<Token> {
        exchange::request_token(&self.client, &self.credentials, &self.agent, self.expiry_margin)
            .await
    }

    /// Check if a token is past its expiration time
    pub fn is_expired(&self, token: &Token) -> bool {
        token.expires_at() < Utc::now()
    }

    /// Snapshot of the current token
    pub async fn current_token(&self) -> Token {
        self.token.read().await.clone()
    }

    /// Fetch a new token and replace the stored one
    pub async fn refresh(&self) -> Result<Token> {
        let _guard = self.refresh_lock.lock().await;
        self.replace_token().await
    }

    /// Refresh only if the stored token is still expired once the lock is held
    /// Callers that lose the race get the token fetched by the winner
    pub(crate) async fn refresh_if_expired(&self) -> Result<Token> {
        let _guard = self.refresh_lock.lock().await;

        {
            let current = self.token.read().await;
            if !self.is_expired(&current) {
                tracing::debug!("Token already refreshed by another caller");
                return Ok(current.clone());
            }
        }

        tracing::warn!("Access token expired, requesting a new one");
        self.replace_token().await
    }

    async fn replace_token(&self) -> Result<Token> {
        let token = self.fetch_token().await.map_err(|e| {
            tracing::error!("Token refresh failed: {}", e);
            e
        })?;

        let mut current = self.token.write().await;
        *current = token.clone();

        Ok(token)
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    pub fn client_id(&self) -> &str {
        self.credentials.client_id()
    }

    pub fn oauth_server(&self) -> &str {
        self.credentials.oauth_server()
    }

    /// Token endpoint URL
    pub fn token_url(&self) -> String {
        self.credentials.token_url()
    }

    /// Mark the stored token as expired
    #[cfg(test)]
    pub(crate) async fn force_expiry(&self) {
        let mut token = self.token.write().await;
        token.set_expires_at(Utc::now() - Duration::seconds(1));
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("credentials", &self.credentials)
            .field("agent", &self.agent)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
