use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenManager;
use crate::error::{Error, Result};
use crate::session::{AuthorizedSession, Target};
use crate::timeout::Timeout;

/// NYPL Platform connection settings
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ConnectionArgs {
    /// OAuth client id
    #[arg(long, env = "NYPL_PLATFORM_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "NYPL_PLATFORM_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// NYPL OAuth server URL
    #[arg(long, env = "NYPL_PLATFORM_OAUTH_SERVER")]
    pub oauth_server: Option<String>,

    /// Platform environment (prod, dev)
    #[arg(short, long, env = "NYPL_PLATFORM_TARGET", default_value = "prod")]
    pub target: String,

    /// User-Agent header value
    #[arg(short, long, env = "NYPL_PLATFORM_AGENT")]
    pub agent: Option<String>,

    /// Connect timeout in seconds
    #[arg(long, env = "NYPL_PLATFORM_CONNECT_TIMEOUT", default_value = "3")]
    pub connect_timeout: f64,

    /// Read timeout in seconds
    #[arg(long, env = "NYPL_PLATFORM_READ_TIMEOUT", default_value = "3")]
    pub read_timeout: f64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub client_id: String,
    pub client_secret: String,
    pub oauth_server: String,

    // Platform
    pub target: Target,
    pub agent: Option<String>,

    // Timeouts
    pub timeout: Timeout,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Build configuration from parsed arguments, priority CLI > ENV > defaults
    pub fn from_args(args: ConnectionArgs) -> Result<Self> {
        let config = Config {
            client_id: args.client_id.unwrap_or_default(),
            client_secret: args.client_secret.unwrap_or_default(),
            oauth_server: args.oauth_server.unwrap_or_default(),
            target: args.target.parse()?,
            agent: args.agent,
            timeout: Timeout::Split {
                connect: parse_seconds("connect timeout", args.connect_timeout)?,
                read: parse_seconds("read timeout", args.read_timeout)?,
            },
            log_level: args.log_level,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("NYPL_PLATFORM_CLIENT_ID", &self.client_id),
            ("NYPL_PLATFORM_CLIENT_SECRET", &self.client_secret),
            ("NYPL_PLATFORM_OAUTH_SERVER", &self.oauth_server),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::Configuration(format!(
                "Missing Platform authentication argument: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }

    /// Create a token manager (performs the first token exchange)
    pub async fn token_manager(&self) -> Result<TokenManager> {
        let mut builder = TokenManager::builder(
            self.client_id.clone(),
            self.client_secret.clone(),
            self.oauth_server.clone(),
        )
        .timeout(self.timeout);

        if let Some(agent) = &self.agent {
            builder = builder.agent(agent.clone());
        }

        builder.build().await
    }

    /// Open a session for the configured target
    pub async fn session(&self, token_manager: Arc<TokenManager>) -> Result<AuthorizedSession> {
        let mut builder = AuthorizedSession::builder(token_manager)
            .target(self.target)
            .timeout(self.timeout);

        if let Some(agent) = &self.agent {
            builder = builder.agent(agent.clone());
        }

        builder.build().await
    }
}

/// Convert a seconds value into a Duration
fn parse_seconds(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| Error::Configuration(format!("Invalid {}: {}", name, secs)))
}
