// Client credentials for the NYPL OAuth server

use std::fmt;

use crate::error::{Error, Result};

const TOKEN_PATH: &str = "/oauth/token";

/// Client id, client secret and the OAuth server they are registered with
///
/// Validated once at construction and never mutated afterwards.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
    oauth_server: String,
}

impl Credentials {
    /// Create credentials, rejecting any empty argument
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        oauth_server: impl Into<String>,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        let oauth_server = oauth_server.into();

        if [&client_id, &client_secret, &oauth_server]
            .iter()
            .any(|value| value.trim().is_empty())
        {
            return Err(Error::Configuration(
                "Missing Platform authentication argument.".to_string(),
            ));
        }

        Ok(Self {
            client_id,
            client_secret,
            oauth_server: oauth_server.trim_end_matches('/').to_string(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn oauth_server(&self) -> &str {
        &self.oauth_server
    }

    /// Token endpoint on the OAuth server
    pub fn token_url(&self) -> String {
        format!("{}{}", self.oauth_server, TOKEN_PATH)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("oauth_server", &self.oauth_server)
            .finish()
    }
}
