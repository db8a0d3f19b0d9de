// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::fmt;

use crate::error::{Error, Result};

/// Default safety margin subtracted from the server-declared token lifetime
pub const DEFAULT_EXPIRY_MARGIN_SECS: u64 = 1;

/// Access token issued by the NYPL OAuth server
///
/// Only built from a successful token exchange, so every `Token` carries a
/// bearer string and an expiration time. Refreshing replaces the whole value.
#[derive(Debug, Clone)]
pub struct Token {
    value: String,
    issued_response: Value,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Build a token from a decoded oauth_server response
    ///
    /// `issued_at` is the time the response arrived; the token expires
    /// `expires_in - margin` after it.
    pub(crate) fn from_response(
        response: Value,
        issued_at: DateTime<Utc>,
        margin: Duration,
    ) -> Result<Self> {
        let value = response
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::auth("Missing access_token parameter in the oauth_server response.")
            })?
            .to_string();

        let expires_in = response
            .get("expires_in")
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                Error::auth("Missing expires_in parameter in the oauth_server response.")
            })?;

        let expires_at = Duration::try_milliseconds((expires_in * 1000.0) as i64)
            .and_then(|lifetime| lifetime.checked_sub(&margin))
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                Error::auth(format!(
                    "Invalid expires_in parameter in the oauth_server response: {}",
                    expires_in
                ))
            })?;

        Ok(Self {
            value,
            issued_response: response,
            expires_at,
        })
    }

    /// Bearer token string
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Full decoded server response the token was parsed from
    pub fn issued_response(&self) -> &Value {
        &self.issued_response
    }

    /// Time after which the token must be replaced
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[cfg(test)]
    pub(crate) fn set_expires_at(&mut self, expires_at: DateTime<Utc>) {
        self.expires_at = expires_at;
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<token: {}, expires_on: {}, server_response: {}>",
            self.value,
            self.expires_at.format("%Y-%m-%d %H:%M:%S"),
            self.issued_response
        )
    }
}
