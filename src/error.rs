// Error handling module
// Defines the error kinds surfaced by every public operation

use thiserror::Error;

/// Errors that can occur while talking to the NYPL Platform
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing construction arguments
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Token exchange with the OAuth server failed
    #[error("Authentication failed: {message}")]
    Auth {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Missing or malformed request parameters (no network call was made)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure while calling a platform endpoint
    #[error("Request failed: {message}")]
    Request {
        message: String,
        #[source]
        source: reqwest::Error,
    },
}

impl Error {
    pub(crate) fn auth(message: impl Into<String>) -> Self {
        Error::Auth {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn auth_transport(message: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Auth {
            message: message.into(),
            source: Some(source),
        }
    }

    pub(crate) fn request(message: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Request {
            message: message.into(),
            source,
        }
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration_error",
            Error::Auth { .. } => "auth_error",
            Error::Validation(_) => "validation_error",
            Error::Request { .. } => "request_error",
        }
    }
}

/// Categorize a transport error for logging
pub(crate) fn transport_error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;
