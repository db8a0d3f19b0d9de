// Client-credentials token exchange

use chrono::{Duration, Utc};
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde_json::Value;

use super::credentials::Credentials;
use super::types::Token;
use crate::error::{transport_error_kind, Error, Result};

/// Request a new access token from the OAuth server
///
/// POSTs `grant_type=client_credentials` with HTTP Basic authentication.
/// Every failure, including transport errors and malformed responses, is
/// reported as an authentication error.
pub async fn request_token(
    client: &Client,
    credentials: &Credentials,
    agent: &str,
    margin: Duration,
) -> Result<Token> {
    let url = credentials.token_url();

    tracing::debug!(
        url = %url,
        client_id = credentials.client_id(),
        "Requesting access token"
    );

    let response = client
        .post(&url)
        .basic_auth(credentials.client_id(), Some(credentials.client_secret()))
        .header(USER_AGENT, agent)
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|e| {
            let error_kind = transport_error_kind(&e);
            tracing::error!(
                error_kind = error_kind,
                error = %e,
                url = %url,
                "Token request failed"
            );
            Error::auth_transport(format!("Trouble connecting: {}", error_kind), e)
        })?;

    let issued_at = Utc::now();
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();

        // Prefer the decoded JSON error body when the server sent one
        let detail = serde_json::from_str::<Value>(&error_text)
            .map(|v| v.to_string())
            .unwrap_or(error_text);

        tracing::error!(
            status = status.as_u16(),
            body = %detail,
            "OAuth server rejected token request"
        );

        return Err(Error::auth(format!(
            "Invalid request. OAuth server returned error: {} - {}",
            status, detail
        )));
    }

    let body: Value = response.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to decode token response");
        Error::auth_transport(format!("Unexpected error occurred: {}", e), e)
    })?;

    let token = Token::from_response(body, issued_at, margin)?;

    tracing::info!(
        "Access token obtained ({}...), expires: {}",
        token.value().chars().take(8).collect::<String>(),
        token.expires_at().to_rfc3339()
    );

    Ok(token)
}
