// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth client for redeeming authorization codes.
//!
//! The mobile app obtains a server auth code with the scopes it needs and
//! offline access already granted, so the exchange requests no scopes.

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

/// Tokens returned by a successful authorization-code exchange.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderCredentials {
    pub access_token: String,
    /// Only issued when the user granted offline access on this consent.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Scopes actually granted, logged when no refresh token is issued.
    #[serde(default)]
    pub scope: Option<String>,
}

/// Failure modes of the exchange call.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// Network failure or timeout before a response arrived.
    #[error("token request failed: {0}")]
    Transport(String),

    /// The provider answered with an error status, e.g. `invalid_grant`
    /// for an expired or already redeemed code.
    #[error("{0}")]
    Rejected(String),

    #[error("failed to parse token response: {0}")]
    InvalidResponse(String),
}

impl From<ExchangeError> for AppError {
    fn from(err: ExchangeError) -> Self {
        AppError::Exchange(err.to_string())
    }
}

/// Redeems authorization codes with the OAuth provider.
#[async_trait]
pub trait CodeExchanger: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<ProviderCredentials, ExchangeError>;
}

/// OAuth error body from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Google token endpoint client.
#[derive(Clone)]
pub struct GoogleTokenExchanger {
    http: reqwest::Client,
    token_uri: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleTokenExchanger {
    /// Create a client with the configured credentials and request timeout.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.exchange_timeout)
            .build()
            .context("failed building token exchange HTTP client")?;

        tracing::info!(
            client_id = %config.google_client_id,
            redirect_uri = %config.oauth_redirect_uri,
            token_uri = %config.google_token_uri,
            timeout_secs = config.exchange_timeout.as_secs(),
            "Initialized Google token exchanger"
        );

        Ok(Self {
            http,
            token_uri: config.google_token_uri.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
        })
    }
}

#[async_trait]
impl CodeExchanger for GoogleTokenExchanger {
    async fn exchange(&self, code: &str) -> Result<ProviderCredentials, ExchangeError> {
        let response = self
            .http
            .post(&self.token_uri)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Google token exchange rejected");
            return Err(ExchangeError::Rejected(describe_error(status, &body)));
        }

        response
            .json()
            .await
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))
    }
}

/// Render the provider's error as `error: error_description`, falling back
/// to the status and raw body when it is not an OAuth error document.
fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(GoogleErrorResponse {
            error,
            error_description: Some(description),
        }) => format!("{error}: {description}"),
        Ok(GoogleErrorResponse { error, .. }) => error,
        Err(_) => format!("HTTP {status}: {body}"),
    }
}
