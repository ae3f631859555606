// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization code exchange route.
//!
//! Runs behind [`require_firebase_auth`](crate::middleware::require_firebase_auth),
//! which has already established the caller's uid.

use axum::{body::Bytes, extract::State, routing::any, Extension, Router};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{ExchangeRequest, UserCredentials};
use crate::AppState;

pub const EXCHANGE_PATH: &str = "/exchangeAuthCode";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(EXCHANGE_PATH, any(exchange_auth_code))
}

/// Redeem the app's auth code for a refresh token and store it with the
/// device's FCM token.
async fn exchange_auth_code(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<&'static str> {
    let request = ExchangeRequest::from_body(&body).inspect_err(|e| {
        tracing::warn!(user_id = %user.user_id, error = %e, "Rejected exchange payload");
    })?;

    tracing::info!(user_id = %user.user_id, "Exchanging authorization code");

    let credentials = state.code_exchanger.exchange(&request.auth_code).await?;

    let refresh_token = credentials
        .refresh_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            tracing::warn!(
                user_id = %user.user_id,
                scope = ?credentials.scope,
                "Exchange returned no refresh token; client must request offline access"
            );
            AppError::MissingRefreshToken
        })?;

    let record = UserCredentials {
        refresh_token,
        fcm_token: request.fcm_token,
    };

    let persist_timeout = state.config.persist_timeout;
    tokio::time::timeout(
        persist_timeout,
        state.user_store.merge_credentials(&user.user_id, &record),
    )
    .await
    .map_err(|_| {
        AppError::Database(format!(
            "user record write timed out after {}s",
            persist_timeout.as_secs()
        ))
    })??;

    tracing::info!(user_id = %user.user_id, "Authorization code exchange complete");

    Ok("Auth successful!")
}
