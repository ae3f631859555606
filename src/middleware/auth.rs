// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token authentication middleware.

use crate::error::AppError;
use crate::services::IdentityError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated user extracted from a verified ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Firebase uid
    pub user_id: String,
}

/// Middleware that requires a valid Firebase ID token.
///
/// Rejects before the body is read, so unauthenticated requests never reach
/// payload validation or any downstream call.
pub async fn require_firebase_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers().get(header::AUTHORIZATION))?;

    let user = state
        .identity_verifier
        .verify(token)
        .await
        .map_err(|err| {
            match &err {
                IdentityError::Invalid(reason) => {
                    tracing::warn!(reason = %reason, "Rejected request: invalid ID token");
                }
                IdentityError::Unavailable(reason) => {
                    tracing::error!(reason = %reason, "ID token verification unavailable");
                }
            }
            AppError::from(err)
        })?;

    request.extensions_mut().insert(AuthUser {
        user_id: user.user_id,
    });

    Ok(next.run(request).await)
}

/// Split `Authorization` into exactly `<scheme> <token>` and require the
/// scheme to be `Bearer` in any letter case.
pub fn extract_bearer_token(auth_header: Option<&HeaderValue>) -> Result<&str, AppError> {
    let value = auth_header
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Ok(*token),
        _ => Err(AppError::Unauthorized),
    }
}
