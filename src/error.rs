// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! The mobile client reads plain-text diagnostics, so every error renders
//! as a status code plus its `Display` string.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed `Authorization` header.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bearer token present but failed verification.
    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Missing authCode or fcmToken")]
    MissingFields,

    /// The provider accepted the code but issued no refresh token.
    #[error("No refresh_token received. Make sure to request offline access.")]
    MissingRefreshToken,

    #[error("Error exchanging token: {0}")]
    Exchange(String),

    #[error("Error exchanging token: {0}")]
    Database(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidJson(_) | AppError::MissingFields | AppError::MissingRefreshToken => {
                StatusCode::BAD_REQUEST
            }
            AppError::Exchange(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Exchange(msg) => {
                tracing::error!(error = %msg, "Authorization code exchange failed");
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
            }
            _ => {}
        }

        (status, self.to_string()).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
