// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request payload for the authorization-code exchange.

use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

/// Body posted by the mobile app after the user grants offline access.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest {
    /// Server auth code issued to the app by Google Sign-In
    #[serde(default)]
    #[validate(length(min = 1))]
    pub auth_code: String,
    /// FCM registration token for push delivery
    #[serde(default)]
    #[validate(length(min = 1))]
    pub fcm_token: String,
}

impl ExchangeRequest {
    /// Parse and validate a raw request body.
    ///
    /// Syntax errors and non-object bodies are `InvalidJson`; a well-formed
    /// object lacking either non-empty string field is `MissingFields`.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| AppError::InvalidJson(e.to_string()))?;

        if !value.is_object() {
            return Err(AppError::InvalidJson("expected a JSON object".to_string()));
        }

        let request: ExchangeRequest =
            serde_json::from_value(value).map_err(|_| AppError::MissingFields)?;
        request.validate().map_err(|_| AppError::MissingFields)?;

        Ok(request)
    }
}
