// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Refresh-token relay: redeem a mobile app's Google authorization code
//! for a refresh token and store it against the caller's Firebase uid.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::UserStore;
use services::{CodeExchanger, IdentityVerifier};
use std::sync::Arc;

/// Shared application state.
///
/// Collaborators are trait objects so tests can substitute doubles.
pub struct AppState {
    pub config: Config,
    pub identity_verifier: Arc<dyn IdentityVerifier>,
    pub code_exchanger: Arc<dyn CodeExchanger>,
    pub user_store: Arc<dyn UserStore>,
}
