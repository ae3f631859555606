// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Refresh-token relay API server.
//!
//! Accepts Google authorization codes from the mobile app, exchanges them
//! for refresh tokens, and stores them in Firestore under the caller's
//! Firebase uid.

use refresh_token_relay::{
    config::Config,
    db::FirestoreDb,
    services::{FirebaseTokenVerifier, GoogleTokenExchanger},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting refresh-token relay");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let identity_verifier =
        FirebaseTokenVerifier::new(&config).expect("Failed to initialize ID token verifier");

    let code_exchanger =
        GoogleTokenExchanger::new(&config).expect("Failed to initialize token exchanger");

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        identity_verifier: Arc::new(identity_verifier),
        code_exchanger: Arc::new(code_exchanger),
        user_store: Arc::new(db),
    });

    // Build router
    let app = refresh_token_relay::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("refresh_token_relay=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
