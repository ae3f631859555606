//! Application configuration loaded from environment variables.
//!
//! Cloud Run injects the OAuth client secret as an environment variable via
//! a Secret Manager binding, so everything is read once at startup.

use std::env;
use std::time::Duration;

/// Google's OAuth 2.0 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Public signing keys for Firebase Auth ID tokens, in JWK form.
pub const DEFAULT_FIREBASE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";

const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PERSIST_TIMEOUT_SECS: u64 = 10;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (the web client the mobile app requests codes for)
    pub google_client_id: String,
    /// Redirect URI registered for the client. Must match the value the
    /// mobile app used when the authorization code was issued.
    pub oauth_redirect_uri: String,
    /// GCP project ID. Also the Firebase project, so it is the expected
    /// ID-token audience.
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Token endpoint used for the authorization-code exchange
    pub google_token_uri: String,
    /// JWKS endpoint for Firebase ID-token signing keys
    pub firebase_jwks_url: String,
    /// Upper bound on the outbound code exchange
    pub exchange_timeout: Duration,
    /// Upper bound on the Firestore merge write
    pub persist_timeout: Duration,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            oauth_redirect_uri: "https://relay.example.com/exchangeAuthCode".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            google_token_uri: DEFAULT_TOKEN_URI.to_string(),
            firebase_jwks_url: DEFAULT_FIREBASE_JWKS_URL.to_string(),
            exchange_timeout: Duration::from_secs(DEFAULT_EXCHANGE_TIMEOUT_SECS),
            persist_timeout: Duration::from_secs(DEFAULT_PERSIST_TIMEOUT_SECS),
            google_client_secret: "test_secret".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// For local development, values can also come from a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            oauth_redirect_uri: env::var("OAUTH_REDIRECT_URI")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("OAUTH_REDIRECT_URI"))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            google_token_uri: env::var("GOOGLE_TOKEN_URI")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URI.to_string()),
            firebase_jwks_url: env::var("FIREBASE_JWKS_URL")
                .unwrap_or_else(|_| DEFAULT_FIREBASE_JWKS_URL.to_string()),
            exchange_timeout: duration_secs("EXCHANGE_TIMEOUT_SECS", DEFAULT_EXCHANGE_TIMEOUT_SECS)?,
            persist_timeout: duration_secs("PERSIST_TIMEOUT_SECS", DEFAULT_PERSIST_TIMEOUT_SECS)?,

            // Secret Manager binding in prod, plain env var for local dev
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
        })
    }
}

/// Read a positive number of seconds, falling back to `default` when unset.
fn duration_secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(Duration::from_secs(default));
    };

    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid(name, raw)),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
