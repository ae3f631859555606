// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Auth ID token verification.
//!
//! Tokens are RS256 JWTs signed by `securetoken@system.gserviceaccount.com`.
//! Signing keys are fetched as a JWKS document and cached for the lifetime
//! advertised by the response's `Cache-Control` header.

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// Minimum age of a cached JWKS before an unknown `kid` may force a refetch.
const MIN_FORCED_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
const CLOCK_SKEW_SECS: u64 = 60;
const MAX_UID_LEN: usize = 128;

/// Identity established by a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    /// Firebase `uid` (the token's `sub`).
    pub user_id: String,
}

/// ID token verification error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// The token is malformed, expired, or its claims do not match.
    #[error("{0}")]
    Invalid(String),
    /// Signing keys could not be obtained.
    #[error("{0}")]
    Unavailable(String),
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        AppError::Auth(err.to_string())
    }
}

/// Verifies caller identity tokens.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<VerifiedUser, IdentityError>;
}

#[derive(Clone)]
enum VerifierMode {
    Jwks {
        url: String,
    },
    StaticKey {
        kid: String,
        decoding_key: Arc<DecodingKey>,
    },
    /// Auth emulator tokens are unsigned.
    Emulator,
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    fetched_at: Instant,
    expires_at: Instant,
}

impl JwksCacheEntry {
    /// Whether this entry can answer lookups without a refetch.
    fn is_current(&self, force_refresh: bool, now: Instant) -> bool {
        if self.expires_at <= now {
            return false;
        }
        !force_refresh || now.duration_since(self.fetched_at) < MIN_FORCED_REFRESH_INTERVAL
    }
}

/// Verifier for Firebase Auth ID tokens issued to the mobile app.
pub struct FirebaseTokenVerifier {
    http_client: reqwest::Client,
    expected_audience: String,
    expected_issuer: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl FirebaseTokenVerifier {
    /// Create a production verifier that fetches and caches Google's
    /// securetoken JWKS.
    ///
    /// With `FIREBASE_AUTH_EMULATOR_HOST` set, unsigned emulator tokens are
    /// accepted instead.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mode = if std::env::var("FIREBASE_AUTH_EMULATOR_HOST").is_ok() {
            tracing::warn!("FIREBASE_AUTH_EMULATOR_HOST set, ID token signatures are NOT checked");
            VerifierMode::Emulator
        } else {
            VerifierMode::Jwks {
                url: config.firebase_jwks_url.clone(),
            }
        };

        let verifier = Self::with_mode(&config.gcp_project_id, mode)?;

        tracing::info!(
            expected_audience = %verifier.expected_audience,
            expected_issuer = %verifier.expected_issuer,
            "Initialized Firebase ID token verifier"
        );

        Ok(verifier)
    }

    /// Create a verifier with a static RSA public key.
    ///
    /// This is intended for deterministic local/integration tests.
    pub fn new_with_static_key(
        config: &Config,
        kid: impl Into<String>,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key kid must not be empty");
        }

        Self::with_mode(
            &config.gcp_project_id,
            VerifierMode::StaticKey {
                kid,
                decoding_key: Arc::new(decoding_key),
            },
        )
    }

    fn with_mode(project_id: &str, mode: VerifierMode) -> anyhow::Result<Self> {
        if project_id.trim().is_empty() {
            anyhow::bail!("Firebase project ID must not be empty");
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building JWKS HTTP client")?;

        Ok(Self {
            http_client,
            expected_audience: project_id.to_string(),
            expected_issuer: format!("https://securetoken.google.com/{project_id}"),
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    async fn verify_signed(&self, token: &str) -> Result<FirebaseIdTokenClaims, IdentityError> {
        let header = decode_header(token)
            .map_err(|e| IdentityError::Invalid(format!("invalid JWT header: {e}")))?;

        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdentityError::Invalid("missing JWT kid".to_string()))?;

        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_audience(&[self.expected_audience.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        decode::<FirebaseIdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map(|data| data.claims)
            .map_err(|e| IdentityError::Invalid(format!("ID token validation failed: {e}")))
    }

    /// Emulator tokens carry `alg: none`, which `jsonwebtoken` refuses to
    /// parse, so the payload is decoded by hand and the standard claims
    /// checked explicitly.
    fn verify_unsigned(&self, token: &str) -> Result<FirebaseIdTokenClaims, IdentityError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| IdentityError::Invalid("malformed JWT".to_string()))?;

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| IdentityError::Invalid(format!("invalid JWT payload encoding: {e}")))?;

        let claims: FirebaseIdTokenClaims = serde_json::from_slice(&bytes)
            .map_err(|e| IdentityError::Invalid(format!("invalid JWT claims: {e}")))?;

        if claims.exp + CLOCK_SKEW_SECS <= now_unix_secs() {
            return Err(IdentityError::Invalid("ID token has expired".to_string()));
        }
        if claims.iss != self.expected_issuer {
            return Err(IdentityError::Invalid(format!(
                "unexpected issuer: {}",
                claims.iss
            )));
        }
        if claims.aud != self.expected_audience {
            return Err(IdentityError::Invalid(format!(
                "unexpected audience: {}",
                claims.aud
            )));
        }

        Ok(claims)
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        let jwks_url = match &self.mode {
            VerifierMode::StaticKey {
                kid: static_kid,
                decoding_key,
            } => {
                if kid == static_kid {
                    return Ok(decoding_key.clone());
                }

                return Err(IdentityError::Invalid(format!(
                    "unknown JWT kid for static verifier: {kid}"
                )));
            }
            VerifierMode::Jwks { url } => url,
            VerifierMode::Emulator => {
                return Err(IdentityError::Invalid(
                    "signed tokens are not used with the auth emulator".to_string(),
                ));
            }
        };

        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        // Keys rotate, so an unknown kid may force one refetch. Refetches are
        // rate limited by MIN_FORCED_REFRESH_INTERVAL.
        for force_refresh in [false, true] {
            self.refresh_jwks(jwks_url, force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::Invalid(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn cache_is_current(&self, force_refresh: bool) -> bool {
        let cache = self.jwks_cache.read().await;
        cache
            .as_ref()
            .is_some_and(|entry| entry.is_current(force_refresh, Instant::now()))
    }

    async fn refresh_jwks(&self, jwks_url: &str, force_refresh: bool) -> Result<(), IdentityError> {
        // Checked before and after taking the lock so callers don't queue
        // behind an in-flight fetch they don't need.
        if self.cache_is_current(force_refresh).await {
            return Ok(());
        }

        let _guard = self.refresh_lock.lock().await;

        if self.cache_is_current(force_refresh).await {
            return Ok(());
        }

        tracing::debug!(jwks_url = %jwks_url, "Refreshing Firebase JWKS cache");

        let response = self
            .http_client
            .get(jwks_url)
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Unavailable(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Unavailable(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid: HashMap<String, Arc<DecodingKey>> = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
                continue;
            }

            if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
                continue;
            }

            if jwk.use_.as_deref().is_some_and(|use_| use_ != "sig") {
                continue;
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(IdentityError::Unavailable(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        let key_count = keys_by_kid.len();
        let fetched_at = Instant::now();
        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            fetched_at,
            expires_at: fetched_at + ttl,
        });

        tracing::debug!(
            ttl_secs = ttl.as_secs(),
            key_count,
            "Firebase JWKS cache refreshed"
        );
        Ok(())
    }
}

#[async_trait]
impl IdentityVerifier for FirebaseTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedUser, IdentityError> {
        let claims = match self.mode {
            VerifierMode::Emulator => self.verify_unsigned(id_token)?,
            _ => self.verify_signed(id_token).await?,
        };

        validate_not_future(claims.iat, "iat")?;
        validate_not_future(claims.auth_time, "auth_time")?;

        if claims.sub.is_empty() {
            return Err(IdentityError::Invalid("sub claim is empty".to_string()));
        }
        if claims.sub.len() > MAX_UID_LEN {
            return Err(IdentityError::Invalid(format!(
                "sub claim longer than {MAX_UID_LEN} characters"
            )));
        }

        tracing::debug!(
            user_id = %claims.sub,
            sign_in_provider = ?claims.firebase.as_ref().and_then(|f| f.sign_in_provider.as_deref()),
            exp = claims.exp,
            "Firebase ID token verified"
        );

        Ok(VerifiedUser {
            user_id: claims.sub,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseIdTokenClaims {
    iss: String,
    aud: String,
    sub: String,
    exp: u64,
    iat: Option<u64>,
    auth_time: Option<u64>,
    firebase: Option<FirebaseClaim>,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaim {
    sign_in_provider: Option<String>,
}

fn validate_not_future(timestamp: Option<u64>, claim: &str) -> Result<(), IdentityError> {
    let Some(timestamp) = timestamp else {
        return Err(IdentityError::Invalid(format!("missing {claim} claim")));
    };

    if timestamp > now_unix_secs() + CLOCK_SKEW_SECS {
        return Err(IdentityError::Invalid(format!(
            "{claim} claim is in the future"
        )));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value.split(',').find_map(|directive| {
        directive
            .trim()
            .strip_prefix("max-age=")
            .and_then(|raw| raw.trim_matches('"').parse::<u64>().ok())
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
