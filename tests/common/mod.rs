// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::response::Response;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use refresh_token_relay::config::Config;
use refresh_token_relay::db::{FirestoreDb, UserStore};
use refresh_token_relay::error::AppError;
use refresh_token_relay::models::UserCredentials;
use refresh_token_relay::routes::create_router;
use refresh_token_relay::services::{
    CodeExchanger, ExchangeError, IdentityError, IdentityVerifier, ProviderCredentials,
    VerifiedUser,
};
use refresh_token_relay::AppState;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// RSA key pair standing in for Google's securetoken signing key.
#[allow(dead_code)]
pub const TEST_SIGNING_KEY_PEM: &[u8] = include_bytes!("../fixtures/firebase_test_key.pem");
#[allow(dead_code)]
pub const TEST_PUBLIC_KEY_PEM: &[u8] = include_bytes!("../fixtures/firebase_test_key.pub.pem");
/// JWK components of the public key above.
#[allow(dead_code)]
pub const TEST_JWK_N: &str = "pLMSvoX1OpLdpW9UEue7D8RePffbth2iVI9e0UQp2aC87tuyHLnD-MhFLp4faSmt5wM1VN3Ikg_jkdRcWO35NZSZSl-VKVcC4COYlA9REjTS2CmX7j8rg8oFpklIG77NbD6Gfzm_tXis-HSrkrL05r96rVGHnQwOmoZ-FdOU0Z0KFdM6nrg_pxbFYbZ1xi5qC8uiHq1X8Z3yqYw-k1P0hGWm0AwHykzGGE5EDKIoChnZ_Pk1DxXVRDYnYo6jogHzI_4ZB9K-iPBgmAkrkTt5EFUoLnDP9a7yiDfnH1tHxlzBRFWjH-La9lNYTUjX0NpWi5T5Cy4tj1_H1WM58PkFpw";
#[allow(dead_code)]
pub const TEST_JWK_E: &str = "AQAB";
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid-1";
/// A key nobody trusts.
#[allow(dead_code)]
pub const UNTRUSTED_SIGNING_KEY_PEM: &[u8] = include_bytes!("../fixtures/untrusted_key.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[allow(dead_code)]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Claims of a fresh ID token for `uid` in `project_id`.
#[allow(dead_code)]
pub fn firebase_claims(uid: &str, project_id: &str) -> Value {
    let now = now_secs();
    serde_json::json!({
        "iss": format!("https://securetoken.google.com/{project_id}"),
        "aud": project_id,
        "sub": uid,
        "user_id": uid,
        "iat": now,
        "auth_time": now,
        "exp": now + 3600,
        "firebase": { "sign_in_provider": "google.com", "identities": {} }
    })
}

/// Sign `claims` as an RS256 ID token with `kid`.
#[allow(dead_code)]
pub fn sign_id_token(claims: &Value, kid: &str, private_key_pem: &[u8]) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());

    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(private_key_pem).expect("valid RSA fixture"),
    )
    .expect("Failed to sign ID token")
}

#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}

// ─── Test doubles ────────────────────────────────────────────────────────────

/// Identity verifier that knows a fixed set of tokens.
#[derive(Default)]
#[allow(dead_code)]
pub struct StaticIdentityVerifier {
    users_by_token: HashMap<String, String>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StaticIdentityVerifier {
    pub fn with_user(token: &str, user_id: &str) -> Self {
        let mut users_by_token = HashMap::new();
        users_by_token.insert(token.to_string(), user_id.to_string());
        Self {
            users_by_token,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, id_token: &str) -> Result<VerifiedUser, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.users_by_token
            .get(id_token)
            .map(|user_id| VerifiedUser {
                user_id: user_id.clone(),
            })
            .ok_or_else(|| IdentityError::Invalid("ID token has invalid signature".to_string()))
    }
}

/// Scripted exchange result.
#[derive(Clone)]
#[allow(dead_code)]
pub enum ExchangeOutcome {
    Issue(Option<String>),
    Reject(String),
}

/// Code exchanger that records the codes it is asked to redeem.
#[allow(dead_code)]
pub struct FakeCodeExchanger {
    outcome: ExchangeOutcome,
    codes: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeCodeExchanger {
    pub fn issuing(refresh_token: &str) -> Self {
        Self::with_outcome(ExchangeOutcome::Issue(Some(refresh_token.to_string())))
    }

    pub fn without_refresh_token() -> Self {
        Self::with_outcome(ExchangeOutcome::Issue(None))
    }

    pub fn rejecting(detail: &str) -> Self {
        Self::with_outcome(ExchangeOutcome::Reject(detail.to_string()))
    }

    pub fn with_outcome(outcome: ExchangeOutcome) -> Self {
        Self {
            outcome,
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn codes(&self) -> Vec<String> {
        self.codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeExchanger for FakeCodeExchanger {
    async fn exchange(&self, code: &str) -> Result<ProviderCredentials, ExchangeError> {
        self.codes.lock().unwrap().push(code.to_string());
        match &self.outcome {
            ExchangeOutcome::Issue(refresh_token) => Ok(ProviderCredentials {
                access_token: "ya29.test-access-token".to_string(),
                refresh_token: refresh_token.clone(),
                ..Default::default()
            }),
            ExchangeOutcome::Reject(detail) => Err(ExchangeError::Rejected(detail.clone())),
        }
    }
}

/// Document store with Firestore's update-mask merge semantics.
#[derive(Default)]
#[allow(dead_code)]
pub struct InMemoryUserStore {
    docs: Mutex<HashMap<String, Map<String, Value>>>,
    writes: AtomicUsize,
}

#[allow(dead_code)]
impl InMemoryUserStore {
    pub fn seed(&self, user_id: &str, doc: Value) {
        let Value::Object(fields) = doc else {
            panic!("seed document must be an object");
        };
        self.docs
            .lock()
            .unwrap()
            .insert(user_id.to_string(), fields);
    }

    pub fn get(&self, user_id: &str) -> Option<Map<String, Value>> {
        self.docs.lock().unwrap().get(user_id).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn merge_credentials(
        &self,
        user_id: &str,
        credentials: &UserCredentials,
    ) -> Result<(), AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.docs.lock().unwrap();
        let doc = docs.entry(user_id.to_string()).or_default();
        doc.insert(
            "refresh_token".to_string(),
            Value::String(credentials.refresh_token.clone()),
        );
        doc.insert(
            "fcm_token".to_string(),
            Value::String(credentials.fcm_token.clone()),
        );
        Ok(())
    }
}

/// Collaborators behind a test app, kept so tests can inspect them.
#[allow(dead_code)]
pub struct TestDeps {
    pub verifier: Arc<StaticIdentityVerifier>,
    pub exchanger: Arc<FakeCodeExchanger>,
    pub store: Arc<InMemoryUserStore>,
}

/// Create a test app from in-memory doubles.
/// Returns the router and the doubles.
#[allow(dead_code)]
pub fn create_test_app(
    verifier: StaticIdentityVerifier,
    exchanger: FakeCodeExchanger,
    store: Arc<InMemoryUserStore>,
) -> (axum::Router, TestDeps) {
    let deps = TestDeps {
        verifier: Arc::new(verifier),
        exchanger: Arc::new(exchanger),
        store,
    };

    let state = Arc::new(AppState {
        config: Config::default(),
        identity_verifier: deps.verifier.clone(),
        code_exchanger: deps.exchanger.clone(),
        user_store: deps.store.clone(),
    });

    (create_router(state), deps)
}

/// Create a test app whose user store is any `UserStore`.
#[allow(dead_code)]
pub fn create_test_app_with_store(
    verifier: StaticIdentityVerifier,
    exchanger: FakeCodeExchanger,
    store: Arc<dyn UserStore>,
) -> axum::Router {
    let state = Arc::new(AppState {
        config: Config::default(),
        identity_verifier: Arc::new(verifier),
        code_exchanger: Arc::new(exchanger),
        user_store: store,
    });

    create_router(state)
}
