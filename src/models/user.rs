//! User record fields written by the exchange flow.

use serde::{Deserialize, Serialize};

/// Credential fields merged into `users/{uid}` in Firestore.
///
/// Only these two fields are written; anything else on the user document
/// belongs to other writers and is left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    /// Google OAuth refresh token
    pub refresh_token: String,
    /// Firebase Cloud Messaging registration token for the user's device
    pub fcm_token: String,
}
