//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

use crate::error::AppError;
use crate::models::UserCredentials;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// User documents, keyed by Firebase uid
    pub const USERS: &str = "users";
}

/// Persistence for user credential records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Merge `credentials` into the user's record, creating it if needed.
    ///
    /// Both fields are overwritten; every other field on the record is
    /// preserved.
    async fn merge_credentials(
        &self,
        user_id: &str,
        credentials: &UserCredentials,
    ) -> Result<(), AppError>;
}
