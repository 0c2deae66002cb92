//! Record store collaborator.
//!
//! The auth core persists identities and reset tokens only through
//! [`RecordStore`]. Every method is a single atomic write or read, so a
//! failed call leaves nothing half-applied. Identity updates touch only the
//! columns they name.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::StoreError;
use crate::models::{Identity, PasswordResetRecord};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    async fn find_identity_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    /// Insert a new identity. A taken email is a [`StoreError::Conflict`].
    async fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError>;

    /// Replace the identity's refresh token (`None` clears it).
    ///
    /// Writes only the token column, so it never undoes a concurrent
    /// password or profile change.
    async fn update_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn update_display_name(
        &self,
        id: Uuid,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Set the active flag. Deactivation clears the refresh token in the same write.
    async fn update_active(
        &self,
        id: Uuid,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn find_reset_token(&self, token: &str)
        -> Result<Option<PasswordResetRecord>, StoreError>;

    async fn save_reset_token(&self, record: &PasswordResetRecord) -> Result<(), StoreError>;

    async fn delete_reset_token(&self, token: &str) -> Result<(), StoreError>;

    /// Remove reset tokens that expired at or before `now`. Returns how many.
    async fn delete_expired_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
