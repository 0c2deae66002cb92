//! Single-use, time-boxed password reset tokens.

use crate::clock::Clock;
use crate::error::StoreError;
use crate::models::PasswordResetRecord;
use crate::store::RecordStore;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Duration;
use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

/// Default reset-token lifetime in minutes
pub const DEFAULT_RESET_TTL_MINUTES: i64 = 60;

pub struct ResetTokenStore {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl ResetTokenStore {
    pub fn new(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Mint and persist a token for `identity_id`; returns the plaintext token
    pub async fn create(&self, identity_id: Uuid, ttl: Duration) -> Result<String, StoreError> {
        let token_bytes: [u8; 32] = rand::thread_rng().gen();
        let token = URL_SAFE_NO_PAD.encode(token_bytes);

        let record = PasswordResetRecord {
            token: token.clone(),
            identity_id,
            expires_at: self.clock.now() + ttl,
        };
        self.store.save_reset_token(&record).await?;

        Ok(token)
    }

    /// The identity a live token belongs to.
    ///
    /// An expired record reads as absent and is deleted on the way out.
    pub async fn resolve(&self, token: &str) -> Result<Option<Uuid>, StoreError> {
        let Some(record) = self.store.find_reset_token(token).await? else {
            return Ok(None);
        };

        if record.is_valid_at(self.clock.now()) {
            return Ok(Some(record.identity_id));
        }

        tracing::debug!(identity_id = %record.identity_id, "Discarding expired reset token");
        self.store.delete_reset_token(token).await?;
        Ok(None)
    }

    /// Delete the token. Call only after the new password is stored.
    pub async fn consume(&self, token: &str) -> Result<(), StoreError> {
        self.store.delete_reset_token(token).await
    }

    /// Delete every expired token. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.store.delete_expired_reset_tokens(self.clock.now()).await
    }
}
