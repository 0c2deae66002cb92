use super::RecordStore;
use crate::error::StoreError;
use crate::models::{Identity, PasswordResetRecord};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local record store
#[derive(Default)]
pub struct MemoryStore {
    identities: RwLock<HashMap<Uuid, Identity>>,
    reset_tokens: RwLock<HashMap<String, PasswordResetRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reset_token_count(&self) -> usize {
        self.reset_tokens.read().await.len()
    }

    /// Apply `change` to the stored identity under the write lock
    async fn modify_identity<F>(&self, id: Uuid, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Identity) + Send,
    {
        let mut identities = self.identities.write().await;
        match identities.get_mut(&id) {
            Some(identity) => {
                change(identity);
                Ok(())
            }
            None => Err(StoreError::Backend(format!("identity {id} does not exist"))),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let identities = self.identities.read().await;
        Ok(identities.values().find(|i| i.email == email).cloned())
    }

    async fn find_identity_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.read().await.get(&id).cloned())
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        let mut identities = self.identities.write().await;
        if identities.values().any(|i| i.email == identity.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already exists",
                identity.email
            )));
        }
        if identities.contains_key(&identity.id) {
            return Err(StoreError::Conflict(format!("id {} already exists", identity.id)));
        }
        identities.insert(identity.id, identity.clone());
        Ok(())
    }

    async fn update_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify_identity(id, |identity| match token {
            Some(token) => identity.rotate_refresh_token(token.to_string(), now),
            None => identity.clear_refresh_token(now),
        })
        .await
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify_identity(id, |identity| {
            identity.set_password_hash(password_hash.to_string(), now)
        })
        .await
    }

    async fn update_display_name(
        &self,
        id: Uuid,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify_identity(id, |identity| {
            identity.set_display_name(display_name.to_string(), now)
        })
        .await
    }

    async fn update_active(
        &self,
        id: Uuid,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify_identity(id, |identity| identity.set_active(active, now))
            .await
    }

    async fn find_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetRecord>, StoreError> {
        Ok(self.reset_tokens.read().await.get(token).cloned())
    }

    async fn save_reset_token(&self, record: &PasswordResetRecord) -> Result<(), StoreError> {
        let mut tokens = self.reset_tokens.write().await;
        if tokens.contains_key(&record.token) {
            return Err(StoreError::Conflict("reset token already exists".to_string()));
        }
        tokens.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn delete_reset_token(&self, token: &str) -> Result<(), StoreError> {
        self.reset_tokens.write().await.remove(token);
        Ok(())
    }

    async fn delete_expired_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tokens = self.reset_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| record.is_valid_at(now));
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_email() {
        let store = MemoryStore::new();
        let a = Identity::new("ada@example.com".into(), "h".into(), None, now());
        let b = Identity::new("ada@example.com".into(), "h".into(), None, now());

        store.insert_identity(&a).await.unwrap();
        assert!(matches!(
            store.insert_identity(&b).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let store = MemoryStore::new();
        let a = Identity::new("Ada@example.com".into(), "h".into(), None, now());
        store.insert_identity(&a).await.unwrap();

        assert!(store
            .find_identity_by_email("ada@example.com")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_identity_by_email("Ada@example.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_identity_fails() {
        let store = MemoryStore::new();

        assert!(store
            .update_refresh_token(Uuid::new_v4(), Some("r"), now())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_updates_touch_only_their_field() {
        let store = MemoryStore::new();
        let a = Identity::new("ada@example.com".into(), "old-hash".into(), None, now());
        store.insert_identity(&a).await.unwrap();

        store.update_refresh_token(a.id, Some("r1"), now()).await.unwrap();
        store.update_password_hash(a.id, "new-hash", now()).await.unwrap();
        store.update_display_name(a.id, "Ada", now()).await.unwrap();

        let stored = store.find_identity_by_id(a.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert_eq!(stored.current_refresh_token(), Some("r1"));
        assert_eq!(stored.display_name.as_deref(), Some("Ada"));

        store.update_active(a.id, false, now()).await.unwrap();
        let stored = store.find_identity_by_id(a.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert!(!stored.has_refresh_token());
        assert_eq!(stored.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn test_delete_expired_reset_tokens() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        for (token, offset) in [("old", -10), ("edge", 0), ("live", 10)] {
            store
                .save_reset_token(&PasswordResetRecord {
                    token: token.into(),
                    identity_id: id,
                    expires_at: now() + Duration::seconds(offset),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.delete_expired_reset_tokens(now()).await.unwrap(), 2);
        assert!(store.find_reset_token("live").await.unwrap().is_some());
        assert_eq!(store.reset_token_count().await, 1);
    }
}
