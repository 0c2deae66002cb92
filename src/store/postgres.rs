use super::RecordStore;
use crate::error::StoreError;
use crate::models::{Identity, PasswordResetRecord};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgQueryResult;
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL-backed record store
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the auth tables if they do not exist yet
    pub async fn migrate(&self) -> Result<(), StoreError> {
        tracing::info!("Running authentication database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS identities (
                id UUID PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                display_name VARCHAR(100),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                roles TEXT[] NOT NULL DEFAULT ARRAY['user'],
                current_refresh_token VARCHAR(255),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS password_reset_tokens (
                token VARCHAR(255) PRIMARY KEY,
                identity_id UUID NOT NULL REFERENCES identities(id) ON DELETE CASCADE,
                expires_at TIMESTAMPTZ NOT NULL
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_reset_tokens_expires ON password_reset_tokens(expires_at);",
        )
        .execute(&self.db)
        .await?;

        tracing::info!("Authentication migrations completed successfully");
        Ok(())
    }
}

fn ensure_found(result: PgQueryResult, id: Uuid) -> Result<(), StoreError> {
    if result.rows_affected() == 0 {
        return Err(StoreError::Backend(format!("identity {id} does not exist")));
    }
    Ok(())
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_identity_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let identity: Option<Identity> = sqlx::query_as("SELECT * FROM identities WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(identity)
    }

    async fn find_identity_by_id(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let identity: Option<Identity> = sqlx::query_as("SELECT * FROM identities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(identity)
    }

    async fn insert_identity(&self, identity: &Identity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO identities
                (id, email, password_hash, display_name, is_active, is_superuser,
                 roles, current_refresh_token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(identity.id)
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(&identity.display_name)
        .bind(identity.is_active)
        .bind(identity.is_superuser)
        .bind(&identity.roles)
        .bind(identity.current_refresh_token())
        .bind(identity.created_at)
        .bind(identity.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn update_refresh_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE identities SET current_refresh_token = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(now)
        .execute(&self.db)
        .await?;

        ensure_found(result, id)
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE identities SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .bind(now)
                .execute(&self.db)
                .await?;

        ensure_found(result, id)
    }

    async fn update_display_name(
        &self,
        id: Uuid,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE identities SET display_name = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(display_name)
                .bind(now)
                .execute(&self.db)
                .await?;

        ensure_found(result, id)
    }

    async fn update_active(
        &self,
        id: Uuid,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE identities SET
                is_active = $2,
                current_refresh_token = CASE WHEN $2 THEN current_refresh_token ELSE NULL END,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(active)
        .bind(now)
        .execute(&self.db)
        .await?;

        ensure_found(result, id)
    }

    async fn find_reset_token(
        &self,
        token: &str,
    ) -> Result<Option<PasswordResetRecord>, StoreError> {
        let record: Option<PasswordResetRecord> = sqlx::query_as(
            "SELECT token, identity_id, expires_at FROM password_reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    async fn save_reset_token(&self, record: &PasswordResetRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (token, identity_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&record.token)
        .bind(record.identity_id)
        .bind(record.expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn delete_reset_token(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn delete_expired_reset_tokens(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
