//! Authentication Service
//!
//! Registration, login, refresh rotation, logout and the password flows,
//! built on the hasher, token codec, revocation registry and reset-token
//! store.

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, StoreError};
use crate::models::*;
use crate::notifier::Notifier;
use crate::password::{PasswordHasher, PasswordPolicy};
use crate::rate_limit::RateLimiter;
use crate::reset_token::ResetTokenStore;
use crate::revocation::RevocationRegistry;
use crate::store::RecordStore;
use crate::token::{AccessClaims, TokenCodec, TokenPair};

use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

/// Counts of entries dropped by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub revocations: usize,
    pub rate_limit_keys: usize,
    pub reset_tokens: u64,
}

/// Authentication service
pub struct AuthService {
    config: AuthConfig,
    store: Arc<dyn RecordStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    hasher: PasswordHasher,
    policy: PasswordPolicy,
    tokens: TokenCodec,
    revocations: Arc<RevocationRegistry>,
    reset_tokens: ResetTokenStore,
    login_limiter: Arc<RateLimiter>,
}

impl AuthService {
    /// Create a new authentication service on the system clock
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AuthError> {
        Self::with_clock(config, store, notifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AuthConfig,
        store: Arc<dyn RecordStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let hasher = PasswordHasher::from_config(&config)?;
        let revocations = Arc::new(RevocationRegistry::new(clock.clone()));
        let tokens = TokenCodec::new(&config, clock.clone(), revocations.clone());
        let reset_tokens = ResetTokenStore::new(store.clone(), clock.clone());
        let login_limiter = Arc::new(RateLimiter::new(
            config.login_rate_limit,
            Duration::seconds(config.login_rate_window),
            clock.clone(),
        ));

        Ok(Self {
            config,
            store,
            notifier,
            clock,
            hasher,
            policy: PasswordPolicy,
            tokens,
            revocations,
            reset_tokens,
            login_limiter,
        })
    }

    /// Get reference to config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub fn revocations(&self) -> &Arc<RevocationRegistry> {
        &self.revocations
    }

    pub fn login_limiter(&self) -> &Arc<RateLimiter> {
        &self.login_limiter
    }

    // ============================================
    // Access Checks
    // ============================================

    /// Verify a bearer token for a protected request
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.tokens.verify_access(token)
    }

    /// Gate a login attempt from `client_key`
    pub fn check_login_rate(&self, client_key: &str) -> Result<(), AuthError> {
        if self.login_limiter.allow(client_key) {
            return Ok(());
        }

        let retry_after = self.login_limiter.retry_after(client_key);
        tracing::warn!(client = %client_key, retry_after, "Login attempts throttled");
        Err(AuthError::RateLimited { retry_after })
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new identity. No tokens are issued.
    pub async fn register(&self, req: RegisterRequest) -> Result<Identity, AuthError> {
        if self.store.find_identity_by_email(&req.email).await?.is_some() {
            return Err(AuthError::DuplicateIdentity);
        }

        self.policy.validate(&req.password)?;

        let password_hash = self.hasher.hash(&req.password)?;
        let identity = Identity::new(req.email, password_hash, req.name, self.clock.now());

        match self.store.insert_identity(&identity).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Err(AuthError::DuplicateIdentity),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %identity.id, "Identity registered");
        Ok(identity)
    }

    // ============================================
    // Login / Logout
    // ============================================

    /// Check credentials and open a session.
    ///
    /// Unknown email and wrong password fail identically. The new refresh
    /// token replaces any earlier one.
    pub async fn login(&self, req: LoginRequest) -> Result<TokenPair, AuthError> {
        let identity = self
            .store
            .find_identity_by_email(&req.email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.hasher.verify(&req.password, &identity.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        if !identity.is_active {
            return Err(AuthError::InactiveAccount);
        }

        let pair = self
            .tokens
            .issue_pair(&identity.token_subject(), self.tokens.access_ttl())?;
        self.store
            .update_refresh_token(identity.id, Some(&pair.refresh_token), self.clock.now())
            .await?;

        tracing::info!(user_id = %identity.id, "Login succeeded");
        Ok(pair)
    }

    /// Drop the identity's refresh token, then revoke the presented access token.
    ///
    /// A failed store write returns before anything is revoked.
    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let claims = self.tokens.decode(access_token)?;

        let identity = self.store.find_identity_by_email(&claims.sub).await?;
        if let Some(identity) = &identity {
            self.store
                .update_refresh_token(identity.id, None, self.clock.now())
                .await?;
        }

        self.revocations.revoke(&claims.jti, claims.expires_at());

        if let Some(identity) = identity {
            tracing::info!(user_id = %identity.id, jti = %claims.jti, "Logged out");
        }
        Ok(())
    }

    // ============================================
    // Token Refresh
    // ============================================

    /// Exchange the current refresh token for a new pair (single-use rotation)
    pub async fn refresh(
        &self,
        claims: &AccessClaims,
        presented_refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let identity = self
            .store
            .find_identity_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if !identity.refresh_token_matches(presented_refresh_token) {
            tracing::warn!(
                user_id = %identity.id,
                "Refresh attempted with a token that is not current"
            );
            return Err(AuthError::TokenMismatch);
        }

        if !identity.is_active {
            return Err(AuthError::InactiveAccount);
        }

        let pair = self
            .tokens
            .issue_pair(&identity.token_subject(), self.tokens.access_ttl())?;
        self.store
            .update_refresh_token(identity.id, Some(&pair.refresh_token), self.clock.now())
            .await?;

        tracing::debug!(user_id = %identity.id, "Refresh token rotated");
        Ok(pair)
    }

    // ============================================
    // Password Management
    // ============================================

    /// Change password for an authenticated identity.
    ///
    /// Outstanding access tokens stay valid until they expire.
    pub async fn change_password(
        &self,
        claims: &AccessClaims,
        req: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let identity = self.identity_for(claims).await?;

        if !self
            .hasher
            .verify(&req.current_password, &identity.password_hash)
        {
            return Err(AuthError::InvalidCredentials);
        }

        self.policy.validate(&req.new_password)?;

        let password_hash = self.hasher.hash(&req.new_password)?;
        self.store
            .update_password_hash(identity.id, &password_hash, self.clock.now())
            .await?;

        tracing::info!(user_id = %identity.id, "Password changed");
        Ok(())
    }

    /// Start a password reset. Unknown emails fail with `NotFound`.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let identity = self
            .store
            .find_identity_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let token = self
            .reset_tokens
            .create(
                identity.id,
                Duration::seconds(self.config.password_reset_expiration),
            )
            .await?;

        let body = format!(
            "A password reset was requested for your account. \
             The token is valid for {} minutes. Reset token: {}",
            self.config.password_reset_expiration / 60,
            token
        );
        if let Err(e) = self
            .notifier
            .send(&identity.email, "Password reset", &body)
            .await
        {
            tracing::warn!(user_id = %identity.id, error = %e, "Failed to send reset email");
        }

        tracing::info!(user_id = %identity.id, "Password reset token issued");
        Ok(())
    }

    /// Complete a reset. The token is deleted only after the new hash is stored.
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), AuthError> {
        let identity_id = self
            .reset_tokens
            .resolve(&req.token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        self.policy.validate(&req.new_password)?;

        let identity = self
            .store
            .find_identity_by_id(identity_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let password_hash = self.hasher.hash(&req.new_password)?;
        self.store
            .update_password_hash(identity.id, &password_hash, self.clock.now())
            .await?;

        self.reset_tokens.consume(&req.token).await?;

        tracing::info!(user_id = %identity.id, "Password reset completed");
        Ok(())
    }

    // ============================================
    // Profile
    // ============================================

    /// The identity behind a verified access token
    pub async fn current_identity(&self, claims: &AccessClaims) -> Result<Identity, AuthError> {
        self.identity_for(claims).await
    }

    pub async fn update_profile(
        &self,
        claims: &AccessClaims,
        req: UpdateProfileRequest,
    ) -> Result<Identity, AuthError> {
        let mut identity = self.identity_for(claims).await?;
        let now = self.clock.now();

        self.store
            .update_display_name(identity.id, &req.name, now)
            .await?;
        identity.set_display_name(req.name, now);

        Ok(identity)
    }

    async fn identity_for(&self, claims: &AccessClaims) -> Result<Identity, AuthError> {
        self.store
            .find_identity_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::NotFound)
    }

    // ============================================
    // Administration
    // ============================================

    /// Look up any identity. Superusers only.
    pub async fn get_identity(&self, claims: &AccessClaims, id: Uuid) -> Result<Identity, AuthError> {
        require_superuser(claims)?;

        self.store
            .find_identity_by_id(id)
            .await?
            .ok_or(AuthError::NotFound)
    }

    /// Activate or deactivate an identity. Superusers only.
    pub async fn set_active(
        &self,
        claims: &AccessClaims,
        id: Uuid,
        active: bool,
    ) -> Result<Identity, AuthError> {
        require_superuser(claims)?;

        let mut identity = self
            .store
            .find_identity_by_id(id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let now = self.clock.now();
        self.store.update_active(identity.id, active, now).await?;
        identity.set_active(active, now);

        tracing::info!(user_id = %identity.id, active, "Identity activation changed");
        Ok(identity)
    }

    // ============================================
    // Housekeeping
    // ============================================

    /// Drop expired revocations, idle throttle keys and expired reset tokens
    pub async fn sweep(&self) -> Result<SweepReport, AuthError> {
        let report = SweepReport {
            revocations: self.revocations.purge_expired(),
            rate_limit_keys: self.login_limiter.purge_idle(),
            reset_tokens: self.reset_tokens.purge_expired().await?,
        };

        tracing::debug!(?report, "Sweep finished");
        Ok(report)
    }
}

fn require_superuser(claims: &AccessClaims) -> Result<(), AuthError> {
    if claims.is_superuser {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied)
    }
}
