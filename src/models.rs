//! Authentication Models
//!
//! Stored entities plus request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::token::TokenSubject;

// ============================================
// Stored Entities
// ============================================

/// Default role for new identities
pub const DEFAULT_ROLE: &str = "user";

/// A user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub roles: Vec<String>,
    /// The one refresh token currently honoured for this identity
    #[serde(skip_serializing)]
    current_refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(
        email: String,
        password_hash: String,
        display_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            display_name,
            is_active: true,
            is_superuser: false,
            roles: vec![DEFAULT_ROLE.to_string()],
            current_refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Install a new refresh token, replacing whatever was there.
    ///
    /// Only one refresh token is ever valid per identity, so this is the only
    /// way a session's refresh capability is granted.
    pub fn rotate_refresh_token(&mut self, token: String, now: DateTime<Utc>) {
        self.current_refresh_token = Some(token);
        self.updated_at = now;
    }

    /// Drop the refresh token so no session can refresh
    pub fn clear_refresh_token(&mut self, now: DateTime<Utc>) {
        self.current_refresh_token = None;
        self.updated_at = now;
    }

    pub fn refresh_token_matches(&self, presented: &str) -> bool {
        self.current_refresh_token.as_deref() == Some(presented)
    }

    pub fn has_refresh_token(&self) -> bool {
        self.current_refresh_token.is_some()
    }

    pub fn current_refresh_token(&self) -> Option<&str> {
        self.current_refresh_token.as_deref()
    }

    pub fn set_password_hash(&mut self, hash: String, now: DateTime<Utc>) {
        self.password_hash = hash;
        self.updated_at = now;
    }

    pub fn set_display_name(&mut self, name: String, now: DateTime<Utc>) {
        self.display_name = Some(name);
        self.updated_at = now;
    }

    pub fn set_active(&mut self, active: bool, now: DateTime<Utc>) {
        self.is_active = active;
        if !active {
            self.current_refresh_token = None;
        }
        self.updated_at = now;
    }

    pub fn token_subject(&self) -> TokenSubject {
        TokenSubject {
            subject: self.email.clone(),
            roles: self.roles.clone(),
            is_superuser: self.is_superuser,
        }
    }
}

/// A single-use password reset token
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PasswordResetRecord {
    pub token: String,
    pub identity_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl PasswordResetRecord {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

// ============================================
// Request DTOs
// ============================================

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

/// Refresh token request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Password reset request (initiate)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Password reset request (complete)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Change password request (for authenticated users)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Profile update for the current identity
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

/// Admin activation toggle
#[derive(Debug, Clone, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

// ============================================
// Response DTOs
// ============================================

/// Public identity data without secrets
#[derive(Debug, Clone, Serialize)]
pub struct IdentityResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub roles: Vec<String>,
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            email: identity.email,
            name: identity.display_name,
            is_active: identity.is_active,
            is_superuser: identity.is_superuser,
            roles: identity.roles,
        }
    }
}

/// Token pair response
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl From<crate::token::TokenPair> for TokenResponse {
    fn from(pair: crate::token::TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "bearer".to_string(),
            expires_in: pair.expires_in,
        }
    }
}

/// Simple message response
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn identity() -> Identity {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Identity::new("ada@example.com".into(), "hash".into(), None, now)
    }

    #[test]
    fn test_rotation_replaces_previous_token() {
        let mut identity = identity();
        let now = identity.created_at;

        identity.rotate_refresh_token("first".into(), now);
        identity.rotate_refresh_token("second".into(), now);

        assert!(!identity.refresh_token_matches("first"));
        assert!(identity.refresh_token_matches("second"));
    }

    #[test]
    fn test_cleared_token_matches_nothing() {
        let mut identity = identity();
        let now = identity.created_at;
        identity.rotate_refresh_token("t".into(), now);

        identity.clear_refresh_token(now);

        assert!(!identity.refresh_token_matches("t"));
        assert!(!identity.refresh_token_matches(""));
        assert!(!identity.has_refresh_token());
    }

    #[test]
    fn test_deactivation_clears_refresh_token() {
        let mut identity = identity();
        let now = identity.created_at;
        identity.rotate_refresh_token("t".into(), now);

        identity.set_active(false, now + Duration::seconds(1));

        assert!(!identity.is_active);
        assert!(!identity.has_refresh_token());
    }

    #[test]
    fn test_reset_record_validity_is_strict() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let record = PasswordResetRecord {
            token: "t".into(),
            identity_id: Uuid::new_v4(),
            expires_at: now,
        };

        assert!(record.is_valid_at(now - Duration::seconds(1)));
        assert!(!record.is_valid_at(now));
    }

    #[test]
    fn test_response_hides_secrets() {
        let mut identity = identity();
        let now = identity.created_at;
        identity.rotate_refresh_token("secret-refresh".into(), now);

        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("secret-refresh"));
        assert!(!json.contains("password_hash"));
    }

    #[test]
    fn test_login_request_validation() {
        let bad = LoginRequest {
            email: "not-an-email".into(),
            password: "x".into(),
        };
        assert!(bad.validate().is_err());

        let good = LoginRequest {
            email: "ada@example.com".into(),
            password: "x".into(),
        };
        assert!(good.validate().is_ok());
    }
}
