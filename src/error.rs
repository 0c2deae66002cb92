//! Authentication Error Types
//!
//! Every failure the auth core can report, and its HTTP mapping.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is not active")]
    InactiveAccount,

    #[error("Email already registered")]
    DuplicateIdentity,

    #[error("{0}")]
    PolicyViolation(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid or expired refresh token")]
    TokenMismatch,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Too many requests. Please try again later")]
    RateLimited { retry_after: u64 },

    #[error("Not found")]
    NotFound,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

impl AuthError {
    /// HTTP status and stable machine-readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::InactiveAccount => (StatusCode::BAD_REQUEST, "inactive_account"),
            AuthError::DuplicateIdentity => (StatusCode::BAD_REQUEST, "email_exists"),
            AuthError::PolicyViolation(_) => (StatusCode::BAD_REQUEST, "weak_password"),
            AuthError::InvalidToken | AuthError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "invalid_token")
            }
            AuthError::TokenMismatch => (StatusCode::UNAUTHORIZED, "invalid_refresh_token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
            AuthError::TokenRevoked => (StatusCode::UNAUTHORIZED, "token_revoked"),
            AuthError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AuthError::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            AuthError::PermissionDenied => (StatusCode::FORBIDDEN, "forbidden"),
            AuthError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AuthError::Persistence(_) | AuthError::Config(_) | AuthError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Persistence(_) | AuthError::Config(_) | AuthError::Internal => {
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let body = Json(serde_json::json!({
            "error": error_code,
            "message": self.public_message()
        }));

        match self {
            AuthError::RateLimited { retry_after } => (
                status,
                [(header::RETRY_AFTER, retry_after.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

/// Failures reported by a record store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Record store error: {}", err);
        AuthError::Persistence(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Backend(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AuthError::Internal
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        tracing::debug!("JWT error: {:?}", err);
        match err.kind() {
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_are_unauthorized() {
        for err in [
            AuthError::InvalidToken,
            AuthError::InvalidSignature,
            AuthError::TokenMismatch,
            AuthError::TokenExpired,
            AuthError::TokenRevoked,
            AuthError::InvalidCredentials,
        ] {
            assert_eq!(err.status_and_code().0, StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AuthError::InactiveAccount.status_and_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::DuplicateIdentity.status_and_code().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::RateLimited { retry_after: 3 }.status_and_code().0,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(AuthError::NotFound.status_and_code().0, StatusCode::NOT_FOUND);
        assert_eq!(
            AuthError::PermissionDenied.status_and_code().0,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AuthError::Persistence("connection refused on 10.0.0.3".to_string());
        assert_eq!(err.public_message(), "An internal error occurred");
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_policy_message_names_rule() {
        let err = AuthError::PolicyViolation("Password must contain at least one digit.".into());
        assert_eq!(err.public_message(), "Password must contain at least one digit.");
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AuthError::RateLimited { retry_after: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }
}
