//! Token Codec
//!
//! Signed JWT access tokens and opaque refresh tokens.
//!
//! Access-token expiry is checked against the injected [`Clock`] rather than
//! `jsonwebtoken`'s wall-clock validation. The registered `exp` claim is whole
//! seconds, rounded up; `exp_ms` carries the exact instant and is the one
//! enforced. A token is expired once the clock is past `exp_ms`.

use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::revocation::RevocationRegistry;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Number of random bytes in a refresh token
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Identity facts carried inside an access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub subject: String,
    pub roles: Vec<String>,
    pub is_superuser: bool,
}

/// JWT claims for access tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (identity email)
    pub sub: String,
    pub roles: Vec<String>,
    pub is_superuser: bool,
    /// JWT ID (unique per issued token)
    pub jti: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp (seconds, rounded up)
    pub exp: i64,
    /// Expiration instant in milliseconds
    pub exp_ms: i64,
    pub iss: String,
    pub aud: String,
}

impl AccessClaims {
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            subject: self.sub.clone(),
            roles: self.roles.clone(),
            is_superuser: self.is_superuser,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.exp_ms)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// A freshly minted access/refresh pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

/// Signs and verifies bearer tokens
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    clock: Arc<dyn Clock>,
    revocations: Arc<RevocationRegistry>,
}

impl TokenCodec {
    pub fn new(
        config: &AuthConfig,
        clock: Arc<dyn Clock>,
        revocations: Arc<RevocationRegistry>,
    ) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_audience(&[&config.jwt_audience]);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key,
            decoding_key,
            validation,
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            access_ttl: Duration::seconds(config.access_token_expiration),
            clock,
            revocations,
        }
    }

    /// Default access-token lifetime
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Sign a new access token with a fresh `jti`
    pub fn issue_access(&self, subject: &TokenSubject, ttl: Duration) -> Result<String, AuthError> {
        let now = self.clock.now();
        let exp_ms = (now + ttl).timestamp_millis();

        let claims = AccessClaims {
            sub: subject.subject.clone(),
            roles: subject.roles.clone(),
            is_superuser: subject.is_superuser,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp_ms.div_euclid(1000) + i64::from(exp_ms.rem_euclid(1000) != 0),
            exp_ms,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Generate an opaque refresh token
    pub fn issue_refresh(&self) -> String {
        let token_bytes: [u8; REFRESH_TOKEN_BYTES] = rand::thread_rng().gen();
        URL_SAFE_NO_PAD.encode(token_bytes)
    }

    /// Mint an access token and an unrelated refresh token together
    pub fn issue_pair(&self, subject: &TokenSubject, ttl: Duration) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue_access(subject, ttl)?,
            refresh_token: self.issue_refresh(),
            expires_in: ttl.num_seconds(),
        })
    }

    /// Structural check only: signature, issuer, audience and expiry.
    pub fn decode(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let claims = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)?.claims;

        if self.clock.now().timestamp_millis() > claims.exp_ms {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }

    /// Full check: structure first, then the revocation registry
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let claims = self.decode(token)?;

        if self.revocations.is_revoked(&claims.jti) {
            tracing::debug!(jti = %claims.jti, "Rejected revoked access token");
            return Err(AuthError::TokenRevoked);
        }

        Ok(claims)
    }
}
