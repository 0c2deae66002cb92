//! Storefront Authentication
//!
//! Authentication core for the storefront backend providing:
//! - Identity registration and login
//! - Signed JWT access tokens with per-token revocation
//! - Single-use refresh token rotation
//! - Argon2id password hashing and a strength policy
//! - Password reset flow
//! - Sliding-window login throttling
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_SECRET` - Secret key for signing JWTs (required, min 32 chars)
//! - `JWT_ACCESS_EXPIRATION` - Access token expiration in seconds (default: 1800)
//! - `JWT_ISSUER` - JWT issuer claim (default: "storefront")
//! - `JWT_AUDIENCE` - JWT audience claim (default: "storefront-api")
//! - `PASSWORD_RESET_EXPIRATION` - Reset token lifetime in seconds (default: 3600)
//! - `LOGIN_RATE_LIMIT` / `LOGIN_RATE_WINDOW` - Login attempts per window (default: 5 per 60s)
//! - `TRUSTED_PROXIES` - Proxies whose `X-Forwarded-For` is honoured (default: none)
//!
//! See [`AuthConfig`] for the full list.
//!
//! # Usage
//!
//! ```rust,ignore
//! use storefront_auth::{AuthConfig, AuthService, LogNotifier, MemoryStore};
//! use std::sync::Arc;
//!
//! let config = AuthConfig::from_env()?;
//! let auth = Arc::new(AuthService::new(
//!     config,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(LogNotifier),
//! )?);
//!
//! storefront_auth::sweeper::spawn(auth.clone());
//! let app = storefront_auth::create_routes(auth);
//! // login throttling keys on the peer address
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notifier;
pub mod password;
pub mod rate_limit;
pub mod reset_token;
pub mod revocation;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod token;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AuthConfig;
pub use error::{AuthError, StoreError};
pub use extractors::{AuthUser, ClientInfo};
pub use handlers::AuthState;
pub use models::*;
pub use notifier::{LogNotifier, Notifier, NotifyError};
pub use password::{PasswordHasher, PasswordPolicy, PolicyError, PolicyRule};
pub use rate_limit::RateLimiter;
pub use reset_token::ResetTokenStore;
pub use revocation::RevocationRegistry;
pub use service::{AuthService, SweepReport};
pub use store::{MemoryStore, PgStore, RecordStore};
pub use token::{AccessClaims, TokenCodec, TokenPair, TokenSubject};

use axum::Router;
use std::sync::Arc;

/// Create authentication routes
pub fn create_routes(auth_service: Arc<AuthService>) -> Router {
    handlers::create_routes(auth_service)
}
