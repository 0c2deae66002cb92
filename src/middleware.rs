//! Authentication Middleware
//!
//! Bearer verification, the superuser guard and login throttling.

use crate::error::AuthError;
use crate::extractors::{bearer_token, AuthUser, ClientInfo};
use crate::handlers::AuthState;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

fn authenticate(auth: &AuthState, req: &Request) -> Result<AuthUser, AuthError> {
    let token = bearer_token(req.headers())?;
    let claims = auth.verify_access(token)?;
    Ok(AuthUser {
        claims,
        token: token.to_string(),
    })
}

/// Require authenticated user
///
/// Validates the bearer token and stores the caller in request extensions
/// for the `AuthUser` extractor.
pub async fn require_auth(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&auth, &req)?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Require superuser
pub async fn require_admin(
    State(auth): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = authenticate(&auth, &req)?;
    if !user.is_superuser() {
        return Err(AuthError::PermissionDenied);
    }
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Throttle login attempts per client before they reach the handler.
///
/// The client is the socket peer, or the forwarded address when the peer is
/// a configured trusted proxy. Requires serving with connect info.
pub async fn rate_limit_login(
    State(auth): State<AuthState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let client = ClientInfo::resolve(peer.ip(), req.headers(), &auth.config().trusted_proxies);
    let key = client.client_key();
    auth.check_login_rate(&key)?;
    let remaining = auth.login_limiter().remaining(&key);

    let mut response = next.run(req).await;

    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", auth.login_limiter().limit().into());
    headers.insert("X-RateLimit-Remaining", remaining.into());

    Ok(response)
}
