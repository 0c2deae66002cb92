//! Authentication Extractors
//!
//! Axum extractors for the bearer identity, plus client attribution.

use crate::error::AuthError;
use crate::handlers::AuthState;
use crate::token::AccessClaims;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use std::net::IpAddr;

/// Pull the bearer token out of the `Authorization` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::InvalidToken)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidToken)
}

/// Authenticated caller: verified claims plus the raw token they came from
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub claims: AccessClaims,
    pub token: String,
}

impl AuthUser {
    pub fn email(&self) -> &str {
        &self.claims.sub
    }

    pub fn is_superuser(&self) -> bool {
        self.claims.is_superuser
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already verified by middleware
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = bearer_token(&parts.headers)?;
        let auth = AuthState::from_ref(state);
        let claims = auth.verify_access(token)?;

        Ok(AuthUser {
            claims,
            token: token.to_string(),
        })
    }
}

/// The client a request is attributed to for throttling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: IpAddr,
}

impl ClientInfo {
    /// Attribute a request to a client.
    ///
    /// Forwarding headers are honoured only when the socket peer is one of
    /// `trusted_proxies`. `X-Forwarded-For` is read right to left and the
    /// first address that is not a trusted proxy wins.
    pub fn resolve(peer: IpAddr, headers: &HeaderMap, trusted_proxies: &[IpAddr]) -> Self {
        if !trusted_proxies.contains(&peer) {
            return ClientInfo { ip: peer };
        }

        let forwarded = headers
            .get("X-Forwarded-For")
            .and_then(|h| h.to_str().ok())
            .and_then(|chain| {
                chain
                    .rsplit(',')
                    .map(|hop| hop.trim().parse::<IpAddr>())
                    .take_while(Result::is_ok)
                    .flatten()
                    .find(|ip| !trusted_proxies.contains(ip))
            });

        let ip = forwarded
            .or_else(|| {
                headers
                    .get("X-Real-IP")
                    .and_then(|h| h.to_str().ok())
                    .and_then(|s| s.trim().parse().ok())
            })
            .unwrap_or(peer);

        ClientInfo { ip }
    }

    /// Key used for per-client throttling
    pub fn client_key(&self) -> String {
        self.ip.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(AuthError::InvalidToken));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), Err(AuthError::InvalidToken));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), Err(AuthError::InvalidToken));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Ok("abc.def"));
    }

    fn ip(raw: &str) -> IpAddr {
        raw.parse().unwrap()
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarding_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", HeaderValue::from_static("203.0.113.5"));
        headers.insert("X-Real-IP", HeaderValue::from_static("192.0.2.9"));

        let client = ClientInfo::resolve(ip("198.51.100.7"), &headers, &[]);
        assert_eq!(client.client_key(), "198.51.100.7");
    }

    #[test]
    fn test_trusted_proxy_forwarding() {
        let proxy = ip("10.0.0.1");
        let mut headers = HeaderMap::new();
        assert_eq!(ClientInfo::resolve(proxy, &headers, &[proxy]).ip, proxy);

        headers.insert("X-Real-IP", HeaderValue::from_static("192.0.2.9"));
        assert_eq!(
            ClientInfo::resolve(proxy, &headers, &[proxy]).ip,
            ip("192.0.2.9")
        );

        // a spoofed leading entry is skipped in favour of what the proxy appended
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("1.2.3.4, 203.0.113.5, 10.0.0.1"),
        );
        assert_eq!(
            ClientInfo::resolve(proxy, &headers, &[proxy]).ip,
            ip("203.0.113.5")
        );
    }
}
