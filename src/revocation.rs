//! Revoked access-token identifiers.
//!
//! Entries live in process memory only, so a restart forgets every
//! revocation. An entry stops mattering once its token's own expiry passes;
//! [`RevocationRegistry::purge_expired`] drops those.

use crate::clock::Clock;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Set of revoked `jti` values with the expiry of the token they belonged to
pub struct RevocationRegistry {
    entries: DashMap<String, DateTime<Utc>>,
    clock: Arc<dyn Clock>,
}

impl RevocationRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Revoke a token id. Revoking an id twice keeps the first entry.
    pub fn revoke(&self, jti: &str, expires_at: DateTime<Utc>) {
        self.entries.entry(jti.to_string()).or_insert(expires_at);
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.entries.contains_key(jti)
    }

    /// Drop entries whose token has expired anyway. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
