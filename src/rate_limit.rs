//! Sliding-window request throttle, keyed by client.
//!
//! Each key keeps the instants of its accepted requests inside the trailing
//! window. Keys are never evicted on their own; [`RateLimiter::purge_idle`]
//! drops keys with no request inside the window.

use crate::clock::Clock;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of requests allowed per window
pub const DEFAULT_LIMIT: usize = 5;

/// Default window length
pub const DEFAULT_WINDOW_SECS: i64 = 60;

pub struct RateLimiter {
    windows: DashMap<String, VecDeque<DateTime<Utc>>>,
    limit: usize,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// A `limit` of zero rejects every request.
    pub fn new(limit: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
            clock,
        }
    }

    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(DEFAULT_LIMIT, Duration::seconds(DEFAULT_WINDOW_SECS), clock)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Record a request for `client_key` if it fits in the window.
    ///
    /// Returns `false` without recording anything when the key is at its limit.
    pub fn allow(&self, client_key: &str) -> bool {
        if self.limit == 0 {
            return false;
        }

        let now = self.clock.now();
        let cutoff = now - self.window;

        let mut entry = self.windows.entry(client_key.to_string()).or_default();
        while entry.front().is_some_and(|t| *t <= cutoff) {
            entry.pop_front();
        }

        if entry.len() < self.limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }

    /// Requests still available to `client_key` in the current window
    pub fn remaining(&self, client_key: &str) -> usize {
        let cutoff = self.clock.now() - self.window;
        let used = self
            .windows
            .get(client_key)
            .map(|w| w.iter().filter(|t| **t > cutoff).count())
            .unwrap_or(0);
        self.limit.saturating_sub(used)
    }

    /// Whole seconds until `client_key` may make another request
    pub fn retry_after(&self, client_key: &str) -> u64 {
        if self.limit == 0 {
            return self.window.num_seconds().max(0) as u64;
        }

        let now = self.clock.now();
        let cutoff = now - self.window;

        let Some(window) = self.windows.get(client_key) else {
            return 0;
        };
        let live: Vec<_> = window.iter().filter(|t| **t > cutoff).collect();
        if live.len() < self.limit {
            return 0;
        }

        // The slot frees up when the oldest counted request leaves the window.
        let frees_at = *live[live.len() - self.limit] + self.window;
        let millis = (frees_at - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000)
    }

    /// Forget keys with no request inside the window. Returns how many were removed.
    pub fn purge_idle(&self) -> usize {
        let cutoff = self.clock.now() - self.window;
        let before = self.windows.len();
        self.windows
            .retain(|_, window| window.back().is_some_and(|t| *t > cutoff));
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
