//! Per-client fixed-window rate limiting.
//!
//! Each client key owns one [`WindowCounter`]. The window is fixed, not
//! sliding: a client can spend a full budget at the end of one window and
//! another at the start of the next.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::clock::Clock;
use crate::config::RateLimitConfig;

/// Request count for one client within the current window.
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    window_start: Instant,
    count: u32,
}

impl WindowCounter {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub permitted: bool,
    /// Time until the current window rolls over. Zero when permitted.
    pub retry_after: Duration,
}

/// Fixed-window limiter keyed by client.
pub struct RateLimiter {
    windows: DashMap<String, WindowCounter>,
    window: Duration,
    capacity: u32,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            window: config.window(),
            capacity: config.max_requests,
            clock,
        }
    }

    /// Count one request for `client_key` and decide whether it may proceed.
    ///
    /// The read-modify-write happens under the entry's shard lock, so
    /// concurrent requests from one client are never lost.
    pub fn allow(&self, client_key: &str) -> RateDecision {
        let now = self.clock.now();

        let mut counter = match self.windows.get_mut(client_key) {
            Some(entry) => entry,
            None => self
                .windows
                .entry(client_key.to_owned())
                .or_insert_with(|| WindowCounter::new(now)),
        };

        if counter.expired(now, self.window) {
            *counter = WindowCounter::new(now);
        }
        counter.count = counter.count.saturating_add(1);

        if counter.count > self.capacity {
            let elapsed = now.saturating_duration_since(counter.window_start);
            RateDecision {
                permitted: false,
                retry_after: self.window.saturating_sub(elapsed),
            }
        } else {
            RateDecision {
                permitted: true,
                retry_after: Duration::ZERO,
            }
        }
    }

    /// Drop counters whose window has expired. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.windows.len();
        self.windows
            .retain(|_, counter| !counter.expired(now, self.window));
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients currently holding a counter.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}
