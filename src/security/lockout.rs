//! Temporary lockout after repeated bad credentials.
//!
//! Failures are timestamps retained for a trailing horizon. A client is locked
//! while the retained count reaches the threshold; there is no unlock action,
//! old failures simply age out.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::clock::Clock;
use crate::config::LockoutConfig;

/// Lockout state of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    Clean,
    /// Some failures retained, below the threshold.
    Warning(usize),
    Locked,
}

/// Per-client failure tracker.
pub struct LockoutTracker {
    failures: DashMap<String, VecDeque<Instant>>,
    max_failures: usize,
    horizon: Duration,
    clock: Arc<dyn Clock>,
}

fn prune(failures: &mut VecDeque<Instant>, now: Instant, horizon: Duration) {
    while let Some(oldest) = failures.front() {
        if now.saturating_duration_since(*oldest) >= horizon {
            failures.pop_front();
        } else {
            break;
        }
    }
}

impl LockoutTracker {
    pub fn new(config: &LockoutConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            failures: DashMap::new(),
            max_failures: config.max_failures,
            horizon: config.horizon(),
            clock,
        }
    }

    /// Record a failed credential check and return the retained failure count.
    pub fn record_failure(&self, client_key: &str) -> usize {
        let now = self.clock.now();
        let mut entry = self.failures.entry(client_key.to_owned()).or_default();
        prune(&mut entry, now, self.horizon);
        entry.push_back(now);
        entry.len()
    }

    /// Whether the client currently holds at least `max_failures` retained failures.
    pub fn is_locked(&self, client_key: &str) -> bool {
        self.locked_for(client_key).is_some()
    }

    /// Remaining lock time, or `None` when the client is not locked.
    ///
    /// The lock lifts once enough failures age out to drop the count below the
    /// threshold.
    pub fn locked_for(&self, client_key: &str) -> Option<Duration> {
        let now = self.clock.now();
        let retained = self.retained(client_key, now)?;
        if retained.len() < self.max_failures {
            return None;
        }
        let Some(releasing) = retained.get(retained.len() - self.max_failures) else {
            return Some(self.horizon);
        };
        let elapsed = now.saturating_duration_since(*releasing);
        Some(self.horizon.saturating_sub(elapsed))
    }

    pub fn state(&self, client_key: &str) -> LockoutState {
        let now = self.clock.now();
        match self.retained(client_key, now).map(|f| f.len()) {
            None | Some(0) => LockoutState::Clean,
            Some(n) if n >= self.max_failures => LockoutState::Locked,
            Some(n) => LockoutState::Warning(n),
        }
    }

    /// Prune the client's record and return a copy; empty records are removed.
    fn retained(&self, client_key: &str, now: Instant) -> Option<VecDeque<Instant>> {
        let snapshot = {
            let mut entry = self.failures.get_mut(client_key)?;
            prune(&mut entry, now, self.horizon);
            entry.value().clone()
        };
        if snapshot.is_empty() {
            self.failures.remove_if(client_key, |_, f| f.is_empty());
        }
        Some(snapshot)
    }

    /// Prune every record and drop the ones left empty. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.failures.len();
        self.failures.retain(|_, failures| {
            prune(failures, now, self.horizon);
            !failures.is_empty()
        });
        before.saturating_sub(self.failures.len())
    }

    /// Number of clients with a failure record.
    pub fn tracked_clients(&self) -> usize {
        self.failures.len()
    }
}
