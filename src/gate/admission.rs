//! Per-request admission decision.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::GateConfig;
use crate::gate::outcome::Rejection;
use crate::observability::metrics;
use crate::security::{LockoutTracker, RateLimiter, TimingSafeAuthenticator};

/// Proof that a request passed rate limiting, lockout, and authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub client_key: String,
}

/// Orchestrates the cheap checks before the credential comparison.
///
/// Order is fixed: rate limit, then lockout, then the constant-time compare.
/// Each tracker call is a single atomic step on its own map; there is no
/// cross-component transaction to leave half-applied.
pub struct AdmissionGate {
    limiter: RateLimiter,
    lockout: LockoutTracker,
    authenticator: TimingSafeAuthenticator,
}

impl AdmissionGate {
    pub fn new(config: &GateConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &GateConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            limiter: RateLimiter::new(&config.rate_limit, clock.clone()),
            lockout: LockoutTracker::new(&config.lockout, clock),
            authenticator: TimingSafeAuthenticator::new(&config.auth.api_key),
        }
    }

    /// Decide whether `client_key` presenting `credential` may proceed.
    pub fn authorize(
        &self,
        client_key: &str,
        credential: Option<&str>,
    ) -> Result<Admission, Rejection> {
        let decision = self.limiter.allow(client_key);
        if !decision.permitted {
            tracing::warn!(client = %client_key, outcome = "rate_limited", "Admission rejected");
            metrics::record_admission("rate_limited");
            return Err(Rejection::RateLimited {
                retry_after: decision.retry_after,
            });
        }

        if let Some(retry_after) = self.lockout.locked_for(client_key) {
            tracing::warn!(client = %client_key, outcome = "locked", "Admission rejected");
            metrics::record_admission("locked");
            return Err(Rejection::Locked { retry_after });
        }

        if !self.authenticator.verify(credential) {
            let failures = self.lockout.record_failure(client_key);
            tracing::warn!(
                client = %client_key,
                outcome = "unauthorized",
                credential_present = credential.is_some_and(|c| !c.is_empty()),
                failures,
                "Admission rejected"
            );
            metrics::record_admission("unauthorized");
            return Err(Rejection::Unauthorized);
        }

        tracing::debug!(client = %client_key, outcome = "admitted", "Admission granted");
        metrics::record_admission("admitted");
        Ok(Admission {
            client_key: client_key.to_owned(),
        })
    }

    /// Evict stale tracker entries and publish the tracked-client gauges.
    pub fn sweep(&self) -> usize {
        let evicted = self.limiter.sweep() + self.lockout.sweep();
        metrics::record_tracked_clients("rate_limit", self.limiter.tracked_clients());
        metrics::record_tracked_clients("lockout", self.lockout.tracked_clients());
        evicted
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn lockout(&self) -> &LockoutTracker {
        &self.lockout
    }

    pub fn authenticator(&self) -> &TimingSafeAuthenticator {
        &self.authenticator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::security::LockoutState;
    use std::time::Duration;

    const KEY: &str = "the-real-key";

    fn gate() -> (AdmissionGate, Arc<ManualClock>) {
        let mut config = GateConfig::default();
        config.auth.api_key = KEY.into();
        let clock = Arc::new(ManualClock::new());
        (AdmissionGate::with_clock(&config, clock.clone()), clock)
    }

    #[test]
    fn test_admits_correct_key() {
        let (gate, _) = gate();
        let admission = gate.authorize("1.2.3.4", Some(KEY)).unwrap();
        assert_eq!(admission.client_key, "1.2.3.4");
    }

    #[test]
    fn test_missing_and_wrong_keys_are_failures() {
        let (gate, _) = gate();
        assert_eq!(gate.authorize("ip", None), Err(Rejection::Unauthorized));
        assert_eq!(gate.authorize("ip", Some("nope")), Err(Rejection::Unauthorized));
        assert_eq!(gate.lockout().state("ip"), LockoutState::Warning(2));
    }

    #[test]
    fn test_lockout_precedes_comparison() {
        let (gate, _) = gate();
        for _ in 0..10 {
            assert_eq!(gate.authorize("ip", Some("wrong")), Err(Rejection::Unauthorized));
        }
        let compared = gate.authenticator().verifications();
        assert_eq!(compared, 10);

        let eleventh = gate.authorize("ip", Some(KEY));
        assert!(matches!(eleventh, Err(Rejection::Locked { .. })));
        assert_eq!(gate.authenticator().verifications(), compared);
    }

    #[test]
    fn test_success_does_not_clear_failures() {
        let (gate, _) = gate();
        for _ in 0..9 {
            let _ = gate.authorize("ip", Some("wrong"));
        }
        assert!(gate.authorize("ip", Some(KEY)).is_ok());
        assert_eq!(gate.lockout().state("ip"), LockoutState::Warning(9));

        let _ = gate.authorize("ip", Some("wrong"));
        assert!(matches!(gate.authorize("ip", Some(KEY)), Err(Rejection::Locked { .. })));
    }

    #[test]
    fn test_lock_expires_after_horizon() {
        let (gate, clock) = gate();
        for _ in 0..10 {
            let _ = gate.authorize("ip", Some("wrong"));
        }
        match gate.authorize("ip", Some(KEY)) {
            Err(Rejection::Locked { retry_after }) => assert_eq!(retry_after, Duration::from_secs(300)),
            other => panic!("expected lock, got {other:?}"),
        }

        clock.advance(Duration::from_secs(300));
        assert!(gate.authorize("ip", Some(KEY)).is_ok());
    }

    #[test]
    fn test_rate_limit_checked_first_and_spares_failure_budget() {
        let (gate, _) = gate();
        for _ in 0..100 {
            assert!(gate.authorize("ip", Some(KEY)).is_ok());
        }
        let compared = gate.authenticator().verifications();

        match gate.authorize("ip", Some("wrong")) {
            Err(Rejection::RateLimited { retry_after }) => {
                assert!(retry_after > Duration::ZERO && retry_after <= Duration::from_secs(60));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
        assert_eq!(gate.authenticator().verifications(), compared);
        assert_eq!(gate.lockout().state("ip"), LockoutState::Clean);
    }

    #[test]
    fn test_failed_attempts_consume_rate_budget() {
        let (gate, _) = gate();
        for _ in 0..9 {
            let _ = gate.authorize("ip", Some("wrong"));
        }
        for _ in 0..91 {
            assert!(gate.authorize("ip", Some(KEY)).is_ok());
        }
        assert!(matches!(
            gate.authorize("ip", Some(KEY)),
            Err(Rejection::RateLimited { .. })
        ));
    }

    #[test]
    fn test_sweep_evicts_idle_clients() {
        let (gate, clock) = gate();
        let _ = gate.authorize("idle", Some("wrong"));
        assert_eq!(gate.rate_limiter().tracked_clients(), 1);
        assert_eq!(gate.lockout().tracked_clients(), 1);

        clock.advance(Duration::from_secs(300));
        assert_eq!(gate.sweep(), 2);
        assert_eq!(gate.rate_limiter().tracked_clients(), 0);
        assert_eq!(gate.lockout().tracked_clients(), 0);
    }
}
