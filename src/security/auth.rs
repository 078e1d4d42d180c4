//! Constant-time API key verification.
//!
//! Both the configured secret and the presented value are reduced to fixed
//! 32-byte BLAKE3 digests, then compared with an XOR-accumulate over every
//! byte. Running time depends on neither the presented length nor the
//! position of the first differing byte.

use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};

type Digest = [u8; blake3::OUT_LEN];

/// Verifies a presented credential against the single configured API key.
pub struct TimingSafeAuthenticator {
    expected: Digest,
    verifications: AtomicU64,
}

impl TimingSafeAuthenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            expected: digest(secret.as_bytes()),
            verifications: AtomicU64::new(0),
        }
    }

    /// Compare `presented` against the secret. Empty or missing credentials fail.
    ///
    /// The digest and comparison run even for an empty credential so the
    /// missing-header path costs the same as a wrong key.
    pub fn verify(&self, presented: Option<&str>) -> bool {
        self.verifications.fetch_add(1, Ordering::Relaxed);

        let presented = presented.unwrap_or_default();
        let candidate = digest(presented.as_bytes());
        let matches = constant_time_eq(&candidate, &self.expected);

        matches & !presented.is_empty()
    }

    /// How many comparisons have been performed since startup.
    pub fn verifications(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for TimingSafeAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimingSafeAuthenticator")
            .field("expected", &"<redacted>")
            .finish()
    }
}

fn digest(bytes: &[u8]) -> Digest {
    *blake3::hash(bytes).as_bytes()
}

/// Fixed iteration count, no early exit: every byte pair is XORed into the accumulator.
#[inline(never)]
fn constant_time_eq(a: &Digest, b: &Digest) -> bool {
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= black_box(x ^ y);
    }
    black_box(acc) == 0
}
