use crate::primitives::{AvssError, AvssResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_wait_timeout_ms() -> u64 {
    30_000
}

/// Parameters of a DKG run. `n` shareholders, reconstruction threshold `k`
/// and at most `f` faulty shareholders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub n: usize,
    pub k: usize,
    pub f: usize,
    /// How long a worker blocks on the broadcast channel before checking
    /// whether it was stopped
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Default bound for `wait_for_qual` and `wait_for_public_key`
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

impl Config {
    pub fn new(n: usize, k: usize, f: usize) -> Self {
        Self {
            n,
            k,
            f,
            poll_interval_ms: default_poll_interval_ms(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }

    /// Checks `n >= 1`, `k >= 1` and `f < k <= n - 2f`
    pub fn validate(&self) -> AvssResult<()> {
        let Self { n, k, f, .. } = *self;
        let invalid = AvssError::InvalidParameters { n, k, f };

        if n == 0 || k == 0 || f >= k {
            return Err(invalid);
        }
        match n.checked_sub(2 * f) {
            Some(max_k) if k <= max_k => Ok(()),
            _ => Err(invalid),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }
}
