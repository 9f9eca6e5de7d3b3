/*!
 * Drain Configuration
 *
 * Runtime configuration for the refcount drain wait
 */

use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::limits::{DEFAULT_DRAIN_MAX_SPINS, DEFAULT_DRAIN_SPIN, DEFAULT_DRAIN_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds of one refcount drain
///
/// The drain spins for at most `spin_duration` / `max_spins`, then parks on
/// a condvar until the last in-flight call leaves or `timeout` elapses.
/// Past `timeout` the drain fails; it never proceeds with calls in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainConfig {
    /// Spin duration before parking
    pub spin_duration: Duration,
    /// Maximum spin iterations before parking
    pub max_spins: u32,
    /// Total bound on the drain, spin phase included
    pub timeout: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            spin_duration: DEFAULT_DRAIN_SPIN,
            max_spins: DEFAULT_DRAIN_MAX_SPINS,
            timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl DrainConfig {
    /// Native calls expected to return within microseconds
    pub const fn low_latency() -> Self {
        Self {
            spin_duration: Duration::from_micros(50),
            max_spins: 500,
            timeout: Duration::from_secs(1),
        }
    }

    /// Native calls that block on I/O (directory walks, service queries)
    pub const fn long_wait() -> Self {
        Self {
            spin_duration: Duration::from_micros(1),
            max_spins: 10,
            timeout: Duration::from_secs(30),
        }
    }

    /// Same spin bounds with a different cap
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn validate(&self) -> LifecycleResult<()> {
        if self.timeout.is_zero() {
            return Err(LifecycleError::Configuration("drain timeout is zero".into()));
        }
        if self.spin_duration > self.timeout {
            return Err(LifecycleError::Configuration(
                "drain spin duration exceeds timeout".into(),
            ));
        }
        Ok(())
    }
}
