/*!
 * Lifecycle Configuration
 *
 * Top-level configuration of a [`Runtime`](crate::Runtime), with
 * environment overrides for the values marked [ENV] in `core::limits`.
 */

use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::limits::DEFAULT_CACHE_CAPACITY;
use crate::core::sync::DrainConfig;
use crate::pool::PoolConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    pub pool: PoolConfig,
    pub drain: DrainConfig,
    /// Initial capacity of cache tables built through the runtime
    pub cache_initial_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            drain: DrainConfig::default(),
            cache_initial_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl LifecycleConfig {
    /// Defaults overridden by environment variables
    ///
    /// - LIFECYCLE_DRAIN_TIMEOUT_MS: drain bound in milliseconds
    /// - LIFECYCLE_DRAIN_MAX_SPINS: spin iterations before parking
    /// - LIFECYCLE_MAX_ARENAS: live arena limit
    pub fn from_env() -> LifecycleResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LifecycleResult<Self> {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64>(&lookup, "LIFECYCLE_DRAIN_TIMEOUT_MS")? {
            config.drain.timeout = Duration::from_millis(ms);
        }
        if let Some(spins) = parse_var::<u32>(&lookup, "LIFECYCLE_DRAIN_MAX_SPINS")? {
            config.drain.max_spins = spins;
        }
        if let Some(max) = parse_var::<usize>(&lookup, "LIFECYCLE_MAX_ARENAS")? {
            config.pool.max_arenas = max;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_drain(mut self, drain: DrainConfig) -> Self {
        self.drain = drain;
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn validate(&self) -> LifecycleResult<()> {
        self.pool.validate()?;
        self.drain.validate()?;
        if self.cache_initial_capacity == 0 {
            return Err(LifecycleError::Configuration(
                "cache_initial_capacity is zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> LifecycleResult<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| LifecycleError::Configuration(format!("{key}={raw:?} is not a number").into())),
    }
}
