/*!
 * Lifecycle Counters
 * Lock-free counters for arena and object transitions
 */

use crate::pool::CleanupMode;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Live counters shared by a pool tree and its runtime
#[derive(Debug, Default)]
pub struct LifecycleStats {
    arenas_created: AtomicU64,
    arenas_destroyed: AtomicU64,
    arenas_cleared: AtomicU64,
    objects_allocated: AtomicU64,
    objects_released: AtomicU64,
    finalized_explicit: AtomicU64,
    finalized_cascade: AtomicU64,
    objects_recycled: AtomicU64,
    drain_waits: AtomicU64,
    drain_parks: AtomicU64,
    drain_wait_micros: AtomicU64,
    drain_timeouts: AtomicU64,
    deferred_finalizations: AtomicU64,
}

impl LifecycleStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_arena_created(&self) {
        self.arenas_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_arena_destroyed(&self) {
        self.arenas_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_arena_cleared(&self) {
        self.arenas_cleared.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_object_allocated(&self) {
        self.objects_allocated.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_object_released(&self) {
        self.objects_released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleanup(&self, mode: CleanupMode) {
        let counter = match mode {
            CleanupMode::Explicit => &self.finalized_explicit,
            CleanupMode::CascadedFromAncestor => &self.finalized_cascade,
            CleanupMode::Recycle => &self.objects_recycled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drain(&self, waited: Duration, parked: bool) {
        self.drain_waits.fetch_add(1, Ordering::Relaxed);
        if parked {
            self.drain_parks.fetch_add(1, Ordering::Relaxed);
        }
        self.drain_wait_micros
            .fetch_add(waited.as_micros() as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_drain_timeout(&self) {
        self.drain_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_deferred(&self) {
        self.deferred_finalizations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        let arenas_created = load(&self.arenas_created);
        let arenas_destroyed = load(&self.arenas_destroyed);
        let objects_allocated = load(&self.objects_allocated);
        let objects_released = load(&self.objects_released);
        StatsSnapshot {
            arenas_created,
            arenas_destroyed,
            arenas_live: arenas_created.saturating_sub(arenas_destroyed),
            arenas_cleared: load(&self.arenas_cleared),
            objects_allocated,
            objects_live: objects_allocated.saturating_sub(objects_released),
            finalized_explicit: load(&self.finalized_explicit),
            finalized_cascade: load(&self.finalized_cascade),
            objects_recycled: load(&self.objects_recycled),
            drain_waits: load(&self.drain_waits),
            drain_parks: load(&self.drain_parks),
            drain_wait_micros: load(&self.drain_wait_micros),
            drain_timeouts: load(&self.drain_timeouts),
            deferred_finalizations: load(&self.deferred_finalizations),
        }
    }
}

/// Point-in-time copy of [`LifecycleStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub arenas_created: u64,
    pub arenas_destroyed: u64,
    pub arenas_live: u64,
    pub arenas_cleared: u64,
    pub objects_allocated: u64,
    pub objects_live: u64,
    pub finalized_explicit: u64,
    pub finalized_cascade: u64,
    pub objects_recycled: u64,
    pub drain_waits: u64,
    pub drain_parks: u64,
    pub drain_wait_micros: u64,
    pub drain_timeouts: u64,
    pub deferred_finalizations: u64,
}

impl StatsSnapshot {
    /// Mean drain wait in microseconds
    pub fn mean_drain_micros(&self) -> f64 {
        if self.drain_waits == 0 {
            return 0.0;
        }
        self.drain_wait_micros as f64 / self.drain_waits as f64
    }

    pub fn finalized_total(&self) -> u64 {
        self.finalized_explicit + self.finalized_cascade
    }
}
