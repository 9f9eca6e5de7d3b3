/*!
 * Escalating Backoff
 *
 * Bounded spin phase that precedes parking in a drain wait:
 *
 * 1. **Tight spin** (first `SPIN_PHASE_ITERATIONS`): `spin_loop()` hint
 * 2. **Yield** (until `max_spins` or `spin_duration`): `yield_now()`
 *
 * Once exhausted the caller parks on a condvar instead of sleeping in a
 * loop, so an idle drain costs no CPU.
 */

use crate::core::limits::SPIN_PHASE_ITERATIONS;
use std::thread;
use std::time::{Duration, Instant};

/// One-shot escalating backoff
pub struct Backoff {
    started: Instant,
    spin_duration: Duration,
    max_spins: u32,
    spins: u32,
}

impl Backoff {
    pub fn new(spin_duration: Duration, max_spins: u32) -> Self {
        Self {
            started: Instant::now(),
            spin_duration,
            max_spins,
            spins: 0,
        }
    }

    /// Spin until `ready` holds or the spin budget is spent
    ///
    /// Returns `true` if `ready` held.
    pub fn spin_until(&mut self, ready: impl Fn() -> bool) -> bool {
        loop {
            if ready() {
                return true;
            }
            if !self.snooze() {
                return ready();
            }
        }
    }

    /// Back off once; `false` when the budget is spent
    pub fn snooze(&mut self) -> bool {
        if self.is_exhausted() {
            return false;
        }
        if self.spins < SPIN_PHASE_ITERATIONS {
            std::hint::spin_loop();
        } else {
            thread::yield_now();
        }
        self.spins += 1;
        true
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.spins >= self.max_spins || self.started.elapsed() >= self.spin_duration
    }

    #[inline]
    pub fn spins(&self) -> u32 {
        self.spins
    }
}
