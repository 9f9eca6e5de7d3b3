/*!
 * Drain Gate
 *
 * Reference count and interruption flag of a native object packed into one
 * atomic word, so "check not interrupted, then count me in" is a single
 * compare-and-swap. A call can never slip in after the draining thread has
 * observed the interruption.
 *
 * # Word layout
 *
 * ```text
 *  31          30     29        28       27 ............ 0
 * INTERRUPTED CLOSED DEFERRED UNBOUND   in-flight count
 * ```
 *
 * The drain escalates from a bounded spin to a `parking_lot::Condvar` wait.
 * The leave that drops the count to zero on an interrupted gate takes the
 * gate mutex before notifying, so the wake-up cannot be lost between the
 * drainer's check and its park.
 */

use super::config::DrainConfig;
use super::spinwait::Backoff;
use crate::core::errors::LifecycleError;
use crate::core::limits::MAX_IN_FLIGHT;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

const COUNT_MASK: u32 = MAX_IN_FLIGHT;
const UNBOUND: u32 = 1 << 28;
const DEFERRED: u32 = 1 << 29;
const CLOSED: u32 = 1 << 30;
const INTERRUPTED: u32 = 1 << 31;

/// Why `try_enter` refused a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// The object has not been bound to an arena yet
    Unbound,
    /// Disposal (or a recycle) has begun
    Interrupted,
    /// The object is finalized
    Closed,
    /// The in-flight counter is full
    Saturated,
}

/// What a `leave` observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Other calls are still in flight, or nobody is draining
    InFlight,
    /// Last call out of an interrupted gate; the drainer was woken
    Drained,
    /// Last call out of a gate whose finalization was handed to this leave
    Deferred,
}

/// Successful drain
#[derive(Debug, Clone, Copy)]
pub struct DrainReport {
    pub waited: Duration,
    pub parked: bool,
}

/// Drain that hit its bound with calls still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainTimeout {
    pub waited: Duration,
    pub in_flight: u32,
}

impl From<DrainTimeout> for LifecycleError {
    fn from(timeout: DrainTimeout) -> Self {
        LifecycleError::Timeout {
            waited_ms: timeout.waited.as_millis() as u64,
            in_flight: timeout.in_flight,
        }
    }
}

pub struct DrainGate {
    state: AtomicU32,
    lock: Mutex<()>,
    drained: Condvar,
}

impl DrainGate {
    /// New gate, refusing calls until [`bind`](Self::bind)
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(UNBOUND),
            lock: Mutex::new(()),
            drained: Condvar::new(),
        }
    }

    /// Open the gate for calls
    pub fn bind(&self) {
        self.state.fetch_and(!UNBOUND, Ordering::Release);
    }

    /// Atomically check the flags and count one call in
    #[inline]
    pub fn try_enter(&self) -> Result<(), Refusal> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & CLOSED != 0 {
                return Err(Refusal::Closed);
            }
            if current & UNBOUND != 0 {
                return Err(Refusal::Unbound);
            }
            if current & INTERRUPTED != 0 {
                return Err(Refusal::Interrupted);
            }
            if current & COUNT_MASK == COUNT_MASK {
                return Err(Refusal::Saturated);
            }
            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::Acquire,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Count one call out
    ///
    /// Must pair with a successful [`try_enter`](Self::try_enter).
    #[inline]
    pub fn leave(&self) -> LeaveOutcome {
        let previous = self.state.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous & COUNT_MASK > 0, "leave without enter");

        if previous & COUNT_MASK != 1 {
            return LeaveOutcome::InFlight;
        }
        if previous & DEFERRED != 0 {
            return LeaveOutcome::Deferred;
        }
        if previous & INTERRUPTED != 0 {
            let _held = self.lock.lock();
            self.drained.notify_all();
            return LeaveOutcome::Drained;
        }
        LeaveOutcome::InFlight
    }

    /// Refuse further calls; returns `true` if this call set the flag
    pub fn interrupt(&self) -> bool {
        self.state.fetch_or(INTERRUPTED, Ordering::AcqRel) & INTERRUPTED == 0
    }

    /// Accept calls again after a recycle
    pub fn resume(&self) {
        self.state.fetch_and(!INTERRUPTED, Ordering::AcqRel);
    }

    /// Claim finalization; returns `true` for exactly one caller
    pub fn close(&self) -> bool {
        self.state.fetch_or(CLOSED, Ordering::AcqRel) & CLOSED == 0
    }

    /// Hand finalization to whichever call leaves last
    ///
    /// Returns `false` if nothing is in flight any more; the caller then
    /// finalizes itself.
    pub fn defer(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & COUNT_MASK == 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                current | DEFERRED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Wait for every in-flight call to leave
    ///
    /// The gate must already be interrupted, otherwise new calls may keep
    /// arriving and the wait only ends at the bound.
    pub fn drain(&self, config: &DrainConfig) -> Result<DrainReport, DrainTimeout> {
        let started = Instant::now();
        let mut backoff = Backoff::new(config.spin_duration, config.max_spins);
        if backoff.spin_until(|| self.in_flight() == 0) {
            return Ok(DrainReport {
                waited: started.elapsed(),
                parked: false,
            });
        }

        let deadline = started + config.timeout;
        let mut held = self.lock.lock();
        while self.in_flight() != 0 {
            if self.drained.wait_until(&mut held, deadline).timed_out() {
                let in_flight = self.in_flight();
                if in_flight == 0 {
                    break;
                }
                return Err(DrainTimeout {
                    waited: started.elapsed(),
                    in_flight,
                });
            }
        }

        Ok(DrainReport {
            waited: started.elapsed(),
            parked: true,
        })
    }

    #[inline]
    pub fn in_flight(&self) -> u32 {
        self.state.load(Ordering::Acquire) & COUNT_MASK
    }

    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.state.load(Ordering::Acquire) & INTERRUPTED != 0
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) & CLOSED != 0
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.state.load(Ordering::Acquire) & UNBOUND == 0
    }
}

impl Default for DrainGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DrainGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrainGate")
            .field("in_flight", &self.in_flight())
            .field("interrupted", &self.is_interrupted())
            .field("closed", &self.is_closed())
            .field("bound", &self.is_bound())
            .finish()
    }
}
