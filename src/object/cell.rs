/*!
 * Object Cell
 *
 * Shared state of one native object: its drain gate, arena binding, native
 * slot, cleanup function and host-side finalizer. Explicit free, cascade
 * from an ancestor and deferred finalization on the last leave all end in
 * [`ObjectCell::finalize`], which the gate's `CLOSED` bit lets run once.
 */

use super::host::{FinalizerToken, HostFinalizer, HostProxy};
use super::slot::{NativeSlot, ObjectCleanupFn};
use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::sync::{DrainConfig, DrainGate, DrainReport, DrainTimeout};
use crate::core::types::{ArenaId, ObjectId};
use crate::monitoring::{DisposalSpan, LifecycleStats};
use crate::pool::{CleanupMode, CleanupToken};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// Lifecycle state of a native object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectState {
    /// Allocated, not bound to an arena yet
    Uninit,
    /// Bound and accepting calls
    Active,
    /// Refusing new calls; a free, clear or cascade is draining it
    Interrupting,
    /// Torn down; terminal
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindStage {
    Unbound,
    Binding,
    Bound,
}

pub(crate) struct Binding {
    pub(crate) stage: BindStage,
    pub(crate) arena: Option<ArenaId>,
    pub(crate) cascade: Option<CleanupToken>,
}

pub(crate) struct ObjectCell {
    pub(crate) id: ObjectId,
    pub(crate) gate: DrainGate,
    pub(crate) binding: Mutex<Binding>,
    pub(crate) slot: RwLock<NativeSlot>,
    cleanup: Mutex<Option<ObjectCleanupFn>>,
    host: Mutex<Option<Weak<dyn HostProxy>>>,
    finalizer: FinalizerToken,
    stats: Arc<LifecycleStats>,
}

impl ObjectCell {
    pub(crate) fn new(id: ObjectId, stats: Arc<LifecycleStats>) -> Self {
        Self {
            id,
            gate: DrainGate::new(),
            binding: Mutex::new(Binding {
                stage: BindStage::Unbound,
                arena: None,
                cascade: None,
            }),
            slot: RwLock::new(NativeSlot::default()),
            cleanup: Mutex::new(None),
            host: Mutex::new(None),
            finalizer: FinalizerToken::default(),
            stats,
        }
    }

    pub(crate) fn state(&self) -> ObjectState {
        if self.gate.is_closed() {
            ObjectState::Finalized
        } else if !self.gate.is_bound() {
            ObjectState::Uninit
        } else if self.gate.is_interrupted() {
            ObjectState::Interrupting
        } else {
            ObjectState::Active
        }
    }

    pub(crate) fn arena(&self) -> Option<ArenaId> {
        self.binding.lock().arena
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.binding.lock().stage == BindStage::Bound
    }

    /// Claim the right to bind; fails if init already ran or is running
    pub(crate) fn begin_binding(&self) -> LifecycleResult<()> {
        if self.gate.is_closed() {
            return Err(LifecycleError::AlreadyFinalized(self.id));
        }
        let mut binding = self.binding.lock();
        if binding.stage != BindStage::Unbound {
            return Err(LifecycleError::InvalidHandle(self.id));
        }
        binding.stage = BindStage::Binding;
        Ok(())
    }

    pub(crate) fn abort_binding(&self) {
        let mut binding = self.binding.lock();
        if binding.stage == BindStage::Binding {
            binding.stage = BindStage::Unbound;
        }
    }

    /// Finish init and open the gate
    ///
    /// Returns the host finalizer unarmed if the object was finalized while
    /// binding; the caller owes it its one call.
    pub(crate) fn complete_binding(
        &self,
        arena: ArenaId,
        cascade: CleanupToken,
        host: Option<Weak<dyn HostProxy>>,
        finalizer: Option<HostFinalizer>,
    ) -> Option<HostFinalizer> {
        let rejected = finalizer.and_then(|finalizer| self.finalizer.arm(finalizer).err());
        *self.host.lock() = host;
        {
            let mut binding = self.binding.lock();
            binding.stage = BindStage::Bound;
            binding.arena = Some(arena);
            binding.cascade = Some(cascade);
        }
        self.gate.bind();
        rejected
    }

    pub(crate) fn take_cascade(&self) -> Option<CleanupToken> {
        self.binding.lock().cascade.take()
    }

    pub(crate) fn set_cascade(&self, token: CleanupToken) {
        self.binding.lock().cascade = Some(token);
    }

    pub(crate) fn set_cleanup(&self, cleanup: ObjectCleanupFn) {
        *self.cleanup.lock() = Some(cleanup);
    }

    pub(crate) fn host(&self) -> Option<Arc<dyn HostProxy>> {
        self.host.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Wait for in-flight calls, recording the outcome
    pub(crate) fn drain(&self, config: &DrainConfig) -> Result<DrainReport, DrainTimeout> {
        let result = self.gate.drain(config);
        match &result {
            Ok(report) => {
                self.stats.record_drain(report.waited, report.parked);
                trace!(
                    object = %self.id,
                    waited_us = report.waited.as_micros() as u64,
                    parked = report.parked,
                    "Object drained"
                );
            }
            Err(timeout) => {
                self.stats.record_drain_timeout();
                warn!(
                    object = %self.id,
                    waited_ms = timeout.waited.as_millis() as u64,
                    in_flight = timeout.in_flight,
                    "Drain timed out"
                );
            }
        }
        result
    }

    /// Run the common finalization path; `false` if it already ran
    ///
    /// Caller has drained the gate, or is the deferred last leave.
    pub(crate) fn finalize(&self, mode: CleanupMode) -> bool {
        if !self.gate.close() {
            return false;
        }

        self.finalizer.fire(mode);
        let cleanup = self.cleanup.lock().take();
        {
            let mut slot = self.slot.write();
            if let Some(mut cleanup) = cleanup {
                cleanup(mode, &mut *slot);
            }
            slot.reset();
        }
        {
            let mut binding = self.binding.lock();
            binding.arena = None;
            binding.cascade = None;
        }
        *self.host.lock() = None;

        self.stats.record_cleanup(mode);
        debug!(object = %self.id, %mode, "Object finalized");
        true
    }

    /// Run the cleanup function in recycle mode and empty the slot
    pub(crate) fn recycle(&self) {
        let mut cleanup = self.cleanup.lock();
        let mut slot = self.slot.write();
        if let Some(cleanup) = cleanup.as_mut() {
            cleanup(CleanupMode::Recycle, &mut *slot);
        }
        slot.reset();
        self.stats.record_cleanup(CleanupMode::Recycle);
    }

    /// Teardown of an ancestor reached this object's arena
    ///
    /// Does not touch the arena; the ancestor is already unwinding it. If
    /// the drain times out the object is detached and finalized by its last
    /// leave, and the timeout is reported to the destroying caller.
    pub(crate) fn cascade(&self, config: &DrainConfig) -> LifecycleResult<()> {
        let span = DisposalSpan::new("cascade", self.id);
        let _entered = span.enter();
        let result = self.cascade_inner(config);
        span.record_result(&result);
        result
    }

    fn cascade_inner(&self, config: &DrainConfig) -> LifecycleResult<()> {
        {
            let mut binding = self.binding.lock();
            binding.arena = None;
            binding.cascade = None;
        }
        self.gate.interrupt();

        match self.drain(config) {
            Ok(_) => {
                self.finalize(CleanupMode::CascadedFromAncestor);
                Ok(())
            }
            Err(timeout) if self.gate.defer() => {
                self.stats.record_deferred();
                warn!(
                    object = %self.id,
                    in_flight = timeout.in_flight,
                    "Finalization deferred to last leave"
                );
                Err(timeout.into())
            }
            // Drained between the timeout and the hand-off
            Err(_) => {
                self.finalize(CleanupMode::CascadedFromAncestor);
                Ok(())
            }
        }
    }
}

/// Cleanup registered in an object's arena so a teardown reaches the object
///
/// Holds the cell weakly: a cell already dropped from its table has nothing
/// left to finalize.
pub(crate) fn cascade_hook(
    cell: &Arc<ObjectCell>,
    config: DrainConfig,
) -> impl FnOnce(CleanupMode) -> LifecycleResult<()> + Send + 'static {
    let cell = Arc::downgrade(cell);
    move |_mode| match cell.upgrade() {
        Some(cell) => cell.cascade(&config),
        None => Ok(()),
    }
}

impl std::fmt::Debug for ObjectCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCell")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("gate", &self.gate)
            .field("finalizer", &self.finalizer)
            .finish()
    }
}
