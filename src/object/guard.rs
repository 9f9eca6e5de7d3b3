/*!
 * Enter Guard
 *
 * RAII bracket around one native call. Holding a guard keeps the object's
 * in-flight count raised, so no free or cascade can finalize the payload
 * underneath it. Dropping the guard is the `leave`.
 *
 * ## Example
 *
 * ```ignore
 * let guard = runtime.enter(id)?;
 * for entry in entries {
 *     guard.checkpoint()?;
 *     // touch guard.payload::<DirHandle>()
 * }
 * // leave on drop
 * ```
 */

use super::cell::ObjectCell;
use super::slot::Payload;
use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::sync::LeaveOutcome;
use crate::core::types::{Discriminator, ObjectId};
use crate::pool::CleanupMode;
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard};
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, trace};

#[must_use = "dropping the guard leaves the object immediately"]
pub struct EnterGuard {
    cell: Arc<ObjectCell>,
}

impl EnterGuard {
    /// Wrap a successful `try_enter` on the cell's gate
    pub(crate) fn new(cell: Arc<ObjectCell>) -> Self {
        Self { cell }
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.cell.id
    }

    /// Leave explicitly; same as dropping the guard
    pub fn leave(self) {}

    /// Cooperative cancellation point for long-running loops
    ///
    /// Fails once the object is interrupted; the guard stays valid so the
    /// caller can unwind and drop it.
    pub fn checkpoint(&self) -> LifecycleResult<()> {
        if self.cell.gate.is_interrupted() {
            return Err(LifecycleError::Interrupted(self.cell.id));
        }
        Ok(())
    }

    /// Borrow the payload as a `T`
    pub fn payload<T: Any>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.cell.slot.read(), |slot| slot.payload::<T>()).ok()
    }

    /// Mutably borrow the payload as a `T`
    pub fn payload_mut<T: Any>(&self) -> Option<MappedRwLockWriteGuard<'_, T>> {
        RwLockWriteGuard::try_map(self.cell.slot.write(), |slot| slot.payload_mut::<T>()).ok()
    }

    /// Store the OS payload, returning the one it replaces
    pub fn store<T: Any + Send + Sync>(
        &self,
        payload: T,
        discriminator: Option<Discriminator>,
    ) -> Option<Payload> {
        self.cell.slot.write().replace(Box::new(payload), discriminator)
    }

    /// Take the payload out of the slot if it is a `T`
    pub fn take<T: Any>(&self) -> Option<T> {
        self.cell.slot.write().take_payload::<T>()
    }

    pub fn discriminator(&self) -> Option<Discriminator> {
        self.cell.slot.read().discriminator()
    }

    /// Whether a payload is stored
    pub fn has_payload(&self) -> bool {
        !self.cell.slot.read().is_empty()
    }
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        match self.cell.gate.leave() {
            LeaveOutcome::InFlight => {}
            LeaveOutcome::Drained => {
                trace!(object = %self.cell.id, "Last call left interrupted object");
            }
            LeaveOutcome::Deferred => {
                debug!(object = %self.cell.id, "Running deferred finalization");
                self.cell.finalize(CleanupMode::CascadedFromAncestor);
            }
        }
    }
}

impl std::fmt::Debug for EnterGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnterGuard").field("object", &self.cell.id).finish()
    }
}
