/*!
 * Host Boundary
 *
 * The host-side proxy an object is bound to, and the one-shot finalizer the
 * host hands over at init. The proxy is only ever held weakly: the host's
 * collector owns it.
 */

use crate::core::types::{ArenaId, ObjectId};
use crate::pool::CleanupMode;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Identifiers published back to the host proxy after init
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostBinding {
    pub object: ObjectId,
    pub arena: ArenaId,
}

/// Host-owned proxy object
///
/// `publish` runs once per successful init, outside every lifecycle lock.
pub trait HostProxy: Send + Sync {
    fn publish(&self, binding: HostBinding);
}

/// Host-side finalizer, told why the object went away
pub type HostFinalizer = Box<dyn FnOnce(CleanupMode) + Send>;

/// One-shot capability wrapping a [`HostFinalizer`]
///
/// Firing consumes the finalizer and tombstones the token; a second fire is
/// a no-op. The finalizer runs outside the token's lock.
#[derive(Default)]
pub struct FinalizerToken {
    finalizer: Mutex<Option<HostFinalizer>>,
    spent: AtomicBool,
}

impl FinalizerToken {
    pub fn new(finalizer: HostFinalizer) -> Self {
        Self {
            finalizer: Mutex::new(Some(finalizer)),
            spent: AtomicBool::new(false),
        }
    }

    /// Install a finalizer into an empty token
    ///
    /// Hands the finalizer back if one was set or the token is spent.
    pub fn arm(&self, finalizer: HostFinalizer) -> Result<(), HostFinalizer> {
        let mut slot = self.finalizer.lock();
        if slot.is_some() || self.is_spent() {
            return Err(finalizer);
        }
        *slot = Some(finalizer);
        Ok(())
    }

    /// Run the finalizer; `true` only for the call that ran it
    pub fn fire(&self, mode: CleanupMode) -> bool {
        if self.spent.swap(true, Ordering::AcqRel) {
            return false;
        }
        let finalizer = self.finalizer.lock().take();
        match finalizer {
            Some(finalizer) => {
                finalizer(mode);
                true
            }
            None => false,
        }
    }

    pub fn is_spent(&self) -> bool {
        self.spent.load(Ordering::Acquire)
    }

    pub fn is_armed(&self) -> bool {
        !self.is_spent() && self.finalizer.lock().is_some()
    }
}

impl std::fmt::Debug for FinalizerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizerToken")
            .field("armed", &self.is_armed())
            .field("spent", &self.is_spent())
            .finish()
    }
}
