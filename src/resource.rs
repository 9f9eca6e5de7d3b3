/*!
 * Managed Resources
 *
 * Typed adapter for resource modules (files, mutexes, directory iterators,
 * service handles). It follows the module contract: init once, store the
 * payload with its discriminator, register a cleanup that releases the
 * payload for every mode, and bracket every payload access with
 * enter/leave.
 *
 * The runtime never opens an OS resource itself; `T` owns it and releases
 * it in [`NativeResource::release`].
 */

use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::types::{ArenaId, Discriminator, ObjectId};
use crate::object::ObjectInit;
use crate::pool::CleanupMode;
use crate::runtime::Runtime;
use std::marker::PhantomData;
use tracing::warn;

/// OS payload owned by a native object
pub trait NativeResource: Send + Sync + Sized + 'static {
    /// Type tag stored next to the payload
    const DISCRIMINATOR: Option<Discriminator> = None;

    /// Release the OS resource
    ///
    /// Called exactly once per payload: on recycle, explicit free or
    /// cascade from an ancestor arena.
    fn release(self, mode: CleanupMode);
}

/// Native object holding one `T`
///
/// Dropping the handle does not free the object; it lives until
/// [`close`](Self::close) or the teardown of an ancestor arena.
pub struct ManagedResource<'rt, T: NativeResource> {
    runtime: &'rt Runtime,
    id: ObjectId,
    arena: ArenaId,
    _payload: PhantomData<fn() -> T>,
}

impl<'rt, T: NativeResource> ManagedResource<'rt, T> {
    /// Allocate, bind and store `payload`
    ///
    /// If binding fails, or the object is interrupted before the payload is
    /// stored, the object is freed and the payload released with
    /// [`CleanupMode::Explicit`] before the error is returned.
    pub fn open(runtime: &'rt Runtime, init: ObjectInit, payload: T) -> LifecycleResult<Self> {
        let id = runtime.alloc();
        runtime.set_cleanup(id, |mode, slot| {
            if let Some(payload) = slot.take_payload::<T>() {
                payload.release(mode);
            }
        })?;

        let arena = match runtime.init(id, init) {
            Ok(arena) => arena,
            Err(e) => {
                if let Err(free) = runtime.free(id) {
                    warn!(object = %id, error = %free, "Free of unbound resource failed");
                }
                payload.release(CleanupMode::Explicit);
                return Err(e);
            }
        };

        let guard = match runtime.enter(id) {
            Ok(guard) => guard,
            Err(e) => {
                if let Err(free) = runtime.free(id) {
                    warn!(object = %id, error = %free, "Free of unusable resource failed");
                }
                payload.release(CleanupMode::Explicit);
                return Err(e);
            }
        };
        guard.store(payload, T::DISCRIMINATOR);

        Ok(Self {
            runtime,
            id,
            arena,
            _payload: PhantomData,
        })
    }

    #[inline]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[inline]
    pub fn arena(&self) -> ArenaId {
        self.arena
    }

    /// Run `f` on the payload inside an enter/leave bracket
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> LifecycleResult<R> {
        let guard = self.runtime.enter(self.id)?;
        let payload = guard
            .payload::<T>()
            .ok_or(LifecycleError::InvalidHandle(self.id))?;
        Ok(f(&*payload))
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> LifecycleResult<R> {
        let guard = self.runtime.enter(self.id)?;
        let mut payload = guard
            .payload_mut::<T>()
            .ok_or(LifecycleError::InvalidHandle(self.id))?;
        Ok(f(&mut *payload))
    }

    /// Recycle the object and store a fresh payload
    ///
    /// The previous payload is released with [`CleanupMode::Recycle`]
    /// before `payload` is stored. If the object cannot take it, `payload`
    /// is released with [`CleanupMode::Explicit`] and the error returned.
    pub fn replace(&self, payload: T) -> LifecycleResult<()> {
        let stored = self
            .runtime
            .clear(self.id)
            .and_then(|()| self.runtime.enter(self.id));
        match stored {
            Ok(guard) => {
                guard.store(payload, T::DISCRIMINATOR);
                Ok(())
            }
            Err(e) => {
                payload.release(CleanupMode::Explicit);
                Err(e)
            }
        }
    }

    /// Explicitly free the object
    pub fn close(self) -> LifecycleResult<()> {
        self.runtime.free(self.id)
    }
}

impl<T: NativeResource> std::fmt::Debug for ManagedResource<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedResource")
            .field("id", &self.id)
            .field("arena", &self.arena)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
