/*!
 * Native Slot
 * Type-erased OS payload plus discriminator held by a native object
 */

use crate::core::types::Discriminator;
use crate::pool::CleanupMode;
use std::any::Any;

pub type Payload = Box<dyn Any + Send + Sync>;

/// Resource-specific cleanup, run once per recycle and once at finalization
///
/// Whatever payload the function leaves in the slot is dropped right after
/// it returns.
pub type ObjectCleanupFn = Box<dyn FnMut(CleanupMode, &mut NativeSlot) + Send>;

#[derive(Default)]
pub struct NativeSlot {
    payload: Option<Payload>,
    discriminator: Option<Discriminator>,
}

impl NativeSlot {
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref()
    }

    pub fn payload_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.payload.as_deref_mut()?.downcast_mut()
    }

    /// Take the payload if it is a `T`; a payload of another type stays put
    pub fn take_payload<T: Any>(&mut self) -> Option<T> {
        match self.payload.take()?.downcast::<T>() {
            Ok(payload) => Some(*payload),
            Err(other) => {
                self.payload = Some(other);
                None
            }
        }
    }

    pub fn take_any(&mut self) -> Option<Payload> {
        self.payload.take()
    }

    /// Store a payload, handing back the one it replaces
    pub fn replace(&mut self, payload: Payload, discriminator: Option<Discriminator>) -> Option<Payload> {
        self.discriminator = discriminator;
        self.payload.replace(payload)
    }

    pub fn discriminator(&self) -> Option<Discriminator> {
        self.discriminator
    }

    pub fn set_discriminator(&mut self, discriminator: Option<Discriminator>) {
        self.discriminator = discriminator;
    }

    pub(crate) fn reset(&mut self) {
        self.payload = None;
        self.discriminator = None;
    }
}

impl std::fmt::Debug for NativeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeSlot")
            .field("occupied", &self.payload.is_some())
            .field("discriminator", &self.discriminator)
            .finish()
    }
}
