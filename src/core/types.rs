/*!
 * Core Types
 * Identifiers that cross the host boundary
 *
 * Arena and object identities are `(index, generation)` pairs packed into a
 * single `u64`: slot index in the upper 32 bits, generation in the lower 32.
 * The host stores the raw value on its proxy object and hands it back
 * unchanged; a value whose generation no longer matches its slot fails a
 * cheap check instead of reaching freed state.
 */

use super::limits::GENERATION_BITS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque type tag a resource module may attach to its payload
pub type Discriminator = u64;

/// Slot index plus generation, the shared encoding of every id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawId(u64);

impl RawId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((index as u64) << GENERATION_BITS) | generation as u64)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        (self.0 >> GENERATION_BITS) as u32
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub const fn into_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// Keys usable in a [`SlotMap`](crate::core::data_structures::SlotMap)
pub trait SlotKey: Copy + Eq + fmt::Debug {
    fn from_raw_id(id: RawId) -> Self;
    fn raw_id(self) -> RawId;
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(RawId);

        impl $name {
            /// Rebuild an id from the value the host stored
            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(RawId::from_raw(raw))
            }

            /// Value handed to the host
            #[inline]
            pub const fn into_raw(self) -> u64 {
                self.0.into_raw()
            }

            #[inline]
            pub const fn index(self) -> u32 {
                self.0.index()
            }

            #[inline]
            pub const fn generation(self) -> u32 {
                self.0.generation()
            }
        }

        impl SlotKey for $name {
            #[inline]
            fn from_raw_id(id: RawId) -> Self {
                Self(id)
            }

            #[inline]
            fn raw_id(self) -> RawId {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}.{}", $prefix, self.index(), self.generation())
            }
        }
    };
}

define_id!(
    /// Identity of an arena in a [`PoolTree`](crate::pool::PoolTree)
    ArenaId,
    "arena"
);

define_id!(
    /// Identity of a native object in a [`Runtime`](crate::Runtime)
    ObjectId,
    "object"
);
