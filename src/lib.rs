/*!
 * Native Lifecycle Library
 * Arena tree, native object handles and cache tables for host-managed runtimes
 */

pub mod cache;
pub mod config;
pub mod core;
pub mod monitoring;
pub mod object;
pub mod pool;
pub mod resource;
pub mod runtime;

// Re-exports
pub use cache::{CacheEntry, CacheTable};
pub use config::LifecycleConfig;
pub use crate::core::errors::{ErrorCode, LifecycleError, LifecycleResult, SerializableError};
pub use crate::core::sync::DrainConfig;
pub use crate::core::types::{ArenaId, Discriminator, ObjectId};
pub use monitoring::{init_tracing, LifecycleStats, StatsSnapshot};
pub use object::{
    EnterGuard, HostBinding, HostFinalizer, HostProxy, NativeSlot, ObjectCleanupFn, ObjectInit,
    ObjectState,
};
pub use pool::{AncestryLock, ArenaKind, CleanupMode, CleanupToken, PoolConfig, PoolTree};
pub use resource::{ManagedResource, NativeResource};
pub use runtime::Runtime;
