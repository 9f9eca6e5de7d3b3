/*!
 * Arena Pools
 * Hierarchical arenas with ordered cleanup and ancestry locking
 */

mod cleanup;
mod node;
mod tree;

pub use cleanup::{CleanupFn, CleanupMode, CleanupToken};
pub use node::ArenaKind;
pub use tree::{AncestryLock, PoolConfig, PoolTree};
