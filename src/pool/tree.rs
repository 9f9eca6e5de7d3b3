/*!
 * Pool Tree
 *
 * Generation-checked arena tree. Every arena lives in one slot map keyed by
 * [`ArenaId`]; parent links are weak and child lists hold ids, so a stale
 * id fails a generation check instead of reaching a freed node.
 *
 * # Locking
 *
 * Structural changes (create, clear, destroy) run under the ancestry lock:
 * the reentrant mutex of the nearest arena that carries one, the root
 * included. Teardown takes each child's ancestry lock on the way down, so
 * locks are always acquired top-down. Order: ancestry mutex, then the slot
 * map, then a node's state mutex. Node state is never held while cleanups
 * run.
 */

use super::cleanup::{self, CleanupMode, CleanupToken};
use super::node::{ArenaKind, ChildLink, PoolNode};
use crate::core::data_structures::SlotMap;
use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::limits::{DEFAULT_MAX_ARENAS, DEFAULT_SCRATCH_CAPACITY};
use crate::core::types::ArenaId;
use crate::monitoring::LifecycleStats;
use bumpalo::Bump;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Arena tree limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Live arenas allowed at once, root included
    pub max_arenas: usize,
    /// Initial bump capacity of each arena's scratch region
    pub scratch_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_arenas: DEFAULT_MAX_ARENAS,
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> LifecycleResult<()> {
        if self.max_arenas == 0 {
            return Err(LifecycleError::Configuration(
                "max_arenas must leave room for the root arena".into(),
            ));
        }
        Ok(())
    }
}

/// Mutex of the nearest locked ancestor of an arena
///
/// Resolving the lock and holding it are separate steps:
///
/// ```ignore
/// let lock = pools.lock_ancestry(arena)?;
/// let _held = lock.hold();
/// ```
pub struct AncestryLock {
    mutex: Arc<ReentrantMutex<()>>,
    owner: ArenaId,
}

impl AncestryLock {
    /// Block until the lock is held; reentrant on the same thread
    pub fn hold(&self) -> ReentrantMutexGuard<'_, ()> {
        self.mutex.lock()
    }

    /// Arena whose mutex this is
    pub fn owner(&self) -> ArenaId {
        self.owner
    }
}

pub struct PoolTree {
    nodes: RwLock<SlotMap<ArenaId, Arc<PoolNode>>>,
    root: Arc<PoolNode>,
    config: PoolConfig,
    stats: Arc<LifecycleStats>,
}

impl PoolTree {
    /// Create a tree holding only its root arena
    pub fn new(config: PoolConfig, stats: Arc<LifecycleStats>) -> LifecycleResult<Self> {
        config.validate()?;

        let mut nodes = SlotMap::new();
        let mut root = None;
        nodes.insert_with(|id| {
            let node = Arc::new(PoolNode::new(
                id,
                None,
                ArenaKind::Scope,
                true,
                config.scratch_capacity,
            ));
            root = Some(node.clone());
            node
        });
        let root = root.ok_or_else(|| LifecycleError::Configuration("root arena".into()))?;
        stats.record_arena_created();
        debug!(arena = %root.id, "Root arena created");

        Ok(Self {
            nodes: RwLock::new(nodes),
            root,
            config,
            stats,
        })
    }

    #[inline]
    pub fn root(&self) -> ArenaId {
        self.root.id
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<LifecycleStats> {
        &self.stats
    }

    /// Create a scope arena under `parent`, or under the root when `None`
    pub fn create_child(&self, parent: Option<ArenaId>, exclusive: bool) -> LifecycleResult<ArenaId> {
        self.spawn(parent, exclusive, ArenaKind::Scope)
    }

    pub(crate) fn spawn(
        &self,
        parent: Option<ArenaId>,
        exclusive: bool,
        kind: ArenaKind,
    ) -> LifecycleResult<ArenaId> {
        let parent_id = parent.unwrap_or(self.root.id);
        let parent_node = self.node(parent_id)?;
        let lock = self.ancestry_of(&parent_node);
        let _held = lock.hold();

        if parent_node.is_closing() {
            return Err(LifecycleError::NoArena(parent_id));
        }

        let mut nodes = self.nodes.write();
        if nodes.len() >= self.config.max_arenas {
            return Err(LifecycleError::OutOfMemory {
                live: nodes.len(),
                limit: self.config.max_arenas,
            });
        }

        let mut parent_state = parent_node.state.lock();
        if !parent_state.alive {
            return Err(LifecycleError::NoArena(parent_id));
        }

        let scratch_capacity = self.config.scratch_capacity;
        let mut depth = 0;
        let id = nodes.insert_with(|id| {
            let node = PoolNode::new(id, Some(&parent_node), kind, exclusive, scratch_capacity);
            depth = node.depth;
            Arc::new(node)
        });
        parent_state.children.push(ChildLink { id, kind });
        drop(parent_state);
        drop(nodes);

        self.stats.record_arena_created();
        debug!(
            arena = %id,
            parent = %parent_id,
            depth,
            exclusive,
            ?kind,
            "Arena created"
        );
        Ok(id)
    }

    /// Resolve the ancestry lock of an arena without holding it
    pub fn lock_ancestry(&self, arena: ArenaId) -> LifecycleResult<AncestryLock> {
        let node = self.node(arena)?;
        Ok(self.ancestry_of(&node))
    }

    /// Reset an arena for reuse
    ///
    /// Child arenas are destroyed, the arena's own cleanups run with
    /// [`CleanupMode::Recycle`] and are dropped, and the scratch region is
    /// reset. The arena stays alive and accepts new children and cleanups.
    pub fn clear(&self, arena: ArenaId) -> LifecycleResult<()> {
        let node = self.node(arena)?;
        let lock = self.ancestry_of(&node);
        let _held = lock.hold();

        if node.is_closing() || !node.is_alive() {
            return Err(LifecycleError::NoArena(arena));
        }

        let result = self.teardown(&node, CleanupMode::Recycle);
        self.stats.record_arena_cleared();
        debug!(arena = %arena, ok = result.is_ok(), "Arena cleared");
        result
    }

    /// Destroy an arena and everything beneath it
    ///
    /// Idempotent: a stale or already destroyed id is a no-op. Destroying
    /// the root is a [`shutdown`](Self::shutdown). Every cleanup runs even
    /// when one fails; the first error is returned.
    pub fn destroy(&self, arena: ArenaId) -> LifecycleResult<()> {
        if arena == self.root.id {
            return self.shutdown();
        }
        let node = match self.nodes.read().get(arena) {
            Ok(node) => node.clone(),
            Err(_) => return Ok(()),
        };
        let lock = self.ancestry_of(&node);
        let _held = lock.hold();
        self.destroy_node(&node)
    }

    /// Tear down every child of the root and refuse new arenas
    ///
    /// The root itself stays in the table so late calls fail with
    /// [`LifecycleError::NoArena`] instead of a stale id.
    pub fn shutdown(&self) -> LifecycleResult<()> {
        let lock = self.ancestry_of(&self.root);
        let _held = lock.hold();

        self.root.mark_closing();
        let result = self.teardown(&self.root, CleanupMode::CascadedFromAncestor);
        debug!(arena = %self.root.id, live = self.len(), "Pool tree shut down");
        result
    }

    /// Register a cleanup to run when the arena is cleared or destroyed
    pub fn register_cleanup<F>(&self, arena: ArenaId, cleanup: F) -> LifecycleResult<CleanupToken>
    where
        F: FnOnce(CleanupMode) -> LifecycleResult<()> + Send + 'static,
    {
        let node = self.node(arena)?;
        let mut state = node.state.lock();
        if node.is_closing() || !state.alive {
            return Err(LifecycleError::NoArena(arena));
        }
        let token = state.push_cleanup(Box::new(cleanup));
        trace!(arena = %arena, token = token.0, "Cleanup registered");
        Ok(token)
    }

    /// Drop a registered cleanup without running it
    ///
    /// Returns `false` when the cleanup already ran or the arena is gone.
    pub fn unregister_cleanup(&self, arena: ArenaId, token: CleanupToken) -> bool {
        match self.node(arena) {
            Ok(node) => node.state.lock().remove_cleanup(token),
            Err(_) => false,
        }
    }

    pub fn child_count(&self, arena: ArenaId) -> LifecycleResult<usize> {
        Ok(self.node(arena)?.state.lock().children.len())
    }

    pub fn children(&self, arena: ArenaId) -> LifecycleResult<Vec<ArenaId>> {
        let node = self.node(arena)?;
        let state = node.state.lock();
        Ok(state.children.iter().map(|child| child.id).collect())
    }

    pub fn parent_of(&self, arena: ArenaId) -> LifecycleResult<Option<ArenaId>> {
        Ok(self.node(arena)?.parent().map(|parent| parent.id))
    }

    pub fn kind_of(&self, arena: ArenaId) -> LifecycleResult<ArenaKind> {
        Ok(self.node(arena)?.kind)
    }

    pub fn contains(&self, arena: ArenaId) -> bool {
        self.nodes.read().contains(arena)
    }

    /// Live arenas, root included
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow an arena's scratch region
    ///
    /// The arena's state is locked while `f` runs; `f` must not call back
    /// into this tree for the same arena.
    pub fn with_scratch<R>(&self, arena: ArenaId, f: impl FnOnce(&Bump) -> R) -> LifecycleResult<R> {
        let node = self.node(arena)?;
        let state = node.state.lock();
        if !state.alive {
            return Err(LifecycleError::NoArena(arena));
        }
        Ok(f(&state.scratch))
    }

    pub fn scratch_bytes(&self, arena: ArenaId) -> LifecycleResult<usize> {
        Ok(self.node(arena)?.state.lock().scratch.allocated_bytes())
    }

    fn node(&self, arena: ArenaId) -> LifecycleResult<Arc<PoolNode>> {
        self.nodes
            .read()
            .get(arena)
            .cloned()
            .map_err(|_| LifecycleError::NoArena(arena))
    }

    fn ancestry_of(&self, node: &Arc<PoolNode>) -> AncestryLock {
        let mut current = node.clone();
        loop {
            if let Some(mutex) = &current.mutex {
                return AncestryLock {
                    mutex: mutex.clone(),
                    owner: current.id,
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        // Orphaned chain; the root always carries a mutex
        AncestryLock {
            mutex: self.root.mutex.clone().unwrap_or_default(),
            owner: self.root.id,
        }
    }

    /// Caller holds the ancestry lock of `node`
    fn destroy_node(&self, node: &Arc<PoolNode>) -> LifecycleResult<()> {
        // Re-entered from one of this arena's own cleanups, or lost a race
        if node.is_closing() || !node.is_alive() {
            return Ok(());
        }
        node.mark_closing();

        let result = self.teardown(node, CleanupMode::CascadedFromAncestor);

        if let Some(parent) = node.parent() {
            parent.state.lock().children.retain(|child| child.id != node.id);
        }
        node.state.lock().alive = false;
        // Stale already means someone else removed it
        let _ = self.nodes.write().remove(node.id);

        self.stats.record_arena_destroyed();
        debug!(arena = %node.id, depth = node.depth, ok = result.is_ok(), "Arena destroyed");
        result
    }

    /// Destroy children, then run own cleanups with `own_mode`
    fn teardown(&self, node: &Arc<PoolNode>, own_mode: CleanupMode) -> LifecycleResult<()> {
        let mut first_error = None;

        let children = node.state.lock().teardown_order();
        for child_id in children {
            let child = match self.nodes.read().get(child_id) {
                Ok(child) => child.clone(),
                Err(_) => continue,
            };
            let lock = self.ancestry_of(&child);
            let _held = lock.hold();
            if let Err(e) = self.destroy_node(&child) {
                first_error.get_or_insert(e);
            }
        }

        let cleanups = std::mem::take(&mut node.state.lock().cleanups);
        trace!(arena = %node.id, count = cleanups.len(), mode = %own_mode, "Running arena cleanups");
        if let Err(e) = cleanup::run_all(cleanups, own_mode) {
            first_error.get_or_insert(e);
        }

        node.state.lock().scratch.reset();
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for PoolTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolTree")
            .field("root", &self.root.id)
            .field("live", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
