/*!
 * Lifecycle Runtime
 *
 * Ties the arena tree and the object table together and implements the
 * disposal protocol: explicit free, recycle through clear, and cascade from
 * an ancestor arena all converge on one finalization per object.
 *
 * # Process-wide runtime
 *
 * [`Runtime::global`] creates the singleton (and its root arena) on first
 * use. Failing to allocate the root is unrecoverable and aborts the
 * process. Before the library is unloaded the embedder calls
 * [`Runtime::shutdown`], which cascades every root child; afterwards new
 * arenas and inits fail with [`LifecycleError::NoArena`].
 */

use crate::cache::CacheTable;
use crate::config::LifecycleConfig;
use crate::core::errors::{LifecycleError, LifecycleResult};
use crate::core::limits::MAX_IN_FLIGHT;
use crate::core::sync::Refusal;
use crate::core::types::{ArenaId, ObjectId};
use crate::monitoring::{DisposalSpan, LifecycleStats, StatsSnapshot};
use crate::object::{
    cascade_hook, EnterGuard, HostBinding, HostProxy, NativeSlot, ObjectCell, ObjectInit,
    ObjectState, ObjectTable,
};
use crate::pool::{ArenaKind, CleanupMode, PoolTree};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

static GLOBAL: OnceLock<Runtime> = OnceLock::new();

pub struct Runtime {
    config: LifecycleConfig,
    pools: PoolTree,
    objects: ObjectTable,
    stats: Arc<LifecycleStats>,
}

impl Runtime {
    pub fn new(config: LifecycleConfig) -> LifecycleResult<Self> {
        config.validate()?;
        let stats = Arc::new(LifecycleStats::new());
        let pools = PoolTree::new(config.pool, stats.clone())?;
        Ok(Self {
            config,
            pools,
            objects: ObjectTable::new(stats.clone()),
            stats,
        })
    }

    /// Process-wide runtime, configured from the environment
    pub fn global() -> &'static Runtime {
        GLOBAL.get_or_init(|| {
            let config = LifecycleConfig::from_env().unwrap_or_else(|e| {
                warn!(error = %e, "Invalid lifecycle environment, using defaults");
                LifecycleConfig::default()
            });
            match Runtime::new(config) {
                Ok(runtime) => {
                    info!(root = %runtime.pools.root(), "Global lifecycle runtime initialized");
                    runtime
                }
                Err(e) => {
                    error!(error = %e, "Root arena allocation failed, aborting");
                    std::process::abort();
                }
            }
        })
    }

    /// Cascade every arena under the root and refuse new ones
    pub fn shutdown(&self) -> LifecycleResult<()> {
        info!(
            arenas = self.pools.len(),
            objects = self.objects.len(),
            "Lifecycle runtime shutting down"
        );
        self.pools.shutdown()
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn pools(&self) -> &PoolTree {
        &self.pools
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Objects still holding a table slot
    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    /// Empty cache table sized from the configuration
    pub fn cache_table<V>(&self) -> CacheTable<V> {
        CacheTable::with_capacity(self.config.cache_initial_capacity)
    }

    /// Allocate an unbound object
    pub fn alloc(&self) -> ObjectId {
        let id = self.objects.alloc();
        debug!(object = %id, "Object allocated");
        id
    }

    /// Bind an object to a new arena and its host proxy
    ///
    /// Returns the object's arena, which is also published to the proxy.
    /// An object binds once; a second init fails with `InvalidHandle`.
    pub fn init(&self, id: ObjectId, init: ObjectInit) -> LifecycleResult<ArenaId> {
        let cell = self.objects.get(id)?;
        cell.begin_binding()?;

        let arena = match self.pools.spawn(init.parent, init.exclusive, ArenaKind::Object) {
            Ok(arena) => arena,
            Err(e) => {
                cell.abort_binding();
                return Err(e);
            }
        };
        let cascade = match self
            .pools
            .register_cleanup(arena, cascade_hook(&cell, self.config.drain))
        {
            Ok(token) => token,
            Err(e) => {
                if let Err(rollback) = self.pools.destroy(arena) {
                    warn!(object = %id, arena = %arena, error = %rollback, "Init rollback failed");
                }
                cell.abort_binding();
                return Err(e);
            }
        };

        let ObjectInit {
            host, finalizer, ..
        } = init;
        let rejected = cell.complete_binding(arena, cascade, host.clone(), finalizer);

        // Torn down by a concurrent free or ancestor teardown while binding
        if cell.gate.is_closed() {
            if let Some(finalizer) = rejected {
                finalizer(CleanupMode::Explicit);
            }
            self.pools.destroy(arena)?;
            return Err(LifecycleError::AlreadyFinalized(id));
        }

        debug!(object = %id, arena = %arena, "Object initialized");
        if let Some(proxy) = host.and_then(|host| host.upgrade()) {
            proxy.publish(HostBinding { object: id, arena });
        }
        Ok(arena)
    }

    /// Install the resource-specific cleanup function
    pub fn set_cleanup<F>(&self, id: ObjectId, cleanup: F) -> LifecycleResult<()>
    where
        F: FnMut(CleanupMode, &mut NativeSlot) + Send + 'static,
    {
        let cell = self.live_cell(id)?;
        cell.set_cleanup(Box::new(cleanup));
        Ok(())
    }

    /// Count one native call in
    pub fn enter(&self, id: ObjectId) -> LifecycleResult<EnterGuard> {
        let cell = self.objects.get(id)?;
        match cell.gate.try_enter() {
            Ok(()) => Ok(EnterGuard::new(cell)),
            Err(Refusal::Unbound) => Err(LifecycleError::InvalidHandle(id)),
            Err(Refusal::Interrupted) => Err(LifecycleError::Interrupted(id)),
            Err(Refusal::Closed) => Err(LifecycleError::AlreadyFinalized(id)),
            Err(Refusal::Saturated) => Err(LifecycleError::OutOfMemory {
                live: MAX_IN_FLIGHT as usize,
                limit: MAX_IN_FLIGHT as usize,
            }),
        }
    }

    /// Refuse further calls; in-flight calls see it at their next checkpoint
    pub fn interrupt(&self, id: ObjectId) -> LifecycleResult<()> {
        let cell = self.live_cell(id)?;
        if !cell.gate.is_bound() {
            return Err(LifecycleError::InvalidHandle(id));
        }
        if cell.gate.interrupt() {
            debug!(object = %id, "Object interrupted");
        }
        Ok(())
    }

    /// Explicitly dispose of an object
    ///
    /// Interrupts, drains in-flight calls, runs the host finalizer and the
    /// cleanup function with [`CleanupMode::Explicit`], destroys the
    /// object's arena and releases its id. If the drain times out nothing
    /// is finalized, the object stays interrupted and the free can be
    /// retried. Freeing an object an ancestor already finalized only
    /// releases its id.
    pub fn free(&self, id: ObjectId) -> LifecycleResult<()> {
        let span = DisposalSpan::new("free", id);
        let _entered = span.enter();
        let result = self.free_inner(id);
        span.record_result(&result);
        result
    }

    fn free_inner(&self, id: ObjectId) -> LifecycleResult<()> {
        let cell = self.objects.get(id)?;
        let arena = match cell.arena() {
            Some(arena) => arena,
            None => {
                self.release_detached(&cell);
                return Ok(());
            }
        };
        let lock = match self.pools.lock_ancestry(arena) {
            Ok(lock) => lock,
            Err(_) => {
                self.release_detached(&cell);
                return Ok(());
            }
        };
        let _held = lock.hold();
        if cell.arena() != Some(arena) {
            self.release_detached(&cell);
            return Ok(());
        }

        cell.gate.interrupt();
        cell.drain(&self.config.drain)?;

        if let Some(token) = cell.take_cascade() {
            self.pools.unregister_cleanup(arena, token);
        }
        cell.finalize(CleanupMode::Explicit);
        let result = self.pools.destroy(arena);
        self.objects.remove(id);
        result
    }

    /// Release the id of an object that is no longer attached to an arena
    fn release_detached(&self, cell: &Arc<ObjectCell>) {
        if !cell.is_bound() {
            cell.finalize(CleanupMode::Explicit);
        }
        self.objects.remove(cell.id);
        debug!(object = %cell.id, "Detached object released");
    }

    /// Recycle an object for a new query without rebinding it
    ///
    /// Drains, hands the payload to the cleanup function with
    /// [`CleanupMode::Recycle`], clears the object's arena, re-registers the
    /// cascade cleanup, empties the slot and accepts calls again. On a
    /// drain timeout the interrupted flag is restored and nothing changes.
    pub fn clear(&self, id: ObjectId) -> LifecycleResult<()> {
        let span = DisposalSpan::new("clear", id);
        let _entered = span.enter();
        let result = self.clear_inner(id);
        span.record_result(&result);
        result
    }

    fn clear_inner(&self, id: ObjectId) -> LifecycleResult<()> {
        let cell = self.live_cell(id)?;
        let detached = || {
            if cell.is_bound() {
                LifecycleError::AlreadyFinalized(id)
            } else {
                LifecycleError::InvalidHandle(id)
            }
        };
        let arena = cell.arena().ok_or_else(detached)?;
        let lock = self.pools.lock_ancestry(arena).map_err(|_| detached())?;
        let _held = lock.hold();
        if cell.arena() != Some(arena) {
            return Err(detached());
        }

        let newly_interrupted = cell.gate.interrupt();
        if let Err(timeout) = cell.drain(&self.config.drain) {
            if newly_interrupted {
                cell.gate.resume();
            }
            return Err(timeout.into());
        }

        cell.recycle();
        if let Some(token) = cell.take_cascade() {
            self.pools.unregister_cleanup(arena, token);
        }
        let result = self.pools.clear(arena);
        let token = self
            .pools
            .register_cleanup(arena, cascade_hook(&cell, self.config.drain))?;
        cell.set_cascade(token);
        cell.gate.resume();

        debug!(object = %id, arena = %arena, "Object recycled");
        result
    }

    /// Current state; a released id reports `Finalized`
    pub fn state(&self, id: ObjectId) -> LifecycleResult<ObjectState> {
        match self.objects.get(id) {
            Ok(cell) => Ok(cell.state()),
            Err(LifecycleError::AlreadyFinalized(_)) => Ok(ObjectState::Finalized),
            Err(e) => Err(e),
        }
    }

    /// Owning arena; `None` before init and after finalization
    pub fn arena_of(&self, id: ObjectId) -> LifecycleResult<Option<ArenaId>> {
        Ok(self.objects.get(id)?.arena())
    }

    pub fn in_flight(&self, id: ObjectId) -> LifecycleResult<u32> {
        Ok(self.objects.get(id)?.gate.in_flight())
    }

    /// Host proxy, if it is still alive and the object is not finalized
    pub fn host(&self, id: ObjectId) -> LifecycleResult<Option<Arc<dyn HostProxy>>> {
        Ok(self.objects.get(id)?.host())
    }

    fn live_cell(&self, id: ObjectId) -> LifecycleResult<Arc<ObjectCell>> {
        let cell = self.objects.get(id)?;
        if cell.gate.is_closed() {
            return Err(LifecycleError::AlreadyFinalized(id));
        }
        Ok(cell)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("pools", &self.pools)
            .field("objects", &self.objects.len())
            .field("config", &self.config)
            .finish()
    }
}
