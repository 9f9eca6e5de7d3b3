/*!
 * Pool Tree Tests
 * Arena creation, teardown order, cleanup modes and limits
 */

use native_lifecycle::{
    ArenaId, ArenaKind, CleanupMode, LifecycleError, LifecycleStats, PoolConfig, PoolTree,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn tree() -> PoolTree {
    PoolTree::new(PoolConfig::default(), Arc::new(LifecycleStats::new()))
        .expect("Failed to create pool tree")
}

type Log = Arc<Mutex<Vec<&'static str>>>;

fn record(pools: &PoolTree, arena: ArenaId, name: &'static str, log: &Log) {
    let log = log.clone();
    pools
        .register_cleanup(arena, move |_| {
            log.lock().push(name);
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_create_and_destroy_counts() {
    let pools = tree();
    let a = pools.create_child(None, false).unwrap();
    let b = pools.create_child(Some(a), false).unwrap();
    let c = pools.create_child(Some(b), false).unwrap();
    assert_eq!(pools.len(), 4);
    assert_eq!(pools.kind_of(c).unwrap(), ArenaKind::Scope);
    assert_eq!(pools.children(a).unwrap(), vec![b]);

    pools.destroy(a).unwrap();
    assert_eq!(pools.len(), 1);
    for arena in [a, b, c] {
        assert!(!pools.contains(arena));
        assert_eq!(pools.parent_of(arena), Err(LifecycleError::NoArena(arena)));
    }

    let stats = pools.stats().snapshot();
    assert_eq!(stats.arenas_created, 4);
    assert_eq!(stats.arenas_destroyed, 3);
}

#[test]
fn test_cleanups_run_lifo() {
    let pools = tree();
    let arena = pools.create_child(None, false).unwrap();
    let log: Log = Arc::default();
    record(&pools, arena, "first", &log);
    record(&pools, arena, "second", &log);
    record(&pools, arena, "third", &log);

    pools.destroy(arena).unwrap();
    assert_eq!(*log.lock(), vec!["third", "second", "first"]);
}

#[test]
fn test_siblings_torn_down_newest_first() {
    let pools = tree();
    let parent = pools.create_child(None, false).unwrap();
    let log: Log = Arc::default();
    for name in ["one", "two", "three"] {
        let child = pools.create_child(Some(parent), false).unwrap();
        record(&pools, child, name, &log);
    }
    record(&pools, parent, "parent", &log);

    pools.destroy(parent).unwrap();
    assert_eq!(*log.lock(), vec!["three", "two", "one", "parent"]);
}

#[test]
fn test_every_cleanup_runs_despite_failure() {
    let pools = tree();
    let arena = pools.create_child(None, false).unwrap();
    let log: Log = Arc::default();
    record(&pools, arena, "after", &log);
    pools
        .register_cleanup(arena, |_| Err(LifecycleError::Configuration("socket busy".into())))
        .unwrap();
    record(&pools, arena, "before", &log);

    let result = pools.destroy(arena);
    assert_eq!(
        result,
        Err(LifecycleError::Configuration("socket busy".into()))
    );
    assert_eq!(*log.lock(), vec!["before", "after"]);
    assert!(!pools.contains(arena));
}

#[test]
fn test_cleanup_modes() {
    let pools = tree();
    let arena = pools.create_child(None, false).unwrap();
    let modes = Arc::new(Mutex::new(Vec::new()));
    let register = |modes: &Arc<Mutex<Vec<CleanupMode>>>| {
        let modes = modes.clone();
        pools
            .register_cleanup(arena, move |mode| {
                modes.lock().push(mode);
                Ok(())
            })
            .unwrap();
    };

    register(&modes);
    pools.clear(arena).unwrap();
    register(&modes);
    pools.destroy(arena).unwrap();

    assert_eq!(
        *modes.lock(),
        vec![CleanupMode::Recycle, CleanupMode::CascadedFromAncestor]
    );
}

#[test]
fn test_cleanup_may_destroy_its_own_arena() {
    let pools = Arc::new(tree());
    let arena = pools.create_child(None, false).unwrap();
    let weak = Arc::downgrade(&pools);
    pools
        .register_cleanup(arena, move |_| match weak.upgrade() {
            Some(pools) => pools.destroy(arena),
            None => Ok(()),
        })
        .unwrap();

    pools.destroy(arena).unwrap();
    assert!(!pools.contains(arena));
}

#[test]
fn test_stale_id_after_slot_reuse() {
    let pools = tree();
    let first = pools.create_child(None, false).unwrap();
    pools.destroy(first).unwrap();
    let second = pools.create_child(None, false).unwrap();

    assert_ne!(first, second);
    assert_eq!(first.index(), second.index());
    assert!(pools.contains(second));
    assert_eq!(pools.child_count(first), Err(LifecycleError::NoArena(first)));
    // Destroying through the stale id leaves the new arena alone
    pools.destroy(first).unwrap();
    assert!(pools.contains(second));
}

#[test]
fn test_arena_limit() {
    let config = PoolConfig {
        max_arenas: 3,
        ..PoolConfig::default()
    };
    let pools = PoolTree::new(config, Arc::new(LifecycleStats::new())).unwrap();
    let a = pools.create_child(None, false).unwrap();
    pools.create_child(None, false).unwrap();
    assert!(matches!(
        pools.create_child(None, false),
        Err(LifecycleError::OutOfMemory { limit: 3, .. })
    ));

    pools.destroy(a).unwrap();
    assert!(pools.create_child(None, false).is_ok());
}

#[test]
fn test_destroying_root_shuts_down() {
    let pools = tree();
    let child = pools.create_child(None, false).unwrap();
    pools.destroy(pools.root()).unwrap();
    assert!(!pools.contains(child));
    assert!(pools.contains(pools.root()));
    assert!(matches!(
        pools.register_cleanup(pools.root(), |_| Ok(())),
        Err(LifecycleError::NoArena(_))
    ));
}

#[test]
fn test_scratch_region_per_arena() {
    let pools = tree();
    let arena = pools.create_child(None, false).unwrap();
    let label = pools
        .with_scratch(arena, |bump| bump.alloc_str("C:\\Windows\\Temp").len())
        .unwrap();
    assert_eq!(label, 15);
    assert!(pools.scratch_bytes(arena).unwrap() >= 15);

    pools.destroy(arena).unwrap();
    assert!(pools.with_scratch(arena, |_| ()).is_err());
}
