/*!
 * Global Runtime Tests
 * The process-wide runtime is created once and shared
 */

use native_lifecycle::{ObjectInit, ObjectState, Runtime};
use serial_test::serial;
use std::thread;

#[test]
#[serial]
fn test_global_is_singleton() {
    let first = Runtime::global() as *const Runtime;
    let handles: Vec<_> = (0..4)
        .map(|_| thread::spawn(|| Runtime::global() as *const Runtime as usize))
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), first as usize);
    }
}

#[test]
#[serial]
fn test_global_root_outlives_objects() {
    let runtime = Runtime::global();
    let root = runtime.pools().root();
    let live = runtime.live_objects();

    let id = runtime.alloc();
    let arena = runtime.init(id, ObjectInit::new()).unwrap();
    assert_eq!(runtime.pools().parent_of(arena).unwrap(), Some(root));

    runtime.free(id).unwrap();
    assert_eq!(runtime.state(id).unwrap(), ObjectState::Finalized);
    assert_eq!(runtime.live_objects(), live);
    assert!(runtime.pools().contains(root));
}

#[test]
#[serial]
fn test_global_stats_accumulate() {
    let runtime = Runtime::global();
    let before = runtime.stats();

    let scope = runtime.pools().create_child(None, false).unwrap();
    for _ in 0..3 {
        let id = runtime.alloc();
        runtime.init(id, ObjectInit::new().parent(scope)).unwrap();
    }
    runtime.pools().destroy(scope).unwrap();

    let after = runtime.stats();
    assert_eq!(after.finalized_cascade - before.finalized_cascade, 3);
    assert_eq!(after.arenas_destroyed - before.arenas_destroyed, 4);
}
