/*!
 * Explicit Disposal Tests
 * Free, interrupt and enter semantics of a single native object
 */

use native_lifecycle::{
    CleanupMode, ErrorCode, HostBinding, HostProxy, LifecycleConfig, LifecycleError, ObjectInit,
    ObjectState, Runtime,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct RecordingProxy {
    bindings: Mutex<Vec<HostBinding>>,
}

impl HostProxy for RecordingProxy {
    fn publish(&self, binding: HostBinding) {
        self.bindings.lock().push(binding);
    }
}

fn runtime() -> Runtime {
    Runtime::new(LifecycleConfig::default()).expect("Failed to create runtime")
}

#[test]
fn test_free_returns_parent_child_count_to_zero() {
    let rt = runtime();
    let parent = rt.pools().create_child(None, false).unwrap();
    let id = rt.alloc();
    rt.init(id, ObjectInit::new().parent(parent)).unwrap();
    assert_eq!(rt.pools().child_count(parent).unwrap(), 1);

    rt.free(id).expect("Free should succeed");
    assert_eq!(rt.pools().child_count(parent).unwrap(), 0);
    assert_eq!(rt.live_objects(), 0);
}

#[test]
fn test_enter_after_free_never_reaches_payload() {
    let rt = runtime();
    let id = rt.alloc();
    rt.init(id, ObjectInit::new()).unwrap();
    rt.enter(id).unwrap().store(String::from("socket"), None);

    rt.free(id).unwrap();
    let err = rt.enter(id).unwrap_err();
    assert!(
        matches!(
            err,
            LifecycleError::AlreadyFinalized(_) | LifecycleError::InvalidHandle(_)
        ),
        "unexpected error: {err}"
    );
    assert_eq!(ErrorCode::from(&err), ErrorCode::AlreadyFinalized);
}

#[test]
fn test_cleanup_and_finalizer_run_once() {
    let rt = runtime();
    let id = rt.alloc();
    let cleanups = Arc::new(Mutex::new(Vec::new()));
    let finalized = Arc::new(AtomicU32::new(0));

    let record = cleanups.clone();
    rt.set_cleanup(id, move |mode, slot| {
        record.lock().push((mode, slot.take_payload::<u64>()));
    })
    .unwrap();
    let counter = finalized.clone();
    rt.init(
        id,
        ObjectInit::new().on_finalize(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    )
    .unwrap();
    rt.enter(id).unwrap().store(77u64, Some(1));

    rt.free(id).unwrap();
    assert_eq!(rt.free(id), Err(LifecycleError::AlreadyFinalized(id)));

    assert_eq!(*cleanups.lock(), vec![(CleanupMode::Explicit, Some(77))]);
    assert_eq!(finalized.load(Ordering::SeqCst), 1);
}

#[test]
fn test_binding_published_to_host() {
    let rt = runtime();
    let proxy = Arc::new(RecordingProxy::default());
    let id = rt.alloc();
    let arena = rt.init(id, ObjectInit::new().host(&proxy)).unwrap();

    assert_eq!(*proxy.bindings.lock(), vec![HostBinding { object: id, arena }]);
    assert!(rt.host(id).unwrap().is_some());
    assert_eq!(rt.arena_of(id).unwrap(), Some(arena));
}

#[test]
fn test_host_proxy_is_held_weakly() {
    let rt = runtime();
    let proxy = Arc::new(RecordingProxy::default());
    let id = rt.alloc();
    rt.init(id, ObjectInit::new().host(&proxy)).unwrap();

    drop(proxy);
    assert!(rt.host(id).unwrap().is_none());
    rt.free(id).unwrap();
}

#[test]
fn test_interrupt_refuses_new_calls() {
    let rt = runtime();
    let id = rt.alloc();
    rt.init(id, ObjectInit::new()).unwrap();

    let guard = rt.enter(id).unwrap();
    rt.interrupt(id).unwrap();
    assert_eq!(rt.state(id).unwrap(), ObjectState::Interrupting);
    assert_eq!(rt.enter(id).unwrap_err(), LifecycleError::Interrupted(id));
    assert_eq!(
        guard.checkpoint(),
        Err(LifecycleError::Interrupted(id)),
        "in-flight call should observe the interrupt at its next checkpoint"
    );
    drop(guard);
    rt.free(id).unwrap();
}

#[test]
fn test_interrupt_uninit_is_invalid() {
    let rt = runtime();
    let id = rt.alloc();
    assert_eq!(rt.interrupt(id), Err(LifecycleError::InvalidHandle(id)));
}

#[test]
fn test_state_transitions() {
    let rt = runtime();
    let id = rt.alloc();
    assert_eq!(rt.state(id).unwrap(), ObjectState::Uninit);
    rt.init(id, ObjectInit::new()).unwrap();
    assert_eq!(rt.state(id).unwrap(), ObjectState::Active);
    rt.free(id).unwrap();
    assert_eq!(rt.state(id).unwrap(), ObjectState::Finalized);
}

#[test]
fn test_freeing_exclusive_object_arena() {
    let rt = runtime();
    let id = rt.alloc();
    let arena = rt.init(id, ObjectInit::new().exclusive(true)).unwrap();
    assert_eq!(rt.pools().lock_ancestry(arena).unwrap().owner(), arena);

    let inner = rt.pools().create_child(Some(arena), false).unwrap();
    rt.free(id).unwrap();
    assert!(!rt.pools().contains(arena));
    assert!(!rt.pools().contains(inner));
}

#[test]
fn test_stats_count_explicit_frees() {
    let rt = runtime();
    for _ in 0..3 {
        let id = rt.alloc();
        rt.init(id, ObjectInit::new()).unwrap();
        rt.free(id).unwrap();
    }
    let stats = rt.stats();
    assert_eq!(stats.finalized_explicit, 3);
    assert_eq!(stats.objects_live, 0);
    assert_eq!(stats.arenas_live, 1);
}
