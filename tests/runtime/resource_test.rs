/*!
 * Managed Resource Tests
 * Typed resource modules on top of the disposal protocol
 */

use native_lifecycle::{
    CleanupMode, Discriminator, HostBinding, HostProxy, LifecycleConfig, LifecycleError,
    ManagedResource, NativeResource, ObjectInit, ObjectState, Runtime,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

type ReleaseLog = Arc<Mutex<Vec<(String, CleanupMode)>>>;

/// Stand-in for a directory iterator handle
struct DirHandle {
    path: String,
    cursor: usize,
    log: ReleaseLog,
}

impl DirHandle {
    fn open(path: &str, log: &ReleaseLog) -> Self {
        Self {
            path: path.to_string(),
            cursor: 0,
            log: log.clone(),
        }
    }
}

impl NativeResource for DirHandle {
    const DISCRIMINATOR: Option<Discriminator> = Some(0xD1);

    fn release(self, mode: CleanupMode) {
        self.log.lock().push((self.path, mode));
    }
}

fn runtime() -> Runtime {
    Runtime::new(LifecycleConfig::default()).unwrap()
}

#[test]
fn test_resources_released_by_scope_teardown() {
    let rt = runtime();
    let log: ReleaseLog = Arc::default();
    let scope = rt.pools().create_child(None, false).unwrap();

    let dirs: Vec<_> = ["/tmp", "/var", "/etc"]
        .iter()
        .map(|path| {
            let init = ObjectInit::new().parent(scope);
            ManagedResource::open(&rt, init, DirHandle::open(path, &log)).unwrap()
        })
        .collect();
    for dir in &dirs {
        assert_eq!(rt.pools().parent_of(dir.arena()).unwrap(), Some(scope));
    }

    rt.pools().destroy(scope).unwrap();
    let released: Vec<_> = log.lock().iter().map(|(path, _)| path.clone()).collect();
    assert_eq!(released, vec!["/etc", "/var", "/tmp"]);

    for dir in dirs {
        assert_eq!(
            dir.with(|handle| handle.cursor).unwrap_err(),
            LifecycleError::AlreadyFinalized(dir.id())
        );
        assert_eq!(rt.state(dir.id()).unwrap(), ObjectState::Finalized);
        dir.close().unwrap();
    }
    assert_eq!(log.lock().len(), 3);
}

#[test]
fn test_free_waits_for_reader() {
    let rt = runtime();
    let log: ReleaseLog = Arc::default();
    let dir = ManagedResource::open(&rt, ObjectInit::new(), DirHandle::open("/srv", &log)).unwrap();
    let inside = Barrier::new(2);
    let finished = AtomicBool::new(false);

    thread::scope(|s| {
        let reader = s.spawn(|| {
            dir.with_mut(|handle| {
                inside.wait();
                for _ in 0..5 {
                    handle.cursor += 1;
                    thread::sleep(Duration::from_millis(5));
                }
                finished.store(true, Ordering::SeqCst);
                handle.cursor
            })
        });

        inside.wait();
        rt.free(dir.id()).unwrap();
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(reader.join().unwrap(), Ok(5));
    });

    assert_eq!(*log.lock(), vec![("/srv".to_string(), CleanupMode::Explicit)]);
    assert!(dir.with(|handle| handle.cursor).is_err());
}

#[test]
fn test_discriminator_stored_with_payload() {
    let rt = runtime();
    let log: ReleaseLog = Arc::default();
    let dir = ManagedResource::open(&rt, ObjectInit::new(), DirHandle::open("/opt", &log)).unwrap();

    let guard = rt.enter(dir.id()).unwrap();
    assert_eq!(guard.discriminator(), DirHandle::DISCRIMINATOR);
    assert_eq!(
        guard.payload::<DirHandle>().map(|h| h.path.clone()),
        Some("/opt".to_string())
    );
    drop(guard);

    dir.close().unwrap();
}

#[test]
fn test_replace_recycles_in_place() {
    let rt = runtime();
    let log: ReleaseLog = Arc::default();
    let dir = ManagedResource::open(&rt, ObjectInit::new(), DirHandle::open("/a", &log)).unwrap();
    let arena = dir.arena();

    dir.replace(DirHandle::open("/b", &log)).unwrap();
    assert_eq!(rt.arena_of(dir.id()).unwrap(), Some(arena));
    assert_eq!(dir.with(|h| h.path.clone()).unwrap(), "/b");

    dir.close().unwrap();
    assert_eq!(
        *log.lock(),
        vec![
            ("/a".to_string(), CleanupMode::Recycle),
            ("/b".to_string(), CleanupMode::Explicit),
        ]
    );
}

/// Host that interrupts every object as soon as it is published
struct InterruptingHost {
    runtime: Arc<Runtime>,
}

impl HostProxy for InterruptingHost {
    fn publish(&self, binding: HostBinding) {
        self.runtime.interrupt(binding.object).unwrap();
    }
}

#[test]
fn test_open_interrupted_before_store_releases_payload() {
    let rt = Arc::new(runtime());
    let log: ReleaseLog = Arc::default();
    let host = Arc::new(InterruptingHost {
        runtime: rt.clone(),
    });

    let result = ManagedResource::open(
        &rt,
        ObjectInit::new().host(&host),
        DirHandle::open("/proc", &log),
    );
    assert!(matches!(result, Err(LifecycleError::Interrupted(_))));
    assert_eq!(*log.lock(), vec![("/proc".to_string(), CleanupMode::Explicit)]);
    assert_eq!(rt.live_objects(), 0);
    assert_eq!(rt.pools().len(), 1);
}

#[test]
fn test_replace_on_finalized_object_releases_new_payload() {
    let rt = runtime();
    let log: ReleaseLog = Arc::default();
    let scope = rt.pools().create_child(None, false).unwrap();
    let dir = ManagedResource::open(
        &rt,
        ObjectInit::new().parent(scope),
        DirHandle::open("/home", &log),
    )
    .unwrap();
    rt.pools().destroy(scope).unwrap();

    assert_eq!(
        dir.replace(DirHandle::open("/root", &log)),
        Err(LifecycleError::AlreadyFinalized(dir.id()))
    );
    assert_eq!(
        *log.lock(),
        vec![
            ("/home".to_string(), CleanupMode::CascadedFromAncestor),
            ("/root".to_string(), CleanupMode::Explicit),
        ]
    );
    dir.close().unwrap();
}
