/*!
 * Lifecycle Soak - Main Entry Point
 *
 * Drives the disposal protocol under load:
 * - Worker threads looping enter / hold / leave on a shared object
 * - A controller that interrupts and frees it mid-flight
 * - A cascade round that destroys a scope full of live objects
 *
 * Prints a JSON counter snapshot when done.
 */

use native_lifecycle::{
    init_tracing, CleanupMode, LifecycleConfig, LifecycleError, ObjectInit, Runtime,
};
use std::error::Error;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

struct SoakConfig {
    threads: usize,
    rounds: usize,
    hold: Duration,
    free_after: Duration,
    cascade_objects: usize,
}

impl SoakConfig {
    fn from_env() -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            threads: env_or("LIFECYCLE_SOAK_THREADS", 50)?,
            rounds: env_or("LIFECYCLE_SOAK_ROUNDS", 20)?,
            hold: Duration::from_millis(env_or("LIFECYCLE_SOAK_HOLD_MS", 1)?),
            free_after: Duration::from_millis(env_or("LIFECYCLE_SOAK_FREE_AFTER_MS", 5)?),
            cascade_objects: env_or("LIFECYCLE_SOAK_CASCADE_OBJECTS", 64)?,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, Box<dyn Error>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{key}={raw:?} is not a number").into()),
        Err(_) => Ok(default),
    }
}

/// One contended free: workers hammer the object until it refuses them
fn contended_free(runtime: &Runtime, soak: &SoakConfig) -> Result<(), Box<dyn Error>> {
    let scope = runtime.pools().create_child(None, false)?;
    let id = runtime.alloc();
    let cleanups = Arc::new(AtomicU32::new(0));
    let counter = cleanups.clone();
    runtime.set_cleanup(id, move |mode, slot| {
        if mode.is_final() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        slot.take_any();
    })?;
    runtime.init(id, ObjectInit::new().parent(scope))?;

    let active = AtomicUsize::new(0);
    let refused = AtomicUsize::new(0);
    let started = Instant::now();

    let in_flight_at_free = thread::scope(|s| {
        for _ in 0..soak.threads {
            s.spawn(|| loop {
                match runtime.enter(id) {
                    Ok(guard) => {
                        active.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(soak.hold);
                        active.fetch_sub(1, Ordering::SeqCst);
                        guard.leave();
                    }
                    Err(LifecycleError::Interrupted(_)) | Err(LifecycleError::AlreadyFinalized(_)) => {
                        refused.fetch_add(1, Ordering::SeqCst);
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Unexpected enter failure");
                        break;
                    }
                }
            });
        }

        thread::sleep(soak.free_after);
        runtime.interrupt(id)?;
        runtime.free(id)?;
        Ok::<_, LifecycleError>(active.load(Ordering::SeqCst))
    })?;

    if in_flight_at_free != 0 {
        return Err(format!("free returned with {in_flight_at_free} call(s) still in flight").into());
    }
    let runs = cleanups.load(Ordering::SeqCst);
    if runs != 1 {
        return Err(format!("cleanup ran {runs} times").into());
    }
    runtime.pools().destroy(scope)?;

    info!(
        threads = soak.threads,
        refused = refused.load(Ordering::SeqCst),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Contended free round complete"
    );
    Ok(())
}

/// Destroy a scope holding many live objects and check each cascaded once
fn cascade_round(runtime: &Runtime, soak: &SoakConfig) -> Result<(), Box<dyn Error>> {
    let scope = runtime.pools().create_child(None, true)?;
    let cascaded = Arc::new(AtomicUsize::new(0));
    let mut ids = Vec::with_capacity(soak.cascade_objects);

    for _ in 0..soak.cascade_objects {
        let id = runtime.alloc();
        let counter = cascaded.clone();
        runtime.init(
            id,
            ObjectInit::new().parent(scope).on_finalize(move |mode| {
                if mode == CleanupMode::CascadedFromAncestor {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }),
        )?;
        ids.push(id);
    }

    runtime.pools().destroy(scope)?;
    let count = cascaded.load(Ordering::SeqCst);
    if count != soak.cascade_objects {
        return Err(format!("{count} of {} objects cascaded", soak.cascade_objects).into());
    }
    for id in ids {
        runtime.free(id)?;
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    info!("Lifecycle soak starting...");
    info!("================================================");

    let config = LifecycleConfig::from_env()?;
    let soak = SoakConfig::from_env()?;
    info!(
        drain_timeout_ms = config.drain.timeout.as_millis() as u64,
        max_arenas = config.pool.max_arenas,
        threads = soak.threads,
        rounds = soak.rounds,
        "Configuration loaded"
    );

    let runtime = Runtime::new(config)?;
    for round in 0..soak.rounds {
        contended_free(&runtime, &soak)?;
        cascade_round(&runtime, &soak)?;
        info!(round, "Round complete");
    }
    runtime.shutdown()?;

    info!("Soak complete");
    info!("================================================");
    println!("{}", serde_json::to_string_pretty(&runtime.stats())?);
    Ok(())
}
