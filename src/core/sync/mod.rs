/*!
 * Synchronization Primitives
 *
 * Wait/notify building blocks for the disposal protocol:
 * - `DrainGate`: packed refcount + flags with a condvar-backed drain
 * - `Backoff`: bounded spin phase before parking
 * - `DrainConfig`: drain bounds and presets
 *
 * # Use Cases
 *
 * - **Explicit free**: wait for in-flight native calls before teardown
 * - **Cascade teardown**: same wait, driven by an ancestor arena
 * - **Recycle**: drain, reset the payload, reopen the gate
 */

mod config;
mod drain;
mod spinwait;

pub use config::DrainConfig;
pub use drain::{DrainGate, DrainReport, DrainTimeout, LeaveOutcome, Refusal};
pub use spinwait::Backoff;
