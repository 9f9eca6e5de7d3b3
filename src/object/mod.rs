/*!
 * Native Objects
 *
 * Reference-counted handles binding one host proxy to one OS resource, and
 * the disposal protocol that tears each one down exactly once.
 *
 * ## States
 *
 * ```text
 * Uninit --init--> Active --interrupt/free--> Interrupting --> Finalized
 *                   ^  |
 *                   +--+ clear
 * ```
 */

mod cell;
mod guard;
mod host;
mod init;
mod slot;
mod table;

pub use cell::ObjectState;
pub use guard::EnterGuard;
pub use host::{FinalizerToken, HostBinding, HostFinalizer, HostProxy};
pub use init::ObjectInit;
pub use slot::{NativeSlot, ObjectCleanupFn, Payload};

pub(crate) use cell::{cascade_hook, ObjectCell};
pub(crate) use table::ObjectTable;
