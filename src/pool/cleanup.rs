/*!
 * Cleanup Registration
 * Callbacks an arena runs when it is cleared or torn down
 */

use crate::core::errors::LifecycleResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a cleanup (or an object's cleanup function) is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupMode {
    /// The host freed the object itself
    Explicit,
    /// An ancestor arena is being destroyed
    CascadedFromAncestor,
    /// The arena or object is being reset for reuse
    Recycle,
}

impl CleanupMode {
    /// Whether the resource is gone for good after this cleanup
    #[inline]
    pub const fn is_final(self) -> bool {
        !matches!(self, CleanupMode::Recycle)
    }
}

impl fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupMode::Explicit => write!(f, "explicit"),
            CleanupMode::CascadedFromAncestor => write!(f, "cascade"),
            CleanupMode::Recycle => write!(f, "recycle"),
        }
    }
}

/// Handle to a registered cleanup, unique within its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CleanupToken(pub(crate) u64);

/// Registered cleanup; the payload it releases lives in its captures
pub type CleanupFn = Box<dyn FnOnce(CleanupMode) -> LifecycleResult<()> + Send>;

pub(crate) struct CleanupEntry {
    pub(crate) token: CleanupToken,
    pub(crate) run: CleanupFn,
}

/// Run cleanups newest first, keeping the first error
pub(crate) fn run_all(entries: Vec<CleanupEntry>, mode: CleanupMode) -> LifecycleResult<()> {
    let mut first_error = None;
    for entry in entries.into_iter().rev() {
        if let Err(e) = (entry.run)(mode) {
            tracing::warn!(token = entry.token.0, %mode, error = %e, "Arena cleanup failed");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
