/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::data_structures::InlineString;
use super::types::{ArenaId, ObjectId};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LifecycleError {
    #[error("Invalid handle {0}")]
    #[diagnostic(
        code(lifecycle::invalid_handle),
        help("The object was never initialized or the id did not come from this runtime.")
    )]
    InvalidHandle(ObjectId),

    #[error("Object {0} is interrupted")]
    #[diagnostic(
        code(lifecycle::interrupted),
        help("The object is being disposed. Drop the reference held by the host proxy.")
    )]
    Interrupted(ObjectId),

    #[error("Drain timed out after {waited_ms}ms with {in_flight} call(s) in flight")]
    #[diagnostic(
        code(lifecycle::timeout),
        help("A native call did not return within the drain bound. Retry the free or raise LIFECYCLE_DRAIN_TIMEOUT_MS.")
    )]
    Timeout { waited_ms: u64, in_flight: u32 },

    #[error("Out of memory: {live} live, limit {limit}")]
    #[diagnostic(
        code(lifecycle::out_of_memory),
        help("Too many arenas or in-flight calls are alive. Free unused objects or raise LIFECYCLE_MAX_ARENAS.")
    )]
    OutOfMemory { live: usize, limit: usize },

    #[error("Arena {0} does not exist")]
    #[diagnostic(
        code(lifecycle::no_arena),
        help("The arena was destroyed, is being torn down, or the runtime has shut down.")
    )]
    NoArena(ArenaId),

    #[error("Object {0} is already finalized")]
    #[diagnostic(
        code(lifecycle::already_finalized),
        help("The object was disposed explicitly or by its parent arena.")
    )]
    AlreadyFinalized(ObjectId),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(lifecycle::configuration),
        help("Review the lifecycle configuration and LIFECYCLE_* environment variables.")
    )]
    Configuration(InlineString),
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// ABI-stable status codes for hosts that cannot carry Rust errors
///
/// `Ok` is zero, every error is negative.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Ok = 0,
    InvalidHandle = -1,
    Interrupted = -2,
    Timeout = -3,
    OutOfMemory = -4,
    NoArena = -5,
    AlreadyFinalized = -6,
    Configuration = -7,
}

impl From<&LifecycleError> for ErrorCode {
    fn from(err: &LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidHandle(_) => ErrorCode::InvalidHandle,
            LifecycleError::Interrupted(_) => ErrorCode::Interrupted,
            LifecycleError::Timeout { .. } => ErrorCode::Timeout,
            LifecycleError::OutOfMemory { .. } => ErrorCode::OutOfMemory,
            LifecycleError::NoArena(_) => ErrorCode::NoArena,
            LifecycleError::AlreadyFinalized(_) => ErrorCode::AlreadyFinalized,
            LifecycleError::Configuration(_) => ErrorCode::Configuration,
        }
    }
}

impl<T> From<&LifecycleResult<T>> for ErrorCode {
    fn from(result: &LifecycleResult<T>) -> Self {
        match result {
            Ok(_) => ErrorCode::Ok,
            Err(err) => err.into(),
        }
    }
}

/// Serializable error representation for hosts that marshal text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SerializableError {
    pub code: ErrorCode,
    pub message: InlineString,
}

impl From<&LifecycleError> for SerializableError {
    fn from(err: &LifecycleError) -> Self {
        Self {
            code: err.into(),
            message: err.to_string().into(),
        }
    }
}
