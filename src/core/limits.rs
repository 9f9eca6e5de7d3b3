/*!
 * System Limits and Constants
 *
 * Centralized location for lifecycle limits, thresholds, and magic numbers.
 * Organized by subsystem (drain, pool, cache, handle encoding).
 *
 * - Performance-critical constants are marked with [PERF]
 * - Values a host may override through `LifecycleConfig::from_env` are
 *   marked with [ENV]
 */

use std::time::Duration;

// =============================================================================
// DRAIN LIMITS
// =============================================================================

/// Upper bound on a refcount drain before `Timeout` is surfaced (5s)
/// [ENV] LIFECYCLE_DRAIN_TIMEOUT_MS
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Time spent spinning before parking on the drain condvar
/// [PERF] Most in-flight native calls finish within a few microseconds
pub const DEFAULT_DRAIN_SPIN: Duration = Duration::from_micros(10);

/// Maximum spin iterations before parking
/// [ENV] LIFECYCLE_DRAIN_MAX_SPINS
pub const DEFAULT_DRAIN_MAX_SPINS: u32 = 100;

/// Iterations of `spin_loop()` before the backoff starts yielding
pub const SPIN_PHASE_ITERATIONS: u32 = 10;

/// Most in-flight calls a single object can carry
/// The gate word reserves its top four bits for state flags
pub const MAX_IN_FLIGHT: u32 = (1 << 28) - 1;

// =============================================================================
// POOL LIMITS
// =============================================================================

/// Maximum live arenas per pool tree (root included)
/// Exceeding it fails `create_child` with `OutOfMemory`
/// [ENV] LIFECYCLE_MAX_ARENAS
pub const DEFAULT_MAX_ARENAS: usize = 1 << 20;

/// Initial scratch capacity of a new arena (bytes)
/// [PERF] Zero: most arenas only carry cleanups and never touch scratch
pub const DEFAULT_SCRATCH_CAPACITY: usize = 0;

// =============================================================================
// CACHE LIMITS
// =============================================================================

/// Default initial capacity of a cache table
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Capacity multiplier applied when a cache table fills up
pub const CACHE_GROWTH_FACTOR: usize = 2;

/// Polynomial multiplier of the cache key hash
pub const CACHE_HASH_MULTIPLIER: u32 = 33;

// =============================================================================
// HANDLE ENCODING
// =============================================================================

/// Bits of a raw id occupied by the generation counter
pub const GENERATION_BITS: u32 = 32;
