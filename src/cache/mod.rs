/*!
 * Cache Tables
 * Per-call deduplication of keyed enumeration results
 */

mod table;

pub use table::{CacheEntry, CacheTable};
