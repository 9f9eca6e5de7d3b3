/*!
 * Data Structures
 *
 * - Inline strings for short keys and error context
 * - Generational slot map for arena and object identities
 */

mod inline_string;
mod slot_map;

pub use inline_string::InlineString;
pub use slot_map::{SlotMap, SlotMiss};
