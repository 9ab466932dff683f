//! # Sequence Allocator
//!
//! Human-readable integer ids ("1", "2", ...) derived from the live
//! collection.
//!
//! ```text
//!   ids in collection:  "3"  "7"  "mv_12"  "x"      start offset: 1
//!                        │    │     ╳       ╳
//!                        ▼    ▼
//!   max({3, 7} ∪ {0}) + 1  =  "8"
//! ```
//!
//! The next id follows the highest surviving id. Gaps are never refilled,
//! but deleting the current maximum lets the next id step back down to it.
//! Always allocate against the live dataset while holding its write lock;
//! a stale copy hands out duplicates.

use crate::dataset::Entity;

/// Returns the next sequence id for `collection`.
///
/// ```rust
/// use tally_core::{sequence::next_id, Product};
///
/// let empty: Vec<Product> = Vec::new();
/// assert_eq!(next_id(&empty, 1), "1");
/// assert_eq!(next_id(&empty, 1000), "1000");
/// ```
pub fn next_id<E: Entity>(collection: &[E], start_offset: i64) -> String {
    next_id_from(collection.iter().map(|e| e.id()), start_offset)
}

/// Same as [`next_id`] over bare id strings.
pub fn next_id_from<'a>(ids: impl IntoIterator<Item = &'a str>, start_offset: i64) -> String {
    let floor = start_offset.saturating_sub(1);
    let max = ids
        .into_iter()
        .filter_map(|id| id.trim().parse::<i64>().ok())
        .fold(floor, i64::max);
    max.saturating_add(1).to_string()
}
