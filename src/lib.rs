//! order-hashmap: a single-threaded hash map that iterates its entries in
//! insertion order.
//!
//! Internal Design:
//!
//! Summary
//! - OrderHashMap<K, V, S> is a chained hash map built from two cooperating
//!   structures:
//!   - an order list: the entries' true storage, a slot arena (generational
//!     keys via `slotmap`) threaded into a doubly-linked chain so iteration
//!     runs oldest-inserted first and removal is O(1) once located.
//!   - a bucket index: a `Vec` of per-bucket slot-key lists. An entry's
//!     bucket is its cached hash taken modulo the bucket count (always a
//!     power of two, so a mask).
//! - The bucket index holds only non-owning back-references; the arena owns
//!   every entry. Rebuilding the index never moves or re-keys an entry.
//!
//! Growth policy
//! - The table starts at 8 buckets and doubles whenever an insert is about
//!   to land while `4 * len >= bucket_count`, i.e. the check runs before the
//!   new entry is counted. A doubling rebuilds the bucket index in one pass
//!   over the order chain; the order list itself is untouched, so positions
//!   handed out earlier stay valid across growth.
//! - The table never shrinks on removal. `clear()` resets it to 8 buckets.
//!
//! Duplicate policy
//! - First write wins: inserting a present key is a no-op that keeps the
//!   original value. This is deliberate, observable behavior, not a missing
//!   upsert; use `get_mut` or a position to update a value in place.
//!
//! Hasher and rehashing invariants
//! - Each entry stores its full `u64` hash at insertion time and the index
//!   only ever consults the stored hash; `K: Hash` runs for fresh lookup
//!   keys, never during growth or while routing a removal.
//!
//! Notes and non-goals
//! - Single-threaded; every mutation takes `&mut self`, so concurrent use
//!   needs external serialization.
//! - No shrink-on-erase, no custom allocators, no persistence.
//! - Only insertion order is preserved; there is no ordering by key value.
//! - Positions ([`Pos`]) survive growth and unrelated removals, go stale on
//!   removal of their entry or on `clear()`, and never alias later entries
//!   (slot keys are generational).

pub mod order_hash_map;
mod order_hash_map_proptest;

// Public surface
pub use order_hash_map::{
    IntoIter, Iter, IterMut, Keys, OrderHashMap, OutOfRange, Pos, Values, ValuesMut,
};
