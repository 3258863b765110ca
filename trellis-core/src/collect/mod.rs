//! Ordered Collections
//!
//! Three collection primitives that schedulers use to decide the order in
//! which graph work happens:
//!
//! - [`SkipMap`] / [`SkipSet`]: comparator-ordered map and set with
//!   ceiling/floor/higher/lower lookups and a cursor that can remove as it walks.
//! - [`BinaryHeap`]: min-heap over `f64` priorities. Inserting returns a
//!   [`HeapEntry`] handle for O(log n) priority changes and removal, and a
//!   deferred-ordering mode turns bulk loads into a single O(n) heapify.
//! - [`KeyedPriorityQueue`]: at most one element per key, FIFO among equals.
//!
//! None of these are thread-safe; they are meant to be owned by one solving
//! session at a time.

pub mod heap;
pub mod keyed_queue;
pub mod skip_list;

pub use heap::{merge_into, BinaryHeap, Heap, HeapEntry};
pub use keyed_queue::{Keyed, KeyedPriorityQueue, UniquePriorityQueue};
pub use skip_list::{Comparator, Cursor, SkipMap, SkipSet};
