//! Binary Heap
//!
//! A min-priority queue over `(element, f64 priority)` pairs. Every insertion
//! returns a [`HeapEntry`] handle; the entry remembers its own position in the
//! backing array, so changing its priority or removing it is O(log n) with no
//! search.
//!
//! # Deferred Ordering
//!
//! When many entries are about to be added or changed, restoring the heap
//! property after each one costs O(n log n) overall. In deferred mode the heap
//! instead tracks `ordered_upto`, the prefix of the array still known to be a
//! valid heap, and lets new or changed entries sit past it. The next operation
//! that needs the true minimum restores order in one pass:
//!
//! - at most half ordered: bottom-up heapify of the whole array, O(n);
//! - more than half ordered: the unordered tail consists only of leaves, so
//!   each one is raised individually.
//!
//! An empty heap always starts in deferred mode, the cheapest state for the
//! next bulk load.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::{Error, Result};

/// Minimal contract shared by dynamic-priority heaps.
pub trait Heap<E> {
    /// Handle type returned by [`offer`](Self::offer).
    type Entry: Clone;

    /// Number of entries.
    fn len(&self) -> usize;

    /// True if there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add `element` with `priority`. Fails with [`Error::InvalidPriority`] on NaN.
    fn offer(&mut self, element: E, priority: f64) -> Result<Self::Entry>;

    /// Entry with the lowest priority, restoring order first if needed.
    fn peek_entry(&mut self) -> Option<Self::Entry>;

    /// Remove and return the entry with the lowest priority.
    fn poll_entry(&mut self) -> Option<Self::Entry>;

    /// Change the priority of `entry`. Returns `Ok(false)` if the entry is not
    /// currently in this heap.
    fn change_priority(&mut self, entry: &Self::Entry, priority: f64) -> Result<bool>;

    /// True if `entry` is currently held by this heap.
    fn contains_entry(&self, entry: &Self::Entry) -> bool;

    /// Remove `entry`. Returns false if it was not in this heap.
    fn remove_entry(&mut self, entry: &Self::Entry) -> bool;

    /// Remove every entry, returning `(element, priority)` pairs in array order.
    fn drain_pairs(&mut self) -> Vec<(E, f64)>;

    /// Remove every entry.
    fn clear(&mut self);
}

/// Move every entry of `source` into `target` by repeated offers. O(n log n).
///
/// This is the fallback for heaps of different concrete types;
/// [`BinaryHeap::merge`] migrates entries directly in O(n).
pub fn merge_into<E, T, S>(target: &mut T, source: &mut S) -> Result<()>
where
    T: Heap<E> + ?Sized,
    S: Heap<E> + ?Sized,
{
    for (element, priority) in source.drain_pairs() {
        target.offer(element, priority)?;
    }
    Ok(())
}

struct EntryCell<E> {
    element: E,
    priority: Cell<f64>,
    /// Position in the owning heap's array, or -1 when not owned.
    offset: Cell<isize>,
}

/// Handle to an entry of a [`BinaryHeap`].
///
/// Cloning the handle does not copy the entry; both clones refer to it.
pub struct HeapEntry<E> {
    cell: Rc<EntryCell<E>>,
}

impl<E> HeapEntry<E> {
    fn new(element: E, priority: f64) -> Self {
        Self {
            cell: Rc::new(EntryCell {
                element,
                priority: Cell::new(priority),
                offset: Cell::new(-1),
            }),
        }
    }

    /// The element.
    pub fn element(&self) -> &E {
        &self.cell.element
    }

    /// Current priority.
    pub fn priority(&self) -> f64 {
        self.cell.priority.get()
    }

    /// True while some heap holds this entry.
    pub fn is_owned(&self) -> bool {
        self.cell.offset.get() >= 0
    }

    /// Recover the element if this is the last handle to the entry.
    pub fn into_element(self) -> std::result::Result<E, Self> {
        match Rc::try_unwrap(self.cell) {
            Ok(cell) => Ok(cell.element),
            Err(cell) => Err(Self { cell }),
        }
    }

    /// True if both handles refer to the same entry.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }

    fn offset(&self) -> isize {
        self.cell.offset.get()
    }

    fn set_offset(&self, offset: isize) {
        self.cell.offset.set(offset);
    }
}

impl<E> Clone for HeapEntry<E> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for HeapEntry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapEntry")
            .field("element", self.element())
            .field("priority", &self.priority())
            .field("offset", &self.offset())
            .finish()
    }
}

/// Array-based binary min-heap with handle-based updates.
///
/// Insert, poll and priority change are O(log n); bulk insertion or change
/// under deferred ordering is O(n) overall.
pub struct BinaryHeap<E> {
    heap: Vec<HeapEntry<E>>,
    ordered_upto: usize,
    defer_ordering: bool,
}

impl<E> Default for BinaryHeap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> BinaryHeap<E> {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::with_capacity(16)
    }

    /// Create an empty heap with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            ordered_upto: 0,
            defer_ordering: true,
        }
    }

    /// Reserve room for at least `capacity` entries in total.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        self.heap.reserve(capacity.saturating_sub(self.heap.len()));
    }

    /// True if ordering is currently deferred.
    pub fn defers_ordering(&self) -> bool {
        self.defer_ordering
    }

    /// Turn deferred ordering on or off. Turning it off restores order immediately.
    pub fn defer_ordering(&mut self, defer: bool) {
        if defer != self.defer_ordering {
            self.defer_ordering = defer;
            if !defer {
                self.heapify();
            }
        }
    }

    /// Prepare for `n` insertions. Switches to deferred mode when `n` is at
    /// least the current size. Returns whether ordering is now deferred.
    pub fn defer_ordering_for_bulk_add(&mut self, n: usize) -> bool {
        if !self.defer_ordering && n >= self.heap.len() {
            self.defer_ordering = true;
        }
        self.defer_ordering
    }

    /// Prepare for `n` priority changes. Switches to deferred mode when `n` is
    /// at least half the current size. Returns whether ordering is now deferred.
    pub fn defer_ordering_for_bulk_change(&mut self, n: usize) -> bool {
        if !self.defer_ordering && n >= self.heap.len() / 2 {
            self.defer_ordering = true;
        }
        self.defer_ordering
    }

    /// True if the whole array currently satisfies the heap property.
    pub fn is_ordered(&self) -> bool {
        self.ordered_upto >= self.heap.len()
    }

    /// Entries in array order (not priority order).
    pub fn entries(&self) -> impl Iterator<Item = &HeapEntry<E>> {
        self.heap.iter()
    }

    /// First entry whose element equals `element`. O(n).
    pub fn entry_for_element(&self, element: &E) -> Option<HeapEntry<E>>
    where
        E: PartialEq,
    {
        self.heap.iter().find(|e| e.element() == element).cloned()
    }

    /// Element with the lowest priority.
    pub fn peek(&mut self) -> Option<&E> {
        if self.heap.is_empty() {
            return None;
        }
        self.heapify();
        Some(self.heap[0].element())
    }

    /// Element with the lowest priority, or [`Error::Empty`].
    pub fn element(&mut self) -> Result<&E> {
        self.peek().ok_or(Error::Empty)
    }

    /// Remove the lowest-priority entry and return a copy of its element.
    pub fn poll(&mut self) -> Option<E>
    where
        E: Clone,
    {
        self.poll_entry().map(|entry| match entry.into_element() {
            Ok(element) => element,
            Err(entry) => entry.element().clone(),
        })
    }

    /// Merge all entries of `other` into this heap, moving the entry handles
    /// themselves, then reorder once. O(n). `other` is left empty.
    pub fn merge(&mut self, other: &mut BinaryHeap<E>) {
        let prev_len = self.heap.len();
        self.heap.append(&mut other.heap);
        for (i, entry) in self.heap.iter().enumerate().skip(prev_len) {
            entry.set_offset(i as isize);
        }
        other.clear();
        self.heapify();
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check_priority(priority: f64) -> Result<()> {
        if priority.is_nan() {
            return Err(Error::InvalidPriority);
        }
        Ok(())
    }

    fn priority_at(&self, i: usize) -> f64 {
        self.heap[i].priority()
    }

    fn heap_set(&mut self, i: usize, entry: HeapEntry<E>) {
        entry.set_offset(i as isize);
        self.heap[i] = entry;
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.heap[a].set_offset(a as isize);
        self.heap[b].set_offset(b as isize);
    }

    fn heap_adjust(&mut self, offset: usize, old_priority: f64) {
        let priority = self.priority_at(offset);
        if priority < old_priority {
            self.heap_raise(offset);
        } else if priority > old_priority {
            self.sift_down(offset);
        }
    }

    /// Move the entry at `i` up until its parent's priority is not greater.
    fn heap_raise(&mut self, mut i: usize) {
        let priority = self.priority_at(i);
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.priority_at(parent) <= priority {
                break;
            }
            self.swap(i, parent);
            i = parent;
        }
    }

    /// Restore the heap rooted at `i`, given both children are already heaps.
    fn sift_down(&mut self, mut i: usize) {
        let end = self.heap.len();
        loop {
            let l = 2 * i + 1;
            let r = l + 1;
            let mut min = i;
            let mut p = self.priority_at(i);
            if l < end {
                let lp = self.priority_at(l);
                if lp < p {
                    min = l;
                    p = lp;
                }
                if r < end && self.priority_at(r) < p {
                    min = r;
                }
            }
            if min == i {
                break;
            }
            self.swap(i, min);
            i = min;
        }
    }

    /// Restore full order and leave deferred mode.
    fn heapify(&mut self) {
        let size = self.heap.len();
        let ordered = self.ordered_upto;
        if ordered < size {
            let half = size / 2;
            if ordered <= half {
                trace!(size, ordered, "heap full reorder");
                for i in (0..half).rev() {
                    self.sift_down(i);
                }
            } else {
                trace!(size, ordered, "heap raising unordered tail");
                for i in ordered..size {
                    self.heap_raise(i);
                }
            }
            self.ordered_upto = size;
        }
        self.defer_ordering = false;
    }

    fn remove_unchecked(&mut self, entry: &HeapEntry<E>) {
        let offset = entry.offset() as usize;
        let size = self.heap.len();
        let last = match self.heap.pop() {
            Some(last) => last,
            None => unreachable!("removing from an empty heap"),
        };
        if !last.ptr_eq(entry) {
            self.heap_set(offset, last);
            if self.defer_ordering {
                self.ordered_upto = self.ordered_upto.min(offset);
            } else {
                self.heap_adjust(offset, entry.priority());
                self.ordered_upto = size - 1;
            }
        } else {
            self.ordered_upto = self.ordered_upto.min(offset);
        }
        if self.heap.is_empty() {
            self.ordered_upto = 0;
            self.defer_ordering = true;
        }
        entry.set_offset(-1);
    }
}

impl<E> Heap<E> for BinaryHeap<E> {
    type Entry = HeapEntry<E>;

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn offer(&mut self, element: E, priority: f64) -> Result<HeapEntry<E>> {
        Self::check_priority(priority)?;
        let entry = HeapEntry::new(element, priority);
        let offset = self.heap.len();
        entry.set_offset(offset as isize);
        self.heap.push(entry.clone());
        if !self.defer_ordering {
            self.heap_raise(offset);
            self.ordered_upto = self.heap.len();
        }
        Ok(entry)
    }

    fn peek_entry(&mut self) -> Option<HeapEntry<E>> {
        if self.heap.is_empty() {
            return None;
        }
        self.heapify();
        Some(self.heap[0].clone())
    }

    fn poll_entry(&mut self) -> Option<HeapEntry<E>> {
        match self.heap.len() {
            0 => None,
            1 => {
                let entry = self.heap.pop()?;
                entry.set_offset(-1);
                self.ordered_upto = 0;
                self.defer_ordering = true;
                Some(entry)
            }
            _ => {
                self.heapify();
                let entry = self.heap[0].clone();
                self.remove_unchecked(&entry);
                Some(entry)
            }
        }
    }

    fn change_priority(&mut self, entry: &HeapEntry<E>, priority: f64) -> Result<bool> {
        Self::check_priority(priority)?;
        if !self.contains_entry(entry) {
            return Ok(false);
        }
        let old_priority = entry.priority();
        entry.cell.priority.set(priority);
        let offset = entry.offset() as usize;
        if self.defer_ordering {
            self.ordered_upto = self.ordered_upto.min(offset);
        } else {
            self.heap_adjust(offset, old_priority);
        }
        Ok(true)
    }

    fn contains_entry(&self, entry: &HeapEntry<E>) -> bool {
        let offset = entry.offset();
        offset >= 0
            && (offset as usize) < self.heap.len()
            && self.heap[offset as usize].ptr_eq(entry)
    }

    fn remove_entry(&mut self, entry: &HeapEntry<E>) -> bool {
        if self.contains_entry(entry) {
            self.remove_unchecked(entry);
            true
        } else {
            false
        }
    }

    fn drain_pairs(&mut self) -> Vec<(E, f64)> {
        let entries = std::mem::take(&mut self.heap);
        self.clear();
        entries
            .into_iter()
            .filter_map(|entry| {
                entry.set_offset(-1);
                let priority = entry.priority();
                // Entries still referenced by outside handles cannot give up their element.
                entry.into_element().ok().map(|element| (element, priority))
            })
            .collect()
    }

    fn clear(&mut self) {
        for entry in &self.heap {
            entry.set_offset(-1);
        }
        self.heap.clear();
        self.defer_ordering = true;
        self.ordered_upto = 0;
    }
}

impl<E: Clone> Clone for BinaryHeap<E> {
    /// Deep copy: the clone holds fresh entries, so handles into `self` are
    /// not contained in the copy.
    fn clone(&self) -> Self {
        let heap = self
            .heap
            .iter()
            .map(|entry| {
                let copy = HeapEntry::new(entry.element().clone(), entry.priority());
                copy.set_offset(entry.offset());
                copy
            })
            .collect();
        Self {
            heap,
            ordered_upto: self.ordered_upto,
            defer_ordering: self.defer_ordering,
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for BinaryHeap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryHeap")
            .field("len", &self.heap.len())
            .field("ordered_upto", &self.ordered_upto)
            .field("defer_ordering", &self.defer_ordering)
            .field("entries", &self.heap)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn drain<E: Clone>(heap: &mut BinaryHeap<E>) -> Vec<E> {
        std::iter::from_fn(|| heap.poll()).collect()
    }

    #[test]
    fn polls_in_priority_order() {
        let mut heap = BinaryHeap::new();
        for p in [5.0, 3.0, 8.0, 1.0, 4.0] {
            heap.offer(p as i32, p).unwrap();
        }
        assert_eq!(drain(&mut heap), vec![1, 3, 4, 5, 8]);
        assert!(heap.is_empty());
        assert!(heap.defers_ordering());
    }

    #[test]
    fn rejects_nan_priority() {
        let mut heap = BinaryHeap::new();
        assert_eq!(heap.offer("x", f64::NAN).unwrap_err(), Error::InvalidPriority);
        assert!(heap.is_empty());

        let entry = heap.offer("y", 1.0).unwrap();
        assert_eq!(
            heap.change_priority(&entry, f64::NAN).unwrap_err(),
            Error::InvalidPriority
        );
        assert_eq!(entry.priority(), 1.0);
    }

    #[test]
    fn empty_heap_element_signals_empty() {
        let mut heap: BinaryHeap<u8> = BinaryHeap::new();
        assert_eq!(heap.element().unwrap_err(), Error::Empty);
        assert!(heap.peek().is_none());
        assert!(heap.poll_entry().is_none());
    }

    #[test]
    fn change_priority_reorders() {
        let mut heap = BinaryHeap::new();
        let a = heap.offer('a', 1.0).unwrap();
        let b = heap.offer('b', 2.0).unwrap();
        let c = heap.offer('c', 3.0).unwrap();
        assert_eq!(heap.peek(), Some(&'a'));

        assert!(heap.change_priority(&c, 0.5).unwrap());
        assert_eq!(heap.peek(), Some(&'c'));
        assert!(heap.change_priority(&c, 10.0).unwrap());
        assert!(heap.change_priority(&a, 5.0).unwrap());
        assert_eq!(heap.peek(), Some(&'b'));
        assert_eq!(drain(&mut heap), vec!['b', 'a', 'c']);
    }

    #[test]
    fn stale_handles_are_rejected() {
        let mut heap = BinaryHeap::new();
        let a = heap.offer(1, 1.0).unwrap();
        heap.offer(2, 2.0).unwrap();
        assert!(heap.remove_entry(&a));
        assert!(!a.is_owned());
        assert!(!heap.remove_entry(&a));
        assert!(!heap.change_priority(&a, 0.0).unwrap());
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn handles_from_other_heap_are_not_contained() {
        let mut first = BinaryHeap::new();
        let mut second = BinaryHeap::new();
        let a = first.offer(1, 1.0).unwrap();
        second.offer(2, 1.0).unwrap();
        assert!(first.contains_entry(&a));
        assert!(!second.contains_entry(&a));
        assert!(!second.remove_entry(&a));
    }

    #[test]
    fn remove_middle_entry_keeps_order() {
        let mut heap = BinaryHeap::new();
        heap.defer_ordering(false);
        let entries: Vec<_> = (0..10)
            .map(|i| heap.offer(i, f64::from(i)).unwrap())
            .collect();
        assert!(heap.remove_entry(&entries[3]));
        assert!(heap.remove_entry(&entries[0]));
        assert_eq!(drain(&mut heap), vec![1, 2, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn bulk_add_defers_then_restores_on_peek() {
        let mut heap = BinaryHeap::new();
        heap.offer(100, 100.0).unwrap();
        heap.peek();
        assert!(!heap.defers_ordering());

        assert!(heap.defer_ordering_for_bulk_add(50));
        for i in (0..50).rev() {
            heap.offer(i, f64::from(i)).unwrap();
        }
        assert!(!heap.is_ordered());
        assert_eq!(heap.peek(), Some(&0));
        assert!(heap.is_ordered());
        assert!(!heap.defers_ordering());
    }

    #[test]
    fn bulk_change_threshold_is_half_the_heap() {
        let mut heap = BinaryHeap::new();
        for i in 0..10 {
            heap.offer(i, f64::from(i)).unwrap();
        }
        heap.peek();
        assert!(!heap.defer_ordering_for_bulk_change(4));
        assert!(heap.defer_ordering_for_bulk_change(5));
    }

    #[test]
    fn merge_moves_handles() {
        let mut a = BinaryHeap::new();
        let mut b = BinaryHeap::new();
        a.offer("a1", 3.0).unwrap();
        let moved = b.offer("b1", 1.0).unwrap();
        b.offer("b2", 2.0).unwrap();

        a.merge(&mut b);
        assert!(b.is_empty());
        assert_eq!(a.len(), 3);
        assert!(a.contains_entry(&moved));
        assert!(a.change_priority(&moved, 4.0).unwrap());
        assert_eq!(drain(&mut a), vec!["b2", "a1", "b1"]);
    }

    #[test]
    fn generic_merge_falls_back_to_offers() {
        let mut a = BinaryHeap::new();
        let mut b = BinaryHeap::new();
        a.offer(2, 2.0).unwrap();
        b.offer(1, 1.0).unwrap();
        merge_into(&mut a, &mut b).unwrap();
        assert!(b.is_empty());
        assert_eq!(drain(&mut a), vec![1, 2]);
    }

    #[test]
    fn clone_is_deep() {
        let mut heap = BinaryHeap::new();
        let a = heap.offer(1, 1.0).unwrap();
        let copy = heap.clone();
        assert!(!copy.contains_entry(&a));
        assert_eq!(copy.len(), 1);
        assert_eq!(copy.entry_for_element(&1).map(|e| e.priority()), Some(1.0));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Offer(f64),
        Change(usize, f64),
        Remove(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-100.0f64..100.0).prop_map(Op::Offer),
            (0usize..64, -100.0f64..100.0).prop_map(|(i, p)| Op::Change(i, p)),
            (0usize..64).prop_map(Op::Remove),
        ]
    }

    fn run(ops: &[Op], deferred: bool) -> Vec<(usize, f64)> {
        let mut heap = BinaryHeap::new();
        heap.defer_ordering(deferred);
        let mut handles = Vec::new();
        for op in ops {
            match *op {
                Op::Offer(p) => handles.push(heap.offer(handles.len(), p).unwrap()),
                Op::Change(i, p) => {
                    if let Some(h) = handles.get(i) {
                        heap.change_priority(h, p).unwrap();
                    }
                }
                Op::Remove(i) => {
                    if let Some(h) = handles.get(i) {
                        heap.remove_entry(h);
                    }
                }
            }
            if !deferred {
                heap.defer_ordering(false);
            }
        }
        std::iter::from_fn(|| heap.poll_entry())
            .map(|e| (*e.element(), e.priority()))
            .collect()
    }

    proptest! {
        #[test]
        fn prop_peek_is_minimum(ops in proptest::collection::vec(op_strategy(), 1..120)) {
            let mut heap = BinaryHeap::new();
            let mut handles = Vec::new();
            for op in &ops {
                match *op {
                    Op::Offer(p) => handles.push(heap.offer((), p).unwrap()),
                    Op::Change(i, p) => {
                        if let Some(h) = handles.get(i) {
                            heap.change_priority(h, p).unwrap();
                        }
                    }
                    Op::Remove(i) => {
                        if let Some(h) = handles.get(i) {
                            heap.remove_entry(h);
                        }
                    }
                }
            }
            if let Some(top) = heap.peek_entry() {
                let min = heap.entries().map(HeapEntry::priority).fold(f64::INFINITY, f64::min);
                prop_assert_eq!(top.priority(), min);
            }
        }

        #[test]
        fn prop_deferred_mode_does_not_change_priorities_polled(
            ops in proptest::collection::vec(op_strategy(), 1..120)
        ) {
            let eager = run(&ops, false);
            let deferred = run(&ops, true);
            let eager_priorities: Vec<_> = eager.iter().map(|(_, p)| *p).collect();
            let deferred_priorities: Vec<_> = deferred.iter().map(|(_, p)| *p).collect();
            prop_assert_eq!(eager_priorities, deferred_priorities);
            let mut eager_ids: Vec<_> = eager.iter().map(|(i, _)| *i).collect();
            let mut deferred_ids: Vec<_> = deferred.iter().map(|(i, _)| *i).collect();
            eager_ids.sort_unstable();
            deferred_ids.sort_unstable();
            prop_assert_eq!(eager_ids, deferred_ids);
        }
    }
}
