//! Keyed Priority Queue
//!
//! A priority queue that holds at most one element per key. Elements that
//! compare equal are served in insertion order; the insertion counter that
//! breaks those ties restarts from zero whenever the queue drains.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::collect::skip_list::SkipMap;
use crate::error::{Error, Result};

/// An element that carries its own key.
pub trait Keyed {
    /// Key type; at most one element per key can be queued.
    type Key: Hash + Eq;

    /// Key of this element.
    fn key(&self) -> Self::Key;
}

struct Queued<E> {
    element: E,
    insert_order: u64,
}

/// Priority queue allowing at most one element per [`Keyed::key`].
///
/// `offer`, `peek` and `poll` are O(log n) expected; `get`, `contains_key`
/// are O(1) expected and `remove_key` is O(log n) expected.
pub struct KeyedPriorityQueue<E: Keyed> {
    queue: SkipMap<Rc<Queued<E>>, ()>,
    index: HashMap<E::Key, Rc<Queued<E>>>,
    insert_order: u64,
}

impl<E: Keyed + Ord + 'static> KeyedPriorityQueue<E> {
    /// Create a queue ordered by the elements' natural order.
    pub fn new() -> Self {
        Self::with_comparator(|a: &E, b: &E| a.cmp(b))
    }
}

impl<E: Keyed + Ord + 'static> Default for KeyedPriorityQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Keyed + 'static> KeyedPriorityQueue<E> {
    /// Create a queue ordered by `comparator`; ties go to the earlier insertion.
    pub fn with_comparator<F>(comparator: F) -> Self
    where
        F: Fn(&E, &E) -> Ordering + 'static,
    {
        let queue = SkipMap::with_comparator(move |a: &Rc<Queued<E>>, b: &Rc<Queued<E>>| {
            comparator(&a.element, &b.element).then(a.insert_order.cmp(&b.insert_order))
        });
        Self {
            queue,
            index: HashMap::new(),
            insert_order: 0,
        }
    }
}

impl<E: Keyed> KeyedPriorityQueue<E> {
    /// Number of queued elements.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Queue `element` unless an element with the same key is already queued.
    /// Returns whether it was added.
    pub fn offer(&mut self, element: E) -> bool {
        let key = element.key();
        if self.index.contains_key(&key) {
            return false;
        }
        let queued = Rc::new(Queued {
            element,
            insert_order: self.insert_order,
        });
        self.insert_order += 1;
        self.queue.insert(Rc::clone(&queued), ());
        self.index.insert(key, queued);
        true
    }

    /// Lowest element, if any.
    pub fn peek(&self) -> Option<&E> {
        self.queue.first_entry().map(|(queued, _)| &queued.element)
    }

    /// Lowest element, or [`Error::Empty`].
    pub fn element(&self) -> Result<&E> {
        self.peek().ok_or(Error::Empty)
    }

    /// Remove and return the lowest element.
    pub fn poll(&mut self) -> Option<E> {
        let Some((queued, ())) = self.queue.poll_first() else {
            self.insert_order = 0;
            return None;
        };
        self.index.remove(&queued.element.key());
        Rc::into_inner(queued).map(|q| q.element)
    }

    /// Element queued under `key`.
    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.index.get(key).map(|queued| &queued.element)
    }

    /// True if an element is queued under `key`.
    pub fn contains_key(&self, key: &E::Key) -> bool {
        self.index.contains_key(key)
    }

    /// True if an element with the same key as `element` is queued.
    pub fn contains(&self, element: &E) -> bool {
        self.index.contains_key(&element.key())
    }

    /// Remove the element queued under `key`.
    pub fn remove_key(&mut self, key: &E::Key) -> Option<E> {
        let queued = self.index.remove(key)?;
        self.queue.remove(&queued);
        if self.index.is_empty() {
            self.insert_order = 0;
        }
        Rc::into_inner(queued).map(|q| q.element)
    }

    /// Remove the element sharing `element`'s key. Returns the queued element.
    pub fn remove(&mut self, element: &E) -> Option<E> {
        self.remove_key(&element.key())
    }

    /// Remove everything and restart the insertion counter.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.index.clear();
        self.insert_order = 0;
    }

    /// Elements in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.queue.keys().map(|queued| &queued.element)
    }
}

impl<E: Keyed + fmt::Debug> fmt::Debug for KeyedPriorityQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[derive(Debug)]
struct SelfKeyed<E>(E);

impl<E: Hash + Eq + Clone> Keyed for SelfKeyed<E> {
    type Key = E;

    fn key(&self) -> E {
        self.0.clone()
    }
}

/// Priority queue of distinct elements; each element is its own key.
pub struct UniquePriorityQueue<E: Hash + Eq + Clone> {
    inner: KeyedPriorityQueue<SelfKeyed<E>>,
}

impl<E: Hash + Eq + Clone + Ord + 'static> UniquePriorityQueue<E> {
    /// Create a queue ordered by the elements' natural order.
    pub fn new() -> Self {
        Self::with_comparator(|a: &E, b: &E| a.cmp(b))
    }
}

impl<E: Hash + Eq + Clone + Ord + 'static> Default for UniquePriorityQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Hash + Eq + Clone + 'static> UniquePriorityQueue<E> {
    /// Create a queue ordered by `comparator`.
    pub fn with_comparator<F>(comparator: F) -> Self
    where
        F: Fn(&E, &E) -> Ordering + 'static,
    {
        Self {
            inner: KeyedPriorityQueue::with_comparator(
                move |a: &SelfKeyed<E>, b: &SelfKeyed<E>| comparator(&a.0, &b.0),
            ),
        }
    }
}

impl<E: Hash + Eq + Clone> UniquePriorityQueue<E> {
    /// Number of queued elements.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Queue `element` unless it is already queued.
    pub fn offer(&mut self, element: E) -> bool {
        self.inner.offer(SelfKeyed(element))
    }

    /// Lowest element, if any.
    pub fn peek(&self) -> Option<&E> {
        self.inner.peek().map(|e| &e.0)
    }

    /// Remove and return the lowest element.
    pub fn poll(&mut self) -> Option<E> {
        self.inner.poll().map(|e| e.0)
    }

    /// True if `element` is queued.
    pub fn contains(&self, element: &E) -> bool {
        self.inner.contains_key(element)
    }

    /// Remove `element`. Returns whether it was queued.
    pub fn remove(&mut self, element: &E) -> bool {
        self.inner.remove_key(element).is_some()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Elements in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.inner.iter().map(|e| &e.0)
    }
}

impl<E: Hash + Eq + Clone + fmt::Debug> fmt::Debug for UniquePriorityQueue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
