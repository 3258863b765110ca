//! Skip List
//!
//! An ordered map (and set) built on a randomized skip list. Nodes live in a
//! slab addressed by `u32` index; slot 0 is the head sentinel, which carries
//! no entry and owns one forward link per level currently in use.
//!
//! # Levels
//!
//! A new node gets a level drawn so that each level holds roughly a quarter of
//! the nodes of the level below it. With branching factor `b` a search costs
//! about `(b + 2) / 2 * log_b(n)` comparisons, which is minimal near `b = 4.3`;
//! 4 is close enough and makes the level computation a matter of counting bits.
//!
//! # Precursors
//!
//! Every keyed operation first computes a precursor: for each level, the last
//! node whose key is strictly less than the search key. That is exactly what
//! splicing a node in or out requires. The precursor buffer is kept on the
//! list and reused, so keyed operations do not allocate.
//!
//! The tail is not tracked, so `last` and `poll_last` cost a full descending
//! walk (O(log n)) rather than O(1).

use std::cmp::Ordering;
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::{smallvec, SmallVec};

use crate::error::{Error, Result};

const HEAD: u32 = 0;
const NIL: u32 = u32::MAX;

/// Seed used when the caller does not supply one. Level choice only affects
/// performance, never the observable order, so a fixed seed keeps runs repeatable.
const DEFAULT_SEED: u64 = 0x05ee_d5ee_d5ee_d5ee;

/// Key comparator used to order a list.
pub type Comparator<K> = Box<dyn Fn(&K, &K) -> Ordering>;

struct SkipNode<K, V> {
    /// `None` for the head sentinel and for freed slots.
    entry: Option<(K, V)>,
    /// Forward link at each level this node participates in.
    next: SmallVec<[u32; 2]>,
}

/// Ordered map backed by a skip list.
///
/// Expected O(log n) insert, remove and lookup; O(n) in-order iteration.
pub struct SkipMap<K, V> {
    comparator: Comparator<K>,
    nodes: Vec<SkipNode<K, V>>,
    free: Vec<u32>,
    len: usize,
    precursor: Vec<u32>,
    rng: StdRng,
}

impl<K: Ord, V> SkipMap<K, V> {
    /// Create an empty map ordered by the keys' natural order.
    pub fn new() -> Self {
        Self::with_comparator(|a: &K, b: &K| a.cmp(b))
    }
}

impl<K: Ord, V> Default for SkipMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SkipMap<K, V> {
    /// Create an empty map ordered by `comparator`.
    ///
    /// All keys must be mutually comparable under it; a comparator that is not
    /// a total order gives unspecified (but memory-safe) results.
    pub fn with_comparator<F>(comparator: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        Self::with_comparator_and_seed(comparator, DEFAULT_SEED)
    }

    /// Create an empty map ordered by `comparator`, seeding the level generator.
    pub fn with_comparator_and_seed<F>(comparator: F, seed: u64) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        Self {
            comparator: Box::new(comparator),
            nodes: vec![SkipNode {
                entry: None,
                next: smallvec![NIL],
            }],
            free: Vec::new(),
            len: 0,
            precursor: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels currently in use (at least 1).
    pub fn levels(&self) -> usize {
        self.nodes[HEAD as usize].next.len()
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[HEAD as usize].next = smallvec![NIL];
        self.free.clear();
        self.len = 0;
    }

    /// Insert `key` with `value`. If the key is present its value is replaced
    /// and the old value returned; the stored key is kept.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (index, inserted) = self.add_node(key, value);
        match inserted {
            Insertion::Added => None,
            Insertion::Existing(value) => {
                let slot = self.entry_mut(index);
                Some(std::mem::replace(&mut slot.1, value))
            }
        }
    }

    /// Insert `key` only if absent. Returns true if it was added.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> bool {
        matches!(self.add_node(key, value).1, Insertion::Added)
    }

    /// Value stored for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find_exact(key).map(|i| &self.entry(i).1)
    }

    /// Mutable value stored for `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.find_exact(key)?;
        Some(&mut self.entry_mut(index).1)
    }

    /// True if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find_exact(key).is_some()
    }

    /// Remove `key`, returning the stored entry.
    pub fn remove(&mut self, key: &K) -> Option<(K, V)> {
        let mut precursor = std::mem::take(&mut self.precursor);
        self.fill_precursor(key, &mut precursor);
        let candidate = self.nodes[precursor[0] as usize].next[0];
        let removed = if candidate != NIL
            && (self.comparator)(&self.entry(candidate).0, key) == Ordering::Equal
        {
            Some(self.unlink(candidate, &precursor))
        } else {
            None
        };
        self.precursor = precursor;
        removed
    }

    /// Least entry.
    pub fn first_entry(&self) -> Option<(&K, &V)> {
        self.node_entry(self.first_index())
    }

    /// Greatest entry. O(log n): the tail is found by a descending walk.
    pub fn last_entry(&self) -> Option<(&K, &V)> {
        self.node_entry(self.last_index())
    }

    /// Least entry, or [`Error::Empty`].
    pub fn first(&self) -> Result<(&K, &V)> {
        self.first_entry().ok_or(Error::Empty)
    }

    /// Greatest entry, or [`Error::Empty`].
    pub fn last(&self) -> Result<(&K, &V)> {
        self.last_entry().ok_or(Error::Empty)
    }

    /// Remove and return the least entry.
    pub fn poll_first(&mut self) -> Option<(K, V)> {
        let first = self.first_index();
        if first == NIL {
            return None;
        }
        // The first node's precursor is the head at every level it occupies.
        let mut precursor = std::mem::take(&mut self.precursor);
        precursor.clear();
        precursor.resize(self.levels(), HEAD);
        let entry = self.unlink(first, &precursor);
        self.precursor = precursor;
        Some(entry)
    }

    /// Remove and return the greatest entry. O(log n).
    pub fn poll_last(&mut self) -> Option<(K, V)> {
        let last = self.last_index();
        if last == NIL {
            return None;
        }
        let mut precursor = std::mem::take(&mut self.precursor);
        self.fill_precursor(&self.entry(last).0, &mut precursor);
        let entry = self.unlink(last, &precursor);
        self.precursor = precursor;
        Some(entry)
    }

    /// Least entry with key `>= key`.
    pub fn ceiling_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.node_entry(self.find_ceiling(key))
    }

    /// Greatest entry with key `<= key`.
    pub fn floor_entry(&self, key: &K) -> Option<(&K, &V)> {
        let lower = self.find_lower(key);
        let next = self.nodes[lower as usize].next[0];
        if next != NIL && (self.comparator)(&self.entry(next).0, key) == Ordering::Equal {
            return self.node_entry(next);
        }
        self.node_entry(if lower == HEAD { NIL } else { lower })
    }

    /// Least entry with key strictly `> key`.
    pub fn higher_entry(&self, key: &K) -> Option<(&K, &V)> {
        let mut node = self.find_ceiling(key);
        while node != NIL && (self.comparator)(&self.entry(node).0, key) == Ordering::Equal {
            node = self.nodes[node as usize].next[0];
        }
        self.node_entry(node)
    }

    /// Greatest entry with key strictly `< key`.
    pub fn lower_entry(&self, key: &K) -> Option<(&K, &V)> {
        let lower = self.find_lower(key);
        self.node_entry(if lower == HEAD { NIL } else { lower })
    }

    /// In-order iterator over entries.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: self,
            node: self.first_index(),
            remaining: self.len,
        }
    }

    /// In-order iterator over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    /// In-order iterator over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// A restartable cursor that can remove the entry it last yielded.
    pub fn cursor(&mut self) -> Cursor<'_, K, V> {
        let next = self.first_index();
        Cursor {
            map: self,
            current: NIL,
            next,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn entry(&self, index: u32) -> &(K, V) {
        match &self.nodes[index as usize].entry {
            Some(entry) => entry,
            None => unreachable!("skip list link points at an empty slot"),
        }
    }

    fn entry_mut(&mut self, index: u32) -> &mut (K, V) {
        match &mut self.nodes[index as usize].entry {
            Some(entry) => entry,
            None => unreachable!("skip list link points at an empty slot"),
        }
    }

    fn node_entry(&self, index: u32) -> Option<(&K, &V)> {
        if index == NIL {
            None
        } else {
            let (k, v) = self.entry(index);
            Some((k, v))
        }
    }

    fn first_index(&self) -> u32 {
        self.nodes[HEAD as usize].next[0]
    }

    fn last_index(&self) -> u32 {
        if self.len == 0 {
            return NIL;
        }
        let mut node = HEAD;
        for level in (0..self.levels()).rev() {
            loop {
                let next = self.nodes[node as usize].next[level];
                if next == NIL {
                    break;
                }
                node = next;
            }
        }
        node
    }

    /// Fill `precursor[level]` with the last node whose key is `< key`.
    fn fill_precursor(&self, key: &K, precursor: &mut Vec<u32>) {
        let levels = self.levels();
        precursor.clear();
        precursor.resize(levels, HEAD);
        let mut node = HEAD;
        for level in (0..levels).rev() {
            loop {
                let next = self.nodes[node as usize].next[level];
                if next == NIL || (self.comparator)(&self.entry(next).0, key) != Ordering::Less {
                    break;
                }
                node = next;
            }
            precursor[level] = node;
        }
    }

    /// Last node with key `< key`, or the head.
    fn find_lower(&self, key: &K) -> u32 {
        let mut node = HEAD;
        for level in (0..self.levels()).rev() {
            loop {
                let next = self.nodes[node as usize].next[level];
                if next == NIL || (self.comparator)(&self.entry(next).0, key) != Ordering::Less {
                    break;
                }
                node = next;
            }
        }
        node
    }

    fn find_ceiling(&self, key: &K) -> u32 {
        self.nodes[self.find_lower(key) as usize].next[0]
    }

    fn find_exact(&self, key: &K) -> Option<u32> {
        let node = self.find_ceiling(key);
        (node != NIL && (self.comparator)(&self.entry(node).0, key) == Ordering::Equal)
            .then_some(node)
    }

    /// Draw a level in `0..=log4(len)`, each level a quarter as likely as the one below.
    fn random_level(&mut self) -> usize {
        let len = self.len as u64;
        let max_level = ((64 - len.leading_zeros()) / 2) as usize;
        if max_level == 0 {
            return 0;
        }
        let r: u64 = self.rng.gen_range(0..1u64 << (2 * max_level));
        // Number of base-4 digits in r.
        let digits = ((64 - r.leading_zeros() + 1) / 2) as usize;
        max_level - digits
    }

    fn add_node(&mut self, key: K, value: V) -> (u32, Insertion<V>) {
        let mut precursor = std::mem::take(&mut self.precursor);
        self.fill_precursor(&key, &mut precursor);
        let candidate = self.nodes[precursor[0] as usize].next[0];
        if candidate != NIL
            && (self.comparator)(&self.entry(candidate).0, &key) == Ordering::Equal
        {
            self.precursor = precursor;
            return (candidate, Insertion::Existing(value));
        }

        let level = self.random_level();
        let levels = self.levels();
        if level >= levels {
            let head = &mut self.nodes[HEAD as usize].next;
            head.resize(level + 1, NIL);
            precursor.resize(level + 1, HEAD);
        }

        let node = SkipNode {
            entry: Some((key, value)),
            next: smallvec![NIL; level + 1],
        };
        let index = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot as usize] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                (self.nodes.len() - 1) as u32
            }
        };
        for (lvl, &prev) in precursor.iter().enumerate().take(level + 1) {
            let after = self.nodes[prev as usize].next[lvl];
            self.nodes[index as usize].next[lvl] = after;
            self.nodes[prev as usize].next[lvl] = index;
        }
        self.len += 1;
        self.precursor = precursor;
        (index, Insertion::Added)
    }

    /// Splice `node` out at every level it occupies and free its slot.
    fn unlink(&mut self, node: u32, precursor: &[u32]) -> (K, V) {
        let height = self.nodes[node as usize].next.len();
        for (level, &prev) in precursor.iter().enumerate().take(height) {
            if self.nodes[prev as usize].next[level] != node {
                break;
            }
            let after = self.nodes[node as usize].next[level];
            self.nodes[prev as usize].next[level] = after;
        }
        let head = &mut self.nodes[HEAD as usize].next;
        while head.len() > 1 && head[head.len() - 1] == NIL {
            head.pop();
        }
        self.len -= 1;
        self.free.push(node);
        let slot = &mut self.nodes[node as usize];
        slot.next.clear();
        match slot.entry.take() {
            Some(entry) => entry,
            None => unreachable!("unlinked the head sentinel"),
        }
    }
}

enum Insertion<V> {
    Added,
    Existing(V),
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SkipMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// In-order iterator over a [`SkipMap`].
pub struct Iter<'a, K, V> {
    map: &'a SkipMap<K, V>,
    node: u32,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.node == NIL {
            return None;
        }
        let current = self.node;
        self.node = self.map.nodes[current as usize].next[0];
        self.remaining -= 1;
        self.map.node_entry(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a SkipMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Forward cursor over a [`SkipMap`] that can remove the entry it is on.
///
/// Walks level-0 links. Removing the current entry costs one O(log n)
/// precursor walk; the position of the following entry is kept, so iteration
/// continues where it left off.
pub struct Cursor<'a, K, V> {
    map: &'a mut SkipMap<K, V>,
    current: u32,
    next: u32,
}

impl<K, V> Cursor<'_, K, V> {
    /// Advance to the next entry. Returns false at the end.
    pub fn move_next(&mut self) -> bool {
        self.current = self.next;
        if self.current == NIL {
            return false;
        }
        self.next = self.map.nodes[self.current as usize].next[0];
        true
    }

    /// Entry the cursor is on.
    pub fn current(&self) -> Option<(&K, &V)> {
        self.map.node_entry(self.current)
    }

    /// Key the cursor is on.
    pub fn key(&self) -> Option<&K> {
        self.current().map(|(k, _)| k)
    }

    /// Mutable value of the entry the cursor is on.
    pub fn value_mut(&mut self) -> Option<&mut V> {
        if self.current == NIL {
            return None;
        }
        Some(&mut self.map.entry_mut(self.current).1)
    }

    /// Remove the entry the cursor is on. The cursor is left between entries;
    /// the next [`move_next`](Self::move_next) yields the following one.
    pub fn remove_current(&mut self) -> Option<(K, V)> {
        if self.current == NIL {
            return None;
        }
        let node = self.current;
        self.current = NIL;
        let mut precursor = std::mem::take(&mut self.map.precursor);
        self.map.fill_precursor(&self.map.entry(node).0, &mut precursor);
        let entry = self.map.unlink(node, &precursor);
        self.map.precursor = precursor;
        Some(entry)
    }

    /// Restart from the first entry.
    pub fn reset(&mut self) {
        self.current = NIL;
        self.next = self.map.first_index();
    }
}

/// Ordered set backed by a skip list.
pub struct SkipSet<K> {
    map: SkipMap<K, ()>,
}

impl<K: Ord> SkipSet<K> {
    /// Create an empty set ordered by the keys' natural order.
    pub fn new() -> Self {
        Self { map: SkipMap::new() }
    }
}

impl<K: Ord> Default for SkipSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> FromIterator<K> for SkipSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        for key in iter {
            set.insert(key);
        }
        set
    }
}

impl<K> SkipSet<K> {
    /// Create an empty set ordered by `comparator`.
    pub fn with_comparator<F>(comparator: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        Self {
            map: SkipMap::with_comparator(comparator),
        }
    }

    /// Create an empty set ordered by `comparator`, seeding the level generator.
    pub fn with_comparator_and_seed<F>(comparator: F, seed: u64) -> Self
    where
        F: Fn(&K, &K) -> Ordering + 'static,
    {
        Self {
            map: SkipMap::with_comparator_and_seed(comparator, seed),
        }
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Remove all keys.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Add `key`. Returns false if an equal key was already present.
    pub fn insert(&mut self, key: K) -> bool {
        self.map.insert_if_absent(key, ())
    }

    /// True if an equal key is present.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Remove and return the stored key equal to `key`.
    pub fn remove(&mut self, key: &K) -> Option<K> {
        self.map.remove(key).map(|(k, _)| k)
    }

    /// Least key, or [`Error::Empty`].
    pub fn first(&self) -> Result<&K> {
        self.map.first().map(|(k, _)| k)
    }

    /// Greatest key, or [`Error::Empty`]. O(log n).
    pub fn last(&self) -> Result<&K> {
        self.map.last().map(|(k, _)| k)
    }

    /// Least key without failing on empty.
    pub fn peek_first(&self) -> Option<&K> {
        self.map.first_entry().map(|(k, _)| k)
    }

    /// Greatest key without failing on empty.
    pub fn peek_last(&self) -> Option<&K> {
        self.map.last_entry().map(|(k, _)| k)
    }

    /// Remove and return the least key.
    pub fn poll_first(&mut self) -> Option<K> {
        self.map.poll_first().map(|(k, _)| k)
    }

    /// Remove and return the greatest key. O(log n).
    pub fn poll_last(&mut self) -> Option<K> {
        self.map.poll_last().map(|(k, _)| k)
    }

    /// Least key `>= key`.
    pub fn ceiling(&self, key: &K) -> Option<&K> {
        self.map.ceiling_entry(key).map(|(k, _)| k)
    }

    /// Greatest key `<= key`.
    pub fn floor(&self, key: &K) -> Option<&K> {
        self.map.floor_entry(key).map(|(k, _)| k)
    }

    /// Least key `> key`.
    pub fn higher(&self, key: &K) -> Option<&K> {
        self.map.higher_entry(key).map(|(k, _)| k)
    }

    /// Greatest key `< key`.
    pub fn lower(&self, key: &K) -> Option<&K> {
        self.map.lower_entry(key).map(|(k, _)| k)
    }

    /// In-order iterator over keys.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.map.keys()
    }

    /// A restartable cursor that can remove the key it last yielded.
    pub fn cursor(&mut self) -> Cursor<'_, K, ()> {
        self.map.cursor()
    }
}

impl<K: fmt::Debug> fmt::Debug for SkipSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
