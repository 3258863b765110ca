//! Dynamic Update Queues
//!
//! Two queues for work that changes between full schedule passes:
//!
//! - [`UpdateQueue`]: every node has a numeric priority that can change at
//!   any time, lowest first. Bulk updates defer re-heapification to one
//!   O(n) pass instead of n O(log n) sifts.
//! - [`PendingUpdates`]: nodes waiting to be updated after a neighbour
//!   changed, served in schedule order. A node is queued at most once;
//!   nodes with the same rank come out in the order they were queued.

use std::collections::HashMap;

use tracing::trace;

use crate::collect::{BinaryHeap, Heap, HeapEntry, Keyed, KeyedPriorityQueue};
use crate::error::{Error, Result};
use crate::graph::{FactorGraph, NodeKey};

use super::Schedule;

/// Nodes keyed by a changeable priority, lowest first.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    heap: BinaryHeap<NodeKey>,
    entries: HashMap<NodeKey, HeapEntry<NodeKey>>,
}

impl UpdateQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a queue from `(node, priority)` pairs in one pass.
    pub fn from_priorities<I>(priorities: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeKey, f64)>,
    {
        let priorities: Vec<(NodeKey, f64)> = priorities.into_iter().collect();
        let mut queue = Self::new();
        queue.heap.ensure_capacity(priorities.len());
        queue.set_priorities(&priorities)?;
        Ok(queue)
    }

    /// Number of queued nodes.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// True if `node` is queued.
    pub fn contains(&self, node: NodeKey) -> bool {
        self.entries.contains_key(&node)
    }

    /// Current priority of `node`.
    pub fn priority(&self, node: NodeKey) -> Option<f64> {
        self.entries.get(&node).map(HeapEntry::priority)
    }

    /// Queue `node`, or move it if it is already queued.
    pub fn set_priority(&mut self, node: NodeKey, priority: f64) -> Result<()> {
        match self.entries.get(&node) {
            Some(entry) => {
                self.heap.change_priority(entry, priority)?;
            }
            None => {
                let entry = self.heap.offer(node, priority)?;
                self.entries.insert(node, entry);
            }
        }
        Ok(())
    }

    /// Apply many priority changes at once. Either all are applied or, if
    /// any priority is NaN, none are.
    pub fn set_priorities(&mut self, updates: &[(NodeKey, f64)]) -> Result<()> {
        if updates.iter().any(|(_, priority)| priority.is_nan()) {
            return Err(Error::InvalidPriority);
        }
        let added = updates.iter().filter(|(node, _)| !self.contains(*node)).count();
        let deferred = if added > 0 {
            self.heap.defer_ordering_for_bulk_add(added)
        } else {
            self.heap.defer_ordering_for_bulk_change(updates.len())
        };
        trace!(updates = updates.len(), added, deferred, "bulk priority update");
        for &(node, priority) in updates {
            self.set_priority(node, priority)?;
        }
        Ok(())
    }

    /// Lowest-priority node.
    pub fn peek(&mut self) -> Option<(NodeKey, f64)> {
        self.heap
            .peek_entry()
            .map(|entry| (*entry.element(), entry.priority()))
    }

    /// Remove and return the lowest-priority node.
    pub fn poll(&mut self) -> Option<(NodeKey, f64)> {
        let entry = self.heap.poll_entry()?;
        self.entries.remove(entry.element());
        Some((*entry.element(), entry.priority()))
    }

    /// Drop `node` from the queue. Returns false if it was not queued.
    pub fn remove(&mut self, node: NodeKey) -> bool {
        match self.entries.remove(&node) {
            Some(entry) => self.heap.remove_entry(&entry),
            None => false,
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.entries.clear();
    }

    /// True if the queue is currently heap-ordered (no deferred work).
    pub fn is_ordered(&self) -> bool {
        self.heap.is_ordered()
    }
}

/// A node waiting for an update, ranked by its place in a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingUpdate {
    /// Node to update.
    pub node: NodeKey,
    /// Lower ranks are served first.
    pub rank: usize,
}

impl Keyed for PendingUpdate {
    type Key = NodeKey;

    fn key(&self) -> NodeKey {
        self.node
    }
}

/// Queue of nodes to update, at most one entry per node.
#[derive(Debug)]
pub struct PendingUpdates {
    queue: KeyedPriorityQueue<PendingUpdate>,
}

impl Default for PendingUpdates {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingUpdates {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            queue: KeyedPriorityQueue::with_comparator(|a: &PendingUpdate, b: &PendingUpdate| {
                a.rank.cmp(&b.rank)
            }),
        }
    }

    /// Queue `node` at `rank`. Returns false if it was already queued; the
    /// earlier rank is kept.
    pub fn push(&mut self, node: NodeKey, rank: usize) -> bool {
        self.queue.offer(PendingUpdate { node, rank })
    }

    /// Queue every sibling of a node that just changed, ranked by where the
    /// sibling first appears in `schedule`. Siblings not in the schedule go
    /// last. Returns how many were newly queued.
    pub fn mark_changed(&mut self, graph: &FactorGraph, schedule: &Schedule, node: NodeKey) -> Result<usize> {
        let mut queued = 0;
        for sibling in graph.siblings(node)? {
            let rank = schedule.position(sibling).unwrap_or(usize::MAX);
            if self.push(sibling, rank) {
                queued += 1;
            }
        }
        trace!(node = %node, queued, "neighbours queued");
        Ok(queued)
    }

    /// Next node to update.
    pub fn pop(&mut self) -> Option<PendingUpdate> {
        self.queue.poll()
    }

    /// Next node without removing it.
    pub fn peek(&self) -> Option<&PendingUpdate> {
        self.queue.peek()
    }

    /// True if `node` is queued.
    pub fn contains(&self, node: NodeKey) -> bool {
        self.queue.contains_key(&node)
    }

    /// Drop `node` from the queue.
    pub fn remove(&mut self, node: NodeKey) -> Option<PendingUpdate> {
        self.queue.remove_key(&node)
    }

    /// Number of queued nodes.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Queued updates in service order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingUpdate> {
        self.queue.iter()
    }
}
