//! Update Scheduling
//!
//! A schedule is the order in which a solver updates nodes or edges of a
//! graph. The core does not compute any messages; it only builds orders from
//! the graph's structure and keeps them in step with structural changes.
//!
//! # Overview
//!
//! - [`Scheduler`] builds a [`Schedule`] for a graph
//! - [`ScheduleCache`] keeps the last schedule and rebuilds it only when the
//!   graph's structure has changed since
//! - [`UpdateQueue`] and [`PendingUpdates`] order dynamic work between full
//!   passes
//!
//! # Staleness
//!
//! Each schedule records the graph's global structure version at build time.
//! Any structural change anywhere in the tree bumps that version, so a
//! schedule is stale as soon as the two differ.

mod cache;
mod queue;
mod schedulers;

pub use cache::ScheduleCache;
pub use queue::{PendingUpdate, PendingUpdates, UpdateQueue};
pub use schedulers::{FloodingScheduler, SequentialDirectedScheduler, TreeScheduler};

use serde::Serialize;

use crate::error::Result;
use crate::graph::{FactorGraph, GraphKey, NodeKey};

/// One step of a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleEntry {
    /// Update every outgoing edge of `node`.
    Node(NodeKey),
    /// Update the edge from `node` to its sibling at index `sibling`.
    Edge {
        /// Node sending along the edge.
        node: NodeKey,
        /// Sibling index of the edge at `node`.
        sibling: usize,
    },
}

impl ScheduleEntry {
    /// The node this step updates.
    pub fn node(&self) -> NodeKey {
        match *self {
            ScheduleEntry::Node(node) | ScheduleEntry::Edge { node, .. } => node,
        }
    }
}

/// An ordered list of updates, tagged with the structure version it was
/// built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
    version: u64,
}

impl Schedule {
    /// Schedule for `graph` as it is now.
    pub fn new(graph: &FactorGraph, entries: Vec<ScheduleEntry>) -> Self {
        Self {
            entries,
            version: graph.global_structure_version(),
        }
    }

    /// The updates, in order.
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Global structure version this schedule was built at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True if `graph` has changed structure since this schedule was built.
    pub fn is_stale(&self, graph: &FactorGraph) -> bool {
        graph.global_structure_version() != self.version
    }

    /// Number of updates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no updates.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the first update of `node`.
    pub fn position(&self, node: NodeKey) -> Option<usize> {
        self.entries.iter().position(|e| e.node() == node)
    }

    /// Iterate over the updates.
    pub fn iter(&self) -> std::slice::Iter<'_, ScheduleEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a ScheduleEntry;
    type IntoIter = std::slice::Iter<'a, ScheduleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Builds schedules from graph structure.
pub trait Scheduler {
    /// Schedule for every node nested under `root`.
    fn create_schedule(&self, graph: &FactorGraph, root: GraphKey) -> Result<Schedule>;
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn create_schedule(&self, graph: &FactorGraph, root: GraphKey) -> Result<Schedule> {
        (**self).create_schedule(graph, root)
    }
}
