//! Built-in Schedulers

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::collect::SkipSet;
use crate::error::Result;
use crate::graph::{FactorGraph, GraphKey, NodeKey, FLAT};

use super::{Schedule, ScheduleEntry, Scheduler};

/// Every factor, then every variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloodingScheduler;

impl FloodingScheduler {
    fn entries(graph: &FactorGraph, root: GraphKey) -> Result<Vec<ScheduleEntry>> {
        let factors = graph.factors(root, FLAT)?;
        let variables = graph.variables(root, FLAT)?;
        Ok(factors
            .into_iter()
            .map(|f| f.node())
            .chain(variables.into_iter().map(|v| v.node()))
            .map(ScheduleEntry::Node)
            .collect())
    }
}

impl Scheduler for FloodingScheduler {
    fn create_schedule(&self, graph: &FactorGraph, root: GraphKey) -> Result<Schedule> {
        let entries = Self::entries(graph, root)?;
        Ok(Schedule::new(graph, entries))
    }
}

/// Exact two-pass order for tree-structured graphs.
///
/// For each connected component, edges are scheduled from the leaves in to
/// the component's first node, then from it back out to the leaves, so each
/// edge is updated once in each direction. A graph with a loop falls back
/// to flooding.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeScheduler;

impl Scheduler for TreeScheduler {
    fn create_schedule(&self, graph: &FactorGraph, root: GraphKey) -> Result<Schedule> {
        if !graph.is_forest(root, FLAT)? {
            debug!(graph = %root, "graph has loops, using flooding schedule");
            return FloodingScheduler.create_schedule(graph, root);
        }

        let vertices = graph.nodes(root, FLAT)?;
        let members: HashSet<NodeKey> = vertices.iter().copied().collect();
        let mut seen: HashSet<NodeKey> = HashSet::with_capacity(vertices.len());
        let mut inward = Vec::new();
        let mut outward = Vec::new();

        for &start in &vertices {
            if !seen.insert(start) {
                continue;
            }
            // Breadth-first from `start`, remembering each node's parent edge.
            let mut order = Vec::new();
            let mut parent: HashMap<NodeKey, usize> = HashMap::new();
            let mut children: HashMap<NodeKey, Vec<usize>> = HashMap::new();
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                order.push(node);
                for (index, sibling) in graph.siblings(node)?.into_iter().enumerate() {
                    if !members.contains(&sibling) {
                        continue;
                    }
                    if seen.insert(sibling) {
                        children.entry(node).or_default().push(index);
                        if let Some(back) = graph.sibling_index(sibling, node)? {
                            parent.insert(sibling, back);
                        }
                        queue.push_back(sibling);
                    }
                }
            }
            for node in order.iter().rev() {
                if let Some(&sibling) = parent.get(node) {
                    inward.push(ScheduleEntry::Edge { node: *node, sibling });
                }
            }
            for node in &order {
                for &sibling in children.get(node).into_iter().flatten() {
                    outward.push(ScheduleEntry::Edge { node: *node, sibling });
                }
            }
        }

        inward.extend(outward);
        Ok(Schedule::new(graph, inward))
    }
}

/// Directed factors in dependency order, then the remaining factors.
///
/// Factors on a directed cycle have no dependency order and are scheduled
/// with the undirected ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialDirectedScheduler {
    seed: Option<u64>,
}

impl SequentialDirectedScheduler {
    /// Scheduler drawing skip-list levels from the graph's configured seed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler with an explicit skip-list seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }
}

impl Scheduler for SequentialDirectedScheduler {
    fn create_schedule(&self, graph: &FactorGraph, root: GraphKey) -> Result<Schedule> {
        let order = graph.directed_node_order(root)?;
        let seed = self
            .seed
            .or(graph.options().schedule_seed)
            .unwrap_or_default();
        let mut directed: SkipSet<(usize, NodeKey)> =
            SkipSet::with_comparator_and_seed(|a: &(usize, NodeKey), b: &(usize, NodeKey)| a.cmp(b), seed);

        let factors = graph.factors(root, FLAT)?;
        let mut rest = Vec::new();
        for factor in factors {
            match order.get(&factor.node()) {
                Some(&position) => {
                    directed.insert((position, factor.node()));
                }
                None => rest.push(ScheduleEntry::Node(factor.node())),
            }
        }

        let mut entries: Vec<ScheduleEntry> = Vec::with_capacity(directed.len() + rest.len());
        while let Some((_, factor)) = directed.poll_first() {
            entries.push(ScheduleEntry::Node(factor));
        }
        entries.extend(rest);
        Ok(Schedule::new(graph, entries))
    }
}
