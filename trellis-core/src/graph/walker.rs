//! Graph Walker
//!
//! Breadth- or depth-first traversal over sibling links, confined to one
//! graph and bounded in both search depth and subgraph nesting.
//!
//! Nodes nested deeper than the nesting bound are replaced by their ancestor
//! subgraph at the bound, so a deep subgraph is walked as one opaque node.
//! Reaching an already visited node bumps [`GraphWalker::cycle_count`]
//! instead of descending again; the edge back to the node a step came from
//! is not counted.
//!
//! Breadth-first walks mark a node visited when it is queued. Depth-first
//! walks mark it when it is popped, so a node queued early by one branch is
//! still descended into from a deeper branch that reaches it first.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::factor_graph::FactorGraph;
use super::ids::{GraphKey, NodeKey};

/// Traversal order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkOrder {
    /// Visit by increasing distance from the start.
    #[default]
    BreadthFirst,
    /// Follow each branch to its end first.
    DepthFirst,
}

#[derive(Debug, Clone, Copy)]
struct Step {
    node: NodeKey,
    from: Option<NodeKey>,
    depth: usize,
}

/// Restartable traversal over a [`FactorGraph`].
///
/// ```rust,ignore
/// let mut walker = GraphWalker::new(&graph).start(variable.node())?;
/// let reached: Vec<NodeKey> = walker.by_ref().collect();
/// assert_eq!(walker.cycle_count(), 0);
/// ```
#[derive(Debug)]
pub struct GraphWalker<'a> {
    graph: &'a FactorGraph,
    root: NodeKey,
    order: WalkOrder,
    max_search_depth: usize,
    max_nesting_depth: usize,
    pending: VecDeque<Step>,
    visited: HashSet<NodeKey>,
    cycle_count: usize,
}

impl<'a> GraphWalker<'a> {
    /// Walker over the whole tree using the graph's default bounds and order.
    pub fn new(graph: &'a FactorGraph) -> Self {
        let options = graph.options();
        Self {
            graph,
            root: graph.root().node(),
            order: options.walk_order,
            max_search_depth: options.max_search_depth.unwrap_or(usize::MAX),
            max_nesting_depth: options.max_relative_nesting_depth.unwrap_or(usize::MAX),
            pending: VecDeque::new(),
            visited: HashSet::new(),
            cycle_count: 0,
        }
    }

    /// Only walk nodes nested under `root`.
    pub fn with_root(mut self, root: GraphKey) -> Self {
        self.root = root.node();
        self
    }

    /// Set the traversal order.
    pub fn with_order(mut self, order: WalkOrder) -> Self {
        self.order = order;
        self
    }

    /// Stop expanding nodes this many steps from the start.
    pub fn with_max_search_depth(mut self, depth: usize) -> Self {
        self.max_search_depth = depth;
        self
    }

    /// Treat subgraphs more than `depth` levels below the root as single nodes.
    pub fn with_max_relative_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Begin a walk at `start`.
    pub fn start(mut self, start: NodeKey) -> Result<Self> {
        self.restart(start)?;
        Ok(self)
    }

    /// Drop all walk state and begin again at `start`.
    pub fn restart(&mut self, start: NodeKey) -> Result<()> {
        self.graph.kind(start)?;
        self.graph.as_graph(self.root)?;
        let Some(node) = self.graph.node_at_depth(self.root, start, self.max_nesting_depth) else {
            return Err(Error::NotOwned {
                node: start,
                graph: GraphKey(self.root),
            });
        };
        self.pending.clear();
        self.visited.clear();
        self.cycle_count = 0;
        self.visited.insert(node);
        self.pending.push_back(Step {
            node,
            from: None,
            depth: 0,
        });
        Ok(())
    }

    /// Begin another walk at `start` without forgetting nodes already
    /// visited or cycles already counted. Returns `false` if `start` was
    /// visited before.
    pub fn continue_from(&mut self, start: NodeKey) -> Result<bool> {
        self.graph.kind(start)?;
        let Some(node) = self.graph.node_at_depth(self.root, start, self.max_nesting_depth) else {
            return Err(Error::NotOwned {
                node: start,
                graph: GraphKey(self.root),
            });
        };
        if !self.visited.insert(node) {
            return Ok(false);
        }
        self.pending.push_back(Step {
            node,
            from: None,
            depth: 0,
        });
        Ok(true)
    }

    /// Revisits seen so far.
    pub fn cycle_count(&self) -> usize {
        self.cycle_count
    }

    /// Nodes reached so far. Breadth-first walks include nodes queued but
    /// not yet returned.
    pub fn visited(&self) -> &HashSet<NodeKey> {
        &self.visited
    }

    /// True while nodes remain to be returned.
    pub fn has_next(&self) -> bool {
        !self.pending.is_empty()
    }

    fn expand(&mut self, step: Step) {
        let graph = self.graph;
        let count = graph.sibling_count(step.node).unwrap_or_default();
        let mut skipped_from = false;
        for index in 0..count {
            let sibling = graph.sibling_unchecked(step.node, index);
            let Some(sibling) = graph.node_at_depth(self.root, sibling, self.max_nesting_depth) else {
                continue;
            };
            if !skipped_from && Some(sibling) == step.from {
                skipped_from = true;
                continue;
            }
            if self.visited.contains(&sibling) {
                self.cycle_count += 1;
            } else if step.depth < self.max_search_depth {
                if self.order == WalkOrder::BreadthFirst {
                    self.visited.insert(sibling);
                }
                self.pending.push_back(Step {
                    node: sibling,
                    from: Some(step.node),
                    depth: step.depth + 1,
                });
            }
        }
    }
}

impl Iterator for GraphWalker<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<NodeKey> {
        let step = match self.order {
            WalkOrder::BreadthFirst => self.pending.pop_front()?,
            WalkOrder::DepthFirst => loop {
                let step = self.pending.pop_back()?;
                // Start nodes are marked when queued.
                if step.from.is_none() || self.visited.insert(step.node) {
                    break step;
                }
                self.cycle_count += 1;
            },
        };
        self.expand(step);
        Some(step.node)
    }
}

impl FactorGraph {
    /// `node` as seen from `root` with at most `max_nesting` subgraph levels
    /// visible: the node itself, or its ancestor subgraph at that depth.
    /// `None` when `node` is not nested under `root`.
    pub(crate) fn node_at_depth(&self, root: NodeKey, node: NodeKey, max_nesting: usize) -> Option<NodeKey> {
        if !self.contains(node) {
            return None;
        }
        let chain: Vec<NodeKey> = self.ancestors(node).collect();
        let depth = chain.iter().position(|&g| g == root)?;
        if depth <= max_nesting {
            Some(node)
        } else {
            Some(chain[depth - max_nesting - 1])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Factor, FactorFunction, Variable, VariableKey};

    /// a - f - b - g - c, with an optional h closing c back to a.
    fn chain(close: bool) -> (FactorGraph, Vec<VariableKey>) {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let vars = graph
            .add_variables(root, (0..3).map(|_| Variable::discrete(2)))
            .unwrap();
        let pair = || Factor::new(FactorFunction::named("pair"));
        graph.add_factor(root, pair(), &[vars[0], vars[1]]).unwrap();
        graph.add_factor(root, pair(), &[vars[1], vars[2]]).unwrap();
        if close {
            graph.add_factor(root, pair(), &[vars[2], vars[0]]).unwrap();
        }
        (graph, vars)
    }

    #[test]
    fn breadth_first_visits_by_distance() {
        let (graph, vars) = chain(false);
        let mut walker = GraphWalker::new(&graph).start(vars[0].node()).unwrap();
        let order: Vec<NodeKey> = walker.by_ref().collect();
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], vars[0].node());
        assert_eq!(order[2], vars[1].node());
        assert_eq!(order[4], vars[2].node());
        assert_eq!(walker.cycle_count(), 0);
        assert!(!walker.has_next());
    }

    #[test]
    fn depth_first_reaches_everything() {
        let (graph, vars) = chain(false);
        let walker = GraphWalker::new(&graph)
            .with_order(WalkOrder::DepthFirst)
            .start(vars[1].node())
            .unwrap();
        assert_eq!(walker.count(), 5);
    }

    #[test]
    fn depth_first_descends_from_the_branch_that_arrives_first() {
        // f(a, c, e) is queued from a, but the walk reaches c through
        // g - b - h first and must continue into f from there.
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let v = graph
            .add_variables(root, (0..5).map(|_| Variable::discrete(2)))
            .unwrap();
        let (a, b, c, d, e) = (v[0], v[1], v[2], v[3], v[4]);
        let named = |name: &str| Factor::new(FactorFunction::named(name));
        let k = graph.add_factor(root, named("k"), &[c, d]).unwrap();
        let f = graph.add_factor(root, named("f"), &[a, c, e]).unwrap();
        let g = graph.add_factor(root, named("g"), &[a, b]).unwrap();
        let h = graph.add_factor(root, named("h"), &[b, c]).unwrap();

        let mut walker = GraphWalker::new(&graph)
            .with_order(WalkOrder::DepthFirst)
            .start(a.node())
            .unwrap();
        let order: Vec<NodeKey> = walker.by_ref().collect();
        assert_eq!(
            order,
            vec![
                a.node(),
                g.node(),
                b.node(),
                h.node(),
                c.node(),
                f.node(),
                e.node(),
                k.node(),
                d.node(),
            ]
        );
        assert!(walker.cycle_count() > 0);
        assert_eq!(walker.visited().len(), 9);
    }

    #[test]
    fn depth_first_tree_has_no_cycles() {
        let (graph, vars) = chain(false);
        let mut walker = GraphWalker::new(&graph)
            .with_order(WalkOrder::DepthFirst)
            .start(vars[0].node())
            .unwrap();
        assert_eq!(walker.by_ref().count(), 5);
        assert_eq!(walker.cycle_count(), 0);
    }

    #[test]
    fn cycle_is_counted() {
        let (graph, vars) = chain(true);
        let mut walker = GraphWalker::new(&graph).start(vars[0].node()).unwrap();
        assert_eq!(walker.by_ref().count(), 6);
        assert!(walker.cycle_count() > 0);
    }

    #[test]
    fn search_depth_bounds_the_walk() {
        let (graph, vars) = chain(false);
        let walker = GraphWalker::new(&graph)
            .with_max_search_depth(2)
            .start(vars[0].node())
            .unwrap();
        let reached: Vec<NodeKey> = walker.collect();
        assert_eq!(reached.len(), 3);
        assert!(!reached.contains(&vars[2].node()));
    }

    #[test]
    fn deep_subgraph_is_opaque() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let x = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let sub = graph.add_subgraph(root).unwrap();
        let y = graph.add_variable(sub, Variable::discrete(2)).unwrap();
        graph
            .add_factor(sub, Factor::new(FactorFunction::named("f")), &[x, y])
            .unwrap();

        let reached: Vec<NodeKey> = GraphWalker::new(&graph)
            .with_max_relative_nesting_depth(0)
            .start(x.node())
            .unwrap()
            .collect();
        assert_eq!(reached, vec![x.node(), sub.node()]);

        let reached: Vec<NodeKey> = GraphWalker::new(&graph).start(x.node()).unwrap().collect();
        assert_eq!(reached.len(), 3);
    }

    #[test]
    fn walk_stays_under_root() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let x = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let sub = graph.add_subgraph(root).unwrap();
        let y = graph.add_variable(sub, Variable::discrete(2)).unwrap();
        let f = graph
            .add_factor(sub, Factor::new(FactorFunction::named("f")), &[x, y])
            .unwrap();

        let reached: Vec<NodeKey> = GraphWalker::new(&graph)
            .with_root(sub)
            .start(y.node())
            .unwrap()
            .collect();
        assert_eq!(reached, vec![y.node(), f.node()]);

        let err = GraphWalker::new(&graph).with_root(sub).start(x.node()).unwrap_err();
        assert!(matches!(err, Error::NotOwned { .. }));
    }

    #[test]
    fn restart_forgets_previous_walk() {
        let (graph, vars) = chain(true);
        let mut walker = GraphWalker::new(&graph).start(vars[0].node()).unwrap();
        walker.by_ref().for_each(drop);
        walker.restart(vars[2].node()).unwrap();
        assert_eq!(walker.cycle_count(), 0);
        assert_eq!(walker.visited().len(), 1);
        assert_eq!(walker.count(), 6);
    }
}
