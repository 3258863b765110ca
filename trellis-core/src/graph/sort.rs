//! Directed Node Order
//!
//! Orders the directed factors of a graph, and the variables they read and
//! write, so that every node comes after everything it depends on.
//!
//! # Algorithm
//!
//! Kahn's algorithm with the in-degree kept as a negative counter:
//!
//! 1. A directed factor starts at minus its number of input variables.
//! 2. A variable starts at minus the number of directed factors that
//!    output to it.
//! 3. Nodes starting at zero seed the queue.
//! 4. Popping a node appends it to the order and increments the counter of
//!    each successor (a factor's outputs, a variable's reading factors);
//!    a successor is queued when its counter reaches zero.
//!
//! Nodes on a directed cycle never reach zero and are left out of the result.
//! Callers that need to know compare the result size against the inputs.

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::warn;

use crate::error::Result;

use super::factor_graph::{FactorGraph, FLAT};
use super::ids::{GraphKey, NodeKey};
use super::node::NodeKind;

impl FactorGraph {
    /// Topological order of the directed factors nested under `graph` and
    /// their variables. Maps each ordered node to its position.
    pub fn directed_node_order(&self, graph: GraphKey) -> Result<IndexMap<NodeKey, usize>> {
        self.check_graph(graph)?;

        let factors: Vec<NodeKey> = self
            .nodes_within(graph.node(), FLAT, false)
            .into_iter()
            .filter(|&n| self.data(n).kind() == NodeKind::Factor && self.directed_positions(n).is_some())
            .collect();

        let mut counters: IndexMap<NodeKey, isize> = IndexMap::new();
        // variable -> directed factors that read it
        let mut readers: IndexMap<NodeKey, Vec<NodeKey>> = IndexMap::new();
        for &factor in &factors {
            let outputs = self.directed_positions(factor).cloned().unwrap_or_default();
            let count = self.data(factor).siblings.len();
            let mut inputs = 0;
            for index in 0..count {
                let variable = self.sibling_unchecked(factor, index);
                let counter = counters.entry(variable).or_insert(0);
                if outputs.contains(&(index as u32)) {
                    *counter -= 1;
                } else {
                    inputs += 1;
                    readers.entry(variable).or_default().push(factor);
                }
            }
            counters.insert(factor, -inputs);
        }

        let mut queue: VecDeque<NodeKey> = counters
            .iter()
            .filter(|&(_, &c)| c == 0)
            .map(|(&n, _)| n)
            .collect();
        let mut order: IndexMap<NodeKey, usize> = IndexMap::with_capacity(counters.len());

        while let Some(node) = queue.pop_front() {
            order.insert(node, order.len());
            let successors: Vec<NodeKey> = match self.data(node).kind() {
                NodeKind::Factor => self
                    .directed_positions(node)
                    .map(|outputs| {
                        outputs
                            .iter()
                            .map(|&i| self.sibling_unchecked(node, i as usize))
                            .collect()
                    })
                    .unwrap_or_default(),
                _ => readers.get(&node).cloned().unwrap_or_default(),
            };
            for successor in successors {
                if let Some(counter) = counters.get_mut(&successor) {
                    *counter += 1;
                    if *counter == 0 {
                        queue.push_back(successor);
                    }
                }
            }
        }

        let omitted = counters.len() - order.len();
        if omitted > 0 {
            warn!(graph = %graph, omitted, "directed cycle: nodes left out of order");
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Factor, FactorFunction, FactorKey, Variable, VariableKey};

    fn directed(graph: &mut FactorGraph, input: VariableKey, output: VariableKey) -> FactorKey {
        let root = graph.root();
        let f = graph
            .add_factor(root, Factor::new(FactorFunction::named("step")), &[input, output])
            .unwrap();
        graph.set_directed_to(f, &[output]).unwrap();
        f
    }

    #[test]
    fn chain_is_ordered() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let v = graph
            .add_variables(root, (0..3).map(|_| Variable::discrete(2)))
            .unwrap();
        let f = directed(&mut graph, v[0], v[1]);
        let g = directed(&mut graph, v[1], v[2]);
        let order = graph.directed_node_order(root).unwrap();
        let keys: Vec<NodeKey> = order.keys().copied().collect();
        assert_eq!(
            keys,
            vec![v[0].node(), f.node(), v[1].node(), g.node(), v[2].node()]
        );
        assert_eq!(order[&g.node()], 3);
    }

    #[test]
    fn undirected_factors_are_ignored() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let v = graph
            .add_variables(root, (0..2).map(|_| Variable::discrete(2)))
            .unwrap();
        graph
            .add_factor(root, Factor::new(FactorFunction::Uniform), &[v[0], v[1]])
            .unwrap();
        assert!(graph.directed_node_order(root).unwrap().is_empty());
    }

    #[test]
    fn cycle_members_are_omitted() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let v = graph
            .add_variables(root, (0..4).map(|_| Variable::discrete(2)))
            .unwrap();
        let f = directed(&mut graph, v[0], v[1]);
        let g = directed(&mut graph, v[1], v[2]);
        let h = directed(&mut graph, v[2], v[1]);
        let tail = directed(&mut graph, v[3], v[0]);

        let order = graph.directed_node_order(root).unwrap();
        assert!(order.contains_key(&v[3].node()));
        assert!(order.contains_key(&tail.node()));
        assert!(order.contains_key(&v[0].node()));
        assert!(order.contains_key(&f.node()));
        for omitted in [v[1].node(), g.node(), v[2].node(), h.node()] {
            assert!(!order.contains_key(&omitted));
        }
    }
}
