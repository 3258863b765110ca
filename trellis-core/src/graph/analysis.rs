//! Structure Analysis
//!
//! Tree and forest tests, depth-first listings and adjacency matrices over a
//! graph seen at a bounded nesting depth. At depth `d`, subgraphs more than
//! `d` levels down count as single vertices.

use std::collections::HashSet;

use crate::error::Result;

use super::factor_graph::FactorGraph;
use super::ids::{GraphKey, NodeKey};
use super::node::NodeKind;
use super::walker::{GraphWalker, WalkOrder};

impl FactorGraph {
    /// Vertices of `graph` at nesting `depth`, and the number of edges
    /// between them.
    fn vertices_and_edges(&self, graph: GraphKey, depth: usize) -> Result<(Vec<NodeKey>, usize)> {
        let vertices = self.nodes(graph, depth)?;
        let set: HashSet<NodeKey> = vertices.iter().copied().collect();
        let mut edges = 0;
        for &vertex in &vertices {
            if self.data(vertex).kind() != NodeKind::Variable {
                continue;
            }
            let count = self.data(vertex).siblings.len();
            edges += (0..count)
                .filter_map(|i| self.node_at_depth(graph.node(), self.sibling_unchecked(vertex, i), depth))
                .filter(|sibling| set.contains(sibling))
                .count();
        }
        Ok((vertices, edges))
    }

    fn walker_at(&self, graph: GraphKey, depth: usize) -> GraphWalker<'_> {
        GraphWalker::new(self)
            .with_root(graph)
            .with_max_relative_nesting_depth(depth)
            .with_max_search_depth(usize::MAX)
    }

    /// True if `graph`, seen at nesting `depth`, is a single connected tree.
    /// An empty graph counts as a tree.
    pub fn is_tree(&self, graph: GraphKey, depth: usize) -> Result<bool> {
        let (vertices, edges) = self.vertices_and_edges(graph, depth)?;
        let Some(&start) = vertices.first() else {
            return Ok(true);
        };
        if edges != vertices.len() - 1 {
            return Ok(false);
        }
        let mut walker = self.walker_at(graph, depth).start(start)?;
        walker.by_ref().for_each(drop);
        Ok(walker.cycle_count() == 0 && walker.visited().len() == vertices.len())
    }

    /// True if `graph`, seen at nesting `depth`, has no cycles.
    pub fn is_forest(&self, graph: GraphKey, depth: usize) -> Result<bool> {
        let (vertices, edges) = self.vertices_and_edges(graph, depth)?;
        if vertices.is_empty() {
            return Ok(true);
        }
        if edges > vertices.len() - 1 {
            return Ok(false);
        }
        let mut walker = self.walker_at(graph, depth);
        for &vertex in &vertices {
            if walker.visited().contains(&vertex) {
                continue;
            }
            walker.continue_from(vertex)?;
            walker.by_ref().for_each(drop);
            if walker.cycle_count() > 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Connected components of `graph` at nesting `depth`, each in
    /// breadth-first order from its first vertex.
    pub fn connected_components(&self, graph: GraphKey, depth: usize) -> Result<Vec<Vec<NodeKey>>> {
        let vertices = self.nodes(graph, depth)?;
        let mut seen: HashSet<NodeKey> = HashSet::with_capacity(vertices.len());
        let mut components = Vec::new();
        for vertex in vertices {
            if seen.contains(&vertex) {
                continue;
            }
            let component: Vec<NodeKey> = self.walker_at(graph, depth).start(vertex)?.collect();
            seen.extend(component.iter().copied());
            components.push(component);
        }
        Ok(components)
    }

    /// Nodes reached by a depth-first walk from `start`, in visit order,
    /// going at most `search_depth` steps and `nesting_depth` subgraph
    /// levels below the root.
    pub fn depth_first_search(&self, start: NodeKey, search_depth: usize, nesting_depth: usize) -> Result<Vec<NodeKey>> {
        Ok(GraphWalker::new(self)
            .with_order(WalkOrder::DepthFirst)
            .with_max_search_depth(search_depth)
            .with_max_relative_nesting_depth(nesting_depth)
            .start(start)?
            .collect())
    }

    /// Symmetric adjacency matrix over `nodes`: entry `[i][j]` is true when
    /// `nodes[i]` and `nodes[j]` are siblings.
    pub fn adjacency_matrix(&self, nodes: &[NodeKey]) -> Result<Vec<Vec<bool>>> {
        let n = nodes.len();
        let mut matrix = vec![vec![false; n]; n];
        for (i, &node) in nodes.iter().enumerate() {
            for sibling in self.siblings(node)? {
                if let Some(j) = nodes.iter().position(|&other| other == sibling) {
                    matrix[i][j] = true;
                    matrix[j][i] = true;
                }
            }
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Factor, FactorFunction, Variable, FLAT, TOP};

    fn pair() -> Factor {
        Factor::new(FactorFunction::named("pair"))
    }

    #[test]
    fn empty_graph_is_tree() {
        let graph = FactorGraph::new();
        assert!(graph.is_tree(graph.root(), FLAT).unwrap());
        assert!(graph.is_forest(graph.root(), FLAT).unwrap());
    }

    #[test]
    fn chain_is_tree_loop_is_not() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let v = graph
            .add_variables(root, (0..3).map(|_| Variable::discrete(2)))
            .unwrap();
        graph.add_factor(root, pair(), &[v[0], v[1]]).unwrap();
        graph.add_factor(root, pair(), &[v[1], v[2]]).unwrap();
        assert!(graph.is_tree(root, FLAT).unwrap());

        graph.add_factor(root, pair(), &[v[2], v[0]]).unwrap();
        assert!(!graph.is_tree(root, FLAT).unwrap());
        assert!(!graph.is_forest(root, FLAT).unwrap());
    }

    #[test]
    fn disconnected_trees_form_a_forest() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let v = graph
            .add_variables(root, (0..4).map(|_| Variable::discrete(2)))
            .unwrap();
        graph.add_factor(root, pair(), &[v[0], v[1]]).unwrap();
        graph.add_factor(root, pair(), &[v[2], v[3]]).unwrap();
        assert!(!graph.is_tree(root, FLAT).unwrap());
        assert!(graph.is_forest(root, FLAT).unwrap());
        let components = graph.connected_components(root, FLAT).unwrap();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].len(), 3);
    }

    #[test]
    fn loop_hidden_inside_opaque_subgraph() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let x = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let sub = graph.add_subgraph(root).unwrap();
        let a = graph.add_variable(sub, Variable::discrete(2)).unwrap();
        graph.add_factor(sub, pair(), &[x, a]).unwrap();
        graph.add_factor(sub, pair(), &[a, x]).unwrap();

        assert!(!graph.is_tree(root, FLAT).unwrap());
        // x with two edges into one opaque node.
        assert!(!graph.is_tree(root, TOP).unwrap());
        let lone = graph.add_subgraph(root).unwrap();
        assert!(graph.is_forest(lone, FLAT).unwrap());
    }

    #[test]
    fn single_factor_subgraph_is_tree_at_top() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let x = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let sub = graph.add_subgraph(root).unwrap();
        graph.add_factor(sub, pair(), &[x]).unwrap();
        assert!(graph.is_tree(root, TOP).unwrap());
        assert!(graph.is_tree(root, FLAT).unwrap());
    }

    #[test]
    fn dfs_and_adjacency() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let v = graph
            .add_variables(root, (0..2).map(|_| Variable::discrete(2)))
            .unwrap();
        let f = graph.add_factor(root, pair(), &[v[0], v[1]]).unwrap();
        let visited = graph.depth_first_search(v[0].node(), usize::MAX, FLAT).unwrap();
        assert_eq!(visited, vec![v[0].node(), f.node(), v[1].node()]);

        let nodes = [v[0].node(), f.node(), v[1].node()];
        let matrix = graph.adjacency_matrix(&nodes).unwrap();
        assert_eq!(
            matrix,
            vec![
                vec![false, true, false],
                vec![true, false, true],
                vec![false, true, false],
            ]
        );
    }
}
