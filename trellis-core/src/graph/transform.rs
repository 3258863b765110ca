//! Structural Transforms
//!
//! Operations that rewrite a region of the graph while keeping what it
//! models the same: absorbing a subgraph into its parent, joining factors or
//! variables into one joint node, and splitting a variable in two.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Error, Result};

use super::events::{EventMask, GraphEvent};
use super::factor_graph::{FactorGraph, FLAT};
use super::ids::{FactorKey, GraphKey, NodeKey, VariableKey};
use super::node::{Domain, Factor, FactorFunction, NodeKind, Payload, Projection, Variable};

/// Edges of one factor recorded while it is being re-homed: each variable
/// with its sibling position on the variable side.
struct DetachedEdges {
    factor: NodeKey,
    edges: Vec<(NodeKey, usize)>,
}

impl FactorGraph {
    /// Move everything owned by `subgraph` into `parent`, then delete the
    /// empty subgraph node. Keys of the moved nodes stay valid; their local
    /// ids change.
    pub fn absorb_subgraph(&mut self, parent: GraphKey, subgraph: GraphKey) -> Result<()> {
        self.check_graph(parent)?;
        self.check_graph(subgraph)?;
        if self.data(subgraph.0).parent != Some(parent.0) {
            return Err(Error::NotDirectSubgraph {
                graph: parent,
                subgraph,
            });
        }
        self.check_absorb_names(parent.0, &[subgraph.0])?;
        self.absorb_unchecked(subgraph.0);
        Ok(())
    }

    /// Fail if moving the contents of `graphs` into `target` would reuse a name.
    fn check_absorb_names(&self, target: NodeKey, graphs: &[NodeKey]) -> Result<()> {
        let mut taken: HashSet<&str> = self
            .gdata(target)
            .names
            .iter()
            .filter(|(_, node)| !graphs.contains(node))
            .map(|(name, _)| name.as_str())
            .collect();
        for &graph in graphs {
            for (name, node) in &self.gdata(graph).names {
                if graphs.contains(node) {
                    continue;
                }
                if !taken.insert(name.as_str()) {
                    return Err(Error::DuplicateName {
                        name: name.clone(),
                        graph: GraphKey(target),
                    });
                }
            }
        }
        Ok(())
    }

    fn absorb_unchecked(&mut self, subgraph: NodeKey) {
        let parent = self.owner(subgraph);

        // Factors whose edges are encoded relative to the subgraph: its own,
        // and nested factors that use one of its variables.
        let mut affected: Vec<NodeKey> = self.gdata(subgraph).live(NodeKind::Factor).collect();
        for nested in self.subgraphs_within(subgraph, FLAT) {
            for factor in self.gdata(nested).live(NodeKind::Factor) {
                let count = self.data(factor).siblings.len();
                if (0..count).any(|i| self.owner(self.sibling_unchecked(factor, i)) == subgraph) {
                    affected.push(factor);
                }
            }
        }

        let mut detached = Vec::with_capacity(affected.len());
        for factor in affected {
            let count = self.data(factor).siblings.len();
            let edges = (0..count)
                .map(|i| self.disconnect(factor, i, true))
                .collect();
            detached.push(DetachedEdges { factor, edges });
        }

        let moving: Vec<NodeKey> = {
            let data = self.gdata(subgraph);
            data.live(NodeKind::Variable)
                .chain(data.live(NodeKind::Factor))
                .chain(data.live(NodeKind::Graph))
                .collect()
        };
        for node in moving {
            self.detach(node);
            self.raise_membership(subgraph, node, false);
            self.attach(parent, node);
            self.raise_membership(parent, node, true);
        }

        self.detach(subgraph);
        self.raise(EventMask::SUBGRAPH, || GraphEvent::SubgraphRemoved {
            graph: GraphKey(parent),
            subgraph: GraphKey(subgraph),
            absorbed: true,
        });
        self.free(subgraph);

        for DetachedEdges { factor, edges } in detached {
            for (index, (variable, position)) in edges.into_iter().enumerate() {
                self.connect(factor, variable, Some(index), Some(position));
            }
        }
        debug!(graph = %parent, subgraph = %subgraph, "subgraph absorbed");
    }

    /// Added/removed event for `node` changing owner during an absorb.
    fn raise_membership(&mut self, graph: NodeKey, node: NodeKey, added: bool) {
        let graph = GraphKey(graph);
        match self.data(node).kind() {
            NodeKind::Variable => {
                let variable = VariableKey(node);
                self.raise(EventMask::VARIABLE, || match added {
                    true => GraphEvent::VariableAdded { graph, variable, absorbed: true },
                    false => GraphEvent::VariableRemoved { graph, variable, absorbed: true },
                });
            }
            NodeKind::Factor => {
                let factor = FactorKey(node);
                self.raise(EventMask::FACTOR, || match added {
                    true => GraphEvent::FactorAdded { graph, factor, absorbed: true },
                    false => GraphEvent::FactorRemoved { graph, factor, absorbed: true },
                });
            }
            NodeKind::Graph => {
                let subgraph = GraphKey(node);
                self.raise(EventMask::SUBGRAPH, || match added {
                    true => GraphEvent::SubgraphAdded { graph, subgraph, absorbed: true },
                    false => GraphEvent::SubgraphRemoved { graph, subgraph, absorbed: true },
                });
            }
        }
    }

    /// Replace `factors` with one joint factor over the union of their
    /// variables. See [`join_factors_with_variables`](Self::join_factors_with_variables).
    pub fn join_factors(&mut self, factors: &[FactorKey]) -> Result<FactorKey> {
        self.join_factors_with_variables(&[], factors)
    }

    /// Replace `factors` with one joint factor.
    ///
    /// The joint factor's variables are `variables` followed by any factor
    /// variable not already listed, in first-use order. Its function is the
    /// product of the original functions, each reading its own variables in
    /// its own order; listed variables no factor uses contribute a uniform
    /// part. Subgraphs between the factors and their common ancestor are
    /// absorbed into it, the joint factor is added there, and the originals
    /// are removed.
    ///
    /// A factor listed more than once is joined once. Joining one factor
    /// over its own variables in its own order returns that factor and
    /// changes nothing.
    pub fn join_factors_with_variables(
        &mut self,
        variables: &[VariableKey],
        factors: &[FactorKey],
    ) -> Result<FactorKey> {
        let mut distinct: Vec<FactorKey> = Vec::with_capacity(factors.len());
        for &factor in factors {
            self.check_factor(factor)?;
            if !distinct.contains(&factor) {
                distinct.push(factor);
            }
        }
        let factors = distinct.as_slice();
        let Some(&first) = factors.first() else {
            return Err(Error::Empty);
        };
        for &variable in variables {
            self.check_variable(variable)?;
        }
        if factors.len() == 1 {
            let own = self.factor_variables(first)?;
            if variables.is_empty() || variables == own.as_slice() {
                return Ok(first);
            }
        }

        let mut union: Vec<NodeKey> = Vec::new();
        for variable in variables {
            if !union.contains(&variable.0) {
                union.push(variable.0);
            }
        }
        let mut parts = Vec::with_capacity(factors.len());
        for &factor in factors {
            let mut positions = Vec::new();
            for variable in self.siblings(factor.0)? {
                let position = match union.iter().position(|&v| v == variable) {
                    Some(p) => p,
                    None if variables.is_empty() => {
                        union.push(variable);
                        union.len() - 1
                    }
                    None => {
                        return Err(Error::JoinVariableMissing {
                            variable: VariableKey(variable),
                            factor: factor.0,
                        })
                    }
                };
                positions.push(position);
            }
            parts.push((self.function(factor)?.clone(), positions));
        }
        let used: HashSet<usize> = parts.iter().flat_map(|(_, p)| p.iter().copied()).collect();
        let unused: Vec<usize> = (0..union.len()).filter(|p| !used.contains(p)).collect();
        if !unused.is_empty() {
            parts.push((FactorFunction::Uniform, unused));
        }

        let mut ancestor = self.owner(first.0);
        for factor in &factors[1..] {
            ancestor = self.common_ancestor(ancestor, factor.0)?.ancestor.0;
        }
        let mut uncommon: Vec<(usize, NodeKey)> = Vec::new();
        for factor in factors {
            for graph in self.ancestors(factor.0).take_while(|&g| g != ancestor) {
                if !uncommon.iter().any(|&(_, g)| g == graph) {
                    let depth = self.ancestors(graph).position(|g| g == ancestor).unwrap_or_default();
                    uncommon.push((depth, graph));
                }
            }
        }
        uncommon.sort_by_key(|&(depth, _)| depth);
        let uncommon: Vec<NodeKey> = uncommon.into_iter().map(|(_, g)| g).collect();

        for &variable in &union {
            let owner = self.owner(variable);
            let visible = owner == ancestor
                || self.is_strict_ancestor(owner, ancestor)
                || uncommon.contains(&owner);
            if !visible {
                return Err(Error::VariableOutOfScope {
                    variable: VariableKey(variable),
                    graph: GraphKey(ancestor),
                });
            }
        }
        self.check_absorb_names(ancestor, &uncommon)?;

        for graph in uncommon {
            self.absorb_unchecked(graph);
        }
        let keys: Vec<VariableKey> = union.iter().copied().map(VariableKey).collect();
        let joint = self.add_factor(
            GraphKey(ancestor),
            Factor::new(FactorFunction::Joint(parts)),
            &keys,
        )?;
        for factor in factors {
            self.remove_factor_unchecked(factor.0);
        }
        debug!(graph = %ancestor, factor = %joint, joined = factors.len(), "factors joined");
        Ok(joint)
    }

    /// Replace `variables` with one joint variable whose domain is the
    /// product of theirs. Every factor that used any of them is rewired to
    /// the joint variable with a projected function, and loses its
    /// direction. The originals are removed.
    pub fn join_variables(&mut self, variables: &[VariableKey]) -> Result<VariableKey> {
        let mut distinct: Vec<NodeKey> = Vec::with_capacity(variables.len());
        for &variable in variables {
            self.check_variable(variable)?;
            if !distinct.contains(&variable.0) {
                distinct.push(variable.0);
            }
        }
        if distinct.len() < 2 {
            return Err(Error::TooFewVariables {
                required: 2,
                actual: distinct.len(),
            });
        }

        let mut ancestor = self.owner(distinct[0]);
        for &variable in &distinct[1..] {
            ancestor = self.common_ancestor(ancestor, self.owner(variable))?.ancestor.0;
        }

        let domain = Domain::Joint(
            distinct
                .iter()
                .map(|&v| self.domain(VariableKey(v)).cloned())
                .collect::<Result<_>>()?,
        );
        let joint = self.add_variable(GraphKey(ancestor), Variable::new(domain))?;

        let mut factors: Vec<NodeKey> = Vec::new();
        for &variable in &distinct {
            for factor in self.siblings(variable)? {
                if !factors.contains(&factor) {
                    factors.push(factor);
                }
            }
        }

        for factor in factors {
            let old = self.siblings(factor)?;
            let mut new: Vec<NodeKey> = Vec::with_capacity(old.len());
            let mut arguments = Vec::with_capacity(old.len());
            for &variable in &old {
                match distinct.iter().position(|&v| v == variable) {
                    Some(component) => {
                        let position = match new.iter().position(|&v| v == joint.0) {
                            Some(p) => p,
                            None => {
                                new.push(joint.0);
                                new.len() - 1
                            }
                        };
                        arguments.push(Projection::Component { position, component });
                    }
                    None => {
                        new.push(variable);
                        arguments.push(Projection::Direct(new.len() - 1));
                    }
                }
            }
            for index in (0..old.len()).rev() {
                self.disconnect(factor, index, false);
            }
            for &variable in &new {
                self.connect(factor, variable, None, None);
            }
            if let Payload::Factor { function, directed_to } = &mut self.data_mut(factor).payload {
                let inner = std::mem::replace(function, FactorFunction::Uniform);
                *function = FactorFunction::Projected {
                    inner: Box::new(inner),
                    arguments,
                };
                *directed_to = None;
            }
        }

        for variable in distinct {
            self.remove_variable_unchecked(variable);
        }
        debug!(graph = %ancestor, variable = %joint, joined = variables.len(), "variables joined");
        Ok(joint)
    }

    /// Create a copy of `variable` in the same graph, tie the two together
    /// with an equality factor, and move `factors` over to the copy. Every
    /// factor listed must use `variable`.
    pub fn split(&mut self, variable: VariableKey, factors: &[FactorKey]) -> Result<VariableKey> {
        self.check_variable(variable)?;
        for &factor in factors {
            self.check_factor(factor)?;
            if self.sibling_index(factor.0, variable.0)?.is_none() {
                return Err(Error::NotConnected { factor, variable });
            }
        }
        let owner = GraphKey(self.owner(variable.0));
        let domain = self.domain(variable)?.clone();
        let copy = self.add_variable(owner, Variable::new(domain))?;
        self.add_factor(owner, Factor::new(FactorFunction::Equality), &[variable, copy])?;
        for &factor in factors {
            let count = self.data(factor.0).siblings.len();
            for index in 0..count {
                if self.sibling_unchecked(factor.0, index) == variable.0 {
                    self.replace_edge(factor, index, copy)?;
                }
            }
        }
        debug!(graph = %owner, variable = %variable, copy = %copy, moved = factors.len(), "variable split");
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::events::EventLog;
    use crate::graph::TOP;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn named(name: &str) -> Factor {
        Factor::new(FactorFunction::named(name))
    }

    #[test]
    fn absorb_moves_nodes_and_rewrites_edges() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let x = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let sub = graph.add_subgraph(root).unwrap();
        let nested = graph.add_subgraph(sub).unwrap();
        let y = graph.add_variable(sub, Variable::discrete(3).with_name("y")).unwrap();
        let f = graph.add_factor(sub, named("f"), &[x, y]).unwrap();
        let g = graph.add_factor(nested, named("g"), &[y, x]).unwrap();
        graph.set_directed_to(f, &[y]).unwrap();

        graph.absorb_subgraph(root, sub).unwrap();

        assert!(!graph.contains(sub.node()));
        assert_eq!(graph.parent_graph(y.node()).unwrap(), Some(root));
        assert_eq!(graph.parent_graph(nested.node()).unwrap(), Some(root));
        assert_eq!(graph.variable_by_name(root, "y").unwrap(), Some(y));

        assert_eq!(graph.factor_variables(f).unwrap(), vec![x, y]);
        assert!(graph.edge_state(f.node(), 0).unwrap().unwrap().is_local());
        assert_eq!(graph.directed_to(f).unwrap(), Some(vec![y]));

        assert_eq!(graph.factor_variables(g).unwrap(), vec![y, x]);
        assert_eq!(graph.variable_factors(y).unwrap(), vec![f, g]);
        assert_eq!(graph.boundary_variables(nested).unwrap(), vec![y, x]);
        assert_eq!(graph.variable_count(root, TOP).unwrap(), 2);
        assert_eq!(graph.factor_count(root, TOP).unwrap(), 1);
    }

    #[test]
    fn absorb_reports_moves() {
        let log = Rc::new(RefCell::new(EventLog::new()));
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let sub = graph.add_subgraph(root).unwrap();
        let y = graph.add_variable(sub, Variable::discrete(2)).unwrap();
        graph.set_event_sink(Some(Box::new(Rc::clone(&log))));
        graph.absorb_subgraph(root, sub).unwrap();
        assert_eq!(
            log.borrow().events(),
            &[
                GraphEvent::VariableRemoved { graph: sub, variable: y, absorbed: true },
                GraphEvent::VariableAdded { graph: root, variable: y, absorbed: true },
                GraphEvent::SubgraphRemoved { graph: root, subgraph: sub, absorbed: true },
            ]
        );
    }

    #[test]
    fn absorb_rejects_name_clash() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        graph.add_variable(root, Variable::discrete(2).with_name("a")).unwrap();
        let sub = graph.add_subgraph(root).unwrap();
        graph.add_variable(sub, Variable::discrete(2).with_name("a")).unwrap();
        let err = graph.absorb_subgraph(root, sub).unwrap_err();
        assert!(matches!(err, Error::DuplicateName { .. }));
        assert!(graph.contains(sub.node()));
    }

    #[test]
    fn single_factor_join_is_identity() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let a = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let b = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(root, named("f"), &[a, b]).unwrap();
        let version = graph.global_structure_version();
        assert_eq!(graph.join_factors_with_variables(&[a, b], &[f]).unwrap(), f);
        assert_eq!(graph.join_factors(&[f]).unwrap(), f);
        assert_eq!(graph.global_structure_version(), version);
    }

    #[test]
    fn repeated_factor_is_joined_once() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let a = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let b = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let c = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(root, named("f"), &[a, b]).unwrap();
        let version = graph.global_structure_version();
        assert_eq!(graph.join_factors(&[f, f]).unwrap(), f);
        assert_eq!(graph.global_structure_version(), version);

        let g = graph.add_factor(root, named("g"), &[b, c]).unwrap();
        let joint = graph.join_factors(&[f, g, f]).unwrap();
        assert!(!graph.contains(f.node()));
        assert!(!graph.contains(g.node()));
        assert_eq!(graph.factor_count(root, FLAT).unwrap(), 1);
        assert_eq!(graph.factor_variables(joint).unwrap(), vec![a, b, c]);
        assert_eq!(
            graph.function(joint).unwrap(),
            &FactorFunction::Joint(vec![
                (FactorFunction::named("f"), vec![0, 1]),
                (FactorFunction::named("g"), vec![1, 2]),
            ])
        );
    }

    #[test]
    fn join_builds_product_function() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let a = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let b = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let c = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(root, named("f"), &[b, a]).unwrap();
        let g = graph.add_factor(root, named("g"), &[c, b]).unwrap();

        let joint = graph.join_factors(&[f, g]).unwrap();
        assert!(!graph.contains(f.node()));
        assert!(!graph.contains(g.node()));
        assert_eq!(graph.factor_variables(joint).unwrap(), vec![b, a, c]);
        assert_eq!(
            graph.function(joint).unwrap(),
            &FactorFunction::Joint(vec![
                (FactorFunction::named("f"), vec![0, 1]),
                (FactorFunction::named("g"), vec![2, 0]),
            ])
        );
    }

    #[test]
    fn join_with_extra_variable_adds_uniform_part() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let a = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let extra = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(root, named("f"), &[a]).unwrap();
        let joint = graph.join_factors_with_variables(&[extra, a], &[f]).unwrap();
        assert_eq!(graph.factor_variables(joint).unwrap(), vec![extra, a]);
        assert_eq!(
            graph.function(joint).unwrap(),
            &FactorFunction::Joint(vec![
                (FactorFunction::named("f"), vec![1]),
                (FactorFunction::Uniform, vec![0]),
            ])
        );
    }

    #[test]
    fn join_requires_listed_variables() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let a = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let b = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(root, named("f"), &[a, b]).unwrap();
        let err = graph.join_factors_with_variables(&[a], &[f]).unwrap_err();
        assert_eq!(err, Error::JoinVariableMissing { variable: b, factor: f.node() });
        assert!(graph.contains(f.node()));
    }

    #[test]
    fn join_absorbs_intermediate_subgraphs() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let x = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let left = graph.add_subgraph(root).unwrap();
        let deep = graph.add_subgraph(left).unwrap();
        let right = graph.add_subgraph(root).unwrap();
        let y = graph.add_variable(left, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(deep, named("f"), &[x, y]).unwrap();
        let g = graph.add_factor(right, named("g"), &[x]).unwrap();

        let joint = graph.join_factors(&[f, g]).unwrap();
        assert_eq!(graph.parent_graph(joint.node()).unwrap(), Some(root));
        assert!(!graph.contains(left.node()));
        assert!(!graph.contains(deep.node()));
        assert!(!graph.contains(right.node()));
        assert_eq!(graph.parent_graph(y.node()).unwrap(), Some(root));
        assert_eq!(graph.factor_variables(joint).unwrap(), vec![x, y]);
        assert_eq!(graph.factor_count(root, FLAT).unwrap(), 1);
    }

    #[test]
    fn join_variables_projects_factor_functions() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let a = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let b = graph.add_variable(root, Variable::discrete(3)).unwrap();
        let c = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(root, named("f"), &[c, b, a]).unwrap();
        graph.set_directed_to(f, &[a]).unwrap();

        let joint = graph.join_variables(&[a, b]).unwrap();
        assert!(!graph.contains(a.node()));
        assert!(!graph.contains(b.node()));
        assert_eq!(graph.domain(joint).unwrap().size(), Some(6));
        assert_eq!(graph.factor_variables(f).unwrap(), vec![c, joint]);
        assert_eq!(graph.directed_to(f).unwrap(), None);
        assert_eq!(
            graph.function(f).unwrap(),
            &FactorFunction::Projected {
                inner: Box::new(FactorFunction::named("f")),
                arguments: vec![
                    Projection::Direct(0),
                    Projection::Component { position: 1, component: 1 },
                    Projection::Component { position: 1, component: 0 },
                ],
            }
        );
    }

    #[test]
    fn join_variables_needs_two() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let a = graph.add_variable(root, Variable::discrete(2)).unwrap();
        assert_eq!(
            graph.join_variables(&[a, a]).unwrap_err(),
            Error::TooFewVariables { required: 2, actual: 1 }
        );
    }

    #[test]
    fn join_variables_lands_in_common_ancestor() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let sub = graph.add_subgraph(root).unwrap();
        let a = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let b = graph.add_variable(sub, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(sub, named("f"), &[a, b]).unwrap();
        let joint = graph.join_variables(&[b, a]).unwrap();
        assert_eq!(graph.parent_graph(joint.node()).unwrap(), Some(root));
        assert_eq!(graph.factor_variables(f).unwrap(), vec![joint]);
        assert!(graph.is_boundary_variable(sub, joint).unwrap());
    }

    #[test]
    fn split_moves_listed_factors() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let x = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let y = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(root, named("f"), &[x, y]).unwrap();
        let g = graph.add_factor(root, named("g"), &[x]).unwrap();

        let copy = graph.split(x, &[f]).unwrap();
        assert_eq!(graph.factor_variables(f).unwrap(), vec![copy, y]);
        assert_eq!(graph.factor_variables(g).unwrap(), vec![x]);
        let factors = graph.variable_factors(x).unwrap();
        assert_eq!(factors.len(), 2);
        let equality = factors[1];
        assert_eq!(graph.function(equality).unwrap(), &FactorFunction::Equality);
        assert_eq!(graph.factor_variables(equality).unwrap(), vec![x, copy]);
        assert_eq!(graph.domain(copy).unwrap(), graph.domain(x).unwrap());
    }

    #[test]
    fn split_into_subgraph_factor_uses_boundary_edge() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let x = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let sub = graph.add_subgraph(root).unwrap();
        let y = graph.add_variable(sub, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(sub, named("f"), &[x, y]).unwrap();

        let copy = graph.split(x, &[f]).unwrap();
        assert_eq!(graph.parent_graph(copy.node()).unwrap(), Some(root));
        assert_eq!(graph.factor_variables(f).unwrap(), vec![copy, y]);
        assert!(!graph.edge_state(f.node(), 0).unwrap().unwrap().is_local());
        assert_eq!(graph.sibling_index(f.node(), copy.node()).unwrap(), Some(0));
        let back = graph.sibling_index(copy.node(), f.node()).unwrap().unwrap();
        assert!(!graph.edge_state(copy.node(), back).unwrap().unwrap().is_local());
        assert_eq!(graph.boundary_variables(sub).unwrap(), vec![x, copy]);
        assert!(graph.is_boundary_variable(sub, copy).unwrap());

        let equality = graph.variable_factors(x).unwrap();
        assert_eq!(equality.len(), 1);
        assert_eq!(graph.parent_graph(equality[0].node()).unwrap(), Some(root));
        assert!(graph.edge_state(equality[0].node(), 0).unwrap().unwrap().is_local());
    }

    #[test]
    fn split_rejects_unconnected_factor() {
        let mut graph = FactorGraph::new();
        let root = graph.root();
        let x = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let y = graph.add_variable(root, Variable::discrete(2)).unwrap();
        let f = graph.add_factor(root, named("f"), &[y]).unwrap();
        assert_eq!(
            graph.split(x, &[f]).unwrap_err(),
            Error::NotConnected { factor: f, variable: x }
        );
        assert_eq!(graph.variable_count(root, FLAT).unwrap(), 2);
    }
}
