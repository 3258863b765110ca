//! Factor Graph Arena
//!
//! A [`FactorGraph`] holds one whole graph tree: the root graph, every nested
//! subgraph, and all of their variables and factors. Nodes live in a single
//! slab and refer to each other by [`NodeKey`], so there are no reference
//! cycles between graphs, nodes and edges.
//!
//! # Ownership
//!
//! Each variable, factor and subgraph is owned by exactly one graph, which
//! keeps it in a per-kind array indexed by the node's [`LocalId`] index.
//! Removing a node nulls its slot; slots are never compacted or reused, so
//! the local ids of the remaining nodes do not change.
//!
//! # Edges
//!
//! A factor may connect to variables owned by its own graph (local edge) or
//! by any ancestor graph (boundary edge). Connecting to an ancestor's variable
//! exposes it as a boundary variable of every graph between the two. Each
//! node's sibling list records, per edge, the slot of that edge in the
//! owner's edge array.
//!
//! # Versions
//!
//! Every structural change bumps the `structure_version` of each graph it
//! touches and the tree-wide `global_structure_version`. Derived state such
//! as a schedule records the global version it was computed at and can tell
//! it is stale with one comparison.
//!
//! # Atomicity
//!
//! Operations validate everything they need before changing anything. An
//! `Err` return means the tree is exactly as it was.

use std::any::Any;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::GraphOptions;
use crate::error::{Error, Result};

use super::edge::EdgeState;
use super::events::{EventMask, GraphEvent, GraphEventSink};
use super::ids::{Environment, FactorKey, GlobalId, GraphKey, LocalId, NodeKey, VariableKey};
use super::node::{
    Domain, Factor, FactorFunction, GraphData, NodeData, NodeFlags, NodeKind, Payload, Variable,
};

/// Nesting depth that includes every nested subgraph.
pub const FLAT: usize = usize::MAX;
/// Nesting depth that includes only a graph's own nodes.
pub const TOP: usize = 0;

/// Sibling slot reserved while an edge is being re-encoded.
pub(crate) const PLACEHOLDER: u32 = u32::MAX;

/// Creates the opaque per-node object a solver keeps for each node.
pub trait SolverFactory {
    /// Object for `node`, called when the node is attached or the factory is
    /// installed. `None` leaves the slot empty.
    fn create_solver_object(&self, graph: &FactorGraph, node: NodeKey) -> Option<Box<dyn Any>>;
}

/// Result of [`FactorGraph::common_ancestor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonAncestor {
    /// Deepest graph containing both nodes.
    pub ancestor: GraphKey,
    /// Graphs strictly between either node and the ancestor, deepest first.
    pub uncommon: Vec<GraphKey>,
}

/// A graph tree: root graph, nested subgraphs, variables and factors.
pub struct FactorGraph {
    env: Rc<Environment>,
    tree: u32,
    nodes: Vec<Option<NodeData>>,
    root: NodeKey,
    global_structure_version: u64,
    pub(crate) options: GraphOptions,
    sink: Option<Box<dyn GraphEventSink>>,
    event_mask: EventMask,
    solver_factory: Option<Rc<dyn SolverFactory>>,
}

impl Default for FactorGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FactorGraph {
    /// Create an empty tree with default options in a fresh environment.
    pub fn new() -> Self {
        Self::with_options(GraphOptions::default())
    }

    /// Create an empty tree with `options` in a fresh environment.
    pub fn with_options(options: GraphOptions) -> Self {
        Self::with_environment(&Environment::new(), options)
    }

    /// Create an empty tree drawing ids from `env`.
    pub fn with_environment(env: &Rc<Environment>, options: GraphOptions) -> Self {
        let tree = env.allocate_tree();
        let root_data = NodeData::new(
            Payload::Graph(Box::new(GraphData::new(env.allocate_graph_id()))),
            None,
            None,
        );
        Self {
            env: Rc::clone(env),
            tree,
            nodes: vec![Some(root_data)],
            root: NodeKey::new(tree, 0),
            global_structure_version: 0,
            options,
            sink: None,
            event_mask: EventMask::NONE,
            solver_factory: None,
        }
    }

    /// The root graph.
    pub fn root(&self) -> GraphKey {
        GraphKey(self.root)
    }

    /// Environment ids are drawn from.
    pub fn environment(&self) -> &Rc<Environment> {
        &self.env
    }

    /// Options the tree was created with.
    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Tree-wide structure version.
    pub fn global_structure_version(&self) -> u64 {
        self.global_structure_version
    }

    // ------------------------------------------------------------------
    // Arena access
    // ------------------------------------------------------------------

    fn slot(&self, key: NodeKey) -> Result<&NodeData> {
        if key.tree != self.tree {
            return Err(Error::ForeignNode(key));
        }
        self.nodes
            .get(key.index as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::StaleNode(key))
    }

    /// Validated record of a node of `kind`.
    fn typed_slot(&self, key: NodeKey, kind: NodeKind) -> Result<&NodeData> {
        let data = self.slot(key)?;
        if data.kind() != kind {
            return Err(Error::WrongNodeKind {
                node: key,
                expected: kind.name(),
                actual: data.kind().name(),
            });
        }
        Ok(data)
    }

    pub(crate) fn check_graph(&self, graph: GraphKey) -> Result<()> {
        self.typed_slot(graph.0, NodeKind::Graph).map(|_| ())
    }

    pub(crate) fn check_variable(&self, variable: VariableKey) -> Result<()> {
        self.typed_slot(variable.0, NodeKind::Variable).map(|_| ())
    }

    pub(crate) fn check_factor(&self, factor: FactorKey) -> Result<()> {
        self.typed_slot(factor.0, NodeKind::Factor).map(|_| ())
    }

    /// Record of a node already known to be live.
    pub(crate) fn data(&self, key: NodeKey) -> &NodeData {
        match self.nodes.get(key.index as usize).and_then(Option::as_ref) {
            Some(data) => data,
            None => unreachable!("node {key} is not live"),
        }
    }

    pub(crate) fn data_mut(&mut self, key: NodeKey) -> &mut NodeData {
        match self.nodes.get_mut(key.index as usize).and_then(Option::as_mut) {
            Some(data) => data,
            None => unreachable!("node {key} is not live"),
        }
    }

    pub(crate) fn gdata(&self, graph: NodeKey) -> &GraphData {
        match self.data(graph).graph() {
            Some(data) => data,
            None => unreachable!("node {graph} is not a graph"),
        }
    }

    pub(crate) fn gdata_mut(&mut self, graph: NodeKey) -> &mut GraphData {
        match self.data_mut(graph).graph_mut() {
            Some(data) => data,
            None => unreachable!("node {graph} is not a graph"),
        }
    }

    /// Owning graph of an attached node.
    pub(crate) fn owner(&self, node: NodeKey) -> NodeKey {
        match self.data(node).parent {
            Some(parent) => parent,
            None => unreachable!("node {node} has no owner"),
        }
    }

    pub(crate) fn alloc(&mut self, data: NodeData) -> NodeKey {
        let key = NodeKey::new(self.tree, self.nodes.len() as u32);
        self.nodes.push(Some(data));
        key
    }

    pub(crate) fn free(&mut self, key: NodeKey) -> Option<NodeData> {
        self.nodes.get_mut(key.index as usize).and_then(Option::take)
    }

    /// Every live node key, in allocation order.
    pub fn live_nodes(&self) -> impl Iterator<Item = NodeKey> + '_ {
        let tree = self.tree;
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(move |(i, _)| NodeKey::new(tree, i as u32))
    }

    // ------------------------------------------------------------------
    // Node queries
    // ------------------------------------------------------------------

    /// True if `key` refers to a live node of this tree.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.slot(key).is_ok()
    }

    /// Kind of a node.
    pub fn kind(&self, node: NodeKey) -> Result<NodeKind> {
        Ok(self.slot(node)?.kind())
    }

    /// Typed key for a variable node.
    pub fn as_variable(&self, node: NodeKey) -> Result<VariableKey> {
        self.typed_slot(node, NodeKind::Variable)?;
        Ok(VariableKey(node))
    }

    /// Typed key for a factor node.
    pub fn as_factor(&self, node: NodeKey) -> Result<FactorKey> {
        self.typed_slot(node, NodeKind::Factor)?;
        Ok(FactorKey(node))
    }

    /// Typed key for a graph node.
    pub fn as_graph(&self, node: NodeKey) -> Result<GraphKey> {
        self.typed_slot(node, NodeKind::Graph)?;
        Ok(GraphKey(node))
    }

    /// Graph that owns `node`. `None` for the root.
    pub fn parent_graph(&self, node: NodeKey) -> Result<Option<GraphKey>> {
        Ok(self.slot(node)?.parent.map(GraphKey))
    }

    /// The root graph of the tree holding `node`.
    pub fn root_graph(&self, node: NodeKey) -> Result<GraphKey> {
        self.slot(node)?;
        Ok(self.root())
    }

    /// Id of `node` within its owning graph.
    pub fn local_id(&self, node: NodeKey) -> Result<LocalId> {
        Ok(self.slot(node)?.local_id)
    }

    /// Id of `node` within the environment. The root uses its own graph id.
    pub fn global_id(&self, node: NodeKey) -> Result<GlobalId> {
        let data = self.slot(node)?;
        let graph = data.parent.unwrap_or(node);
        Ok(GlobalId::new(self.gdata(graph).graph_id, data.local_id))
    }

    /// Environment-unique id of a graph.
    pub fn graph_id(&self, graph: GraphKey) -> Result<u32> {
        self.check_graph(graph)?;
        Ok(self.gdata(graph.0).graph_id)
    }

    /// Explicit name.
    pub fn name(&self, node: NodeKey) -> Result<Option<&str>> {
        Ok(self.slot(node)?.name.as_deref())
    }

    /// Display label: the label if set, else the name, else the local id.
    pub fn label(&self, node: NodeKey) -> Result<String> {
        let data = self.slot(node)?;
        Ok(match (&data.label, &data.name) {
            (Some(label), _) => label.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => data.local_id.to_string(),
        })
    }

    /// Set the display label.
    pub fn set_label(&mut self, node: NodeKey, label: Option<&str>) -> Result<()> {
        self.slot(node)?;
        self.data_mut(node).label = label.map(str::to_owned);
        Ok(())
    }

    /// Domain of a variable.
    pub fn domain(&self, variable: VariableKey) -> Result<&Domain> {
        match &self.typed_slot(variable.0, NodeKind::Variable)?.payload {
            Payload::Variable { domain } => Ok(domain),
            _ => unreachable!("checked variable payload"),
        }
    }

    /// Function of a factor.
    pub fn function(&self, factor: FactorKey) -> Result<&FactorFunction> {
        match &self.typed_slot(factor.0, NodeKind::Factor)?.payload {
            Payload::Factor { function, .. } => Ok(function),
            _ => unreachable!("checked factor payload"),
        }
    }

    /// Number of siblings. For a graph node this is its boundary size.
    pub fn sibling_count(&self, node: NodeKey) -> Result<usize> {
        let data = self.slot(node)?;
        Ok(match data.graph() {
            Some(graph) => graph.boundary.len(),
            None => data.siblings.len(),
        })
    }

    /// Sibling `index` of `node`: the other endpoint of its `index`th edge,
    /// or for a graph node its `index`th boundary variable.
    pub fn sibling(&self, node: NodeKey, index: usize) -> Result<Option<NodeKey>> {
        if index >= self.sibling_count(node)? {
            return Ok(None);
        }
        Ok(Some(self.sibling_unchecked(node, index)))
    }

    /// All siblings of `node`, in edge order.
    pub fn siblings(&self, node: NodeKey) -> Result<Vec<NodeKey>> {
        let count = self.sibling_count(node)?;
        Ok((0..count).map(|i| self.sibling_unchecked(node, i)).collect())
    }

    /// Variables of a factor, in edge order.
    pub fn factor_variables(&self, factor: FactorKey) -> Result<Vec<VariableKey>> {
        self.check_factor(factor)?;
        Ok(self.siblings(factor.0)?.into_iter().map(VariableKey).collect())
    }

    /// Factors connected to a variable, in edge order.
    pub fn variable_factors(&self, variable: VariableKey) -> Result<Vec<FactorKey>> {
        self.check_variable(variable)?;
        Ok(self.siblings(variable.0)?.into_iter().map(FactorKey).collect())
    }

    /// State of the `index`th edge of a variable or factor.
    pub fn edge_state(&self, node: NodeKey, index: usize) -> Result<Option<EdgeState>> {
        let data = self.slot(node)?;
        if data.kind() == NodeKind::Graph {
            return Ok(None);
        }
        Ok(data.siblings.get(index).map(|&slot| self.edge_at(self.owner(node), slot)))
    }

    /// Local structure version of a graph.
    pub fn structure_version(&self, graph: GraphKey) -> Result<u64> {
        self.check_graph(graph)?;
        Ok(self.gdata(graph.0).structure_version)
    }

    /// Live edges recorded in a graph's edge array, counting boundary edges
    /// on both graphs they touch.
    pub fn edge_count(&self, graph: GraphKey) -> Result<usize> {
        self.check_graph(graph)?;
        Ok(self.gdata(graph.0).edge_count)
    }

    pub(crate) fn edge_at(&self, graph: NodeKey, slot: u32) -> EdgeState {
        match self.gdata(graph).edges.get(slot as usize).copied().flatten() {
            Some(state) => state,
            None => unreachable!("edge slot {slot} of graph {graph} is empty"),
        }
    }

    pub(crate) fn sibling_unchecked(&self, node: NodeKey, index: usize) -> NodeKey {
        let data = self.data(node);
        if let Some(graph) = data.graph() {
            return graph.boundary[index];
        }
        let owner = self.owner(node);
        let owner_data = self.gdata(owner);
        let state = self.edge_at(owner, data.siblings[index]);
        let found = match data.kind() {
            NodeKind::Factor => match (state.variable_index(), state.boundary_index()) {
                (Some(v), _) => owner_data.variables[v as usize],
                (None, Some(b)) => Some(owner_data.boundary[b as usize]),
                (None, None) => None,
            },
            _ => match state.factor_index() {
                Some(f) => owner_data.factors[f as usize],
                None => state.boundary_factor(),
            },
        };
        match found {
            Some(key) => key,
            None => unreachable!("edge of {node} points at a removed node"),
        }
    }

    /// Position of `target` among the siblings of `node`.
    pub fn sibling_index(&self, node: NodeKey, target: NodeKey) -> Result<Option<usize>> {
        let count = self.sibling_count(node)?;
        Ok((0..count).find(|&i| self.sibling_unchecked(node, i) == target))
    }

    // ------------------------------------------------------------------
    // Transient marks
    // ------------------------------------------------------------------

    /// Clear the transient marks of `graph` and everything nested in it.
    pub fn initialize(&mut self, graph: GraphKey) -> Result<()> {
        self.check_graph(graph)?;
        let mut nodes = self.nodes_within(graph.0, FLAT, false);
        nodes.push(graph.0);
        nodes.extend(self.subgraphs_within(graph.0, FLAT));
        for node in nodes {
            self.data_mut(node).flags.clear();
        }
        Ok(())
    }

    /// Set or clear the mark bit.
    pub fn set_marked(&mut self, node: NodeKey, marked: bool) -> Result<()> {
        self.slot(node)?;
        self.data_mut(node).flags.set(NodeFlags::MARKED, marked);
        Ok(())
    }

    /// True if the mark bit is set.
    pub fn is_marked(&self, node: NodeKey) -> Result<bool> {
        Ok(self.slot(node)?.flags.is_set(NodeFlags::MARKED))
    }

    /// Set or clear the visited bit.
    pub fn set_visited(&mut self, node: NodeKey, visited: bool) -> Result<()> {
        self.slot(node)?;
        self.data_mut(node).flags.set(NodeFlags::VISITED, visited);
        Ok(())
    }

    /// True if the visited bit is set.
    pub fn is_visited(&self, node: NodeKey) -> Result<bool> {
        Ok(self.slot(node)?.flags.is_set(NodeFlags::VISITED))
    }

    // ------------------------------------------------------------------
    // Events and solver objects
    // ------------------------------------------------------------------

    /// Install or remove the event sink. Its interests are read now.
    pub fn set_event_sink(&mut self, sink: Option<Box<dyn GraphEventSink>>) {
        self.event_mask = sink
            .as_ref()
            .map_or(EventMask::NONE, |sink| sink.interests());
        self.sink = sink;
    }

    /// Remove and return the event sink.
    pub fn take_event_sink(&mut self) -> Option<Box<dyn GraphEventSink>> {
        self.event_mask = EventMask::NONE;
        self.sink.take()
    }

    pub(crate) fn raise(&mut self, mask: EventMask, event: impl FnOnce() -> GraphEvent) {
        if self.event_mask.contains(mask) {
            if let Some(sink) = self.sink.as_mut() {
                sink.raise_event(&event());
            }
        }
    }

    /// Install or remove the solver factory. Every live node's solver object
    /// is recreated from the new factory, or cleared if there is none.
    pub fn set_solver_factory(&mut self, factory: Option<Rc<dyn SolverFactory>>) {
        self.solver_factory = factory;
        let live: Vec<NodeKey> = self.live_nodes().collect();
        for node in live {
            self.data_mut(node).solver = None;
            self.create_solver_object(node);
        }
    }

    fn create_solver_object(&mut self, node: NodeKey) {
        if let Some(factory) = self.solver_factory.clone() {
            let object = factory.create_solver_object(self, node);
            self.data_mut(node).solver = object;
        }
    }

    /// Solver object of `node`, if one was created.
    pub fn solver_object(&self, node: NodeKey) -> Result<Option<&dyn Any>> {
        Ok(self.slot(node)?.solver.as_deref())
    }

    // ------------------------------------------------------------------
    // Ancestry
    // ------------------------------------------------------------------

    /// Owner chain of `node`, nearest first.
    pub(crate) fn ancestors(&self, node: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        std::iter::successors(self.data(node).parent, move |&g| self.data(g).parent)
    }

    /// True if `graph` owns `node` directly or through nested subgraphs.
    pub fn is_ancestor_of(&self, graph: GraphKey, node: NodeKey) -> Result<bool> {
        self.check_graph(graph)?;
        self.slot(node)?;
        Ok(self.ancestors(node).any(|g| g == graph.0))
    }

    /// Number of subgraph levels between `ancestor` and `node`: 0 when
    /// `ancestor` owns `node` directly, `None` when it is not an ancestor.
    pub fn depth_below_ancestor(&self, node: NodeKey, ancestor: GraphKey) -> Result<Option<usize>> {
        self.check_graph(ancestor)?;
        self.slot(node)?;
        Ok(self.ancestors(node).position(|g| g == ancestor.0))
    }

    /// Graph `height` levels above `node`: 0 is its owner.
    pub fn ancestor_at_height(&self, node: NodeKey, height: usize) -> Result<Option<GraphKey>> {
        self.slot(node)?;
        Ok(self.ancestors(node).nth(height).map(GraphKey))
    }

    /// Deepest graph containing both nodes. A graph node counts as
    /// containing itself.
    pub fn common_ancestor(&self, first: NodeKey, second: NodeKey) -> Result<CommonAncestor> {
        let first_path = self.graph_path(first)?;
        let second_path = self.graph_path(second)?;
        let ancestor = first_path
            .iter()
            .copied()
            .find(|g| second_path.contains(g))
            .unwrap_or(self.root);
        let mut uncommon: Vec<GraphKey> = Vec::new();
        for path in [&first_path, &second_path] {
            for &g in path.iter().take_while(|&&g| g != ancestor) {
                if !uncommon.contains(&GraphKey(g)) {
                    uncommon.push(GraphKey(g));
                }
            }
        }
        Ok(CommonAncestor {
            ancestor: GraphKey(ancestor),
            uncommon,
        })
    }

    /// `node` itself if it is a graph, followed by its owner chain.
    fn graph_path(&self, node: NodeKey) -> Result<Vec<NodeKey>> {
        let data = self.slot(node)?;
        let mut path = Vec::new();
        if data.kind() == NodeKind::Graph {
            path.push(node);
        }
        path.extend(self.ancestors(node));
        Ok(path)
    }

    pub(crate) fn is_strict_ancestor(&self, graph: NodeKey, node: NodeKey) -> bool {
        self.ancestors(node).any(|g| g == graph)
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// Variables and factors owned by `graph` or by subgraphs at most `depth`
    /// levels below it. With `opaque_cut`, subgraphs just past the cut are
    /// included as single nodes.
    pub(crate) fn nodes_within(&self, graph: NodeKey, depth: usize, opaque_cut: bool) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect_within(graph, depth, opaque_cut, &mut out);
        out
    }

    fn collect_within(&self, graph: NodeKey, depth: usize, opaque_cut: bool, out: &mut Vec<NodeKey>) {
        let data = self.gdata(graph);
        out.extend(data.live(NodeKind::Variable));
        out.extend(data.live(NodeKind::Factor));
        for sub in data.live(NodeKind::Graph) {
            if depth > 0 {
                self.collect_within(sub, depth - 1, opaque_cut, out);
            } else if opaque_cut {
                out.push(sub);
            }
        }
    }

    /// Subgraphs nested under `graph` at most `depth` levels down (0 means direct children).
    pub(crate) fn subgraphs_within(&self, graph: NodeKey, depth: usize) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut frontier = vec![graph];
        let mut level = 0;
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for g in frontier {
                next.extend(self.gdata(g).live(NodeKind::Graph));
            }
            out.extend(next.iter().copied());
            if level == depth {
                break;
            }
            level += 1;
            frontier = next;
        }
        out
    }

    /// Variables owned within `depth` levels of `graph`.
    pub fn variables(&self, graph: GraphKey, depth: usize) -> Result<Vec<VariableKey>> {
        self.check_graph(graph)?;
        Ok(self
            .nodes_within(graph.0, depth, false)
            .into_iter()
            .filter(|&n| self.data(n).kind() == NodeKind::Variable)
            .map(VariableKey)
            .collect())
    }

    /// Factors owned within `depth` levels of `graph`.
    pub fn factors(&self, graph: GraphKey, depth: usize) -> Result<Vec<FactorKey>> {
        self.check_graph(graph)?;
        Ok(self
            .nodes_within(graph.0, depth, false)
            .into_iter()
            .filter(|&n| self.data(n).kind() == NodeKind::Factor)
            .map(FactorKey)
            .collect())
    }

    /// Subgraphs within `depth` levels of `graph`.
    pub fn subgraphs(&self, graph: GraphKey, depth: usize) -> Result<Vec<GraphKey>> {
        self.check_graph(graph)?;
        Ok(self
            .subgraphs_within(graph.0, depth)
            .into_iter()
            .map(GraphKey)
            .collect())
    }

    /// Variables and factors within `depth` levels of `graph`, plus the
    /// subgraphs just below that depth as single opaque nodes.
    pub fn nodes(&self, graph: GraphKey, depth: usize) -> Result<Vec<NodeKey>> {
        self.check_graph(graph)?;
        Ok(self.nodes_within(graph.0, depth, true))
    }

    /// Number of variables owned within `depth` levels of `graph`.
    pub fn variable_count(&self, graph: GraphKey, depth: usize) -> Result<usize> {
        self.check_graph(graph)?;
        let data = self.gdata(graph.0);
        let mut count = data.variable_count;
        if depth > 0 {
            for sub in data.live(NodeKind::Graph) {
                count += self.variable_count(GraphKey(sub), depth - 1)?;
            }
        }
        Ok(count)
    }

    /// Number of factors owned within `depth` levels of `graph`.
    pub fn factor_count(&self, graph: GraphKey, depth: usize) -> Result<usize> {
        self.check_graph(graph)?;
        let data = self.gdata(graph.0);
        let mut count = data.factor_count;
        if depth > 0 {
            for sub in data.live(NodeKind::Graph) {
                count += self.factor_count(GraphKey(sub), depth - 1)?;
            }
        }
        Ok(count)
    }

    /// Variables `graph` owns directly.
    pub fn owned_variables(&self, graph: GraphKey) -> Result<Vec<VariableKey>> {
        self.variables(graph, TOP)
    }

    /// Factors `graph` owns directly.
    pub fn owned_factors(&self, graph: GraphKey) -> Result<Vec<FactorKey>> {
        self.factors(graph, TOP)
    }

    /// Boundary variables of `graph`, in boundary order.
    pub fn boundary_variables(&self, graph: GraphKey) -> Result<Vec<VariableKey>> {
        self.check_graph(graph)?;
        Ok(self
            .gdata(graph.0)
            .boundary
            .iter()
            .copied()
            .map(VariableKey)
            .collect())
    }

    /// True if `variable` is exposed at the boundary of `graph`.
    pub fn is_boundary_variable(&self, graph: GraphKey, variable: VariableKey) -> Result<bool> {
        self.check_graph(graph)?;
        self.check_variable(variable)?;
        Ok(self.gdata(graph.0).boundary.contains(&variable.0))
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    pub(crate) fn check_name_free(&self, graph: NodeKey, name: &str, except: Option<NodeKey>) -> Result<()> {
        match self.gdata(graph).names.get(name) {
            Some(&holder) if Some(holder) != except => Err(Error::DuplicateName {
                name: name.to_owned(),
                graph: GraphKey(graph),
            }),
            _ => Ok(()),
        }
    }

    /// Set or clear the explicit name of `node`. Names are unique within the
    /// owning graph.
    pub fn set_name(&mut self, node: NodeKey, name: Option<&str>) -> Result<()> {
        let parent = self.slot(node)?.parent;
        if let (Some(graph), Some(name)) = (parent, name) {
            self.check_name_free(graph, name, Some(node))?;
        }
        let old = std::mem::replace(&mut self.data_mut(node).name, name.map(str::to_owned));
        if let Some(graph) = parent {
            let names = &mut self.gdata_mut(graph).names;
            if let Some(old) = old {
                names.shift_remove(&old);
            }
            if let Some(name) = name {
                names.insert(name.to_owned(), node);
            }
        }
        Ok(())
    }

    /// Drop every explicit name registered in `graph`.
    pub fn clear_names(&mut self, graph: GraphKey) -> Result<()> {
        self.check_graph(graph)?;
        let named: Vec<NodeKey> = self.gdata(graph.0).names.values().copied().collect();
        for node in named {
            self.data_mut(node).name = None;
        }
        self.gdata_mut(graph.0).names.clear();
        Ok(())
    }

    /// Look up a node by name. Dotted paths descend through named subgraphs:
    /// `"inner.x"` is node `x` of the subgraph named `inner`.
    pub fn node_by_name(&self, graph: GraphKey, path: &str) -> Result<Option<NodeKey>> {
        self.check_graph(graph)?;
        let mut current = graph.0;
        let mut parts = path.split('.').peekable();
        while let Some(part) = parts.next() {
            let Some(&found) = self.gdata(current).names.get(part) else {
                return Ok(None);
            };
            if parts.peek().is_none() {
                return Ok(Some(found));
            }
            if self.data(found).kind() != NodeKind::Graph {
                return Ok(None);
            }
            current = found;
        }
        Ok(None)
    }

    /// Variable named `path`, if there is one.
    pub fn variable_by_name(&self, graph: GraphKey, path: &str) -> Result<Option<VariableKey>> {
        Ok(self
            .node_by_name(graph, path)?
            .filter(|&n| self.data(n).kind() == NodeKind::Variable)
            .map(VariableKey))
    }

    /// Factor named `path`, if there is one.
    pub fn factor_by_name(&self, graph: GraphKey, path: &str) -> Result<Option<FactorKey>> {
        Ok(self
            .node_by_name(graph, path)?
            .filter(|&n| self.data(n).kind() == NodeKind::Factor)
            .map(FactorKey))
    }

    /// Subgraph named `path`, if there is one.
    pub fn graph_by_name(&self, graph: GraphKey, path: &str) -> Result<Option<GraphKey>> {
        Ok(self
            .node_by_name(graph, path)?
            .filter(|&n| self.data(n).kind() == NodeKind::Graph)
            .map(GraphKey))
    }

    // ------------------------------------------------------------------
    // Attach / detach
    // ------------------------------------------------------------------

    /// Bump the version of `graph` and the tree.
    pub(crate) fn touch(&mut self, graph: NodeKey) {
        self.gdata_mut(graph).bump_version();
        self.global_structure_version += 1;
    }

    /// Put `node` into `graph`'s owned array. The name must already be free.
    pub(crate) fn attach(&mut self, graph: NodeKey, node: NodeKey) {
        let kind = self.data(node).kind();
        let name = self.data(node).name.clone();
        let data = self.gdata_mut(graph);
        let (owned, count) = data.owned_mut(kind);
        let index = owned.len() as u32;
        owned.push(Some(node));
        *count += 1;
        if let Some(name) = name {
            data.names.insert(name, node);
        }
        let record = self.data_mut(node);
        record.parent = Some(graph);
        record.local_id = LocalId::new(kind.node_type(), index);
        self.touch(graph);
        self.create_solver_object(node);
    }

    /// Take `node` out of its owner's array, leaving a tombstone.
    pub(crate) fn detach(&mut self, node: NodeKey) {
        let graph = self.owner(node);
        let kind = self.data(node).kind();
        let index = self.data(node).local_id.index() as usize;
        let name = self.data(node).name.clone();
        let data = self.gdata_mut(graph);
        let (owned, count) = data.owned_mut(kind);
        if owned.get(index).copied().flatten() == Some(node) {
            owned[index] = None;
            *count -= 1;
        }
        if let Some(name) = name {
            if data.names.get(&name) == Some(&node) {
                data.names.shift_remove(&name);
            }
        }
        let record = self.data_mut(node);
        record.parent = None;
        record.local_id = LocalId::detached(kind.node_type());
        record.solver = None;
        self.touch(graph);
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Fail unless a factor in `factor_graph` may connect to `variable`.
    pub(crate) fn check_scope(&self, factor_graph: NodeKey, variable: VariableKey) -> Result<()> {
        self.check_variable(variable)?;
        let owner = self.data(variable.0).parent;
        match owner {
            Some(owner) if owner == factor_graph || self.is_strict_ancestor(owner, factor_graph) => {
                Ok(())
            }
            _ => Err(Error::VariableOutOfScope {
                variable,
                graph: GraphKey(factor_graph),
            }),
        }
    }

    fn place(&mut self, node: NodeKey, slot: Option<usize>, edge: u32) {
        let siblings = &mut self.data_mut(node).siblings;
        match slot {
            Some(i) => siblings[i] = edge,
            None => siblings.push(edge),
        }
    }

    /// Add an edge. `factor_slot`/`variable_slot` overwrite a reserved
    /// sibling position instead of appending. Scope must already be checked.
    pub(crate) fn connect(
        &mut self,
        factor: NodeKey,
        variable: NodeKey,
        factor_slot: Option<usize>,
        variable_slot: Option<usize>,
    ) {
        let layout = self.options.edge_layout;
        let factor_graph = self.owner(factor);
        let variable_graph = self.owner(variable);
        if factor_graph == variable_graph {
            let factor_index = self.data(factor).local_id.index();
            let variable_index = self.data(variable).local_id.index();
            let data = self.gdata_mut(factor_graph);
            let edge = data.edges.len() as u32;
            data.push_edge(EdgeState::local(edge, factor_index, variable_index, layout));
            self.place(factor, factor_slot, edge);
            self.place(variable, variable_slot, edge);
            self.touch(factor_graph);
            trace!(%factor, %variable, edge, "local edge added");
        } else {
            self.expose_boundary(factor_graph, variable_graph, variable);
            let boundary = self
                .gdata(factor_graph)
                .boundary
                .iter()
                .position(|&v| v == variable)
                .unwrap_or_default() as u32;
            let factor_edge = self.gdata(factor_graph).edges.len() as u32;
            let variable_edge = self.gdata(variable_graph).edges.len() as u32;
            let state = EdgeState::boundary(factor, boundary, factor_edge, variable_edge, layout);
            self.gdata_mut(factor_graph).push_edge(state);
            self.gdata_mut(variable_graph).push_edge(state);
            self.place(factor, factor_slot, factor_edge);
            self.place(variable, variable_slot, variable_edge);
            self.touch(factor_graph);
            self.touch(variable_graph);
            trace!(%factor, %variable, factor_edge, variable_edge, "boundary edge added");
        }
    }

    /// Remove the `index`th edge of `factor`. With `keep_slots`, both sibling
    /// positions are reserved for a following [`connect`](Self::connect)
    /// instead of being removed. Returns the variable and its sibling position.
    pub(crate) fn disconnect(&mut self, factor: NodeKey, index: usize, keep_slots: bool) -> (NodeKey, usize) {
        let factor_graph = self.owner(factor);
        let variable = self.sibling_unchecked(factor, index);
        let factor_edge = self.data(factor).siblings[index];
        let state = self.edge_at(factor_graph, factor_edge);
        let variable_graph = self.owner(variable);
        let variable_edge = state.variable_edge();

        self.gdata_mut(factor_graph).clear_edge(factor_edge);
        if variable_graph != factor_graph {
            self.gdata_mut(variable_graph).clear_edge(variable_edge);
        }
        let position = self
            .data(variable)
            .siblings
            .iter()
            .position(|&slot| slot == variable_edge)
            .unwrap_or_default();
        if keep_slots {
            self.data_mut(variable).siblings[position] = PLACEHOLDER;
            self.data_mut(factor).siblings[index] = PLACEHOLDER;
        } else {
            self.data_mut(variable).siblings.remove(position);
            self.data_mut(factor).siblings.remove(index);
        }
        self.touch(factor_graph);
        if variable_graph != factor_graph {
            self.touch(variable_graph);
        }
        trace!(%factor, %variable, "edge removed");
        (variable, position)
    }

    /// Expose `variable` at the boundary of `from` and every graph between
    /// it and `owner`.
    fn expose_boundary(&mut self, from: NodeKey, owner: NodeKey, variable: NodeKey) {
        let chain: Vec<NodeKey> = std::iter::once(from)
            .chain(self.ancestors(from))
            .take_while(|&g| g != owner)
            .collect();
        for graph in chain {
            if !self.gdata(graph).boundary.contains(&variable) {
                self.gdata_mut(graph).boundary.push(variable);
                self.touch(graph);
                debug!(graph = %graph, variable = %variable, "boundary variable added");
                self.raise(EventMask::BOUNDARY, || GraphEvent::BoundaryVariableAdded {
                    graph: GraphKey(graph),
                    variable: VariableKey(variable),
                });
            }
        }
    }

    /// Drop the boundary entry at `position` of `graph`, renumbering the
    /// boundary edges of later entries. The entry must have no edges.
    pub(crate) fn drop_boundary(&mut self, graph: NodeKey, position: usize) {
        let layout = self.options.edge_layout;
        let variable = self.gdata_mut(graph).boundary.remove(position);
        let position = position as u32;
        let edge_slots = self.gdata(graph).edges.len();
        for slot in 0..edge_slots {
            let Some(state) = self.gdata(graph).edges[slot] else {
                continue;
            };
            let (Some(factor), Some(boundary)) = (state.boundary_factor(), state.boundary_index()) else {
                continue;
            };
            if boundary <= position || self.owner(factor) != graph {
                continue;
            }
            let renumbered = state.with_boundary_index(boundary - 1, layout);
            let variable_graph = self.owner(self.gdata(graph).boundary[boundary as usize - 1]);
            self.gdata_mut(graph).edges[state.factor_edge() as usize] = Some(renumbered);
            self.gdata_mut(variable_graph).edges[state.variable_edge() as usize] = Some(renumbered);
        }
        self.touch(graph);
        debug!(graph = %graph, variable = %variable, "boundary variable removed");
        self.raise(EventMask::BOUNDARY, || GraphEvent::BoundaryVariableRemoved {
            graph: GraphKey(graph),
            variable: VariableKey(variable),
        });
    }

    /// Remove `variable` from the boundary lists of every graph nested under `graph`.
    fn drop_from_descendant_boundaries(&mut self, graph: NodeKey, variable: NodeKey) {
        for sub in self.subgraphs_within(graph, FLAT) {
            if let Some(position) = self.gdata(sub).boundary.iter().position(|&v| v == variable) {
                self.drop_boundary(sub, position);
            }
        }
    }

    /// Remove the `index`th edge of `factor`. Returns the variable it led to.
    pub fn remove_edge(&mut self, factor: FactorKey, index: usize) -> Result<VariableKey> {
        self.check_factor(factor)?;
        if index >= self.data(factor.0).siblings.len() {
            return Err(Error::NoSuchEdge {
                node: factor.0,
                index,
            });
        }
        let (variable, _) = self.disconnect(factor.0, index, false);
        if let Payload::Factor { directed_to, .. } = &mut self.data_mut(factor.0).payload {
            if let Some(outputs) = directed_to.as_mut() {
                let index = index as u32;
                outputs.retain(|o| *o != index);
                for o in outputs.iter_mut() {
                    if *o > index {
                        *o -= 1;
                    }
                }
                if outputs.is_empty() {
                    *directed_to = None;
                }
            }
        }
        Ok(VariableKey(variable))
    }

    /// Point the `index`th edge of `factor` at `variable`, keeping the edge's
    /// position in the factor's sibling list.
    pub fn replace_edge(&mut self, factor: FactorKey, index: usize, variable: VariableKey) -> Result<()> {
        self.check_factor(factor)?;
        let factor_graph = self.owner(factor.0);
        self.check_scope(factor_graph, variable)?;
        if index >= self.data(factor.0).siblings.len() {
            return Err(Error::NoSuchEdge {
                node: factor.0,
                index,
            });
        }
        let (old, position) = self.disconnect(factor.0, index, true);
        self.data_mut(old).siblings.remove(position);
        self.connect(factor.0, variable.0, Some(index), None);
        trace!(factor = %factor, old = %old, new = %variable, "edge replaced");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Adding nodes
    // ------------------------------------------------------------------

    /// Add `variable` to `graph`.
    pub fn add_variable(&mut self, graph: GraphKey, variable: Variable) -> Result<VariableKey> {
        let mut keys = self.add_variables(graph, std::iter::once(variable))?;
        Ok(keys.remove(0))
    }

    /// Add several variables to `graph`.
    pub fn add_variables<I>(&mut self, graph: GraphKey, variables: I) -> Result<Vec<VariableKey>>
    where
        I: IntoIterator<Item = Variable>,
    {
        self.check_graph(graph)?;
        let variables: Vec<Variable> = variables.into_iter().collect();
        let mut seen: Vec<&str> = Vec::new();
        for name in variables.iter().filter_map(Variable::name) {
            self.check_name_free(graph.0, name, None)?;
            if seen.contains(&name) {
                return Err(Error::DuplicateName {
                    name: name.to_owned(),
                    graph,
                });
            }
            seen.push(name);
        }
        let mut keys = Vec::with_capacity(variables.len());
        for variable in variables {
            let key = self.alloc(NodeData::new(
                Payload::Variable {
                    domain: variable.domain,
                },
                variable.name,
                variable.label,
            ));
            self.attach(graph.0, key);
            debug!(graph = %graph, variable = %key, "variable added");
            self.raise(EventMask::VARIABLE, || GraphEvent::VariableAdded {
                graph,
                variable: VariableKey(key),
                absorbed: false,
            });
            keys.push(VariableKey(key));
        }
        Ok(keys)
    }

    /// Add `factor` to `graph`, connected to `variables` in order. Each
    /// variable must be owned by `graph` or one of its ancestors; ancestor
    /// variables become boundary variables along the way.
    pub fn add_factor(&mut self, graph: GraphKey, factor: Factor, variables: &[VariableKey]) -> Result<FactorKey> {
        self.check_graph(graph)?;
        if let Some(name) = factor.name() {
            self.check_name_free(graph.0, name, None)?;
        }
        for &variable in variables {
            self.check_scope(graph.0, variable)?;
        }
        let key = self.alloc(NodeData::new(
            Payload::Factor {
                function: factor.function,
                directed_to: None,
            },
            factor.name,
            factor.label,
        ));
        self.attach(graph.0, key);
        for variable in variables {
            self.connect(key, variable.0, None, None);
        }
        debug!(graph = %graph, factor = %key, arity = variables.len(), "factor added");
        self.raise(EventMask::FACTOR, || GraphEvent::FactorAdded {
            graph,
            factor: FactorKey(key),
            absorbed: false,
        });
        Ok(FactorKey(key))
    }

    /// Add an empty subgraph to `parent`.
    pub fn add_subgraph(&mut self, parent: GraphKey) -> Result<GraphKey> {
        self.check_graph(parent)?;
        let graph_id = self.env.allocate_graph_id();
        let key = self.alloc(NodeData::new(
            Payload::Graph(Box::new(GraphData::new(graph_id))),
            None,
            None,
        ));
        self.attach(parent.0, key);
        debug!(parent = %parent, subgraph = %key, graph_id, "subgraph added");
        self.raise(EventMask::SUBGRAPH, || GraphEvent::SubgraphAdded {
            graph: parent,
            subgraph: GraphKey(key),
            absorbed: false,
        });
        Ok(GraphKey(key))
    }

    /// Expose ancestor-owned `variables` at the boundary of `graph` (and of
    /// every graph in between) before any factor uses them.
    pub fn add_boundary_variables(&mut self, graph: GraphKey, variables: &[VariableKey]) -> Result<()> {
        self.check_graph(graph)?;
        for &variable in variables {
            self.check_scope(graph.0, variable)?;
            let owner = self.owner(variable.0);
            if owner == graph.0 {
                return Err(Error::AlreadyOwned {
                    variable,
                    owner: graph,
                });
            }
        }
        for variable in variables {
            let owner = self.owner(variable.0);
            self.expose_boundary(graph.0, owner, variable.0);
        }
        Ok(())
    }

    /// Mark the variables at the given sibling positions of `factor` as its
    /// outputs. An empty list makes the factor undirected.
    pub fn set_directed_to(&mut self, factor: FactorKey, outputs: &[VariableKey]) -> Result<()> {
        self.check_factor(factor)?;
        let mut positions: SmallVec<[u32; 2]> = SmallVec::new();
        for &output in outputs {
            self.check_variable(output)?;
            match self.sibling_index(factor.0, output.0)? {
                Some(i) => positions.push(i as u32),
                None => {
                    return Err(Error::NotConnected {
                        factor,
                        variable: output,
                    })
                }
            }
        }
        positions.sort_unstable();
        positions.dedup();
        if let Payload::Factor { directed_to, .. } = &mut self.data_mut(factor.0).payload {
            *directed_to = (!positions.is_empty()).then_some(positions);
        }
        let graph = self.owner(factor.0);
        self.touch(graph);
        Ok(())
    }

    /// Output variables of a directed factor; `None` when undirected.
    pub fn directed_to(&self, factor: FactorKey) -> Result<Option<Vec<VariableKey>>> {
        self.check_factor(factor)?;
        Ok(self.directed_positions(factor.0).map(|positions| {
            positions
                .iter()
                .map(|&i| VariableKey(self.sibling_unchecked(factor.0, i as usize)))
                .collect()
        }))
    }

    /// Input variables of a directed factor; `None` when undirected.
    pub fn directed_from(&self, factor: FactorKey) -> Result<Option<Vec<VariableKey>>> {
        self.check_factor(factor)?;
        let Some(outputs) = self.directed_positions(factor.0) else {
            return Ok(None);
        };
        let count = self.data(factor.0).siblings.len();
        Ok(Some(
            (0..count)
                .filter(|i| !outputs.contains(&(*i as u32)))
                .map(|i| VariableKey(self.sibling_unchecked(factor.0, i)))
                .collect(),
        ))
    }

    /// True if the factor has declared outputs.
    pub fn is_directed(&self, factor: FactorKey) -> Result<bool> {
        self.check_factor(factor)?;
        Ok(self.directed_positions(factor.0).is_some())
    }

    pub(crate) fn directed_positions(&self, factor: NodeKey) -> Option<&SmallVec<[u32; 2]>> {
        match &self.data(factor).payload {
            Payload::Factor { directed_to, .. } => directed_to.as_ref(),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Removing nodes
    // ------------------------------------------------------------------

    fn check_owned(&self, graph: GraphKey, node: NodeKey) -> Result<()> {
        self.check_graph(graph)?;
        if self.slot(node)?.parent != Some(graph.0) {
            return Err(Error::NotOwned { node, graph });
        }
        Ok(())
    }

    /// Remove `factor` from `graph`, disconnecting all its edges.
    pub fn remove_factor(&mut self, graph: GraphKey, factor: FactorKey) -> Result<Factor> {
        self.check_factor(factor)?;
        self.check_owned(graph, factor.0)?;
        Ok(self.remove_factor_unchecked(factor.0))
    }

    pub(crate) fn remove_factor_unchecked(&mut self, factor: NodeKey) -> Factor {
        let graph = self.owner(factor);
        for index in (0..self.data(factor).siblings.len()).rev() {
            self.disconnect(factor, index, false);
        }
        self.detach(factor);
        debug!(graph = %graph, factor = %factor, "factor removed");
        self.raise(EventMask::FACTOR, || GraphEvent::FactorRemoved {
            graph: GraphKey(graph),
            factor: FactorKey(factor),
            absorbed: false,
        });
        match self.free(factor) {
            Some(NodeData {
                payload: Payload::Factor { function, .. },
                name,
                label,
                ..
            }) => Factor {
                function,
                name,
                label,
            },
            _ => unreachable!("removed node {factor} was not a factor"),
        }
    }

    /// Remove `variable` from `graph`. Fails while any factor still uses it.
    pub fn remove_variable(&mut self, graph: GraphKey, variable: VariableKey) -> Result<Variable> {
        self.check_variable(variable)?;
        self.check_owned(graph, variable.0)?;
        let siblings = self.data(variable.0).siblings.len();
        if siblings > 0 {
            return Err(Error::VariableStillConnected { variable, siblings });
        }
        Ok(self.remove_variable_unchecked(variable.0))
    }

    pub(crate) fn remove_variable_unchecked(&mut self, variable: NodeKey) -> Variable {
        let graph = self.owner(variable);
        self.drop_from_descendant_boundaries(graph, variable);
        self.detach(variable);
        debug!(graph = %graph, variable = %variable, "variable removed");
        self.raise(EventMask::VARIABLE, || GraphEvent::VariableRemoved {
            graph: GraphKey(graph),
            variable: VariableKey(variable),
            absorbed: false,
        });
        match self.free(variable) {
            Some(NodeData {
                payload: Payload::Variable { domain },
                name,
                label,
                ..
            }) => Variable { domain, name, label },
            _ => unreachable!("removed node {variable} was not a variable"),
        }
    }

    /// Remove a direct subgraph of `parent` with everything it owns. Boundary
    /// variables of the subgraph that are left with no edges are removed
    /// from their owners as well.
    pub fn remove_subgraph(&mut self, parent: GraphKey, subgraph: GraphKey) -> Result<()> {
        self.check_graph(parent)?;
        self.check_graph(subgraph)?;
        if self.data(subgraph.0).parent != Some(parent.0) {
            return Err(Error::NotDirectSubgraph { graph: parent, subgraph });
        }
        let boundary = self.gdata(subgraph.0).boundary.clone();
        self.destroy_subgraph(subgraph.0);
        for variable in boundary {
            if self.contains(variable) && self.data(variable).siblings.is_empty() {
                self.remove_variable_unchecked(variable);
            }
        }
        Ok(())
    }

    fn destroy_subgraph(&mut self, subgraph: NodeKey) {
        let parent = self.owner(subgraph);
        let nested: Vec<NodeKey> = self.gdata(subgraph).live(NodeKind::Graph).collect();
        for sub in nested {
            self.destroy_subgraph(sub);
        }
        let factors: Vec<NodeKey> = self.gdata(subgraph).live(NodeKind::Factor).collect();
        for factor in factors {
            self.remove_factor_unchecked(factor);
        }
        let variables: Vec<NodeKey> = self.gdata(subgraph).live(NodeKind::Variable).collect();
        for variable in variables {
            self.remove_variable_unchecked(variable);
        }
        self.detach(subgraph);
        debug!(graph = %parent, subgraph = %subgraph, "subgraph removed");
        self.raise(EventMask::SUBGRAPH, || GraphEvent::SubgraphRemoved {
            graph: GraphKey(parent),
            subgraph: GraphKey(subgraph),
            absorbed: false,
        });
        self.free(subgraph);
    }
}

impl std::fmt::Debug for FactorGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let root = self.gdata(self.root);
        f.debug_struct("FactorGraph")
            .field("tree", &self.tree)
            .field("graph_id", &root.graph_id)
            .field("nodes", &self.live_nodes().count())
            .field("global_structure_version", &self.global_structure_version)
            .finish()
    }
}
