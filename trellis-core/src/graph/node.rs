//! Graph Nodes
//!
//! This module defines the node records stored in a graph arena, and the
//! detached [`Variable`] and [`Factor`] values that callers build before
//! handing them to a graph.

use std::any::Any;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::edge::EdgeState;
use super::ids::{LocalId, NodeKey, NodeType};

/// What kind of node a key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    /// A modeled quantity.
    Variable,
    /// A relation over variables.
    Factor,
    /// A graph: the root, or a subgraph nested in another graph.
    Graph,
}

impl NodeKind {
    /// Lowercase name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Variable => "variable",
            NodeKind::Factor => "factor",
            NodeKind::Graph => "graph",
        }
    }

    pub(crate) fn node_type(self) -> NodeType {
        match self {
            NodeKind::Variable => NodeType::Variable,
            NodeKind::Factor => NodeType::Factor,
            NodeKind::Graph => NodeType::Graph,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of values a variable ranges over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// `size` distinct values.
    Discrete {
        /// Number of values.
        size: usize,
    },
    /// The real line.
    Real,
    /// Cartesian product of the component domains.
    Joint(Vec<Domain>),
}

impl Domain {
    /// Number of values for finite domains.
    pub fn size(&self) -> Option<usize> {
        match self {
            Domain::Discrete { size } => Some(*size),
            Domain::Real => None,
            Domain::Joint(parts) => parts
                .iter()
                .try_fold(1usize, |acc, d| d.size().and_then(|s| acc.checked_mul(s))),
        }
    }
}

/// How one argument of a projected function is obtained from the factor's
/// current variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// The factor's variable at this position.
    Direct(usize),
    /// Component `component` of the joint variable at `position`.
    Component {
        /// Position of the joint variable.
        position: usize,
        /// Component within the joint domain.
        component: usize,
    },
}

/// Function a factor evaluates over its variables.
///
/// The core never evaluates these; it only rewrites them when factors or
/// variables are joined so that solvers can.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorFunction {
    /// Function supplied by a solver, identified by name.
    Named(String),
    /// Constant function.
    Uniform,
    /// Nonzero only where all arguments are equal.
    Equality,
    /// Product of parts; each part reads the joint factor's variables at the
    /// listed positions.
    Joint(Vec<(FactorFunction, Vec<usize>)>),
    /// `inner` evaluated on arguments rebuilt from the factor's variables.
    Projected {
        /// Original function.
        inner: Box<FactorFunction>,
        /// One entry per argument of `inner`.
        arguments: Vec<Projection>,
    },
}

impl FactorFunction {
    /// Named function.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

/// A variable that has not been added to a graph yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub(crate) domain: Domain,
    pub(crate) name: Option<String>,
    pub(crate) label: Option<String>,
}

impl Variable {
    /// Create a variable over `domain`.
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            name: None,
            label: None,
        }
    }

    /// Variable with `size` discrete values.
    pub fn discrete(size: usize) -> Self {
        Self::new(Domain::Discrete { size })
    }

    /// Real-valued variable.
    pub fn real() -> Self {
        Self::new(Domain::Real)
    }

    /// Set the explicit name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The domain.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Explicit name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// A factor that has not been added to a graph yet, or has been removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub(crate) function: FactorFunction,
    pub(crate) name: Option<String>,
    pub(crate) label: Option<String>,
}

impl Factor {
    /// Create a factor computing `function`.
    pub fn new(function: FactorFunction) -> Self {
        Self {
            function,
            name: None,
            label: None,
        }
    }

    /// Set the explicit name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The function.
    pub fn function(&self) -> &FactorFunction {
        &self.function
    }

    /// Explicit name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Transient per-node flag bits. Cleared by `initialize`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct NodeFlags(u8);

impl NodeFlags {
    pub(crate) const MARKED: u8 = 0b01;
    pub(crate) const VISITED: u8 = 0b10;

    pub(crate) fn is_set(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    pub(crate) fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.0 |= bit;
        } else {
            self.0 &= !bit;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.0 = 0;
    }
}

/// Kind-specific part of a node record.
pub(crate) enum Payload {
    Variable {
        domain: Domain,
    },
    Factor {
        function: FactorFunction,
        /// Sibling positions of the output variables, if directed.
        directed_to: Option<SmallVec<[u32; 2]>>,
    },
    Graph(Box<GraphData>),
}

/// A node as stored in the arena.
pub(crate) struct NodeData {
    pub(crate) payload: Payload,
    pub(crate) local_id: LocalId,
    /// Owning graph; `None` only for the root.
    pub(crate) parent: Option<NodeKey>,
    pub(crate) name: Option<String>,
    pub(crate) label: Option<String>,
    /// Edge slot of each incident edge, in the owning graph's edge array.
    pub(crate) siblings: SmallVec<[u32; 4]>,
    pub(crate) flags: NodeFlags,
    pub(crate) solver: Option<Box<dyn Any>>,
}

impl NodeData {
    pub(crate) fn new(payload: Payload, name: Option<String>, label: Option<String>) -> Self {
        let kind = match &payload {
            Payload::Variable { .. } => NodeKind::Variable,
            Payload::Factor { .. } => NodeKind::Factor,
            Payload::Graph(_) => NodeKind::Graph,
        };
        Self {
            payload,
            local_id: LocalId::detached(kind.node_type()),
            parent: None,
            name,
            label,
            siblings: SmallVec::new(),
            flags: NodeFlags::default(),
            solver: None,
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self.payload {
            Payload::Variable { .. } => NodeKind::Variable,
            Payload::Factor { .. } => NodeKind::Factor,
            Payload::Graph(_) => NodeKind::Graph,
        }
    }

    pub(crate) fn graph(&self) -> Option<&GraphData> {
        match &self.payload {
            Payload::Graph(graph) => Some(graph),
            _ => None,
        }
    }

    pub(crate) fn graph_mut(&mut self) -> Option<&mut GraphData> {
        match &mut self.payload {
            Payload::Graph(graph) => Some(graph),
            _ => None,
        }
    }
}

/// Graph-specific state of a graph node.
pub(crate) struct GraphData {
    pub(crate) graph_id: u32,
    /// Owned nodes by local index. Removed slots are `None` and never reused.
    pub(crate) variables: Vec<Option<NodeKey>>,
    pub(crate) factors: Vec<Option<NodeKey>>,
    pub(crate) subgraphs: Vec<Option<NodeKey>>,
    pub(crate) variable_count: usize,
    pub(crate) factor_count: usize,
    pub(crate) subgraph_count: usize,
    /// Variables owned by an ancestor and exposed here.
    pub(crate) boundary: Vec<NodeKey>,
    pub(crate) names: IndexMap<String, NodeKey>,
    /// Removed edges leave `None` so live slots keep their index.
    pub(crate) edges: Vec<Option<EdgeState>>,
    pub(crate) edge_count: usize,
    pub(crate) structure_version: u64,
}

impl GraphData {
    pub(crate) fn new(graph_id: u32) -> Self {
        Self {
            graph_id,
            variables: Vec::new(),
            factors: Vec::new(),
            subgraphs: Vec::new(),
            variable_count: 0,
            factor_count: 0,
            subgraph_count: 0,
            boundary: Vec::new(),
            names: IndexMap::new(),
            edges: Vec::new(),
            edge_count: 0,
            structure_version: 0,
        }
    }

    pub(crate) fn owned(&self, kind: NodeKind) -> &Vec<Option<NodeKey>> {
        match kind {
            NodeKind::Variable => &self.variables,
            NodeKind::Factor => &self.factors,
            NodeKind::Graph => &self.subgraphs,
        }
    }

    pub(crate) fn owned_mut(&mut self, kind: NodeKind) -> (&mut Vec<Option<NodeKey>>, &mut usize) {
        match kind {
            NodeKind::Variable => (&mut self.variables, &mut self.variable_count),
            NodeKind::Factor => (&mut self.factors, &mut self.factor_count),
            NodeKind::Graph => (&mut self.subgraphs, &mut self.subgraph_count),
        }
    }

    /// Live owned nodes of `kind`, in local index order.
    pub(crate) fn live(&self, kind: NodeKind) -> impl Iterator<Item = NodeKey> + '_ {
        self.owned(kind).iter().flatten().copied()
    }

    pub(crate) fn push_edge(&mut self, state: EdgeState) -> u32 {
        let slot = self.edges.len() as u32;
        self.edges.push(Some(state));
        self.edge_count += 1;
        slot
    }

    pub(crate) fn clear_edge(&mut self, slot: u32) {
        if let Some(edge) = self.edges.get_mut(slot as usize) {
            if edge.take().is_some() {
                self.edge_count -= 1;
            }
        }
    }

    pub(crate) fn bump_version(&mut self) {
        self.structure_version += 1;
    }
}
