//! Error Types
//!
//! A single error enum covers every failure the core can report. Structural
//! checks run before any mutation starts, so an `Err` always means the graph
//! was left exactly as it was.

use thiserror::Error;

use crate::graph::{FactorKey, GraphKey, NodeKey, VariableKey};

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in graph and collection operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The node belongs to a different graph tree, so the two have no common ancestor.
    #[error("node {0} does not share a common ancestor with this graph")]
    ForeignNode(NodeKey),

    /// The key no longer refers to a live node.
    #[error("node {0} has been removed")]
    StaleNode(NodeKey),

    /// The node exists but is not of the kind the operation requires.
    #[error("node {node} is a {actual}, expected a {expected}")]
    WrongNodeKind {
        /// Offending node.
        node: NodeKey,
        /// Kind the operation needed.
        expected: &'static str,
        /// Kind the node actually is.
        actual: &'static str,
    },

    /// A variable cannot be removed while factors still refer to it.
    #[error("variable {variable} is still connected to {siblings} factor(s)")]
    VariableStillConnected {
        /// Variable being removed.
        variable: VariableKey,
        /// Number of remaining edges.
        siblings: usize,
    },

    /// The node is not directly owned by the graph it was removed from.
    #[error("node {node} is not owned by graph {graph}")]
    NotOwned {
        /// Node being operated on.
        node: NodeKey,
        /// Graph that was expected to own it.
        graph: GraphKey,
    },

    /// The variable already has an owner.
    #[error("variable {variable} is already owned by graph {owner}")]
    AlreadyOwned {
        /// Variable being adopted.
        variable: VariableKey,
        /// Its current owner.
        owner: GraphKey,
    },

    /// Explicit names must be unique within a graph.
    #[error("name '{name}' is already used in graph {graph}")]
    DuplicateName {
        /// Conflicting name.
        name: String,
        /// Graph holding the existing name.
        graph: GraphKey,
    },

    /// The subgraph is not a direct child of the graph.
    #[error("graph {subgraph} is not a direct subgraph of {graph}")]
    NotDirectSubgraph {
        /// Parent graph.
        graph: GraphKey,
        /// Supposed child.
        subgraph: GraphKey,
    },

    /// The variable is neither owned by the factor's graph nor by one of its ancestors.
    #[error("variable {variable} is not visible from graph {graph}")]
    VariableOutOfScope {
        /// Variable being connected.
        variable: VariableKey,
        /// Graph owning the factor.
        graph: GraphKey,
    },

    /// The variable is not part of the graph's boundary.
    #[error("variable {variable} is not a boundary variable of graph {graph}")]
    NotBoundaryVariable {
        /// Variable in question.
        variable: VariableKey,
        /// Graph whose boundary was searched.
        graph: GraphKey,
    },

    /// The factor has no edge to the variable.
    #[error("factor {factor} is not connected to variable {variable}")]
    NotConnected {
        /// Factor searched.
        factor: FactorKey,
        /// Variable that was expected among its siblings.
        variable: VariableKey,
    },

    /// Sibling index past the end of a node's edge list.
    #[error("node {node} has no edge at index {index}")]
    NoSuchEdge {
        /// Node whose edges were indexed.
        node: NodeKey,
        /// Requested position.
        index: usize,
    },

    /// A factor being joined uses a variable missing from the requested variable list.
    #[error("variable {variable} of factor {factor} is missing from the join variable list")]
    JoinVariableMissing {
        /// Variable not present in the list.
        variable: VariableKey,
        /// Factor that uses it.
        factor: NodeKey,
    },

    /// An operation needs more variables than were supplied.
    #[error("need at least {required} variables, got {actual}")]
    TooFewVariables {
        /// Minimum count.
        required: usize,
        /// Supplied count.
        actual: usize,
    },

    /// Heap priorities must be ordinary numbers.
    #[error("priority is not a number")]
    InvalidPriority,

    /// The collection has no elements.
    #[error("collection is empty")]
    Empty,

    /// Options could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
