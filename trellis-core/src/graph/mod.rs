//! Factor Graph
//!
//! This module implements the bipartite variable/factor graph, nested
//! subgraphs, and the algorithms that reason about its structure.
//!
//! # Overview
//!
//! A factor graph is a bipartite graph where:
//!
//! - Variables are the quantities being modeled
//! - Factors are relations over an ordered list of variables
//! - Each factor/variable connection is an edge
//!
//! A graph may own subgraphs, which own their own variables, factors and
//! subgraphs. A factor can use a variable from any enclosing graph; that
//! variable is then a boundary variable of every graph in between.
//!
//! # Design Decisions
//!
//! 1. One [`FactorGraph`] value owns a whole tree of graphs in a slab, and
//!    everything refers to everything else by key. There are no parent or
//!    sibling pointers, so no reference cycles:
//!    - Removing a node only tombstones its slots
//!    - Absorbing a subgraph moves keys between tables
//!    - Keys from another tree are detected and rejected
//!
//! 2. Edges are stored per graph as [`EdgeState`] values in a packed layout
//!    when the indices are small, falling back to a wide layout otherwise.
//!
//! 3. Ids come from an explicit [`Environment`] rather than global counters,
//!    so independent trees in the same process never interfere.
//!
//! 4. Structural events go to an optional sink. With no sink nothing is
//!    allocated for them.

mod analysis;
mod edge;
mod events;
mod factor_graph;
mod ids;
mod node;
mod sort;
mod transform;
mod walker;

pub use edge::{EdgeLayout, EdgeSide, EdgeState};
pub use events::{EventLog, EventMask, GraphEvent, GraphEventSink};
pub use factor_graph::{CommonAncestor, FactorGraph, SolverFactory, FLAT, TOP};
pub use ids::{Environment, FactorKey, GlobalId, GraphKey, LocalId, NodeKey, NodeType, VariableKey};
pub use node::{Domain, Factor, FactorFunction, NodeKind, Projection, Variable};
pub use walker::{GraphWalker, WalkOrder};
