//! Trellis Core
//!
//! This crate provides the structural core of a factor-graph inference
//! engine. It implements:
//!
//! - Ordered collections used to decide the order of graph work
//! - The nested variable/factor graph model and its edits
//! - Traversal, tree detection and directed ordering
//! - Update schedules that stay in step with structural changes
//!
//! No messages or beliefs are computed here; solvers build on top of these
//! pieces.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `collect`: skip list, dynamic-priority heap and keyed priority queue
//! - `graph`: the graph arena, node keys, edges, events and algorithms
//! - `schedule`: schedulers, schedule caching and update queues
//! - `config`: per-tree options
//!
//! # Example
//!
//! ```rust
//! use trellis_core::graph::{Factor, FactorFunction, FactorGraph, Variable, FLAT};
//!
//! let mut graph = FactorGraph::new();
//! let root = graph.root();
//!
//! let a = graph.add_variable(root, Variable::discrete(2)).unwrap();
//! let b = graph.add_variable(root, Variable::discrete(2)).unwrap();
//! graph
//!     .add_factor(root, Factor::new(FactorFunction::named("xor")), &[a, b])
//!     .unwrap();
//!
//! assert!(graph.is_tree(root, FLAT).unwrap());
//! ```

pub mod collect;
pub mod config;
pub mod error;
pub mod graph;
pub mod schedule;

pub use config::GraphOptions;
pub use error::{Error, Result};
pub use graph::{FactorGraph, FactorKey, GraphKey, NodeKey, VariableKey};
