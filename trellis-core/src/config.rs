//! Graph Options
//!
//! Options are plain serde structs so they can be loaded from JSON. Every
//! field has a default; an empty object gives the same options as
//! [`GraphOptions::default`].

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{EdgeLayout, WalkOrder};

/// Options fixed when a graph tree is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Which edge representations may be used.
    pub edge_layout: EdgeLayout,

    /// Default bound on walker search depth. `None` is unbounded.
    pub max_search_depth: Option<usize>,

    /// Default bound on how many subgraph levels a walker descends into
    /// before treating a subgraph as a single node. `None` is unbounded.
    pub max_relative_nesting_depth: Option<usize>,

    /// Default walker order.
    pub walk_order: WalkOrder,

    /// Seed for randomized collections built by schedulers.
    pub schedule_seed: Option<u64>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            edge_layout: EdgeLayout::Auto,
            max_search_depth: None,
            max_relative_nesting_depth: None,
            walk_order: WalkOrder::BreadthFirst,
            schedule_seed: None,
        }
    }
}

impl GraphOptions {
    /// Parse options from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize options to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
