//! Edge State
//!
//! Every factor/variable connection is described by an [`EdgeState`]. Most
//! graphs are small, so the common case packs all indices into one word and
//! only falls back to separate fields when an index does not fit.
//!
//! | variant         | fields                                                  |
//! |-----------------|---------------------------------------------------------|
//! | `SmallLocal`    | `u64`: edge (26 bits), factor (19), variable (19)       |
//! | `FullLocal`     | three `u32`                                             |
//! | `SmallBoundary` | factor key + `u32`: boundary (8), factor edge (12), variable edge (12) |
//! | `FullBoundary`  | factor key + three `u32`                                |
//!
//! A local edge joins a factor and a variable owned by the same graph, and
//! occupies one slot of that graph's edge array. A boundary edge joins a
//! factor to a variable owned by an ancestor graph; it occupies a slot in both
//! graphs' arrays, which is why it carries two edge indices.

use serde::{Deserialize, Serialize};

use super::ids::NodeKey;

const LOCAL_EDGE_BITS: u32 = 26;
const LOCAL_NODE_BITS: u32 = 19;
const BOUNDARY_INDEX_BITS: u32 = 8;
const BOUNDARY_EDGE_BITS: u32 = 12;

const LOCAL_EDGE_MAX: u32 = (1 << LOCAL_EDGE_BITS) - 1;
const LOCAL_NODE_MAX: u32 = (1 << LOCAL_NODE_BITS) - 1;
const BOUNDARY_INDEX_MAX: u32 = (1 << BOUNDARY_INDEX_BITS) - 1;
const BOUNDARY_EDGE_MAX: u32 = (1 << BOUNDARY_EDGE_BITS) - 1;

/// Which representation new edge states may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeLayout {
    /// Packed layout whenever every index fits.
    #[default]
    Auto,
    /// Always the widest layout.
    Full,
}

/// Endpoint of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSide {
    /// The factor end.
    Factor,
    /// The variable end.
    Variable,
}

/// Description of one factor/variable edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    /// Packed local edge.
    SmallLocal(u64),
    /// Local edge with indices too large to pack.
    FullLocal {
        /// Slot in the graph's edge array.
        edge: u32,
        /// Factor's index in the graph's factor array.
        factor: u32,
        /// Variable's index in the graph's variable array.
        variable: u32,
    },
    /// Packed boundary edge.
    SmallBoundary {
        /// The factor endpoint.
        factor: NodeKey,
        /// Boundary index, factor-side edge and variable-side edge.
        packed: u32,
    },
    /// Boundary edge with indices too large to pack.
    FullBoundary {
        /// The factor endpoint.
        factor: NodeKey,
        /// Variable's position in the factor graph's boundary list.
        boundary: u32,
        /// Slot in the factor graph's edge array.
        factor_edge: u32,
        /// Slot in the variable owner's edge array.
        variable_edge: u32,
    },
}

impl EdgeState {
    /// Local edge occupying slot `edge`, between the factor at `factor` and the
    /// variable at `variable`.
    pub fn local(edge: u32, factor: u32, variable: u32, layout: EdgeLayout) -> Self {
        if layout == EdgeLayout::Auto
            && edge <= LOCAL_EDGE_MAX
            && factor <= LOCAL_NODE_MAX
            && variable <= LOCAL_NODE_MAX
        {
            let word = u64::from(edge) << (2 * LOCAL_NODE_BITS)
                | u64::from(factor) << LOCAL_NODE_BITS
                | u64::from(variable);
            Self::SmallLocal(word)
        } else {
            Self::FullLocal {
                edge,
                factor,
                variable,
            }
        }
    }

    /// Boundary edge from `factor` to the boundary variable at `boundary`.
    pub fn boundary(
        factor: NodeKey,
        boundary: u32,
        factor_edge: u32,
        variable_edge: u32,
        layout: EdgeLayout,
    ) -> Self {
        if layout == EdgeLayout::Auto
            && boundary <= BOUNDARY_INDEX_MAX
            && factor_edge <= BOUNDARY_EDGE_MAX
            && variable_edge <= BOUNDARY_EDGE_MAX
        {
            let packed = boundary << (2 * BOUNDARY_EDGE_BITS)
                | factor_edge << BOUNDARY_EDGE_BITS
                | variable_edge;
            Self::SmallBoundary { factor, packed }
        } else {
            Self::FullBoundary {
                factor,
                boundary,
                factor_edge,
                variable_edge,
            }
        }
    }

    /// True for edges whose endpoints share an owner.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::SmallLocal(_) | Self::FullLocal { .. })
    }

    /// True for the packed representations.
    pub fn is_small(&self) -> bool {
        matches!(self, Self::SmallLocal(_) | Self::SmallBoundary { .. })
    }

    /// Edge slot as seen from `side`. Local edges have a single slot.
    pub fn edge_index(&self, side: EdgeSide) -> u32 {
        match side {
            EdgeSide::Factor => self.factor_edge(),
            EdgeSide::Variable => self.variable_edge(),
        }
    }

    /// Slot in the factor's graph.
    pub fn factor_edge(&self) -> u32 {
        match *self {
            Self::SmallLocal(word) => (word >> (2 * LOCAL_NODE_BITS)) as u32 & LOCAL_EDGE_MAX,
            Self::FullLocal { edge, .. } => edge,
            Self::SmallBoundary { packed, .. } => packed >> BOUNDARY_EDGE_BITS & BOUNDARY_EDGE_MAX,
            Self::FullBoundary { factor_edge, .. } => factor_edge,
        }
    }

    /// Slot in the variable owner's graph.
    pub fn variable_edge(&self) -> u32 {
        match *self {
            Self::SmallLocal(_) | Self::FullLocal { .. } => self.factor_edge(),
            Self::SmallBoundary { packed, .. } => packed & BOUNDARY_EDGE_MAX,
            Self::FullBoundary { variable_edge, .. } => variable_edge,
        }
    }

    /// Factor array index, for local edges.
    pub fn factor_index(&self) -> Option<u32> {
        match *self {
            Self::SmallLocal(word) => Some((word >> LOCAL_NODE_BITS) as u32 & LOCAL_NODE_MAX),
            Self::FullLocal { factor, .. } => Some(factor),
            _ => None,
        }
    }

    /// Variable array index, for local edges.
    pub fn variable_index(&self) -> Option<u32> {
        match *self {
            Self::SmallLocal(word) => Some(word as u32 & LOCAL_NODE_MAX),
            Self::FullLocal { variable, .. } => Some(variable),
            _ => None,
        }
    }

    /// Factor endpoint, for boundary edges.
    pub fn boundary_factor(&self) -> Option<NodeKey> {
        match *self {
            Self::SmallBoundary { factor, .. } | Self::FullBoundary { factor, .. } => Some(factor),
            _ => None,
        }
    }

    /// Position in the factor graph's boundary list, for boundary edges.
    pub fn boundary_index(&self) -> Option<u32> {
        match *self {
            Self::SmallBoundary { packed, .. } => Some(packed >> (2 * BOUNDARY_EDGE_BITS)),
            Self::FullBoundary { boundary, .. } => Some(boundary),
            _ => None,
        }
    }

    /// Same boundary edge with a different boundary position.
    pub(crate) fn with_boundary_index(&self, boundary: u32, layout: EdgeLayout) -> Self {
        match self.boundary_factor() {
            Some(factor) => Self::boundary(
                factor,
                boundary,
                self.factor_edge(),
                self.variable_edge(),
                layout,
            ),
            None => *self,
        }
    }
}
