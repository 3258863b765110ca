//! Node Identity
//!
//! Three kinds of identifier are in play:
//!
//! - [`LocalId`]: `type << 28 | index`, unique within the owning graph. The
//!   index is the node's position in the graph's owned array for its kind.
//! - [`GlobalId`]: `graph_id << 32 | local_id`, unique within an [`Environment`].
//! - [`NodeKey`]: arena handle used by the API. Stable for the lifetime of
//!   the node, including across reparenting, and never reused.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

/// Node type tag stored in the top bits of a [`LocalId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum NodeType {
    /// Factor owned by a graph.
    Factor = 1,
    /// Subgraph owned by a graph.
    Graph = 2,
    /// Variable owned by a graph.
    Variable = 3,
    /// Variable exposed at a graph's boundary; the index is its boundary position.
    Boundary = 4,
}

impl NodeType {
    fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::Factor),
            2 => Some(Self::Graph),
            3 => Some(Self::Variable),
            4 => Some(Self::Boundary),
            _ => None,
        }
    }
}

/// Graph-relative node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LocalId(u32);

impl LocalId {
    /// Bits used by the index part.
    pub const INDEX_BITS: u32 = 28;
    /// Largest index; also the index of a detached node.
    pub const INDEX_MAX: u32 = (1 << Self::INDEX_BITS) - 1;

    /// Build an id from a type tag and index. The index is masked to 28 bits.
    pub fn new(node_type: NodeType, index: u32) -> Self {
        Self((node_type as u32) << Self::INDEX_BITS | (index & Self::INDEX_MAX))
    }

    /// Id carried by a node of `node_type` that has no owner.
    pub fn detached(node_type: NodeType) -> Self {
        Self::new(node_type, Self::INDEX_MAX)
    }

    /// Type tag, if valid.
    pub fn node_type(self) -> Option<NodeType> {
        NodeType::from_tag(self.0 >> Self::INDEX_BITS)
    }

    /// Index within the owning graph's array for this type.
    pub fn index(self) -> u32 {
        self.0 & Self::INDEX_MAX
    }

    /// True for the detached placeholder id.
    pub fn is_detached(self) -> bool {
        self.index() == Self::INDEX_MAX
    }

    /// Raw value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.node_type() {
            Some(NodeType::Factor) => 'F',
            Some(NodeType::Graph) => 'G',
            Some(NodeType::Variable) => 'V',
            Some(NodeType::Boundary) => 'B',
            None => '?',
        };
        write!(f, "{prefix}{}", self.index())
    }
}

/// Environment-wide node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GlobalId(u64);

impl GlobalId {
    /// Combine a graph id and a local id.
    pub fn new(graph_id: u32, local: LocalId) -> Self {
        Self(u64::from(graph_id) << 32 | u64::from(local.raw()))
    }

    /// Id of the graph that owns the node.
    pub fn graph_id(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Local part.
    pub fn local_id(self) -> LocalId {
        LocalId(self.0 as u32)
    }

    /// Raw value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.graph_id(), self.local_id())
    }
}

/// Source of graph ids and tree tags.
///
/// Every graph tree built from the same environment draws from the same
/// counters, so global ids and keys never collide between those trees.
#[derive(Debug)]
pub struct Environment {
    next_graph_id: Cell<u32>,
    next_tree: Cell<u32>,
}

impl Environment {
    /// Create a fresh environment. Graph ids start at 1.
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            next_graph_id: Cell::new(1),
            next_tree: Cell::new(1),
        })
    }

    pub(crate) fn allocate_graph_id(&self) -> u32 {
        let id = self.next_graph_id.get();
        self.next_graph_id.set(id + 1);
        id
    }

    pub(crate) fn allocate_tree(&self) -> u32 {
        let tree = self.next_tree.get();
        self.next_tree.set(tree + 1);
        tree
    }
}

/// Handle to a node in a [`FactorGraph`](super::FactorGraph) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeKey {
    pub(crate) tree: u32,
    pub(crate) index: u32,
}

impl NodeKey {
    pub(crate) fn new(tree: u32, index: u32) -> Self {
        Self { tree, index }
    }

    /// Slot in the arena.
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.tree, self.index)
    }
}

macro_rules! typed_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub(crate) NodeKey);

        impl $name {
            /// Untyped key.
            pub fn node(self) -> NodeKey {
                self.0
            }
        }

        impl From<$name> for NodeKey {
            fn from(key: $name) -> NodeKey {
                key.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

typed_key!(
    /// Key of a variable node.
    VariableKey
);
typed_key!(
    /// Key of a factor node.
    FactorKey
);
typed_key!(
    /// Key of a graph node (the root or a subgraph).
    GraphKey
);
