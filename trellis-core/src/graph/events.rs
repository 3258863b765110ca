//! Structural Events
//!
//! A graph can report its structural changes to one [`GraphEventSink`]. The
//! sink declares which kinds it cares about up front; the graph caches that
//! as a bitmask, so with no sink (or no interest) raising an event costs a
//! single mask test and the event value is never built.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use super::ids::{FactorKey, GraphKey, VariableKey};

/// Bitmask of [`GraphEvent`] kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventMask(u8);

impl EventMask {
    /// No events.
    pub const NONE: Self = Self(0);
    /// Factor added or removed.
    pub const FACTOR: Self = Self(0b0001);
    /// Variable added or removed.
    pub const VARIABLE: Self = Self(0b0010);
    /// Subgraph added or removed.
    pub const SUBGRAPH: Self = Self(0b0100);
    /// Boundary variable added or removed.
    pub const BOUNDARY: Self = Self(0b1000);
    /// Every kind.
    pub const ALL: Self = Self(0b1111);

    /// True if every bit of `other` is set here.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for EventMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A structural change to a graph.
///
/// `absorbed` is set when the node changed owner because a subgraph was
/// absorbed into its parent, rather than being created or destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphEvent {
    /// A factor now belongs to `graph`.
    FactorAdded {
        graph: GraphKey,
        factor: FactorKey,
        absorbed: bool,
    },
    /// A factor no longer belongs to `graph`.
    FactorRemoved {
        graph: GraphKey,
        factor: FactorKey,
        absorbed: bool,
    },
    /// A variable now belongs to `graph`.
    VariableAdded {
        graph: GraphKey,
        variable: VariableKey,
        absorbed: bool,
    },
    /// A variable no longer belongs to `graph`.
    VariableRemoved {
        graph: GraphKey,
        variable: VariableKey,
        absorbed: bool,
    },
    /// A subgraph now belongs to `graph`.
    SubgraphAdded {
        graph: GraphKey,
        subgraph: GraphKey,
        absorbed: bool,
    },
    /// A subgraph no longer belongs to `graph`.
    SubgraphRemoved {
        graph: GraphKey,
        subgraph: GraphKey,
        absorbed: bool,
    },
    /// `variable` was exposed at the boundary of `graph`.
    BoundaryVariableAdded { graph: GraphKey, variable: VariableKey },
    /// `variable` was dropped from the boundary of `graph`.
    BoundaryVariableRemoved { graph: GraphKey, variable: VariableKey },
}

impl GraphEvent {
    /// Mask bit for this event's kind.
    pub fn mask(&self) -> EventMask {
        match self {
            GraphEvent::FactorAdded { .. } | GraphEvent::FactorRemoved { .. } => EventMask::FACTOR,
            GraphEvent::VariableAdded { .. } | GraphEvent::VariableRemoved { .. } => {
                EventMask::VARIABLE
            }
            GraphEvent::SubgraphAdded { .. } | GraphEvent::SubgraphRemoved { .. } => {
                EventMask::SUBGRAPH
            }
            GraphEvent::BoundaryVariableAdded { .. } | GraphEvent::BoundaryVariableRemoved { .. } => {
                EventMask::BOUNDARY
            }
        }
    }
}

/// Receiver of structural events.
pub trait GraphEventSink {
    /// Kinds this sink wants. Read once when the sink is installed.
    fn interests(&self) -> EventMask {
        EventMask::ALL
    }

    /// Handle one event.
    fn raise_event(&mut self, event: &GraphEvent);
}

/// Shared sink, so the caller can inspect it while the graph holds a clone.
impl<S: GraphEventSink> GraphEventSink for Rc<RefCell<S>> {
    fn interests(&self) -> EventMask {
        self.borrow().interests()
    }

    fn raise_event(&mut self, event: &GraphEvent) {
        self.borrow_mut().raise_event(event);
    }
}

/// Sink that keeps every event it receives.
#[derive(Debug)]
pub struct EventLog {
    interests: EventMask,
    events: Vec<GraphEvent>,
}

impl EventLog {
    /// Log every event kind.
    pub fn new() -> Self {
        Self::with_interests(EventMask::ALL)
    }

    /// Log only the given kinds.
    pub fn with_interests(interests: EventMask) -> Self {
        Self {
            interests,
            events: Vec::new(),
        }
    }

    /// Events so far, oldest first.
    pub fn events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Take the logged events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEventSink for EventLog {
    fn interests(&self) -> EventMask {
        self.interests
    }

    fn raise_event(&mut self, event: &GraphEvent) {
        self.events.push(event.clone());
    }
}
