//! Graph Nodes
//!
//! This module defines the identifiers and kinds of nodes that live in the
//! dependency graph.

use std::fmt;

/// Unique identifier for a node in the dependency graph.
///
/// Identifiers are assigned by a [`Runtime`](crate::reactive::Runtime) in
/// creation order starting at zero, and are shared by property nodes and
/// function nodes alike. They double as indices into the runtime's node
/// arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// The arena slot this node occupies.
    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u64)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A property node. Backed by an accessor that reads and writes one
    /// value slot.
    Property,

    /// A function node. Backed by a derivation that combines the values of
    /// its input properties into its output property.
    Function,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property => write!(f, "property"),
            Self::Function => write!(f, "function"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_order_by_creation() {
        let first = NodeId::from_index(0);
        let second = NodeId::from_index(1);
        assert!(first < second);
        assert_eq!(second.raw(), 1);
        assert_eq!(second.index(), 1);
    }

    #[test]
    fn node_id_round_trips_through_raw() {
        let id = NodeId::from(42);
        assert_eq!(NodeId::from(id.raw()), id);
        assert_eq!(id.to_string(), "#42");
    }

    #[test]
    fn kinds_display() {
        assert_eq!(NodeKind::Property.to_string(), "property");
        assert_eq!(NodeKind::Function.to_string(), "function");
    }
}
