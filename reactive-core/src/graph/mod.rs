//! Dependency Graph
//!
//! This module implements the directed graph that records relationships
//! between property nodes and function nodes.
//!
//! # Overview
//!
//! The graph has two kinds of nodes:
//!
//! - Property nodes hold a named, mutable value
//! - Function nodes derive one property from a list of other properties
//!
//! An edge from A to B means "B depends on A". A function node has an edge
//! from each of its inputs and an edge to its output, so a forward walk from
//! a changed property reaches every derivation it feeds, their outputs, the
//! derivations those feed, and so on.
//!
//! # Design Decisions
//!
//! 1. Edges are only ever added. Derivations are wired once and live as long
//!    as the runtime that owns them.
//!
//! 2. Only forward edges are stored. Digests walk forward from changed
//!    properties and never need to ask what a node depends on.
//!
//! 3. Cycles are tolerated rather than rejected. A cycle degrades the order
//!    of one digest pass; it never loops.

mod directed;
mod node;

pub use directed::DirectedGraph;
pub use node::{NodeId, NodeKind};
