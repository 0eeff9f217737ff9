//! Error types for the reactive runtime.
//!
//! Organized by subsystem: graph wiring, declaration parsing, digest, the
//! model facade and state encoding.

use crate::graph::{NodeId, NodeKind};

/// Error returned by a derivation that could not produce a value.
pub type DerivationError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from wiring nodes into the dependency graph.
///
/// All of these are raised before the graph is touched, so a failed
/// registration leaves no partial edges behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A function was registered before its node identifiers were resolved.
    #[error("function for '{output}' registered before its {missing} was assigned")]
    IncompleteSpec {
        /// Output property name of the offending function.
        output: String,
        /// Which identifier was still unset.
        missing: &'static str,
    },

    /// The identifier was not issued by this runtime.
    #[error("node {0} does not exist in this runtime")]
    UnknownNode(NodeId),

    /// The identifier names a node of the wrong kind.
    #[error("node {node} is a {found} node, expected a {expected} node")]
    WrongKind {
        node: NodeId,
        expected: NodeKind,
        found: NodeKind,
    },
}

/// Errors from parsing a declarative derivation mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The list for an output does not end with a combining function.
    #[error("declaration for '{output}' must end with a combining function")]
    MissingCombine { output: String },

    /// A combining function appears before the last position.
    #[error("declaration for '{output}' has a combining function at position {position}, before the end")]
    MisplacedCombine { output: String, position: usize },
}

/// Errors from a digest pass.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// A derivation returned an error. Function nodes ordered before it have
    /// already written their outputs; the rest of the pass was abandoned and
    /// the change set was left as it was.
    #[error("derivation {node} for '{output}' failed: {source}")]
    Derivation {
        node: NodeId,
        output: String,
        #[source]
        source: DerivationError,
    },
}

/// Errors from misuse of the model facade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A public property was added after `finalize()`.
    #[error("public property '{0}' added after the model was finalized")]
    Finalized(String),

    /// `finalize()` was called more than once.
    #[error("model finalized more than once")]
    AlreadyFinalized,

    /// The operation requires a finalized model.
    #[error("model must be finalized before {0}")]
    NotFinalized(&'static str),

    /// State referred to a property that is not public.
    #[error("'{0}' is not a public property of this model")]
    UnknownProperty(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors from encoding or decoding a state snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("state MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("state MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
