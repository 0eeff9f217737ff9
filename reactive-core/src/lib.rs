//! Reactive Core
//!
//! This crate provides a minimal reactive dataflow runtime: named, mutable
//! properties connected by pure derivations, with a manual digest that
//! re-evaluates only what recent changes affect, in dependency order.
//!
//! - Dependency graph over property nodes and function nodes
//! - Change tracking and the digest pass
//! - Declarative derivations
//! - Models with public properties, defaults and state snapshots
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Directed graph and depth-first search
//! - `reactive`: Runtime, accessors and derivation specs
//! - `model`: Named-property facade over a runtime
//! - `error`: Error types for each of the above
//!
//! # Example
//!
//! ```rust,ignore
//! use reactive_core::model::Model;
//! use reactive_core::reactive::{Runtime, Term};
//!
//! let runtime = Runtime::new();
//! let mut model = Model::new(&runtime);
//!
//! model.react(vec![
//!     ("c", vec!["a".into(), "b".into(), Term::combine(|v: &[i64]| v[0] + v[1])]),
//! ])?;
//!
//! model.set("a", 1).set("b", 2);
//! runtime.digest()?;
//!
//! assert_eq!(model.get("c"), Some(3));
//! ```

pub mod error;
pub mod graph;
pub mod model;
pub mod reactive;

pub use error::{DerivationError, DigestError, GraphError, ModelError, ParseError, StateError};
pub use graph::NodeId;
pub use model::{Model, Property, State, Value};
pub use reactive::{Accessor, DigestReport, FunctionSpec, Runtime, Term};
