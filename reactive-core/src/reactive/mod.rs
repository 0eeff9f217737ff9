//! Reactive Core
//!
//! This module implements the digest engine: the runtime that connects
//! property nodes through derivations and re-evaluates them on demand.
//!
//! # Concepts
//!
//! ## Properties
//!
//! A property node is a named value slot. The runtime never stores the value
//! itself; it reads and writes it through an [`Accessor`]. Every write is
//! reported to the runtime's change set.
//!
//! ## Functions
//!
//! A function node combines the values of its input properties into its
//! output property. It is described by a [`FunctionSpec`], usually parsed
//! from a declaration.
//!
//! ## Digest
//!
//! Nothing propagates on write. When the caller decides it is time (once
//! per external event, once per frame), it calls [`Runtime::digest`], which
//! evaluates every function node reachable from the changed properties
//! exactly once, dependencies first.
//!
//! # Implementation Notes
//!
//! A function node only runs when every input is defined. Until then it is
//! skipped without error, so derivations never see a missing value.

mod accessor;
mod function;
mod runtime;

pub use accessor::{Accessor, ChangeNotifier};
pub use function::{Combine, Declaration, FunctionSpec, Term};
pub use runtime::{DigestReport, Runtime};
