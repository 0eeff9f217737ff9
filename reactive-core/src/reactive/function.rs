//! Reactive Functions
//!
//! A [`FunctionSpec`] describes one derivation: the names of the properties
//! it reads, the name of the property it writes, and the pure function that
//! combines one into the other.
//!
//! Specs are inert. Whoever registers one (normally the model facade)
//! resolves the names to node ids, creates the function node and wires it
//! into the runtime; after that the spec has no further role.
//!
//! # Declarations
//!
//! Derivations are usually written as a declaration mapping each output
//! name to its inputs followed by the combining function:
//!
//! ```rust,ignore
//! let declaration = vec![
//!     ("full_name", vec!["first".into(), "last".into(), Term::combine(|v: &[String]| {
//!         format!("{} {}", v[0], v[1])
//!     })]),
//! ];
//! let specs = FunctionSpec::parse(declaration)?;
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::{DerivationError, ParseError};
use crate::graph::NodeId;

/// A combining function: input values in declaration order to one output.
pub type Combine<V> = Arc<dyn Fn(&[V]) -> Result<V, DerivationError> + Send + Sync>;

/// A declarative derivation mapping, output name to terms.
pub type Declaration<V> = IndexMap<String, Vec<Term<V>>>;

/// One element of a declaration list.
pub enum Term<V> {
    /// The name of an input property.
    Input(String),

    /// The combining function. Must be the last term.
    Combine(Combine<V>),
}

impl<V: 'static> Term<V> {
    pub fn input(name: impl Into<String>) -> Self {
        Self::Input(name.into())
    }

    /// An infallible combining function.
    pub fn combine<F>(f: F) -> Self
    where
        F: Fn(&[V]) -> V + Send + Sync + 'static,
    {
        Self::Combine(Arc::new(move |values: &[V]| Ok::<V, DerivationError>(f(values))))
    }

    /// A combining function that may fail. Its error aborts the digest.
    pub fn try_combine<F>(f: F) -> Self
    where
        F: Fn(&[V]) -> Result<V, DerivationError> + Send + Sync + 'static,
    {
        Self::Combine(Arc::new(f))
    }
}

impl<V> From<&str> for Term<V> {
    fn from(name: &str) -> Self {
        Self::Input(name.to_owned())
    }
}

impl<V> From<String> for Term<V> {
    fn from(name: String) -> Self {
        Self::Input(name)
    }
}

impl<V> fmt::Debug for Term<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(name) => f.debug_tuple("Input").field(name).finish(),
            Self::Combine(_) => f.write_str("Combine(..)"),
        }
    }
}

/// Description of one derivation.
pub struct FunctionSpec<V> {
    /// Input property names, in the order the combining function sees them.
    inputs: Vec<String>,

    /// Output property name.
    output: String,

    /// Invoked during a digest once every input is defined, and again
    /// whenever an input changes.
    combine: Combine<V>,

    /// Node ids of `inputs`. Assigned by the registering party.
    in_nodes: Option<SmallVec<[NodeId; 4]>>,

    /// This derivation's own node. Assigned by `Runtime::create_function_node`.
    node: Option<NodeId>,

    /// Node id of `output`. Assigned by the registering party.
    out_node: Option<NodeId>,
}

impl<V: 'static> FunctionSpec<V> {
    /// Create a spec with an infallible combining function.
    pub fn new<I, S, F>(inputs: I, output: impl Into<String>, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&[V]) -> V + Send + Sync + 'static,
    {
        Self::with_combine(
            inputs.into_iter().map(Into::into).collect(),
            output.into(),
            Arc::new(move |values: &[V]| Ok::<V, DerivationError>(f(values))),
        )
    }

    /// Create a spec whose combining function may fail.
    pub fn fallible<I, S, F>(inputs: I, output: impl Into<String>, f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&[V]) -> Result<V, DerivationError> + Send + Sync + 'static,
    {
        Self::with_combine(
            inputs.into_iter().map(Into::into).collect(),
            output.into(),
            Arc::new(f),
        )
    }

    fn with_combine(inputs: Vec<String>, output: String, combine: Combine<V>) -> Self {
        Self {
            inputs,
            output,
            combine,
            in_nodes: None,
            node: None,
            out_node: None,
        }
    }

    /// Parse a declaration into one spec per output, in declaration order.
    ///
    /// Each list must end with the combining function; every element before
    /// it names an input. A list holding only the function declares a
    /// derivation with no inputs.
    ///
    /// # Errors
    ///
    /// [`ParseError::MissingCombine`] if a list is empty or does not end with
    /// a combining function, [`ParseError::MisplacedCombine`] if one appears
    /// earlier.
    pub fn parse<I, K>(declaration: I) -> Result<Vec<Self>, ParseError>
    where
        I: IntoIterator<Item = (K, Vec<Term<V>>)>,
        K: Into<String>,
    {
        declaration
            .into_iter()
            .map(|(output, mut terms)| {
                let output = output.into();

                let combine = match terms.pop() {
                    Some(Term::Combine(combine)) => combine,
                    Some(Term::Input(_)) | None => {
                        return Err(ParseError::MissingCombine { output });
                    }
                };

                let mut inputs = Vec::with_capacity(terms.len());
                for (position, term) in terms.into_iter().enumerate() {
                    match term {
                        Term::Input(name) => inputs.push(name),
                        Term::Combine(_) => {
                            return Err(ParseError::MisplacedCombine { output, position });
                        }
                    }
                }

                Ok(Self::with_combine(inputs, output, combine))
            })
            .collect()
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Resolved input node ids, if assigned.
    pub fn in_nodes(&self) -> Option<&[NodeId]> {
        self.in_nodes.as_deref()
    }

    /// This derivation's node id, if created.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Resolved output node id, if assigned.
    pub fn out_node(&self) -> Option<NodeId> {
        self.out_node
    }

    pub fn assign_inputs<I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.in_nodes = Some(nodes.into_iter().collect());
    }

    pub fn assign_output(&mut self, node: NodeId) {
        self.out_node = Some(node);
    }

    pub(crate) fn assign_node(&mut self, node: NodeId) {
        self.node = Some(node);
    }

    pub(crate) fn combine(&self) -> &Combine<V> {
        &self.combine
    }
}

impl<V> fmt::Debug for FunctionSpec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("in_nodes", &self.in_nodes)
            .field("node", &self.node)
            .field("out_node", &self.out_node)
            .finish()
    }
}
