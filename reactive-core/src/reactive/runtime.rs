//! Reactive Runtime
//!
//! The runtime owns the dependency graph between property nodes and function
//! nodes, remembers which properties were written since the last digest, and
//! runs the digest that brings derived properties up to date.
//!
//! # How It Works
//!
//! 1. Property nodes are created with an accessor. Function nodes are created
//!    from a [`FunctionSpec`] and wired with edges from each input and to
//!    the output.
//!
//! 2. Writing through an accessor records the property in the change set.
//!    Nothing else happens until somebody calls [`Runtime::digest`].
//!
//! 3. A digest:
//!    a. Snapshots the change set (the sources)
//!    b. Depth-first searches forward from the sources, collecting nodes in
//!       finish order
//!    c. Reverses that order to get a topological order
//!    d. Evaluates every function node in that order whose inputs are all
//!       defined, writing each result through the output accessor
//!    e. Removes the sources from the change set
//!
//! Only the sources are removed in the last step. A digest that writes
//! derived properties leaves those properties in the change set; the next
//! digest picks them up again. Derivations are pure, so re-running the
//! functions downstream of them reproduces the same values.
//!
//! # Thread Safety
//!
//! A `Runtime` is a cheap handle; clones share one graph. The graph, the
//! change set and the digest each sit behind their own lock. The graph lock
//! is never held while accessors or derivations run.
//!
//! The digest lock is held from the snapshot until the sources are drained,
//! and marking a change takes it too. Writes from derivations run on the
//! digesting thread and re-enter it. Writes from other threads wait for the
//! pass to finish, so their marks survive the drain and the next digest
//! picks them up.
//!
//! A derivation must not hand a write to another thread and wait for it;
//! that thread blocks on the digest lock. Calling [`Runtime::digest`] from
//! inside a derivation is not supported either.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::accessor::{Accessor, ChangeNotifier};
use super::function::{Combine, FunctionSpec};
use crate::error::{DigestError, GraphError};
use crate::graph::{DirectedGraph, NodeId, NodeKind};

/// What an arena slot holds.
enum Slot<V> {
    Property(Arc<dyn Accessor<V>>),
    Function(Derivation<V>),
}

impl<V> Slot<V> {
    fn kind(&self) -> NodeKind {
        match self {
            Self::Property(_) => NodeKind::Property,
            Self::Function(_) => NodeKind::Function,
        }
    }
}

/// A function node's derivation.
struct Derivation<V> {
    output: Arc<str>,
    combine: Combine<V>,
    /// Set by `register_function`.
    wiring: Option<Wiring>,
}

struct Wiring {
    inputs: SmallVec<[NodeId; 4]>,
    output: NodeId,
}

/// Graph structure plus the node arena.
struct GraphState<V> {
    graph: DirectedGraph<NodeId>,
    slots: Vec<Slot<V>>,
}

impl<V> GraphState<V> {
    fn next_id(&self) -> NodeId {
        NodeId::from_index(self.slots.len())
    }

    fn slot(&self, node: NodeId) -> Result<&Slot<V>, GraphError> {
        self.slots
            .get(node.index())
            .ok_or(GraphError::UnknownNode(node))
    }

    fn expect_kind(&self, node: NodeId, expected: NodeKind) -> Result<(), GraphError> {
        let found = self.slot(node)?.kind();
        if found == expected {
            Ok(())
        } else {
            Err(GraphError::WrongKind {
                node,
                expected,
                found,
            })
        }
    }

    fn accessor(&self, node: NodeId) -> Option<Arc<dyn Accessor<V>>> {
        match self.slots.get(node.index()) {
            Some(Slot::Property(accessor)) => Some(Arc::clone(accessor)),
            _ => None,
        }
    }

    /// Everything needed to evaluate `node` without holding the graph lock.
    fn evaluation(&self, node: NodeId) -> Option<Evaluation<V>> {
        let Some(Slot::Function(derivation)) = self.slots.get(node.index()) else {
            return None;
        };
        let wiring = derivation.wiring.as_ref()?;

        Some(Evaluation {
            node,
            output_name: Arc::clone(&derivation.output),
            combine: Arc::clone(&derivation.combine),
            inputs: wiring
                .inputs
                .iter()
                .map(|&input| self.accessor(input))
                .collect::<Option<_>>()?,
            output: self.accessor(wiring.output)?,
        })
    }
}

/// One scheduled function node evaluation.
struct Evaluation<V> {
    node: NodeId,
    output_name: Arc<str>,
    combine: Combine<V>,
    inputs: SmallVec<[Arc<dyn Accessor<V>>; 4]>,
    output: Arc<dyn Accessor<V>>,
}

impl<V> Evaluation<V> {
    /// Run the derivation if every input is defined.
    ///
    /// Returns whether the derivation ran.
    fn run(&self) -> Result<bool, DigestError> {
        let mut values: SmallVec<[V; 4]> = SmallVec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            match input.get() {
                Some(value) => values.push(value),
                None => {
                    tracing::trace!(
                        node = %self.node,
                        output = %self.output_name,
                        "skipping derivation with undefined input"
                    );
                    return Ok(false);
                }
            }
        }

        tracing::trace!(node = %self.node, output = %self.output_name, "evaluating derivation");

        let value = (self.combine)(values.as_slice()).map_err(|source| DigestError::Derivation {
            node: self.node,
            output: self.output_name.to_string(),
            source,
        })?;
        self.output.set(value);

        Ok(true)
    }
}

/// Summary of one digest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestReport {
    /// Changed properties the pass started from.
    pub sources: usize,
    /// Nodes reached from the sources, sources included.
    pub visited: usize,
    /// Function nodes whose derivation ran.
    pub evaluated: usize,
    /// Function nodes skipped because an input was undefined.
    pub skipped: usize,
}

/// The dependency graph and digest engine.
///
/// `V` is the value type every property of this runtime holds. Use
/// [`Value`](crate::model::Value) when properties of different types have to
/// share one graph.
pub struct Runtime<V> {
    state: Arc<Mutex<GraphState<V>>>,
    changes: ChangeNotifier,
}

impl<V: 'static> Runtime<V> {
    /// Create a runtime with an empty graph.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a runtime with room for `nodes` nodes before reallocating.
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(GraphState {
                graph: DirectedGraph::new(),
                slots: Vec::with_capacity(nodes),
            })),
            changes: ChangeNotifier::new(),
        }
    }

    /// A handle accessors use to report writes.
    pub fn notifier(&self) -> ChangeNotifier {
        self.changes.clone()
    }

    /// Create a property node backed by `accessor`.
    pub fn create_property_node(&self, accessor: Arc<dyn Accessor<V>>) -> NodeId {
        let mut state = self.state.lock();
        let node = state.next_id();
        state.slots.push(Slot::Property(accessor));
        node
    }

    /// Create a property node whose accessor needs to know its own id.
    ///
    /// The runtime keeps one clone of the accessor and returns the other.
    /// `make` runs while the graph is locked and must not call back into
    /// this runtime.
    pub fn create_property_node_with<A, F>(&self, make: F) -> A
    where
        A: Accessor<V> + Clone + 'static,
        F: FnOnce(NodeId) -> A,
    {
        let mut state = self.state.lock();
        let node = state.next_id();
        let accessor = make(node);
        state.slots.push(Slot::Property(Arc::new(accessor.clone())));
        accessor
    }

    /// Create the function node for `spec` and record its id in the spec.
    ///
    /// The node is not connected to anything until
    /// [`register_function`](Self::register_function) is called.
    pub fn create_function_node(&self, spec: &mut FunctionSpec<V>) -> NodeId {
        let mut state = self.state.lock();
        let node = state.next_id();
        state.slots.push(Slot::Function(Derivation {
            output: Arc::from(spec.output()),
            combine: Arc::clone(spec.combine()),
            wiring: None,
        }));
        drop(state);

        spec.assign_node(node);
        node
    }

    /// Wire a created function node into the graph.
    ///
    /// Adds an edge from every input to the function node, then one from the
    /// function node to its output.
    ///
    /// # Errors
    ///
    /// [`GraphError::IncompleteSpec`] if the spec's input nodes, function
    /// node or output node has not been assigned; [`GraphError::UnknownNode`]
    /// or [`GraphError::WrongKind`] if an assigned id does not name a node of
    /// the right kind in this runtime. The graph is untouched on error.
    pub fn register_function(&self, spec: &FunctionSpec<V>) -> Result<(), GraphError> {
        let incomplete = |missing| GraphError::IncompleteSpec {
            output: spec.output().to_owned(),
            missing,
        };
        let inputs = spec.in_nodes().ok_or_else(|| incomplete("input nodes"))?;
        let node = spec.node().ok_or_else(|| incomplete("function node"))?;
        let output = spec.out_node().ok_or_else(|| incomplete("output node"))?;

        let mut state = self.state.lock();

        for &input in inputs {
            state.expect_kind(input, NodeKind::Property)?;
        }
        state.expect_kind(node, NodeKind::Function)?;
        state.expect_kind(output, NodeKind::Property)?;

        if let Some(Slot::Function(derivation)) = state.slots.get_mut(node.index()) {
            derivation.wiring = Some(Wiring {
                inputs: inputs.iter().copied().collect(),
                output,
            });
        }
        for &input in inputs {
            state.graph.add_edge(input, node);
        }
        state.graph.add_edge(node, output);

        tracing::debug!(
            node = %node,
            output = spec.output(),
            inputs = inputs.len(),
            "registered function"
        );

        Ok(())
    }

    /// Record that the property behind `node` was written.
    pub fn mark_changed(&self, node: NodeId) {
        self.changes.mark_changed(node);
    }

    /// Bring every property downstream of a changed property up to date.
    ///
    /// # Errors
    ///
    /// [`DigestError::Derivation`] if a derivation fails. Function nodes
    /// evaluated before it keep their effects, the remaining ones are not
    /// evaluated, and the change set is left as it was; fix the derivation
    /// and digest again.
    pub fn digest(&self) -> Result<DigestReport, DigestError> {
        let _digesting = self.changes.lock_digest();

        let sources = self.changes.pending();
        if sources.is_empty() {
            return Ok(DigestReport::default());
        }

        let (visited, plan) = {
            let state = self.state.lock();
            let mut order = state.graph.depth_first_search_all(sources.iter().copied());
            order.reverse();
            let plan: Vec<Evaluation<V>> = order
                .iter()
                .filter_map(|&node| state.evaluation(node))
                .collect();
            (order.len(), plan)
        };

        let mut report = DigestReport {
            sources: sources.len(),
            visited,
            ..DigestReport::default()
        };
        for evaluation in &plan {
            if evaluation.run()? {
                report.evaluated += 1;
            } else {
                report.skipped += 1;
            }
        }

        self.changes.drain(&sources);

        tracing::debug!(
            sources = report.sources,
            visited = report.visited,
            evaluated = report.evaluated,
            skipped = report.skipped,
            "digest complete"
        );

        Ok(report)
    }

    /// Properties waiting for a digest, in ascending id order.
    pub fn pending_changes(&self) -> Vec<NodeId> {
        self.changes.pending()
    }

    /// Whether `node` is waiting for a digest.
    pub fn is_changed(&self, node: NodeId) -> bool {
        self.changes.is_changed(node)
    }

    /// The kind of `node`, or `None` if this runtime never issued it.
    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.state.lock().slots.get(node.index()).map(Slot::kind)
    }

    /// The nodes that depend directly on `node`, in edge insertion order.
    pub fn adjacent(&self, node: NodeId) -> Vec<NodeId> {
        self.state.lock().graph.adjacent(node).to_vec()
    }

    /// Number of nodes created so far.
    pub fn node_count(&self) -> usize {
        self.state.lock().slots.len()
    }
}

impl<V: 'static> Default for Runtime<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Runtime<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            changes: self.changes.clone(),
        }
    }
}

impl<V> fmt::Debug for Runtime<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Runtime")
            .field("nodes", &state.slots.len())
            .field("edges", &state.graph.edge_count())
            .field("pending", &self.changes.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;

    /// A bare value slot that reports writes like a model property does.
    struct Cell {
        node: OnceLock<NodeId>,
        value: RwLock<Option<i64>>,
        changes: ChangeNotifier,
    }

    impl Accessor<i64> for Cell {
        fn get(&self) -> Option<i64> {
            *self.value.read()
        }

        fn set(&self, value: i64) {
            *self.value.write() = Some(value);
            if let Some(&node) = self.node.get() {
                self.changes.mark_changed(node);
            }
        }
    }

    fn cell(runtime: &Runtime<i64>, value: Option<i64>) -> (NodeId, Arc<Cell>) {
        let cell = Arc::new(Cell {
            node: OnceLock::new(),
            value: RwLock::new(value),
            changes: runtime.notifier(),
        });
        let node = runtime.create_property_node(cell.clone());
        cell.node.set(node).unwrap();
        (node, cell)
    }

    fn wire(
        runtime: &Runtime<i64>,
        inputs: &[NodeId],
        output: NodeId,
        f: impl Fn(&[i64]) -> i64 + Send + Sync + 'static,
    ) -> NodeId {
        let mut spec = FunctionSpec::new(Vec::<String>::new(), "out", f);
        spec.assign_inputs(inputs.iter().copied());
        let node = runtime.create_function_node(&mut spec);
        spec.assign_output(output);
        runtime.register_function(&spec).unwrap();
        node
    }

    #[test]
    fn node_ids_are_shared_between_kinds() {
        let runtime = Runtime::new();
        let (a, _) = cell(&runtime, None);
        let (b, _) = cell(&runtime, None);
        let f = wire(&runtime, &[a], b, |v| v[0]);
        let (c, _) = cell(&runtime, None);

        assert_eq!([a.raw(), b.raw(), f.raw(), c.raw()], [0, 1, 2, 3]);
        assert_eq!(runtime.kind(f), Some(NodeKind::Function));
        assert_eq!(runtime.kind(c), Some(NodeKind::Property));
        assert_eq!(runtime.kind(NodeId::from(99)), None);
        assert_eq!(runtime.node_count(), 4);
    }

    #[test]
    fn register_adds_input_and_output_edges() {
        let runtime = Runtime::new();
        let (a, _) = cell(&runtime, None);
        let (b, _) = cell(&runtime, None);
        let (c, _) = cell(&runtime, None);
        let f = wire(&runtime, &[a, b], c, |v| v[0] + v[1]);

        assert_eq!(runtime.adjacent(a), vec![f]);
        assert_eq!(runtime.adjacent(b), vec![f]);
        assert_eq!(runtime.adjacent(f), vec![c]);
        assert!(runtime.adjacent(c).is_empty());
    }

    #[test]
    fn register_requires_resolved_nodes() {
        let runtime = Runtime::<i64>::new();
        let (a, _) = cell(&runtime, None);
        let (b, _) = cell(&runtime, None);

        let mut spec = FunctionSpec::new(["a"], "b", |v: &[i64]| v[0]);
        let err = runtime.register_function(&spec).unwrap_err();
        assert!(matches!(err, GraphError::IncompleteSpec { missing: "input nodes", .. }));

        spec.assign_inputs([a]);
        let err = runtime.register_function(&spec).unwrap_err();
        assert!(matches!(err, GraphError::IncompleteSpec { missing: "function node", .. }));

        runtime.create_function_node(&mut spec);
        let err = runtime.register_function(&spec).unwrap_err();
        assert!(matches!(err, GraphError::IncompleteSpec { missing: "output node", .. }));

        // Nothing was wired by the failed attempts
        assert!(runtime.adjacent(a).is_empty());

        spec.assign_output(b);
        runtime.register_function(&spec).unwrap();
        assert_eq!(runtime.adjacent(a).len(), 1);
    }

    #[test]
    fn register_rejects_wrong_kinds_without_partial_edges() {
        let runtime = Runtime::<i64>::new();
        let (a, _) = cell(&runtime, None);
        let (b, _) = cell(&runtime, None);
        let existing = wire(&runtime, &[a], b, |v| v[0]);

        let mut spec = FunctionSpec::new(["a", "f"], "b", |v: &[i64]| v[0]);
        spec.assign_inputs([a, existing]);
        runtime.create_function_node(&mut spec);
        spec.assign_output(b);

        let err = runtime.register_function(&spec).unwrap_err();
        assert_eq!(
            err,
            GraphError::WrongKind {
                node: existing,
                expected: NodeKind::Property,
                found: NodeKind::Function,
            }
        );
        assert_eq!(runtime.adjacent(a), vec![existing]);

        spec.assign_inputs([a, NodeId::from(50)]);
        let err = runtime.register_function(&spec).unwrap_err();
        assert_eq!(err, GraphError::UnknownNode(NodeId::from(50)));
    }

    #[test]
    fn digest_without_changes_does_nothing() {
        let runtime = Runtime::<i64>::new();
        let report = runtime.digest().unwrap();
        assert_eq!(report, DigestReport::default());
    }

    #[test]
    fn digest_evaluates_sum() {
        let runtime = Runtime::new();
        let (a, a_cell) = cell(&runtime, None);
        let (b, b_cell) = cell(&runtime, None);
        let (c, c_cell) = cell(&runtime, None);
        wire(&runtime, &[a, b], c, |v| v[0] + v[1]);

        a_cell.set(1);
        b_cell.set(2);
        let report = runtime.digest().unwrap();

        assert_eq!(c_cell.get(), Some(3));
        assert_eq!(report.sources, 2);
        assert_eq!(report.evaluated, 1);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn digest_skips_undefined_inputs() {
        let runtime = Runtime::new();
        let (a, a_cell) = cell(&runtime, None);
        let (b, _) = cell(&runtime, None);
        let (c, c_cell) = cell(&runtime, None);
        wire(&runtime, &[a, b], c, |v| v[0] + v[1]);

        a_cell.set(1);
        let report = runtime.digest().unwrap();

        assert_eq!(c_cell.get(), None);
        assert_eq!(report.evaluated, 0);
        assert_eq!(report.skipped, 1);
        assert!(!runtime.is_changed(c));
    }

    #[test]
    fn nullary_derivation_is_never_reached() {
        let runtime = Runtime::new();
        let (a, a_cell) = cell(&runtime, None);
        let (out, out_cell) = cell(&runtime, None);
        let constant = wire(&runtime, &[], out, |_| 7);

        a_cell.set(1);
        let report = runtime.digest().unwrap();

        assert!(runtime.adjacent(a).is_empty());
        assert_eq!(runtime.adjacent(constant), vec![out]);
        assert_eq!(report.evaluated, 0);
        assert_eq!(out_cell.get(), None);
    }

    #[test]
    fn zero_is_a_defined_value() {
        let runtime = Runtime::new();
        let (a, a_cell) = cell(&runtime, None);
        let (b, b_cell) = cell(&runtime, None);
        wire(&runtime, &[a], b, |v| v[0] + 1);

        a_cell.set(0);
        runtime.digest().unwrap();

        assert_eq!(b_cell.get(), Some(1));
    }

    #[test]
    fn digest_drains_only_its_sources() {
        let runtime = Runtime::new();
        let (a, a_cell) = cell(&runtime, None);
        let (b, _) = cell(&runtime, None);
        wire(&runtime, &[a], b, |v| v[0] * 10);

        a_cell.set(1);
        assert_eq!(runtime.pending_changes(), vec![a]);

        runtime.digest().unwrap();

        // `b` was written during the pass and stays pending
        assert_eq!(runtime.pending_changes(), vec![b]);

        // `b` feeds nothing, so the next pass only drains it
        let report = runtime.digest().unwrap();
        assert_eq!(report.evaluated, 0);
        assert!(runtime.pending_changes().is_empty());
    }

    #[test]
    fn unregistered_function_node_is_never_evaluated() {
        let runtime = Runtime::new();
        let (a, a_cell) = cell(&runtime, None);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut spec = FunctionSpec::new(["a"], "b", move |v: &[i64]| {
            counter.fetch_add(1, Ordering::SeqCst);
            v[0]
        });
        spec.assign_inputs([a]);
        runtime.create_function_node(&mut spec);

        a_cell.set(1);
        runtime.digest().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_derivation_aborts_the_pass() {
        let runtime = Runtime::new();
        let (a, a_cell) = cell(&runtime, None);
        let (b, b_cell) = cell(&runtime, None);
        let (c, c_cell) = cell(&runtime, None);

        wire(&runtime, &[a], b, |v| v[0] + 1);

        let mut spec = FunctionSpec::fallible(["b"], "c", |_: &[i64]| Err("boom".into()));
        spec.assign_inputs([b]);
        runtime.create_function_node(&mut spec);
        spec.assign_output(c);
        runtime.register_function(&spec).unwrap();

        a_cell.set(1);
        let err = runtime.digest().unwrap_err();

        assert!(matches!(err, DigestError::Derivation { ref output, .. } if output == "c"));
        // Effects before the failure stay visible
        assert_eq!(b_cell.get(), Some(2));
        assert_eq!(c_cell.get(), None);
        // The source was not drained
        assert!(runtime.is_changed(a));
    }

    #[test]
    fn clones_share_one_graph() {
        let runtime = Runtime::new();
        let other = runtime.clone();
        let (a, a_cell) = cell(&runtime, None);
        let (b, b_cell) = cell(&other, None);
        wire(&other, &[a], b, |v| v[0] * 2);

        a_cell.set(21);
        runtime.digest().unwrap();
        assert_eq!(b_cell.get(), Some(42));
        assert_eq!(other.node_count(), 3);
    }
}
