//! Accessors and Change Notification
//!
//! An accessor is the only way the runtime touches a property's value. The
//! runtime reads inputs through it and writes derived outputs back through
//! it; it never stores values itself.
//!
//! Writing through an accessor must report the change. Accessors do that
//! through a [`ChangeNotifier`], a handle onto the runtime's change set that
//! does not keep the rest of the runtime alive.
//!
//! The notifier also carries the digest lock. Marking a node waits for a
//! running digest to finish unless the mark comes from the digesting thread
//! itself, so a write racing a pass is recorded after the pass drains its
//! sources.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};

use crate::graph::NodeId;

/// Read/write access to the value behind one property node.
///
/// # Contract
///
/// - `get` returns the current value, or `None` while the property is
///   undefined. `None` is the only absence marker: any `Some` value, however
///   "empty", counts as defined.
/// - `set` stores the value and must call
///   [`ChangeNotifier::mark_changed`] with this property's node id.
pub trait Accessor<V>: Send + Sync {
    /// The current value, if defined.
    fn get(&self) -> Option<V>;

    /// Store a new value and report the change.
    fn set(&self, value: V);
}

/// Shared handle onto a runtime's change set.
///
/// Cloning is cheap; all clones record into the same set.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    /// Property nodes written since they last took part in a digest.
    /// Ordered by id so digests visit sources deterministically.
    changed: Arc<Mutex<BTreeSet<NodeId>>>,
    /// Held for the whole of a digest. Reentrant so derivations can write
    /// through accessors on the digesting thread.
    digest: Arc<ReentrantMutex<()>>,
}

impl ChangeNotifier {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record that the property behind `node` was written.
    ///
    /// Marking the same node again before a digest has no further effect.
    /// Blocks while another thread is digesting.
    pub fn mark_changed(&self, node: NodeId) {
        let _digest = self.digest.lock();
        self.changed.lock().insert(node);
    }

    /// Whether `node` is waiting for a digest.
    pub fn is_changed(&self, node: NodeId) -> bool {
        self.changed.lock().contains(&node)
    }

    /// The pending nodes, in ascending id order.
    pub fn pending(&self) -> Vec<NodeId> {
        self.changed.lock().iter().copied().collect()
    }

    /// Exclude marks from other threads until the guard is dropped.
    pub(crate) fn lock_digest(&self) -> ReentrantMutexGuard<'_, ()> {
        self.digest.lock()
    }

    /// Remove exactly `nodes` from the change set, leaving anything that was
    /// added in the meantime.
    pub(crate) fn drain(&self, nodes: &[NodeId]) {
        let mut changed = self.changed.lock();
        for node in nodes {
            changed.remove(node);
        }
    }
}
