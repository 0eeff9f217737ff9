//! Property Implementation
//!
//! A Property is a named value slot owned by a model and backed by one
//! property node in the runtime.
//!
//! # How Properties Work
//!
//! 1. The model creates a property the first time its name is referenced,
//!    either directly or as an input or output of a derivation.
//!
//! 2. Reading returns the current value, or `None` while it is undefined.
//!
//! 3. Writing stores the value and records the property's node in the
//!    runtime's change set. Dependent properties update on the next digest.
//!
//! # Thread Safety
//!
//! The value is protected by a RwLock. Clones share the same slot, so a
//! handle held by application code sees writes made by derivations.

use std::fmt::{self, Debug};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::graph::NodeId;
use crate::reactive::{Accessor, ChangeNotifier};

/// A named, mutable value tracked by a runtime.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let mut model = Model::new(&runtime);
/// let width = model.track("width");
///
/// width.set(640);
/// assert_eq!(width.get(), Some(640));
/// ```
pub struct Property<V> {
    /// Name within the owning model.
    name: Arc<str>,

    /// The property node backing this property.
    node: NodeId,

    /// The current value. `None` until first written.
    value: Arc<RwLock<Option<V>>>,

    /// Where writes are reported.
    changes: ChangeNotifier,
}

impl<V> Property<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(name: &str, node: NodeId, changes: ChangeNotifier) -> Self {
        Self {
            name: Arc::from(name),
            node,
            value: Arc::new(RwLock::new(None)),
            changes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Get the current value, if defined.
    pub fn get(&self) -> Option<V> {
        self.value.read().clone()
    }

    /// Whether the property holds a value.
    pub fn is_defined(&self) -> bool {
        self.value.read().is_some()
    }

    /// Set a new value and mark the property changed.
    ///
    /// Dependents are not recomputed until the next digest.
    pub fn set(&self, value: V) {
        *self.value.write() = Some(value);
        self.changes.mark_changed(self.node);
    }

    /// Update the value using a function.
    ///
    /// Does nothing while the property is undefined.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&V) -> V,
    {
        let new_value = {
            let guard = self.value.read();
            match guard.as_ref() {
                Some(current) => f(current),
                None => return,
            }
        };
        self.set(new_value);
    }
}

impl<V> Accessor<V> for Property<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn get(&self) -> Option<V> {
        Property::get(self)
    }

    fn set(&self, value: V) {
        Property::set(self, value);
    }
}

impl<V> Clone for Property<V> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            node: self.node,
            value: Arc::clone(&self.value),
            changes: self.changes.clone(),
        }
    }
}

impl<V> Debug for Property<V>
where
    V: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("node", &self.node)
            .field("value", &*self.value.read())
            .finish()
    }
}
