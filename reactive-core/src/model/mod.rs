//! Reactive Models
//!
//! A [`Model`] is a set of named properties plus the derivations between
//! them, built on top of a shared [`Runtime`].
//!
//! # Lifecycle
//!
//! 1. Declare public properties with their default values.
//! 2. Declare derivations with [`Model::react`].
//! 3. Call [`Model::finalize`] once. Every public property is tracked and
//!    set to its default.
//! 4. Read and write properties; call [`Runtime::digest`] to propagate.
//!
//! Public properties make up the model's state. [`Model::get_state`] takes a
//! snapshot of them and [`Model::set_state`] restores one.
//!
//! Several models may share one runtime. A single digest then updates all
//! of them, including derivations that read one model's property and write
//! another's through a shared [`Property`] handle.

mod property;
mod state;
mod value;

pub use property::Property;
pub use state::State;
pub use value::Value;

use std::fmt;

use indexmap::IndexMap;

use crate::error::ModelError;
use crate::reactive::{FunctionSpec, Runtime, Term};

/// Named properties and derivations over a runtime.
pub struct Model<V> {
    runtime: Runtime<V>,

    /// Public property defaults, in declaration order.
    public: IndexMap<String, V>,

    /// Every property referenced so far, by name.
    tracked: IndexMap<String, Property<V>>,

    finalized: bool,
}

impl<V> Model<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create an empty model whose properties live in `runtime`.
    pub fn new(runtime: &Runtime<V>) -> Self {
        Self {
            runtime: runtime.clone(),
            public: IndexMap::new(),
            tracked: IndexMap::new(),
            finalized: false,
        }
    }

    pub fn runtime(&self) -> &Runtime<V> {
        &self.runtime
    }

    /// Get the property called `name`, creating its node on first use.
    pub fn track(&mut self, name: &str) -> Property<V> {
        if let Some(property) = self.tracked.get(name) {
            return property.clone();
        }

        let changes = self.runtime.notifier();
        let property = self
            .runtime
            .create_property_node_with(|node| Property::new(name, node, changes));
        tracing::trace!(property = name, node = %property.node(), "tracking property");

        self.tracked.insert(name.to_owned(), property.clone());
        property
    }

    /// The property called `name`, if it has been referenced.
    pub fn property(&self, name: &str) -> Option<Property<V>> {
        self.tracked.get(name).cloned()
    }

    /// Current value of `name`. `None` if undefined or never referenced.
    pub fn get(&self, name: &str) -> Option<V> {
        self.tracked.get(name).and_then(Property::get)
    }

    /// Write `value` to `name`, tracking it if needed.
    pub fn set(&mut self, name: &str, value: V) -> &mut Self {
        self.track(name).set(value);
        self
    }

    /// Names of all referenced properties, in the order they were first seen.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.tracked.keys().map(String::as_str)
    }

    /// Declare a public property with its default value.
    ///
    /// # Errors
    ///
    /// [`ModelError::Finalized`] once the model is finalized.
    pub fn add_public_property(
        &mut self,
        name: impl Into<String>,
        default: V,
    ) -> Result<&mut Self, ModelError> {
        let name = name.into();
        if self.finalized {
            return Err(ModelError::Finalized(name));
        }
        self.public.insert(name, default);
        Ok(self)
    }

    pub fn public_properties(&self) -> impl Iterator<Item = &str> {
        self.public.keys().map(String::as_str)
    }

    pub fn default_value(&self, name: &str) -> Option<&V> {
        self.public.get(name)
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Track every public property and set it to its default.
    ///
    /// # Errors
    ///
    /// [`ModelError::AlreadyFinalized`] on a second call.
    pub fn finalize(&mut self) -> Result<&mut Self, ModelError> {
        if self.finalized {
            return Err(ModelError::AlreadyFinalized);
        }
        self.finalized = true;

        self.reset_to_defaults();

        tracing::debug!(public = self.public.len(), "model finalized");
        Ok(self)
    }

    /// Snapshot the public properties.
    pub fn get_state(&self) -> State<V> {
        let mut state = State::new();
        for name in self.public.keys() {
            state.insert_raw(name.clone(), self.get(name));
        }
        state
    }

    /// Restore a snapshot.
    ///
    /// Every public property is first reset to its default, then each
    /// defined value in `state` is applied. Undefined entries keep the
    /// default instead of clearing the property: a finalized public
    /// property always holds a value.
    ///
    /// # Errors
    ///
    /// [`ModelError::NotFinalized`] before [`finalize`](Self::finalize);
    /// [`ModelError::UnknownProperty`] if `state` names a property that is
    /// not public. Nothing is written on error.
    pub fn set_state(&mut self, state: &State<V>) -> Result<&mut Self, ModelError> {
        if !self.finalized {
            return Err(ModelError::NotFinalized("set_state"));
        }
        if let Some(unknown) = state.names().find(|name| !self.public.contains_key(*name)) {
            return Err(ModelError::UnknownProperty(unknown.to_owned()));
        }

        self.reset_to_defaults();
        for (name, value) in state.iter() {
            if let Some(value) = value {
                self.track(name).set(value.clone());
            }
        }

        Ok(self)
    }

    /// Wire the derivations of `declaration` into the runtime.
    ///
    /// For each output, the inputs are tracked, then the function node is
    /// created, then the output is tracked, then the node is registered.
    ///
    /// # Errors
    ///
    /// [`ModelError::Parse`] if the declaration is malformed, in which case
    /// nothing is wired; [`ModelError::Graph`] if registration fails.
    pub fn react<I, K>(&mut self, declaration: I) -> Result<&mut Self, ModelError>
    where
        I: IntoIterator<Item = (K, Vec<Term<V>>)>,
        K: Into<String>,
    {
        for mut spec in FunctionSpec::parse(declaration)? {
            let inputs: Vec<_> = spec
                .inputs()
                .iter()
                .map(|name| self.track(name).node())
                .collect();
            spec.assign_inputs(inputs);

            self.runtime.create_function_node(&mut spec);

            let output = self.track(spec.output()).node();
            spec.assign_output(output);

            self.runtime.register_function(&spec)?;
        }
        Ok(self)
    }

    fn reset_to_defaults(&mut self) {
        let defaults: Vec<(String, V)> = self
            .public
            .iter()
            .map(|(name, default)| (name.clone(), default.clone()))
            .collect();
        for (name, default) in defaults {
            self.track(&name).set(default);
        }
    }
}

impl<V> fmt::Debug for Model<V>
where
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("public", &self.public)
            .field("tracked", &self.tracked.keys().collect::<Vec<_>>())
            .field("finalized", &self.finalized)
            .finish()
    }
}
