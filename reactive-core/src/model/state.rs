//! State Snapshots
//!
//! A [`State`] maps each public property of a model to its value at the time
//! of the snapshot. Undefined properties are kept as `None` so restoring a
//! snapshot can tell "undefined" apart from "not mentioned".

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Public property values by name, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State<V> {
    values: IndexMap<String, Option<V>>,
}

impl<V> State<V> {
    pub fn new() -> Self {
        Self {
            values: IndexMap::new(),
        }
    }

    /// Set `name` to `value`.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> &mut Self {
        self.values.insert(name.into(), Some(value));
        self
    }

    /// Record `name` as present but undefined.
    pub fn insert_undefined(&mut self, name: impl Into<String>) -> &mut Self {
        self.values.insert(name.into(), None);
        self
    }

    /// The value of `name`, if present and defined.
    pub fn get(&self, name: &str) -> Option<&V> {
        self.values.get(name).and_then(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&V>)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn insert_raw(&mut self, name: String, value: Option<V>) {
        self.values.insert(name, value);
    }
}

impl<V: Serialize> State<V> {
    /// Encode as a JSON object. Undefined properties become `null`.
    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encode as MessagePack.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, StateError> {
        Ok(rmp_serde::to_vec(self)?)
    }
}

impl<V: DeserializeOwned> State<V> {
    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, StateError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl<V> Default for State<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for State<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), Some(value)))
                .collect(),
        }
    }
}
