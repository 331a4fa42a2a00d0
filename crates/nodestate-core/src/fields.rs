#![forbid(unsafe_code)]

//! The field map held by a node-bound store.
//!
//! [`Fields`] is backed by a persistent ordered map, so cloning is O(1) and
//! clones share structure with the original. Snapshots of a bound store are
//! therefore cheap to take and never observe later mutations.
//!
//! # Invariants
//!
//! 1. [`Fields::merge`] writes every key of the payload and nothing else.
//! 2. Merging the same payload twice leaves the map equal to merging it once.
//! 3. A freshly constructed map is empty; no field has a default value.

use im::OrdMap;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::payload::Payload;
use crate::value::Value;

/// Structurally shared map from field name to value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields {
    map: OrdMap<String, Value>,
}

impl Fields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-write-wins merge at field granularity.
    ///
    /// Returns the number of fields whose value actually changed.
    pub fn merge(&mut self, payload: &Payload) -> usize {
        let mut changed = 0;
        for (field, value) in payload {
            if self.map.get(field) != Some(value) {
                self.map.insert(field.clone(), value.clone());
                changed += 1;
            }
        }
        changed
    }

    /// Set a single field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.map.insert(field.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.map.get(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.map.contains_key(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.map.iter()
    }

    /// JSON object form of the current fields.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.map
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Decode the fields into a typed record.
    ///
    /// Record fields that may not have arrived yet should be `Option` or carry
    /// `#[serde(default)]`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeStateError::Decode`](crate::NodeStateError::Decode) when
    /// the fields do not fit `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl From<Payload> for Fields {
    fn from(payload: Payload) -> Self {
        Self {
            map: payload.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = (&'a String, &'a Value);
    type IntoIter = im::ordmap::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.map.iter()
    }
}
