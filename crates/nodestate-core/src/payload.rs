#![forbid(unsafe_code)]

//! Partial update payloads.
//!
//! A [`Payload`] names a subset of a node's fields together with their new
//! values. The same type carries inbound updates (node to store) and outbound
//! writes (store to node). Applying a payload touches only the keys it
//! contains; there is no way to express "remove this field" other than an
//! explicit [`Value::Null`].

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::Serialize;

use crate::error::{NodeStateError, Result};
use crate::value::Value;

/// Mapping from a subset of field names to new values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Payload {
    entries: BTreeMap<String, Value>,
}

impl Payload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set `field`, returning the value it replaced in this payload.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(field.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries.get(field)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Overlay `other` onto this payload; keys in `other` win.
    pub fn extend(&mut self, other: Payload) {
        self.entries.extend(other.entries);
    }

    /// Build a payload from a JSON object.
    ///
    /// # Errors
    ///
    /// Fails with [`NodeStateError::NotAnObject`] for non-object JSON and with
    /// [`NodeStateError::UnsupportedValue`] when a field is not a graph value.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(map) = json else {
            return Err(NodeStateError::NotAnObject {
                kind: json_kind(&json),
            });
        };
        let mut entries = BTreeMap::new();
        for (field, raw) in map {
            let value = Value::from_json(&field, raw)?;
            entries.insert(field, value);
        }
        Ok(Self { entries })
    }

    /// Build a payload from any serializable record.
    ///
    /// Fields that serialize to `null` are skipped, so a struct of `Option`s
    /// with only some members set yields a partial payload. Use
    /// [`Payload::insert`] with [`Value::Null`] to write an explicit null.
    ///
    /// # Errors
    ///
    /// Same as [`Payload::from_json`], plus serialization failures.
    pub fn from_serializable<T: Serialize + ?Sized>(record: &T) -> Result<Self> {
        let json = serde_json::to_value(record)?;
        let mut payload = Self::from_json(json)?;
        payload.entries.retain(|_, v| !v.is_null());
        Ok(payload)
    }

    /// JSON object form of this payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Payload {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Payload {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct TodoPatch {
        title: Option<String>,
        completed: Option<bool>,
    }

    #[test]
    fn builder_and_accessors() {
        let p = Payload::new().with("title", "Buy milk").with("completed", false);
        assert_eq!(p.len(), 2);
        assert_eq!(p.get("title").and_then(Value::as_str), Some("Buy milk"));
        assert!(p.contains("completed"));
        assert!(!p.contains("assigned"));
        assert_eq!(p.keys().collect::<Vec<_>>(), vec!["completed", "title"]);
    }

    #[test]
    fn from_json_requires_object() {
        let err = Payload::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, NodeStateError::NotAnObject { kind: "array" }));
    }

    #[test]
    fn from_json_reports_bad_field() {
        let err = Payload::from_json(json!({"ok": 1, "bad": [1]})).unwrap_err();
        assert!(matches!(
            err,
            NodeStateError::UnsupportedValue { ref field, .. } if field == "bad"
        ));
    }

    #[test]
    fn from_serializable_skips_unset_fields() {
        let patch = TodoPatch {
            title: None,
            completed: Some(true),
        };
        let p = Payload::from_serializable(&patch).unwrap();
        assert_eq!(p, Payload::new().with("completed", true));
    }

    #[test]
    fn explicit_null_survives_insert() {
        let mut p = Payload::new();
        p.insert("assigned", Value::Null);
        assert_eq!(p.get("assigned"), Some(&Value::Null));
    }

    #[test]
    fn extend_overlays() {
        let mut a = Payload::new().with("x", 1).with("y", 2);
        a.extend(Payload::new().with("y", 3));
        assert_eq!(a.get("y"), Some(&Value::Number(3.0)));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn to_json_round_trips_shape() {
        let p = Payload::new().with("n", 2).with("owner", Value::Link("u1".into()));
        assert_eq!(p.to_json(), json!({"n": 2, "owner": {"#": "u1"}}));
    }

    #[test]
    fn collect_from_pairs() {
        let p: Payload = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(p.len(), 2);
    }
}
