#![forbid(unsafe_code)]

//! Scalar field values stored on graph nodes.
//!
//! A graph node is a flat record: every field holds a scalar or a link to
//! another node. Arrays and nested objects are not representable; the graph
//! engine expresses nesting through links instead.
//!
//! # JSON mapping
//!
//! | `Value`        | JSON                 |
//! |----------------|----------------------|
//! | `Null`         | `null`               |
//! | `Bool(b)`      | `true` / `false`     |
//! | `Number(n)`    | number               |
//! | `Text(s)`      | string               |
//! | `Link(id)`     | `{"#": "<id>"}`      |
//!
//! Integral numbers are emitted as JSON integers so typed views can decode
//! them into integer fields.

use core::fmt;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::NodeStateError;

/// Key used by the graph wire format to mark a link object.
pub const LINK_KEY: &str = "#";

/// A single field value on a graph node.
///
/// Equality treats every NaN as equal to every other NaN, so a stored NaN
/// compares equal to itself when the same payload is merged again.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Reference to another node by id.
    Link(String),
}

impl Value {
    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Link(_) => "link",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_link(&self) -> Option<&str> {
        match self {
            Self::Link(id) => Some(id),
            _ => None,
        }
    }

    /// Convert a JSON value into a field value for `field`.
    ///
    /// `field` only labels the error when the JSON shape is not a graph value.
    pub fn from_json(field: &str, json: serde_json::Value) -> Result<Self, NodeStateError> {
        let unsupported = |kind| NodeStateError::UnsupportedValue {
            field: field.to_owned(),
            kind,
        };
        match json {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number).ok_or(unsupported("number")),
            serde_json::Value::String(s) => Ok(Self::Text(s)),
            serde_json::Value::Array(_) => Err(unsupported("array")),
            serde_json::Value::Object(mut map) => {
                if map.len() == 1 {
                    if let Some(serde_json::Value::String(id)) = map.remove(LINK_KEY) {
                        return Ok(Self::Link(id));
                    }
                }
                Err(unsupported("object"))
            }
        }
    }

    /// JSON form of this value (see the module table).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Link(id) => {
                let mut map = serde_json::Map::with_capacity(1);
                map.insert(LINK_KEY.to_owned(), serde_json::Value::String(id.clone()));
                serde_json::Value::Object(map)
            }
        }
    }
}

fn integral(n: f64) -> Option<i64> {
    // 2^53: past this point not every integer is representable in f64.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    (n.fract() == 0.0 && n.abs() <= MAX_EXACT).then_some(n as i64)
}

fn number_to_json(n: f64) -> serde_json::Value {
    match integral(n) {
        Some(i) => serde_json::Value::from(i),
        // NaN and infinities have no JSON form.
        None => serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, Into::into),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => match integral(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Self::Text(s) => serializer.serialize_str(s),
            Self::Link(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(LINK_KEY, id)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Self::from_json("<value>", json).map_err(D::Error::custom)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Link(id) => write!(f, "#{id}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Text(a), Self::Text(b)) | (Self::Link(a), Self::Link(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nan_equals_itself() {
        let nan = Value::Number(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(Value::Number(0.0), Value::Number(-0.0));
        assert_ne!(Value::Number(f64::NAN), Value::Number(1.0));
        assert_ne!(Value::Text("a".into()), Value::Link("a".into()));
    }

    #[test]
    fn scalars_from_json() {
        assert_eq!(Value::from_json("a", json!(null)).unwrap(), Value::Null);
        assert_eq!(Value::from_json("a", json!(true)).unwrap(), Value::Bool(true));
        assert_eq!(Value::from_json("a", json!(2.5)).unwrap(), Value::Number(2.5));
        assert_eq!(
            Value::from_json("a", json!("hi")).unwrap(),
            Value::Text("hi".into())
        );
    }

    #[test]
    fn link_object_becomes_link() {
        let v = Value::from_json("owner", json!({"#": "user/alex"})).unwrap();
        assert_eq!(v, Value::Link("user/alex".into()));
        assert_eq!(v.to_json(), json!({"#": "user/alex"}));
    }

    #[test]
    fn arrays_and_objects_rejected() {
        let err = Value::from_json("tags", json!(["a", "b"])).unwrap_err();
        assert!(matches!(
            err,
            NodeStateError::UnsupportedValue { ref field, kind: "array" } if field == "tags"
        ));

        let err = Value::from_json("meta", json!({"x": 1})).unwrap_err();
        assert!(matches!(err, NodeStateError::UnsupportedValue { kind: "object", .. }));
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        assert_eq!(Value::Number(3.0).to_json(), json!(3));
        assert_eq!(serde_json::to_string(&Value::Number(3.0)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&Value::Number(0.5)).unwrap(), "0.5");
    }

    #[test]
    fn non_finite_numbers_map_to_null_json() {
        assert_eq!(Value::Number(f64::NAN).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn deserialize_via_serde() {
        let v: Value = serde_json::from_str(r##"{"#":"n1"}"##).unwrap();
        assert_eq!(v.as_link(), Some("n1"));
        assert!(serde_json::from_str::<Value>("[1]").is_err());
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from("x"), Value::Text("x".into()));
        assert_eq!(Value::from(7), Value::Number(7.0));
        assert_eq!(Value::from(None::<bool>), Value::Null);
        assert_eq!(Value::from(Some(true)).as_bool(), Some(true));
    }

    #[test]
    fn display() {
        assert_eq!(Value::Text("a".into()).to_string(), "\"a\"");
        assert_eq!(Value::Link("n".into()).to_string(), "#n");
        assert_eq!(Value::Null.to_string(), "null");
    }
}
