// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Values exchanged with the guest.
//!
//! Everything is JSON-compatible. Object references use the tagged shape
//! `{"@ptr": <handle>, "@type"?: <type identifier>}`.

use super::pointer::Handle;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Key carrying the handle of a tagged reference.
pub const PTR_KEY: &str = "@ptr";
/// Key carrying the runtime type of a tagged reference.
pub const TYPE_KEY: &str = "@type";

/// Recursive wire value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Sequence(Vec<WireValue>),
    Mapping(BTreeMap<String, WireValue>),
    Ref {
        handle: Handle,
        type_name: Option<String>,
    },
}

impl Default for WireValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl WireValue {
    /// The empty mapping `{}`.
    pub fn empty() -> Self {
        Self::Mapping(BTreeMap::new())
    }

    pub fn is_empty_mapping(&self) -> bool {
        matches!(self, Self::Mapping(m) if m.is_empty())
    }

    pub fn reference(handle: Handle, type_name: Option<String>) -> Self {
        Self::Ref { handle, type_name }
    }

    /// Field of a mapping.
    pub fn get(&self, key: &str) -> Option<&WireValue> {
        match self {
            Self::Mapping(m) => m.get(key),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Self::Ref { handle, .. } => Some(*handle),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[WireValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_string(&self) -> String {
        Value::from(self.clone()).to_string()
    }
}

impl From<Value> for WireValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                if let Some(ptr) = map.get(PTR_KEY) {
                    // Anything that is not a non-negative integer can never resolve.
                    let handle = ptr.as_u64().map_or(Handle::INVALID, Handle::from_raw);
                    let type_name = map.get(TYPE_KEY).and_then(Value::as_str).map(str::to_string);
                    Self::Ref { handle, type_name }
                } else {
                    Self::Mapping(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
                }
            }
        }
    }
}

impl From<WireValue> for Value {
    fn from(value: WireValue) -> Self {
        match value {
            WireValue::Null => Value::Null,
            WireValue::Bool(b) => Value::Bool(b),
            WireValue::Int(i) => Value::Number(i.into()),
            // JSON has no NaN or infinity.
            WireValue::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            WireValue::String(s) => Value::String(s),
            WireValue::Sequence(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            WireValue::Mapping(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
            WireValue::Ref { handle, type_name } => {
                let mut map = Map::new();
                map.insert(PTR_KEY.to_string(), Value::Number(handle.raw().into()));
                if let Some(t) = type_name {
                    map.insert(TYPE_KEY.to_string(), Value::String(t));
                }
                Value::Object(map)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_reference_parsing() {
        let wire: WireValue = serde_json::from_value(json!({"@ptr": 4294967296u64, "@type": "Object"})).unwrap();
        assert_eq!(
            wire,
            WireValue::Ref {
                handle: Handle::from_raw(1 << 32),
                type_name: Some("Object".into())
            }
        );

        let bare: WireValue = serde_json::from_value(json!({"@ptr": 9})).unwrap();
        assert_eq!(bare.as_handle(), Some(Handle::from_raw(9)));
    }

    #[test]
    fn test_malformed_ptr_is_invalid_handle() {
        for bad in [json!({"@ptr": "7"}), json!({"@ptr": -3}), json!({"@ptr": 1.5}), json!({"@ptr": null})] {
            let wire: WireValue = serde_json::from_value(bad).unwrap();
            assert_eq!(wire.as_handle(), Some(Handle::INVALID));
        }
    }

    #[test]
    fn test_serialize_shapes() {
        let wire = WireValue::Sequence(vec![
            WireValue::Ref {
                handle: Handle::from_raw(5),
                type_name: None,
            },
            WireValue::Float(f64::NAN),
            WireValue::empty(),
        ]);
        assert_eq!(serde_json::to_value(&wire).unwrap(), json!([{"@ptr": 5}, null, {}]));
    }

    #[test]
    fn test_nested_mapping() {
        let wire = WireValue::from_json_str(r#"{"self": {"@ptr": 1}, "args": [1, 2.5, "x"], "kwargs": {}}"#).unwrap();
        assert_eq!(wire.get("self").and_then(WireValue::as_handle), Some(Handle::from_raw(1)));
        assert_eq!(wire.get("args").and_then(WireValue::as_sequence).map(<[_]>::len), Some(3));
        assert!(wire.get("kwargs").is_some_and(WireValue::is_empty_mapping));
    }
}
