// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Serialized host reflection dump.
//!
//! A host writes a [`HostSnapshot`] as JSON once; extraction then runs against the dump
//! without the host being alive. The builders double as test fixtures.

use super::descriptor::{Bounds, EnumItem, PropertyFlags};
use super::reflect::{
    Attribute, FunctionHandle, OperatorHandle, OperatorNamespaceHandle, PropertyHandle,
    ReflectionSource, StructHandle, TypeHandle,
};
use super::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

fn none_tag() -> String {
    "NONE".to_string()
}

/// Full reflection dump of a host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostSnapshot {
    #[serde(default)]
    pub types: Vec<TypeSnapshot>,
    #[serde(default)]
    pub operators: Vec<NamespaceSnapshot>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl HostSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON dump.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut snapshot: Self = serde_json::from_str(json)?;
        snapshot.reindex();
        Ok(snapshot)
    }

    /// Load a JSON dump from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    pub fn with_type(mut self, ty: TypeSnapshot) -> Self {
        self.index.insert(ty.identifier.clone(), self.types.len());
        self.types.push(ty);
        self
    }

    pub fn with_namespace(mut self, namespace: NamespaceSnapshot) -> Self {
        self.operators.push(namespace);
        self
    }

    fn reindex(&mut self) {
        self.index = self
            .types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.identifier.clone(), i))
            .collect();
    }
}

impl ReflectionSource for HostSnapshot {
    fn types(&self) -> Vec<&dyn TypeHandle> {
        self.types.iter().map(|t| t as &dyn TypeHandle).collect()
    }

    fn lookup(&self, identifier: &str) -> Option<&dyn TypeHandle> {
        match self.index.get(identifier) {
            Some(&i) => self.types.get(i).map(|t| t as &dyn TypeHandle),
            // Not built through `with_type`/`from_json` (e.g. direct deserialization).
            None => self
                .types
                .iter()
                .find(|t| t.identifier == identifier)
                .map(|t| t as &dyn TypeHandle),
        }
    }

    fn operator_namespaces(&self) -> Vec<&dyn OperatorNamespaceHandle> {
        self.operators
            .iter()
            .map(|n| n as &dyn OperatorNamespaceHandle)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    pub name: String,
    pub runtime_type: String,
    #[serde(default)]
    pub callable: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeSnapshot {
    pub identifier: String,
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeSnapshot>,
    #[serde(default)]
    pub reflection: Option<StructSnapshot>,
}

impl TypeSnapshot {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Callable entry of the type's own namespace.
    pub fn native_method(mut self, name: impl Into<String>, runtime_type: impl Into<String>) -> Self {
        self.attributes.push(AttributeSnapshot {
            name: name.into(),
            runtime_type: runtime_type.into(),
            callable: true,
        });
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, runtime_type: impl Into<String>) -> Self {
        self.attributes.push(AttributeSnapshot {
            name: name.into(),
            runtime_type: runtime_type.into(),
            callable: false,
        });
        self
    }

    pub fn property(mut self, property: PropertySnapshot) -> Self {
        self.reflection
            .get_or_insert_with(StructSnapshot::default)
            .properties
            .push(property);
        self
    }

    pub fn function(mut self, function: FunctionSnapshot) -> Self {
        self.reflection
            .get_or_insert_with(StructSnapshot::default)
            .functions
            .push(function);
        self
    }
}

impl TypeHandle for TypeSnapshot {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn bases(&self) -> Vec<&str> {
        self.bases.iter().map(String::as_str).collect()
    }

    fn attributes(&self) -> Vec<Attribute> {
        self.attributes
            .iter()
            .map(|a| Attribute {
                name: a.name.clone(),
                runtime_type: a.runtime_type.clone(),
                callable: a.callable,
            })
            .collect()
    }

    fn reflection(&self) -> Option<&dyn StructHandle> {
        self.reflection.as_ref().map(|s| s as &dyn StructHandle)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructSnapshot {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Vec<PropertySnapshot>,
    #[serde(default)]
    pub functions: Vec<FunctionSnapshot>,
}

impl StructHandle for StructSnapshot {
    fn description(&self) -> &str {
        &self.description
    }

    fn properties(&self) -> Vec<&dyn PropertyHandle> {
        self.properties
            .iter()
            .map(|p| p as &dyn PropertyHandle)
            .collect()
    }

    fn functions(&self) -> Vec<&dyn FunctionHandle> {
        self.functions
            .iter()
            .map(|f| f as &dyn FunctionHandle)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionSnapshot {
    pub identifier: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub use_self: bool,
    #[serde(default)]
    pub use_self_type: bool,
    #[serde(default)]
    pub parameters: Vec<PropertySnapshot>,
}

impl FunctionSnapshot {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Default::default()
        }
    }

    pub fn with_self(mut self) -> Self {
        self.use_self = true;
        self
    }

    pub fn parameter(mut self, parameter: PropertySnapshot) -> Self {
        self.parameters.push(parameter);
        self
    }
}

impl FunctionHandle for FunctionSnapshot {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn use_self(&self) -> bool {
        self.use_self
    }

    fn use_self_type(&self) -> bool {
        self.use_self_type
    }

    fn parameters(&self) -> Vec<&dyn PropertyHandle> {
        self.parameters
            .iter()
            .map(|p| p as &dyn PropertyHandle)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Raw reflected property.
///
/// Numeric bounds are stored as `f64` for both float and int kinds; host integer
/// properties are 32-bit so the conversion is exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySnapshot {
    pub kind: String,
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default)]
    pub type_tag: String,
    #[serde(default = "none_tag")]
    pub unit: String,
    #[serde(default = "none_tag")]
    pub subtype: String,
    #[serde(flatten)]
    pub flags: PropertyFlags,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub array_dimensions: Vec<u32>,
    #[serde(default)]
    pub array_length: u32,
    #[serde(default)]
    pub hard_min: f64,
    #[serde(default)]
    pub hard_max: f64,
    #[serde(default)]
    pub soft_min: f64,
    #[serde(default)]
    pub soft_max: f64,
    #[serde(default)]
    pub default: Value,
    #[serde(default)]
    pub length_max: u32,
    #[serde(default)]
    pub fixed_type: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub enum_items: Vec<EnumItem>,
}

impl PropertySnapshot {
    pub fn new(kind: impl Into<String>, identifier: impl Into<String>, type_tag: &str) -> Self {
        let identifier = identifier.into();
        Self {
            kind: kind.into(),
            name: identifier.clone(),
            identifier,
            description: String::new(),
            type_tag: type_tag.to_string(),
            unit: none_tag(),
            subtype: none_tag(),
            flags: PropertyFlags::default(),
            is_array: false,
            array_dimensions: Vec::new(),
            array_length: 0,
            hard_min: 0.0,
            hard_max: 0.0,
            soft_min: 0.0,
            soft_max: 0.0,
            default: Value::Null,
            length_max: 0,
            fixed_type: None,
            collection: None,
            enum_items: Vec::new(),
        }
    }

    /// Enum with items numbered in order.
    pub fn enumeration(identifier: impl Into<String>, items: &[&str]) -> Self {
        let mut prop = Self::new("EnumProperty", identifier, "ENUM");
        prop.enum_items = items
            .iter()
            .zip(0i64..)
            .map(|(id, value)| EnumItem::new(*id, value))
            .collect();
        prop
    }

    pub fn pointer(identifier: impl Into<String>, target: impl Into<String>) -> Self {
        let mut prop = Self::new("PointerProperty", identifier, "POINTER");
        prop.fixed_type = Some(target.into());
        prop
    }

    pub fn collection(identifier: impl Into<String>, target: impl Into<String>) -> Self {
        let mut prop = Self::new("CollectionProperty", identifier, "COLLECTION");
        prop.fixed_type = Some(target.into());
        prop
    }

    pub fn float(identifier: impl Into<String>) -> Self {
        Self::new("FloatProperty", identifier, "FLOAT")
    }

    pub fn int(identifier: impl Into<String>) -> Self {
        Self::new("IntProperty", identifier, "INT")
    }

    pub fn boolean(identifier: impl Into<String>) -> Self {
        Self::new("BoolProperty", identifier, "BOOLEAN")
    }

    pub fn string(identifier: impl Into<String>) -> Self {
        Self::new("StringProperty", identifier, "STRING")
    }

    /// One-dimensional array of `length` elements.
    pub fn array(mut self, length: u32) -> Self {
        self.is_array = true;
        self.array_length = length;
        self.array_dimensions = vec![length];
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.hard_min = min;
        self.hard_max = max;
        self.soft_min = min;
        self.soft_max = max;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = default;
        self
    }

    pub fn owned_by(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.flags.is_required = true;
        self
    }

    fn default_array<T>(&self, convert: impl Fn(&Value) -> Option<T>) -> Vec<T> {
        match &self.default {
            Value::Array(items) => items.iter().filter_map(convert).collect(),
            _ => Vec::new(),
        }
    }
}

impl PropertyHandle for PropertySnapshot {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    fn subtype(&self) -> &str {
        &self.subtype
    }

    fn flags(&self) -> PropertyFlags {
        self.flags
    }

    fn is_array(&self) -> bool {
        self.is_array
    }

    fn array_dimensions(&self) -> Vec<u32> {
        self.array_dimensions.clone()
    }

    fn array_length(&self) -> u32 {
        self.array_length
    }

    fn float_bounds(&self) -> Bounds<f64> {
        Bounds {
            hard_min: self.hard_min,
            hard_max: self.hard_max,
            soft_min: self.soft_min,
            soft_max: self.soft_max,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn int_bounds(&self) -> Bounds<i64> {
        Bounds {
            hard_min: self.hard_min as i64,
            hard_max: self.hard_max as i64,
            soft_min: self.soft_min as i64,
            soft_max: self.soft_max as i64,
        }
    }

    fn default_float(&self) -> f64 {
        self.default.as_f64().unwrap_or_default()
    }

    fn default_float_array(&self) -> Vec<f64> {
        self.default_array(Value::as_f64)
    }

    fn default_int(&self) -> i64 {
        self.default.as_i64().unwrap_or_default()
    }

    fn default_int_array(&self) -> Vec<i64> {
        self.default_array(Value::as_i64)
    }

    fn default_bool(&self) -> bool {
        self.default.as_bool().unwrap_or_default()
    }

    fn default_bool_array(&self) -> Vec<bool> {
        self.default_array(Value::as_bool)
    }

    fn default_string(&self) -> String {
        self.default.as_str().unwrap_or_default().to_string()
    }

    fn length_max(&self) -> u32 {
        self.length_max
    }

    fn fixed_type(&self) -> Option<&str> {
        self.fixed_type.as_deref()
    }

    fn owning_collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    fn enum_items_static(&self) -> Vec<EnumItem> {
        self.enum_items.clone()
    }
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceSnapshot {
    pub name: String,
    #[serde(default)]
    pub operators: Vec<OperatorSnapshot>,
}

impl NamespaceSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operators: Vec::new(),
        }
    }

    pub fn operator(mut self, operator: OperatorSnapshot) -> Self {
        self.operators.push(operator);
        self
    }
}

impl OperatorNamespaceHandle for NamespaceSnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn operators(&self) -> Vec<&dyn OperatorHandle> {
        self.operators
            .iter()
            .map(|o| o as &dyn OperatorHandle)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorSnapshot {
    pub name: String,
    #[serde(default)]
    pub parameters: Option<StructSnapshot>,
}

impl OperatorSnapshot {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Some(StructSnapshot {
                description: description.into(),
                ..Default::default()
            }),
        }
    }

    /// Operator without reflection data.
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: None,
        }
    }

    pub fn parameter(mut self, parameter: PropertySnapshot) -> Self {
        self.parameters
            .get_or_insert_with(StructSnapshot::default)
            .properties
            .push(parameter);
        self
    }
}

impl OperatorHandle for OperatorSnapshot {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Option<&dyn StructHandle> {
        self.parameters.as_ref().map(|s| s as &dyn StructHandle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_from_json() {
        let json = json!({
            "types": [
                {"identifier": "bpy_struct", "bases": ["object"]},
                {"identifier": "ID", "bases": ["bpy_struct"], "reflection": {
                    "properties": [
                        {"kind": "StringProperty", "identifier": "name", "type": "STRING",
                         "length_max": 64, "default": "", "is_required": true}
                    ]
                }}
            ],
            "operators": [
                {"name": "object", "operators": [{"name": "delete"}]}
            ]
        });
        let snapshot = HostSnapshot::from_json(&json.to_string()).unwrap();
        let id = snapshot.lookup("ID").unwrap();
        assert_eq!(id.bases(), vec!["bpy_struct"]);

        let props = id.reflection().unwrap().properties();
        assert_eq!(props[0].kind(), "StringProperty");
        assert_eq!(props[0].length_max(), 64);
        assert!(props[0].flags().is_required);
        assert_eq!(props[0].unit(), "NONE");

        let namespaces = snapshot.operator_namespaces();
        assert_eq!(namespaces[0].operators()[0].name(), "delete");
        assert!(namespaces[0].operators()[0].parameters().is_none());
    }

    #[test]
    fn test_builder_defaults() {
        let prop = PropertySnapshot::int("frames")
            .array(2)
            .bounds(-5.0, 5.0)
            .with_default(json!([1, 2]));
        assert_eq!(prop.int_bounds().hard_min, -5);
        assert_eq!(prop.default_int_array(), vec![1, 2]);
        assert_eq!(prop.array_dimensions(), vec![2]);

        let color = PropertySnapshot::enumeration("color", &["RED", "GREEN"]);
        let items = color.enum_items_static();
        assert_eq!(items[1].value, 1);
        assert!(color.enum_items_dynamic().is_none());
    }

    #[test]
    fn test_lookup_without_index() {
        let snapshot = HostSnapshot {
            types: vec![TypeSnapshot::new("Mesh")],
            ..Default::default()
        };
        assert!(snapshot.lookup("Mesh").is_some());
        assert!(snapshot.lookup("Curve").is_none());
    }
}
