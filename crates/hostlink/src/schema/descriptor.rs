// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema artifact types.
//!
//! Every descriptor serializes to the exact JSON shape consumed by guest binding
//! generators: property descriptors are externally tagged by kind (`{"enum": {...}}`),
//! method descriptors are either native markers or reflected function records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

fn none_tag() -> String {
    "NONE".to_string()
}

// ---------------------------------------------------------------------------
// Common metadata
// ---------------------------------------------------------------------------

/// Boolean flags carried by every property descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFlags {
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_runtime: bool,
    #[serde(default)]
    pub is_output: bool,
    #[serde(default)]
    pub is_never_none: bool,
    #[serde(default)]
    pub is_argument_optional: bool,
}

/// Fields shared by all property kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCommon {
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Host type tag (`BOOLEAN`, `INT`, `FLOAT`, `STRING`, `ENUM`, `POINTER`, `COLLECTION`).
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default = "none_tag")]
    pub unit: String,
    #[serde(default = "none_tag")]
    pub subtype: String,
    #[serde(flatten)]
    pub flags: PropertyFlags,
}

impl PropertyCommon {
    /// Metadata with empty description and default flags.
    pub fn new(identifier: impl Into<String>, type_tag: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            name: identifier.clone(),
            identifier,
            description: String::new(),
            type_tag: type_tag.into(),
            unit: none_tag(),
            subtype: none_tag(),
            flags: PropertyFlags::default(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark as required (and therefore not optional as an argument).
    pub fn required(mut self, required: bool) -> Self {
        self.flags.is_required = required;
        self.flags.is_argument_optional = !required;
        self
    }
}

/// Hard and soft numeric limits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub hard_min: T,
    pub hard_max: T,
    pub soft_min: T,
    pub soft_max: T,
}

impl<T: Copy> Bounds<T> {
    /// Identical hard and soft limits.
    pub fn uniform(min: T, max: T) -> Self {
        Self {
            hard_min: min,
            hard_max: max,
            soft_min: min,
            soft_max: max,
        }
    }
}

/// Shape of an array-valued property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayShape<T> {
    pub default: Vec<T>,
    pub dimensions: Vec<u32>,
    pub length: u32,
}

// ---------------------------------------------------------------------------
// Kind-specific payloads
// ---------------------------------------------------------------------------

/// One enumeration item, in host order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub value: i64,
    #[serde(default)]
    pub description: String,
}

impl EnumItem {
    pub fn new(id: impl Into<String>, value: i64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            value,
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    #[serde(flatten)]
    pub common: PropertyCommon,
    pub items: Vec<EnumItem>,
}

/// Pointer or collection target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    #[serde(flatten)]
    pub common: PropertyCommon,
    /// Identifier of the referenced type node.
    pub fixed_type: String,
    /// Owning collection type (collections only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScalar<T> {
    #[serde(flatten)]
    pub common: PropertyCommon,
    #[serde(flatten)]
    pub bounds: Bounds<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericArray<T> {
    #[serde(flatten)]
    pub common: PropertyCommon,
    #[serde(flatten)]
    pub bounds: Bounds<T>,
    #[serde(flatten)]
    pub shape: ArrayShape<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolScalar {
    #[serde(flatten)]
    pub common: PropertyCommon,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolArray {
    #[serde(flatten)]
    pub common: PropertyCommon,
    #[serde(flatten)]
    pub shape: ArrayShape<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringDescriptor {
    #[serde(flatten)]
    pub common: PropertyCommon,
    #[serde(default)]
    pub length_max: u32,
    #[serde(default)]
    pub default: String,
}

// ---------------------------------------------------------------------------
// Property descriptor
// ---------------------------------------------------------------------------

/// Closed set of property kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyDescriptor {
    #[serde(rename = "enum")]
    Enum(EnumDescriptor),
    #[serde(rename = "collection")]
    Collection(ReferenceDescriptor),
    #[serde(rename = "pointer")]
    Pointer(ReferenceDescriptor),
    #[serde(rename = "float")]
    Float(NumericScalar<f64>),
    #[serde(rename = "float[]")]
    FloatArray(NumericArray<f64>),
    #[serde(rename = "int")]
    Int(NumericScalar<i64>),
    #[serde(rename = "int[]")]
    IntArray(NumericArray<i64>),
    #[serde(rename = "bool")]
    Bool(BoolScalar),
    #[serde(rename = "bool[]")]
    BoolArray(BoolArray),
    #[serde(rename = "string")]
    String(StringDescriptor),
}

impl PropertyDescriptor {
    /// Wire tag of this kind.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            Self::Enum(_) => "enum",
            Self::Collection(_) => "collection",
            Self::Pointer(_) => "pointer",
            Self::Float(_) => "float",
            Self::FloatArray(_) => "float[]",
            Self::Int(_) => "int",
            Self::IntArray(_) => "int[]",
            Self::Bool(_) => "bool",
            Self::BoolArray(_) => "bool[]",
            Self::String(_) => "string",
        }
    }

    pub fn common(&self) -> &PropertyCommon {
        match self {
            Self::Enum(d) => &d.common,
            Self::Collection(d) | Self::Pointer(d) => &d.common,
            Self::Float(d) => &d.common,
            Self::FloatArray(d) => &d.common,
            Self::Int(d) => &d.common,
            Self::IntArray(d) => &d.common,
            Self::Bool(d) => &d.common,
            Self::BoolArray(d) => &d.common,
            Self::String(d) => &d.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut PropertyCommon {
        match self {
            Self::Enum(d) => &mut d.common,
            Self::Collection(d) | Self::Pointer(d) => &mut d.common,
            Self::Float(d) => &mut d.common,
            Self::FloatArray(d) => &mut d.common,
            Self::Int(d) => &mut d.common,
            Self::IntArray(d) => &mut d.common,
            Self::Bool(d) => &mut d.common,
            Self::BoolArray(d) => &mut d.common,
            Self::String(d) => &mut d.common,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.common().identifier
    }

    /// Target reference for pointer and collection kinds.
    pub fn reference(&self) -> Option<&ReferenceDescriptor> {
        match self {
            Self::Collection(d) | Self::Pointer(d) => Some(d),
            _ => None,
        }
    }

    pub fn reference_mut(&mut self) -> Option<&mut ReferenceDescriptor> {
        match self {
            Self::Collection(d) | Self::Pointer(d) => Some(d),
            _ => None,
        }
    }

    /// Synthesized reference with empty description and default flags.
    pub fn synthetic_reference(
        identifier: impl Into<String>,
        fixed_type: impl Into<String>,
        collection: bool,
    ) -> Self {
        let tag = if collection { "COLLECTION" } else { "POINTER" };
        let reference = ReferenceDescriptor {
            common: PropertyCommon::new(identifier, tag),
            fixed_type: fixed_type.into(),
            collection: None,
        };
        if collection {
            Self::Collection(reference)
        } else {
            Self::Pointer(reference)
        }
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// Marker for reflected function records (`"type": "rna"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReflectedTag {
    #[serde(rename = "rna")]
    Rna,
}

/// Reflected function signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    #[serde(default)]
    pub description: String,
    /// First parameter is the implicit receiver.
    pub use_self: bool,
    #[serde(default)]
    pub use_self_type: bool,
    #[serde(default)]
    pub parameters: Vec<PropertyDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodDescriptor {
    Reflected {
        #[serde(rename = "type")]
        tag: ReflectedTag,
        item: FunctionDescriptor,
    },
    Native {
        /// Runtime type name of the callable.
        #[serde(rename = "type")]
        runtime_type: String,
    },
}

impl MethodDescriptor {
    pub fn native(runtime_type: impl Into<String>) -> Self {
        Self::Native {
            runtime_type: runtime_type.into(),
        }
    }

    pub fn reflected(item: FunctionDescriptor) -> Self {
        Self::Reflected {
            tag: ReflectedTag::Rna,
            item,
        }
    }

    pub fn function(&self) -> Option<&FunctionDescriptor> {
        match self {
            Self::Reflected { item, .. } => Some(item),
            Self::Native { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes and artifact
// ---------------------------------------------------------------------------

/// One class in the emitted hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeNode {
    pub name: String,
    pub parent: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDescriptor>,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodDescriptor>,
}

impl TypeNode {
    pub fn new(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: parent.into(),
            ..Default::default()
        }
    }

    /// Names defined both as a property and as a method.
    pub fn collisions(&self) -> Vec<&str> {
        self.properties
            .keys()
            .filter(|name| self.methods.contains_key(*name))
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorDescriptor {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<PropertyDescriptor>,
}

/// Namespace -> operator name -> descriptor.
pub type OperatorTable = BTreeMap<String, BTreeMap<String, OperatorDescriptor>>;

/// The complete schema artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub classes: Vec<TypeNode>,
    #[serde(default)]
    pub operators: OperatorTable,
}

impl Schema {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Find a class by name.
    pub fn class(&self, name: &str) -> Option<&TypeNode> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Set of emitted class names.
    pub fn class_names(&self) -> BTreeSet<&str> {
        self.classes.iter().map(|c| c.name.as_str()).collect()
    }

    /// Every pointer/collection descriptor with its owning class or operator namespace.
    pub fn references(&self) -> Vec<(&str, &ReferenceDescriptor)> {
        let mut out = Vec::new();
        for class in &self.classes {
            let owner = class.name.as_str();
            for prop in class.properties.values() {
                if let Some(r) = prop.reference() {
                    out.push((owner, r));
                }
            }
            for method in class.methods.values() {
                if let Some(function) = method.function() {
                    out.extend(function.parameters.iter().filter_map(|p| p.reference()).map(|r| (owner, r)));
                }
            }
        }
        for (namespace, ops) in &self.operators {
            for op in ops.values() {
                out.extend(
                    op.parameters
                        .iter()
                        .filter_map(|p| p.reference())
                        .map(|r| (namespace.as_str(), r)),
                );
            }
        }
        out
    }

    /// Mutable view over every pointer/collection descriptor.
    pub fn references_mut(&mut self) -> Vec<&mut ReferenceDescriptor> {
        let mut out = Vec::new();
        for class in &mut self.classes {
            out.extend(class.properties.values_mut().filter_map(|p| p.reference_mut()));
            for method in class.methods.values_mut() {
                if let MethodDescriptor::Reflected { item, .. } = method {
                    out.extend(item.parameters.iter_mut().filter_map(|p| p.reference_mut()));
                }
            }
        }
        for ops in self.operators.values_mut() {
            for op in ops.values_mut() {
                out.extend(op.parameters.iter_mut().filter_map(|p| p.reference_mut()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enum_descriptor_shape() {
        let desc = PropertyDescriptor::Enum(EnumDescriptor {
            common: PropertyCommon::new("color", "ENUM"),
            items: vec![EnumItem::new("RED", 0), EnumItem::new("GREEN", 1)],
        });
        let value = serde_json::to_value(&desc).unwrap();
        assert_eq!(value["enum"]["identifier"], "color");
        assert_eq!(value["enum"]["type"], "ENUM");
        assert_eq!(value["enum"]["unit"], "NONE");
        assert_eq!(value["enum"]["is_required"], false);
        assert_eq!(value["enum"]["items"][1]["id"], "GREEN");
        assert_eq!(value["enum"]["items"][1]["value"], 1);
    }

    #[test]
    fn test_array_tag_and_shape() {
        let desc = PropertyDescriptor::FloatArray(NumericArray {
            common: PropertyCommon::new("location", "FLOAT"),
            bounds: Bounds::uniform(-10.0, 10.0),
            shape: ArrayShape {
                default: vec![0.0, 0.0, 0.0],
                dimensions: vec![3],
                length: 3,
            },
        });
        let value = serde_json::to_value(&desc).unwrap();
        assert_eq!(value["float[]"]["length"], 3);
        assert_eq!(value["float[]"]["hard_max"], 10.0);

        let back: PropertyDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(back.kind_tag(), "float[]");
        assert_eq!(back, desc);
    }

    #[test]
    fn test_pointer_omits_collection_field() {
        let desc = PropertyDescriptor::synthetic_reference("scene", "Scene", false);
        let value = serde_json::to_value(&desc).unwrap();
        assert_eq!(value["pointer"]["fixed_type"], "Scene");
        assert!(value["pointer"].get("collection").is_none());
        assert_eq!(value["pointer"]["type"], "POINTER");
    }

    #[test]
    fn test_method_descriptor_variants() {
        let native: MethodDescriptor =
            serde_json::from_value(json!({"type": "method_descriptor"})).unwrap();
        assert_eq!(native, MethodDescriptor::native("method_descriptor"));

        let reflected: MethodDescriptor = serde_json::from_value(json!({
            "type": "rna",
            "item": {"description": "d", "use_self": true, "use_self_type": false, "parameters": []}
        }))
        .unwrap();
        assert!(reflected.function().is_some_and(|f| f.use_self));
    }

    #[test]
    fn test_collisions_and_references() {
        let mut node = TypeNode::new("RenderEngine", "bpy_struct");
        node.properties.insert(
            "render".into(),
            PropertyDescriptor::synthetic_reference("render", "RenderSettings", false),
        );
        node.methods.insert("render".into(), MethodDescriptor::native("function"));
        assert_eq!(node.collisions(), vec!["render"]);

        let mut schema = Schema {
            classes: vec![node],
            ..Default::default()
        };
        assert_eq!(schema.references().len(), 1);
        for r in schema.references_mut() {
            r.fixed_type = "bpy_struct".into();
        }
        assert_eq!(schema.references()[0].1.fixed_type, "bpy_struct");
    }
}
