// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Property classification.
//!
//! Maps one reflected property onto the closed [`PropertyDescriptor`] set. Pointer and
//! collection targets are recorded in [`PendingReferences`] because their target types
//! may not have been visited yet.

use super::descriptor::{
    ArrayShape, BoolArray, BoolScalar, EnumDescriptor, FunctionDescriptor, NumericArray,
    NumericScalar, PropertyCommon, PropertyDescriptor, ReferenceDescriptor, StringDescriptor,
};
use super::reflect::{FunctionHandle, PropertyHandle};
use super::SchemaError;

/// Host reflection classes the classifier understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReflectedKind {
    Enum,
    Collection,
    Pointer,
    Float,
    Int,
    Bool,
    String,
}

impl ReflectedKind {
    /// Resolve a host reflection class name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "EnumProperty" => Some(Self::Enum),
            "CollectionProperty" => Some(Self::Collection),
            "PointerProperty" => Some(Self::Pointer),
            "FloatProperty" => Some(Self::Float),
            "IntProperty" => Some(Self::Int),
            "BoolProperty" => Some(Self::Bool),
            "StringProperty" => Some(Self::String),
            _ => None,
        }
    }
}

/// A pointer/collection target recorded during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    /// Class or operator that declares the reference.
    pub owner: String,
    pub property: String,
    pub fixed_type: String,
}

/// References awaiting the fixup pass.
#[derive(Debug, Clone, Default)]
pub struct PendingReferences {
    entries: Vec<PendingReference>,
}

impl PendingReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, owner: &str, property: &str, fixed_type: &str) {
        self.entries.push(PendingReference {
            owner: owner.to_string(),
            property: property.to_string(),
            fixed_type: fixed_type.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingReference> {
        self.entries.iter()
    }
}

fn common(prop: &dyn PropertyHandle) -> PropertyCommon {
    PropertyCommon {
        identifier: prop.identifier().to_string(),
        name: prop.name().to_string(),
        description: prop.description().to_string(),
        type_tag: prop.type_tag().to_string(),
        unit: prop.unit().to_string(),
        subtype: prop.subtype().to_string(),
        flags: prop.flags(),
    }
}

fn shape<T>(prop: &dyn PropertyHandle, default: Vec<T>) -> ArrayShape<T> {
    ArrayShape {
        default,
        dimensions: prop.array_dimensions(),
        length: prop.array_length(),
    }
}

/// Classify one property of `owner`.
///
/// Fails with [`SchemaError::UnexpectedKind`] when the host reports a reflection class
/// outside the known set.
pub fn classify(
    owner: &str,
    prop: &dyn PropertyHandle,
    pending: &mut PendingReferences,
) -> Result<PropertyDescriptor, SchemaError> {
    let kind = ReflectedKind::from_name(prop.kind()).ok_or_else(|| SchemaError::UnexpectedKind {
        owner: owner.to_string(),
        property: prop.identifier().to_string(),
        kind: prop.kind().to_string(),
    })?;
    let common = common(prop);

    let descriptor = match kind {
        ReflectedKind::Enum => PropertyDescriptor::Enum(EnumDescriptor {
            common,
            items: prop.enum_items_static(),
        }),
        ReflectedKind::Collection | ReflectedKind::Pointer => {
            let fixed_type = prop.fixed_type().unwrap_or_default().to_string();
            pending.record(owner, &common.identifier, &fixed_type);
            if kind == ReflectedKind::Collection {
                PropertyDescriptor::Collection(ReferenceDescriptor {
                    common,
                    fixed_type,
                    collection: prop.owning_collection().map(str::to_string),
                })
            } else {
                PropertyDescriptor::Pointer(ReferenceDescriptor {
                    common,
                    fixed_type,
                    collection: None,
                })
            }
        }
        ReflectedKind::Float if prop.is_array() => PropertyDescriptor::FloatArray(NumericArray {
            common,
            bounds: prop.float_bounds(),
            shape: shape(prop, prop.default_float_array()),
        }),
        ReflectedKind::Float => PropertyDescriptor::Float(NumericScalar {
            common,
            bounds: prop.float_bounds(),
            default: Some(prop.default_float()),
        }),
        ReflectedKind::Int if prop.is_array() => PropertyDescriptor::IntArray(NumericArray {
            common,
            bounds: prop.int_bounds(),
            shape: shape(prop, prop.default_int_array()),
        }),
        ReflectedKind::Int => PropertyDescriptor::Int(NumericScalar {
            common,
            bounds: prop.int_bounds(),
            default: Some(prop.default_int()),
        }),
        ReflectedKind::Bool if prop.is_array() => PropertyDescriptor::BoolArray(BoolArray {
            common,
            shape: shape(prop, prop.default_bool_array()),
        }),
        ReflectedKind::Bool => PropertyDescriptor::Bool(BoolScalar {
            common,
            default: prop.default_bool(),
        }),
        ReflectedKind::String => PropertyDescriptor::String(StringDescriptor {
            common,
            length_max: prop.length_max(),
            default: prop.default_string(),
        }),
    };

    Ok(descriptor)
}

/// Describe a reflected function; parameters go through [`classify`].
pub fn describe_function(
    owner: &str,
    function: &dyn FunctionHandle,
    pending: &mut PendingReferences,
) -> Result<FunctionDescriptor, SchemaError> {
    let parameters = function
        .parameters()
        .into_iter()
        .map(|p| classify(owner, p, pending))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FunctionDescriptor {
        description: function.description().to_string(),
        use_self: function.use_self(),
        use_self_type: function.use_self_type(),
        parameters,
    })
}
