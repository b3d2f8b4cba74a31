// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host reflection interface.
//!
//! Schema extraction reaches the host only through these traits. A live host implements
//! them over its own reflection API; [`HostSnapshot`](super::snapshot::HostSnapshot)
//! implements them over a serialized dump.

use super::descriptor::{Bounds, EnumItem, PropertyFlags};

/// Enumerates the reflectable types and operator namespaces of a host.
pub trait ReflectionSource {
    /// Every reflectable type, in host enumeration order.
    fn types(&self) -> Vec<&dyn TypeHandle>;

    /// Look up a type by identifier.
    fn lookup(&self, identifier: &str) -> Option<&dyn TypeHandle>;

    /// Registered operator namespaces.
    fn operator_namespaces(&self) -> Vec<&dyn OperatorNamespaceHandle>;
}

/// Entry of a type's own namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Runtime type name of the value (e.g. `method_descriptor`).
    pub runtime_type: String,
    pub callable: bool,
}

/// One reflectable type.
pub trait TypeHandle {
    fn identifier(&self) -> &str;

    /// Immediate base type identifiers, in declaration order.
    fn bases(&self) -> Vec<&str>;

    /// Entries defined directly on the type (not inherited).
    fn attributes(&self) -> Vec<Attribute> {
        Vec::new()
    }

    /// Reflected struct, when the type carries reflection data.
    fn reflection(&self) -> Option<&dyn StructHandle>;
}

/// Reflected struct: properties and functions.
pub trait StructHandle {
    fn description(&self) -> &str {
        ""
    }

    /// Properties of the type. Hosts may report only the type's own entries; the
    /// extractor carries base-class properties down the hierarchy itself.
    fn properties(&self) -> Vec<&dyn PropertyHandle>;

    fn functions(&self) -> Vec<&dyn FunctionHandle> {
        Vec::new()
    }
}

/// Reflected function.
pub trait FunctionHandle {
    fn identifier(&self) -> &str;
    fn description(&self) -> &str;
    fn use_self(&self) -> bool;
    fn use_self_type(&self) -> bool;
    fn parameters(&self) -> Vec<&dyn PropertyHandle>;
}

/// Reflected property.
///
/// Accessors that do not apply to a kind keep their defaults; the classifier only reads
/// what the kind reported by [`kind`](Self::kind) needs.
pub trait PropertyHandle {
    /// Host reflection class name (`EnumProperty`, `PointerProperty`, ...).
    fn kind(&self) -> &str;

    fn identifier(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn type_tag(&self) -> &str;
    fn unit(&self) -> &str;
    fn subtype(&self) -> &str;
    fn flags(&self) -> PropertyFlags;

    fn is_array(&self) -> bool {
        false
    }

    fn array_dimensions(&self) -> Vec<u32> {
        Vec::new()
    }

    fn array_length(&self) -> u32 {
        0
    }

    fn float_bounds(&self) -> Bounds<f64> {
        Bounds::default()
    }

    fn int_bounds(&self) -> Bounds<i64> {
        Bounds::default()
    }

    fn default_float(&self) -> f64 {
        0.0
    }

    fn default_float_array(&self) -> Vec<f64> {
        Vec::new()
    }

    fn default_int(&self) -> i64 {
        0
    }

    fn default_int_array(&self) -> Vec<i64> {
        Vec::new()
    }

    fn default_bool(&self) -> bool {
        false
    }

    fn default_bool_array(&self) -> Vec<bool> {
        Vec::new()
    }

    fn default_string(&self) -> String {
        String::new()
    }

    fn length_max(&self) -> u32 {
        0
    }

    /// Target type of a pointer or collection.
    fn fixed_type(&self) -> Option<&str> {
        None
    }

    /// Owning collection type of a collection property.
    fn owning_collection(&self) -> Option<&str> {
        None
    }

    /// Items known without an evaluation context.
    fn enum_items_static(&self) -> Vec<EnumItem> {
        Vec::new()
    }

    /// Context-dependent items. Only valid inside a live evaluation context, so
    /// extraction never calls it.
    fn enum_items_dynamic(&self) -> Option<Vec<EnumItem>> {
        None
    }
}

/// Operator namespace (`object`, `mesh`, ...).
pub trait OperatorNamespaceHandle {
    fn name(&self) -> &str;
    fn operators(&self) -> Vec<&dyn OperatorHandle>;
}

/// One registered operator.
pub trait OperatorHandle {
    fn name(&self) -> &str;

    /// Reflected parameter struct; `None` when the operator has no reflection data.
    fn parameters(&self) -> Option<&dyn StructHandle>;
}
