// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host object model as seen by the bridge.

use super::pointer::Handle;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by host implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("no attribute `{0}`")]
    UnknownAttribute(String),

    #[error("attribute `{0}` is read-only")]
    ReadOnly(String),

    #[error("attribute `{attribute}` expects {expected}")]
    TypeMismatch { attribute: String, expected: String },

    #[error("{0}")]
    Failed(String),
}

/// A live host object.
///
/// Objects are shared as `Arc<dyn HostObject>`; the bridge only ever keeps `Weak`
/// references, so the host decides when an object dies.
pub trait HostObject: Send + Sync {
    /// Runtime type identifier (`Object`, `Mesh`, ...).
    fn type_identifier(&self) -> &str;

    /// Read an attribute. Methods are attributes holding [`HostValue::Callable`].
    fn get_attr(&self, name: &str) -> Option<HostValue>;

    fn set_attr(&self, name: &str, value: HostValue) -> Result<(), HostError>;

    /// Members when the object is a collection of objects.
    fn members(&self) -> Option<Vec<Arc<dyn HostObject>>> {
        None
    }
}

/// Something the guest can call.
pub trait HostCallable: Send + Sync {
    fn call(
        &self,
        args: Vec<HostValue>,
        kwargs: BTreeMap<String, HostValue>,
    ) -> Result<HostValue, HostError>;
}

/// Top-level access points of the host.
pub trait HostRoot: Send + Sync {
    /// Operator namespace object; its callable attributes are the operators.
    fn operator_namespace(&self, namespace: &str) -> Option<Arc<dyn HostObject>>;

    /// Named top-level object handed to the guest at start-up.
    ///
    /// Called once per name when the bridge starts. The bridge keeps the returned
    /// object alive; objects reached through it are only weakly referenced and
    /// must be owned by the host.
    fn entry_point(&self, name: &str) -> Option<Arc<dyn HostObject>>;
}

/// Address of the object's allocation, used as its identity.
pub fn object_identity(object: &Arc<dyn HostObject>) -> usize {
    Arc::as_ptr(object).cast::<()>() as usize
}

/// Host-native value.
#[derive(Clone)]
pub enum HostValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<HostValue>),
    Tuple(Vec<HostValue>),
    Set(Vec<HostValue>),
    Map(BTreeMap<String, HostValue>),
    /// Numeric vector-like value (coordinates, colors).
    Vector(Vec<f64>),
    Object(Arc<dyn HostObject>),
    Callable(Arc<dyn HostCallable>),
    /// Reference whose handle no longer resolves.
    Dangling(Handle),
}

impl HostValue {
    pub fn object(object: impl HostObject + 'static) -> Self {
        Self::Object(Arc::new(object))
    }

    pub fn callable(callable: impl HostCallable + 'static) -> Self {
        Self::Callable(Arc::new(callable))
    }

    pub fn as_object(&self) -> Option<&Arc<dyn HostObject>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Arc<dyn HostCallable>> {
        match self {
            Self::Callable(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// First dangling reference anywhere inside the value.
    pub fn find_dangling(&self) -> Option<Handle> {
        match self {
            Self::Dangling(h) => Some(*h),
            Self::List(items) | Self::Tuple(items) | Self::Set(items) => {
                items.iter().find_map(Self::find_dangling)
            }
            Self::Map(map) => map.values().find_map(Self::find_dangling),
            _ => None,
        }
    }

    /// Short kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Vector(_) => "vector",
            Self::Object(_) => "object",
            Self::Callable(_) => "callable",
            Self::Dangling(_) => "dangling",
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::List(v) => f.debug_tuple("List").field(v).finish(),
            Self::Tuple(v) => f.debug_tuple("Tuple").field(v).finish(),
            Self::Set(v) => f.debug_tuple("Set").field(v).finish(),
            Self::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Self::Vector(v) => f.debug_tuple("Vector").field(v).finish(),
            Self::Object(o) => write!(f, "Object({}@{:#x})", o.type_identifier(), object_identity(o)),
            Self::Callable(_) => write!(f, "Callable"),
            Self::Dangling(h) => write!(f, "Dangling({h})"),
        }
    }
}

/// Structural equality; objects and callables compare by identity.
impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b))
            | (Self::Tuple(a), Self::Tuple(b))
            | (Self::Set(a), Self::Set(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Vector(a), Self::Vector(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => object_identity(a) == object_identity(b),
            (Self::Callable(a), Self::Callable(b)) => {
                Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
            }
            (Self::Dangling(a), Self::Dangling(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for HostValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Arc<dyn HostObject>> for HostValue {
    fn from(v: Arc<dyn HostObject>) -> Self {
        Self::Object(v)
    }
}
