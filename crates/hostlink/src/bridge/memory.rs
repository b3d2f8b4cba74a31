// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory host object model.
//!
//! Enough of a host to drive the bridge without a real application behind it: plain
//! attribute bags, collections, closures as callables, and a root with named operator
//! namespaces and entry points.

use super::host::{HostCallable, HostError, HostObject, HostRoot, HostValue};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Attribute bag, optionally holding collection members.
pub struct MemoryObject {
    type_name: String,
    attrs: RwLock<BTreeMap<String, HostValue>>,
    read_only: BTreeSet<String>,
    members: Option<RwLock<Vec<Arc<dyn HostObject>>>>,
}

impl MemoryObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attrs: RwLock::new(BTreeMap::new()),
            read_only: BTreeSet::new(),
            members: None,
        }
    }

    /// Collection of objects.
    pub fn collection(type_name: impl Into<String>, members: Vec<Arc<dyn HostObject>>) -> Self {
        Self {
            members: Some(RwLock::new(members)),
            ..Self::new(type_name)
        }
    }

    pub fn with_attr(self, name: impl Into<String>, value: impl Into<HostValue>) -> Self {
        self.attrs.write().insert(name.into(), value.into());
        self
    }

    /// Attribute holding a closure.
    pub fn with_method<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<HostValue>, BTreeMap<String, HostValue>) -> Result<HostValue, HostError>
            + Send
            + Sync
            + 'static,
    {
        self.with_attr(name, HostValue::callable(FnCallable::new(f)))
    }

    pub fn read_only(mut self, name: impl Into<String>) -> Self {
        self.read_only.insert(name.into());
        self
    }

    pub fn into_shared(self) -> Arc<dyn HostObject> {
        Arc::new(self)
    }

    /// Append a member (collections only).
    pub fn push_member(&self, member: Arc<dyn HostObject>) -> Result<(), HostError> {
        match &self.members {
            Some(members) => {
                members.write().push(member);
                Ok(())
            }
            None => Err(HostError::Failed(format!("{} is not a collection", self.type_name))),
        }
    }
}

fn compatible(current: &HostValue, incoming: &HostValue) -> bool {
    matches!(
        (current, incoming),
        (HostValue::None, _)
            | (_, HostValue::None)
            | (HostValue::Int(_) | HostValue::Float(_), HostValue::Int(_) | HostValue::Float(_))
            | (HostValue::Vector(_), HostValue::List(_) | HostValue::Tuple(_))
    ) || std::mem::discriminant(current) == std::mem::discriminant(incoming)
}

#[allow(clippy::cast_precision_loss)]
fn coerce(current: &HostValue, incoming: HostValue) -> HostValue {
    match (current, incoming) {
        (HostValue::Float(_), HostValue::Int(i)) => HostValue::Float(i as f64),
        (HostValue::Vector(_), HostValue::List(items) | HostValue::Tuple(items)) => {
            HostValue::Vector(
                items
                    .iter()
                    .map(|v| match v {
                        HostValue::Float(f) => *f,
                        HostValue::Int(i) => *i as f64,
                        _ => 0.0,
                    })
                    .collect(),
            )
        }
        (_, incoming) => incoming,
    }
}

impl HostObject for MemoryObject {
    fn type_identifier(&self) -> &str {
        &self.type_name
    }

    fn get_attr(&self, name: &str) -> Option<HostValue> {
        if let Some(value) = self.attrs.read().get(name) {
            return Some(value.clone());
        }
        match (&self.members, name) {
            (Some(members), "length") => i64::try_from(members.read().len()).ok().map(HostValue::Int),
            _ => None,
        }
    }

    fn set_attr(&self, name: &str, value: HostValue) -> Result<(), HostError> {
        if self.read_only.contains(name) {
            return Err(HostError::ReadOnly(name.to_string()));
        }
        let mut attrs = self.attrs.write();
        let current = attrs
            .get(name)
            .ok_or_else(|| HostError::UnknownAttribute(name.to_string()))?;
        if !compatible(current, &value) {
            return Err(HostError::TypeMismatch {
                attribute: name.to_string(),
                expected: current.kind_name().to_string(),
            });
        }
        let value = coerce(current, value);
        attrs.insert(name.to_string(), value);
        Ok(())
    }

    fn members(&self) -> Option<Vec<Arc<dyn HostObject>>> {
        self.members.as_ref().map(|m| m.read().clone())
    }
}

/// Closure-backed callable.
pub struct FnCallable<F> {
    f: F,
}

impl<F> FnCallable<F>
where
    F: Fn(Vec<HostValue>, BTreeMap<String, HostValue>) -> Result<HostValue, HostError>
        + Send
        + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> HostCallable for FnCallable<F>
where
    F: Fn(Vec<HostValue>, BTreeMap<String, HostValue>) -> Result<HostValue, HostError>
        + Send
        + Sync,
{
    fn call(
        &self,
        args: Vec<HostValue>,
        kwargs: BTreeMap<String, HostValue>,
    ) -> Result<HostValue, HostError> {
        (self.f)(args, kwargs)
    }
}

/// Root with named operator namespaces and entry points.
#[derive(Default)]
pub struct MemoryHost {
    namespaces: BTreeMap<String, Arc<dyn HostObject>>,
    entry_points: BTreeMap<String, Arc<dyn HostObject>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, name: impl Into<String>, namespace: Arc<dyn HostObject>) -> Self {
        self.namespaces.insert(name.into(), namespace);
        self
    }

    pub fn with_entry_point(mut self, name: impl Into<String>, object: Arc<dyn HostObject>) -> Self {
        self.entry_points.insert(name.into(), object);
        self
    }
}

impl HostRoot for MemoryHost {
    fn operator_namespace(&self, namespace: &str) -> Option<Arc<dyn HostObject>> {
        self.namespaces.get(namespace).cloned()
    }

    fn entry_point(&self, name: &str) -> Option<Arc<dyn HostObject>> {
        self.entry_points.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attr_rules() {
        let obj = MemoryObject::new("Object")
            .with_attr("name", "Cube")
            .with_attr("scale", 1.0)
            .with_attr("location", HostValue::Vector(vec![0.0; 3]))
            .with_attr("users", 1i64)
            .read_only("users");

        obj.set_attr("name", "Sphere".into()).unwrap();
        obj.set_attr("scale", 2i64.into()).unwrap();
        obj.set_attr("location", HostValue::List(vec![1i64.into(), 2.5.into(), 3i64.into()]))
            .unwrap();

        assert_eq!(obj.get_attr("name"), Some("Sphere".into()));
        assert_eq!(obj.get_attr("scale"), Some(HostValue::Float(2.0)));
        assert_eq!(obj.get_attr("location"), Some(HostValue::Vector(vec![1.0, 2.5, 3.0])));
        assert_eq!(obj.set_attr("users", 3i64.into()), Err(HostError::ReadOnly("users".into())));
        assert_eq!(
            obj.set_attr("missing", HostValue::None),
            Err(HostError::UnknownAttribute("missing".into()))
        );
        assert!(matches!(
            obj.set_attr("name", true.into()),
            Err(HostError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_collection_length_and_push() {
        let coll = MemoryObject::collection("BlendDataMeshes", Vec::new());
        coll.push_member(MemoryObject::new("Mesh").into_shared()).unwrap();
        assert_eq!(coll.get_attr("length"), Some(HostValue::Int(1)));
        assert_eq!(coll.members().map(|m| m.len()), Some(1));
        assert!(MemoryObject::new("Mesh")
            .push_member(MemoryObject::new("Mesh").into_shared())
            .is_err());
    }

    #[test]
    fn test_methods_are_callable_attributes() {
        let obj = MemoryObject::new("Object").with_method("double", |args, _| match args.first() {
            Some(HostValue::Int(i)) => Ok(HostValue::Int(i * 2)),
            _ => Err(HostError::Failed("expected int".into())),
        });
        let method = obj.get_attr("double").unwrap();
        let callable = method.as_callable().unwrap();
        assert_eq!(callable.call(vec![21i64.into()], BTreeMap::new()), Ok(HostValue::Int(42)));
    }
}
