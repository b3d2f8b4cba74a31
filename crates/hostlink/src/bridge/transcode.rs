// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lift/lower between host values and wire values.
//!
//! `lower` is the only place handles are created. `lift` never fails: a reference that
//! does not resolve becomes [`HostValue::Dangling`] and callers decide what that means.

use super::host::{HostObject, HostValue};
use super::pointer::PointerTable;
use super::wire::WireValue;
use std::sync::Arc;

/// Host value -> wire value, registering every object that crosses.
pub fn lower(value: &HostValue, table: &mut PointerTable) -> WireValue {
    match value {
        HostValue::None | HostValue::Callable(_) => WireValue::Null,
        HostValue::Bool(b) => WireValue::Bool(*b),
        HostValue::Int(i) => WireValue::Int(*i),
        HostValue::Float(f) => WireValue::Float(*f),
        HostValue::Str(s) => WireValue::String(s.clone()),
        HostValue::List(items) | HostValue::Tuple(items) | HostValue::Set(items) => {
            WireValue::Sequence(items.iter().map(|v| lower(v, table)).collect())
        }
        HostValue::Map(map) => WireValue::Mapping(
            map.iter()
                .map(|(k, v)| (k.clone(), lower(v, table)))
                .collect(),
        ),
        HostValue::Vector(components) => {
            WireValue::Sequence(components.iter().copied().map(WireValue::Float).collect())
        }
        HostValue::Object(object) => lower_object(object, table),
        HostValue::Dangling(_) => WireValue::Null,
    }
}

/// Collections register every member before the collection itself and carry no `@type`.
pub fn lower_object(object: &Arc<dyn HostObject>, table: &mut PointerTable) -> WireValue {
    match object.members() {
        Some(members) => {
            for member in &members {
                table.encode(member);
            }
            WireValue::reference(table.encode(object), None)
        }
        None => WireValue::reference(
            table.encode(object),
            Some(object.type_identifier().to_string()),
        ),
    }
}

/// Wire value -> host value.
pub fn lift(value: &WireValue, table: &PointerTable) -> HostValue {
    match value {
        WireValue::Null => HostValue::None,
        WireValue::Bool(b) => HostValue::Bool(*b),
        WireValue::Int(i) => HostValue::Int(*i),
        WireValue::Float(f) => HostValue::Float(*f),
        WireValue::String(s) => HostValue::Str(s.clone()),
        WireValue::Sequence(items) => HostValue::List(items.iter().map(|v| lift(v, table)).collect()),
        WireValue::Mapping(map) => HostValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), lift(v, table)))
                .collect(),
        ),
        WireValue::Ref { handle, .. } => table
            .decode(*handle)
            .map_or(HostValue::Dangling(*handle), HostValue::Object),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::memory::MemoryObject;
    use crate::bridge::pointer::Handle;
    use std::collections::BTreeMap;

    #[test]
    fn test_lower_composites() {
        let mut table = PointerTable::default();
        let value = HostValue::Map(BTreeMap::from([
            ("loc".to_string(), HostValue::Vector(vec![1.0, 2.0, 3.0])),
            ("tags".to_string(), HostValue::Set(vec!["a".into()])),
            ("pair".to_string(), HostValue::Tuple(vec![1i64.into(), true.into()])),
        ]));
        let wire = lower(&value, &mut table);
        assert_eq!(
            wire.to_json_string(),
            r#"{"loc":[1.0,2.0,3.0],"pair":[1,true],"tags":["a"]}"#
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_object_carries_type() {
        let mut table = PointerTable::default();
        let obj: Arc<dyn HostObject> = Arc::new(MemoryObject::new("Camera"));
        match lower(&HostValue::Object(obj.clone()), &mut table) {
            WireValue::Ref { handle, type_name } => {
                assert_eq!(type_name.as_deref(), Some("Camera"));
                assert_eq!(lift(&WireValue::reference(handle, None), &table), HostValue::Object(obj));
            }
            other => panic!("Expected reference, got {other:?}"),
        }
    }

    #[test]
    fn test_collection_registers_members() {
        let mut table = PointerTable::default();
        let members: Vec<Arc<dyn HostObject>> = (0..3)
            .map(|_| Arc::new(MemoryObject::new("Object")) as Arc<dyn HostObject>)
            .collect();
        let coll: Arc<dyn HostObject> =
            Arc::new(MemoryObject::collection("BlendDataObjects", members.clone()));

        let wire = lower(&HostValue::Object(coll), &mut table);
        assert_eq!(table.len(), 4);
        assert!(matches!(wire, WireValue::Ref { type_name: None, .. }));

        let decoded = table.decode(wire.as_handle().unwrap()).unwrap();
        for member in decoded.members().unwrap() {
            let handle = table.encode(&member);
            assert!(table.decode(handle).is_some());
        }
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_unresolved_reference_lifts_to_dangling() {
        let table = PointerTable::default();
        let wire = WireValue::Sequence(vec![WireValue::reference(Handle::from_raw(7), None)]);
        let lifted = lift(&wire, &table);
        assert_eq!(lifted.find_dangling(), Some(Handle::from_raw(7)));
    }

    #[test]
    fn test_callables_lower_to_null() {
        let mut table = PointerTable::default();
        let f = crate::bridge::memory::FnCallable::new(|_, _| Ok(HostValue::None));
        assert_eq!(lower(&HostValue::callable(f), &mut table), WireValue::Null);
    }
}
