// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Guest-callable host functions.
//!
//! Each operation has a fallible `try_*` form and a total form. The total form passes the
//! result through [`FailurePolicy::collapse`], so whatever happens the guest receives a
//! well-formed wire value.

use super::host::{HostError, HostObject, HostRoot, HostValue};
use super::pointer::{Handle, PointerTable};
use super::transcode::{lift, lower};
use super::wire::WireValue;
use crate::config::BridgeConfig;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Namespace under which the host functions are registered with the engine.
pub const HOST_NAMESPACE: &str = "hostlink:bridge";

/// Bridge call errors. Contained at the dispatcher boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("unknown handle {}", .0.map_or_else(|| "(none)".to_string(), |h| h.to_string()))]
    UnknownPtr(Option<Handle>),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("malformed arguments: {0}")]
    MalformedArgs(String),

    #[error("host error: {0}")]
    Host(HostError),
}

impl BridgeError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownPtr(_) => "UnknownPtr",
            Self::InvalidTarget(_) => "InvalidTarget",
            Self::MalformedArgs(_) => "MalformedArgs",
            Self::Host(_) => "Host",
        }
    }
}

impl From<HostError> for BridgeError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::UnknownAttribute(name) => Self::InvalidTarget(name),
            other => Self::Host(other),
        }
    }
}

/// What the guest sees when a call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// `{}`, indistinguishable from an empty success.
    #[default]
    Empty,
    /// `{"@error": {"kind": ..., "message": ...}}`.
    Report,
}

impl FailurePolicy {
    pub fn collapse(self, result: Result<WireValue, BridgeError>) -> WireValue {
        match (result, self) {
            (Ok(value), _) => value,
            (Err(_), Self::Empty) => WireValue::empty(),
            (Err(err), Self::Report) => {
                let detail = BTreeMap::from([
                    ("kind".to_string(), WireValue::String(err.kind().to_string())),
                    ("message".to_string(), WireValue::String(err.to_string())),
                ]);
                WireValue::Mapping(BTreeMap::from([(
                    "@error".to_string(),
                    WireValue::Mapping(detail),
                )]))
            }
        }
    }
}

/// The four host functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostFunction {
    Operator,
    CallMethod,
    GetAttr,
    SetAttr,
}

impl HostFunction {
    pub const ALL: [HostFunction; 4] = [
        Self::Operator,
        Self::CallMethod,
        Self::GetAttr,
        Self::SetAttr,
    ];

    /// Exported name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Operator => "bpy_operator",
            Self::CallMethod => "bpy_callmethod",
            Self::GetAttr => "bpy_getattr",
            Self::SetAttr => "bpy_setattr",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Number of string selectors before the argument object.
    pub fn selector_count(self) -> usize {
        match self {
            Self::Operator => 2,
            _ => 1,
        }
    }
}

/// Lifted `{self, args, kwargs}` argument object.
struct CallArgs {
    target: Option<HostValue>,
    args: Vec<HostValue>,
    kwargs: BTreeMap<String, HostValue>,
}

impl CallArgs {
    /// Split the argument object. A dangling reference anywhere in it fails the call.
    fn parse(lifted: HostValue) -> Result<Self, BridgeError> {
        if let Some(handle) = lifted.find_dangling() {
            return Err(BridgeError::UnknownPtr(Some(handle)));
        }
        let mut fields = match lifted {
            HostValue::Map(fields) => fields,
            HostValue::None => BTreeMap::new(),
            other => {
                return Err(BridgeError::MalformedArgs(format!(
                    "expected an argument object, got {}",
                    other.kind_name()
                )))
            }
        };

        let target = fields.remove("self");
        let args = match fields.remove("args") {
            None | Some(HostValue::None) => Vec::new(),
            Some(HostValue::List(items) | HostValue::Tuple(items)) => items,
            Some(other) => {
                return Err(BridgeError::MalformedArgs(format!(
                    "`args` must be a sequence, got {}",
                    other.kind_name()
                )))
            }
        };
        let kwargs = match fields.remove("kwargs") {
            None | Some(HostValue::None) => BTreeMap::new(),
            Some(HostValue::Map(map)) => map,
            Some(other) => {
                return Err(BridgeError::MalformedArgs(format!(
                    "`kwargs` must be a mapping, got {}",
                    other.kind_name()
                )))
            }
        };

        Ok(Self {
            target,
            args,
            kwargs,
        })
    }

    fn require_target(&mut self) -> Result<Arc<dyn HostObject>, BridgeError> {
        match self.target.take() {
            Some(HostValue::Object(object)) => Ok(object),
            Some(HostValue::Dangling(handle)) => Err(BridgeError::UnknownPtr(Some(handle))),
            None | Some(HostValue::None) => Err(BridgeError::UnknownPtr(None)),
            Some(other) => Err(BridgeError::MalformedArgs(format!(
                "`self` must be an object reference, got {}",
                other.kind_name()
            ))),
        }
    }
}

/// The marshaling bridge: owns the pointer table and dispatches guest calls to the host.
pub struct Bridge {
    host: Arc<dyn HostRoot>,
    table: Mutex<PointerTable>,
    config: BridgeConfig,
    entry_points: BTreeMap<String, Handle>,
    // The table only holds weak references; entry points must outlive every guest call.
    roots: Vec<Arc<dyn HostObject>>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("table", &*self.table.lock())
            .field("entry_points", &self.entry_points)
            .field("roots", &self.roots.len())
            .field("failure_policy", &self.config.failure_policy)
            .finish()
    }
}

impl Bridge {
    /// Start the bridge, registering every configured entry point the host provides.
    ///
    /// Entry-point objects are retained by the bridge, so their handles stay valid
    /// for its whole lifetime even when the host does not keep them alive.
    pub fn new(host: Arc<dyn HostRoot>, config: BridgeConfig) -> Self {
        let mut table = PointerTable::new(config.sweep_threshold);
        let mut entry_points = BTreeMap::new();
        let mut roots = Vec::new();
        for name in &config.entry_points {
            match host.entry_point(name) {
                Some(object) => {
                    entry_points.insert(name.clone(), table.encode(&object));
                    roots.push(object);
                }
                None => warn!(entry_point = %name, "entry point not provided by host"),
            }
        }
        info!(
            entry_points = entry_points.len(),
            policy = ?config.failure_policy,
            "bridge started"
        );
        Self {
            host,
            table: Mutex::new(table),
            config,
            entry_points,
            roots,
        }
    }

    /// Pre-registered entry point handles.
    pub fn entry_points(&self) -> &BTreeMap<String, Handle> {
        &self.entry_points
    }

    /// Engine configuration for the guest: `{config_key: "<JSON name -> handle>"}`.
    pub fn guest_config(&self) -> BTreeMap<String, String> {
        let handles: serde_json::Map<String, serde_json::Value> = self
            .entry_points
            .iter()
            .map(|(name, handle)| (name.clone(), serde_json::Value::from(handle.raw())))
            .collect();
        BTreeMap::from([(
            self.config.config_key.clone(),
            serde_json::Value::Object(handles).to_string(),
        )])
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.config.failure_policy
    }

    /// Lower a host value, registering any objects it contains.
    pub fn lower(&self, value: &HostValue) -> WireValue {
        lower(value, &mut self.table.lock())
    }

    pub fn lift(&self, value: &WireValue) -> HostValue {
        lift(value, &self.table.lock())
    }

    /// Registered handles.
    pub fn table_len(&self) -> usize {
        self.table.lock().len()
    }

    /// Reclaim handles of dropped objects.
    pub fn sweep(&self) -> usize {
        self.table.lock().sweep()
    }

    // -----------------------------------------------------------------------
    // Total operations
    // -----------------------------------------------------------------------

    /// Call `namespace.name(*args, **kwargs)`.
    pub fn invoke_operator(&self, namespace: &str, name: &str, args: &WireValue) -> WireValue {
        self.finish(HostFunction::Operator, name, self.try_invoke_operator(namespace, name, args))
    }

    /// Call `self.method(*args, **kwargs)`.
    pub fn invoke_method(&self, method: &str, args: &WireValue) -> WireValue {
        self.finish(HostFunction::CallMethod, method, self.try_invoke_method(method, args))
    }

    /// Read `self.attribute`.
    pub fn get_attribute(&self, attribute: &str, args: &WireValue) -> WireValue {
        self.finish(HostFunction::GetAttr, attribute, self.try_get_attribute(attribute, args))
    }

    /// Write `self.attribute = args[0]`.
    pub fn set_attribute(&self, attribute: &str, args: &WireValue) -> WireValue {
        self.finish(HostFunction::SetAttr, attribute, self.try_set_attribute(attribute, args))
    }

    /// Route a call by function; `selectors` are the leading string parameters.
    pub fn dispatch(&self, function: HostFunction, selectors: &[&str], args: &WireValue) -> WireValue {
        match (function, selectors) {
            (HostFunction::Operator, [namespace, name]) => self.invoke_operator(namespace, name, args),
            (HostFunction::CallMethod, [method]) => self.invoke_method(method, args),
            (HostFunction::GetAttr, [attribute]) => self.get_attribute(attribute, args),
            (HostFunction::SetAttr, [attribute]) => self.set_attribute(attribute, args),
            _ => self.finish(
                function,
                "",
                Err(BridgeError::MalformedArgs(format!(
                    "{} takes {} selector(s), got {}",
                    function.name(),
                    function.selector_count(),
                    selectors.len()
                ))),
            ),
        }
    }

    /// JSON in, JSON out; never fails.
    pub fn dispatch_json(&self, function: &str, selectors: &[&str], args_json: &str) -> String {
        let Some(function) = HostFunction::from_name(function) else {
            let reply = self.config.failure_policy.collapse(Err(BridgeError::InvalidTarget(format!(
                "host function `{function}`"
            ))));
            return reply.to_json_string();
        };
        let reply = match WireValue::from_json_str(args_json) {
            Ok(args) => self.dispatch(function, selectors, &args),
            Err(err) => self.finish(function, "", Err(BridgeError::MalformedArgs(err.to_string()))),
        };
        reply.to_json_string()
    }

    // -----------------------------------------------------------------------
    // Fallible operations
    // -----------------------------------------------------------------------

    pub fn try_invoke_operator(
        &self,
        namespace: &str,
        name: &str,
        args: &WireValue,
    ) -> Result<WireValue, BridgeError> {
        let call = CallArgs::parse(self.lift(args))?;
        let ns = self
            .host
            .operator_namespace(namespace)
            .ok_or_else(|| BridgeError::InvalidTarget(format!("operator namespace `{namespace}`")))?;
        let operator = match ns.get_attr(name) {
            Some(HostValue::Callable(c)) => c,
            _ => {
                return Err(BridgeError::InvalidTarget(format!(
                    "operator `{namespace}.{name}`"
                )))
            }
        };
        let result = operator.call(call.args, call.kwargs)?;
        Ok(self.lower(&result))
    }

    pub fn try_invoke_method(&self, method: &str, args: &WireValue) -> Result<WireValue, BridgeError> {
        let mut call = CallArgs::parse(self.lift(args))?;
        let target = call.require_target()?;
        let callee = match target.get_attr(method) {
            Some(HostValue::Callable(c)) => c,
            _ => {
                return Err(BridgeError::InvalidTarget(format!(
                    "method `{method}` on {}",
                    target.type_identifier()
                )))
            }
        };
        let result = callee.call(call.args, call.kwargs)?;
        Ok(self.lower(&result))
    }

    pub fn try_get_attribute(&self, attribute: &str, args: &WireValue) -> Result<WireValue, BridgeError> {
        let mut call = CallArgs::parse(self.lift(args))?;
        let target = call.require_target()?;
        let value = target.get_attr(attribute).ok_or_else(|| {
            BridgeError::InvalidTarget(format!(
                "attribute `{attribute}` on {}",
                target.type_identifier()
            ))
        })?;
        Ok(self.lower(&value))
    }

    pub fn try_set_attribute(&self, attribute: &str, args: &WireValue) -> Result<WireValue, BridgeError> {
        let mut call = CallArgs::parse(self.lift(args))?;
        let target = call.require_target()?;
        let value = call
            .args
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::MalformedArgs(format!("no value given for `{attribute}`")))?;
        target.set_attr(attribute, value)?;
        Ok(WireValue::empty())
    }

    fn finish(
        &self,
        function: HostFunction,
        selector: &str,
        result: Result<WireValue, BridgeError>,
    ) -> WireValue {
        match &result {
            Ok(_) => debug!(function = function.name(), selector, "bridge call ok"),
            Err(err) => warn!(
                function = function.name(),
                selector,
                kind = err.kind(),
                error = %err,
                "bridge call failed"
            ),
        }
        self.config.failure_policy.collapse(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::memory::{MemoryHost, MemoryObject};
    use serde_json::json;

    fn wire(value: serde_json::Value) -> WireValue {
        serde_json::from_value(value).unwrap()
    }

    fn bridge_with(policy: FailurePolicy) -> (Bridge, Arc<dyn HostObject>) {
        let cube = MemoryObject::new("Object")
            .with_attr("name", "Cube")
            .with_attr("parent", HostValue::None)
            .with_method("rename", |args, _| match args.first() {
                Some(HostValue::Str(s)) => Ok(HostValue::Str(format!("renamed:{s}"))),
                _ => Err(HostError::Failed("rename needs a string".into())),
            })
            .into_shared();
        let objects = MemoryObject::collection("BlendDataObjects", vec![cube.clone()]).into_shared();
        let ops = MemoryObject::new("OperatorNamespace")
            .with_method("add", |args, kwargs| {
                let base = args.len() as i64;
                let extra = kwargs.get("extra").map_or(0, |v| match v {
                    HostValue::Int(i) => *i,
                    _ => 0,
                });
                Ok(HostValue::Int(base + extra))
            })
            .with_attr("not_callable", 3i64)
            .into_shared();
        let host = MemoryHost::new()
            .with_entry_point("objects", objects)
            .with_namespace("object", ops);
        let config = BridgeConfig {
            entry_points: vec!["objects".into(), "scenes".into()],
            failure_policy: policy,
            ..BridgeConfig::default()
        };
        (Bridge::new(Arc::new(host), config), cube)
    }

    #[test]
    fn test_entry_points_registered() {
        let (bridge, _cube) = bridge_with(FailurePolicy::Empty);
        assert_eq!(bridge.entry_points().len(), 1);
        // collection only; members register when it is lowered
        assert_eq!(bridge.table_len(), 1);
        let config = bridge.guest_config();
        let payload: serde_json::Value = serde_json::from_str(&config["bpy.data"]).unwrap();
        assert_eq!(payload["objects"], bridge.entry_points()["objects"].raw());
    }

    /// Host that builds a new object on every entry point lookup and keeps none of them.
    struct TransientHost;

    impl HostRoot for TransientHost {
        fn operator_namespace(&self, _namespace: &str) -> Option<Arc<dyn HostObject>> {
            None
        }

        fn entry_point(&self, name: &str) -> Option<Arc<dyn HostObject>> {
            Some(MemoryObject::new("BlendData").with_attr("name", name).into_shared())
        }
    }

    #[test]
    fn test_entry_points_outlive_host_references() {
        let config = BridgeConfig {
            entry_points: vec!["objects".into()],
            failure_policy: FailurePolicy::Report,
            ..BridgeConfig::default()
        };
        let bridge = Bridge::new(Arc::new(TransientHost), config);
        let handle = bridge.entry_points()["objects"];

        assert_eq!(bridge.sweep(), 0);
        let reply = bridge
            .try_get_attribute("name", &wire(json!({"self": {"@ptr": handle.raw()}})))
            .unwrap();
        assert_eq!(reply, WireValue::String("objects".into()));
    }

    #[test]
    fn test_operator_call() {
        let (bridge, _cube) = bridge_with(FailurePolicy::Empty);
        let reply = bridge.invoke_operator("object", "add", &wire(json!({"args": [1, 2], "kwargs": {"extra": 10}})));
        assert_eq!(reply, WireValue::Int(12));
        let reply = bridge.invoke_operator("object", "add", &wire(json!({})));
        assert_eq!(reply, WireValue::Int(0));
    }

    #[test]
    fn test_operator_invalid_targets() {
        let (bridge, _cube) = bridge_with(FailurePolicy::Report);
        for (ns, name) in [("mesh", "add"), ("object", "missing"), ("object", "not_callable")] {
            match bridge.try_invoke_operator(ns, name, &WireValue::empty()) {
                Err(BridgeError::InvalidTarget(_)) => {}
                other => panic!("Expected InvalidTarget for {ns}.{name}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_method_and_attributes() {
        let (bridge, cube) = bridge_with(FailurePolicy::Empty);
        let me = bridge.lower(&HostValue::Object(cube));
        let reply = bridge.invoke_method("rename", &WireValue::Mapping(BTreeMap::from([
            ("self".to_string(), me.clone()),
            ("args".to_string(), WireValue::Sequence(vec![WireValue::String("Sphere".into())])),
        ])));
        assert_eq!(reply, WireValue::String("renamed:Sphere".into()));

        let args = WireValue::Mapping(BTreeMap::from([("self".to_string(), me.clone())]));
        assert_eq!(bridge.get_attribute("name", &args), WireValue::String("Cube".into()));
        assert_eq!(bridge.get_attribute("parent", &args), WireValue::Null);
        assert!(bridge.get_attribute("missing", &args).is_empty_mapping());

        let set = WireValue::Mapping(BTreeMap::from([
            ("self".to_string(), me),
            ("args".to_string(), WireValue::Sequence(vec![WireValue::String("Torus".into())])),
        ]));
        assert!(bridge.set_attribute("name", &set).is_empty_mapping());
        assert_eq!(bridge.get_attribute("name", &args), WireValue::String("Torus".into()));
    }

    #[test]
    fn test_missing_self_is_unknown_ptr() {
        let (bridge, _cube) = bridge_with(FailurePolicy::Empty);
        assert_eq!(
            bridge.try_get_attribute("name", &wire(json!({}))),
            Err(BridgeError::UnknownPtr(None))
        );
        assert_eq!(
            bridge.try_invoke_method("rename", &wire(json!({"self": {"@ptr": 99}}))),
            Err(BridgeError::UnknownPtr(Some(Handle::from_raw(99))))
        );
        assert!(bridge.invoke_method("rename", &wire(json!({"self": {"@ptr": 99}}))).is_empty_mapping());
    }

    #[test]
    fn test_dangling_argument_rejects_call() {
        let (bridge, cube) = bridge_with(FailurePolicy::Empty);
        let me = bridge.lower(&HostValue::Object(cube));
        let args = WireValue::Mapping(BTreeMap::from([
            ("self".to_string(), me),
            ("args".to_string(), WireValue::Sequence(vec![wire(json!({"@ptr": 12345}))])),
        ]));
        assert!(matches!(
            bridge.try_invoke_method("rename", &args),
            Err(BridgeError::UnknownPtr(Some(_)))
        ));
    }

    #[test]
    fn test_dangling_anywhere_in_arguments() {
        let (bridge, _cube) = bridge_with(FailurePolicy::Report);
        let cases = [
            json!({"self": [{"@ptr": 77}]}),
            json!({"self": {"inner": {"@ptr": 77}}}),
            json!({"extra": {"@ptr": 77}}),
            json!({"kwargs": {"deep": [[{"@ptr": 77}]]}}),
        ];
        for case in cases {
            assert_eq!(
                bridge.try_get_attribute("name", &wire(case.clone())),
                Err(BridgeError::UnknownPtr(Some(Handle::from_raw(77)))),
                "{case}"
            );
        }
        assert_eq!(
            bridge.try_invoke_operator("object", "add", &wire(json!({"note": {"@ptr": 77}}))),
            Err(BridgeError::UnknownPtr(Some(Handle::from_raw(77))))
        );
    }

    #[test]
    fn test_set_without_value_is_malformed() {
        let (bridge, cube) = bridge_with(FailurePolicy::Report);
        let me = bridge.lower(&HostValue::Object(cube));
        let args = WireValue::Mapping(BTreeMap::from([("self".to_string(), me)]));
        let reply = bridge.set_attribute("name", &args);
        assert_eq!(
            reply.get("@error").and_then(|e| e.get("kind")),
            Some(&WireValue::String("MalformedArgs".into()))
        );
    }

    #[test]
    fn test_host_failure_collapses() {
        let (bridge, cube) = bridge_with(FailurePolicy::Empty);
        let me = bridge.lower(&HostValue::Object(cube));
        let args = WireValue::Mapping(BTreeMap::from([
            ("self".to_string(), me),
            ("args".to_string(), WireValue::Sequence(vec![WireValue::Int(1)])),
        ]));
        assert!(matches!(bridge.try_invoke_method("rename", &args), Err(BridgeError::Host(_))));
        assert!(bridge.invoke_method("rename", &args).is_empty_mapping());
    }

    #[test]
    fn test_dispatch_json_totality() {
        let (bridge, _cube) = bridge_with(FailurePolicy::Empty);
        assert_eq!(bridge.dispatch_json("bpy_getattr", &["name"], "not json"), "{}");
        assert_eq!(bridge.dispatch_json("bpy_unknown", &["x"], "{}"), "{}");
        assert_eq!(bridge.dispatch_json("bpy_operator", &["object"], "{}"), "{}");
        assert_eq!(bridge.dispatch_json("bpy_operator", &["object", "add"], r#"{"args": [1]}"#), "1");
        assert_eq!(bridge.dispatch_json("bpy_getattr", &["name"], "[1, 2]"), "{}");
    }

    #[test]
    fn test_host_function_names() {
        for f in HostFunction::ALL {
            assert_eq!(HostFunction::from_name(f.name()), Some(f));
        }
        assert_eq!(HostFunction::Operator.selector_count(), 2);
    }
}
