// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hostlink::bridge::{Bridge, FailurePolicy, HostFunction, HostValue, MemoryHost, MemoryObject};
use hostlink::config::BridgeConfig;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(args) = std::str::from_utf8(rest) else {
        return;
    };

    let cube = MemoryObject::new("Object")
        .with_attr("name", "Cube")
        .with_attr("location", HostValue::Vector(vec![0.0; 3]))
        .with_method("select_set", |_, _| Ok(HostValue::None))
        .into_shared();
    let objects = MemoryObject::collection("BlendDataObjects", vec![cube]).into_shared();
    let host = MemoryHost::new()
        .with_entry_point("objects", objects)
        .with_namespace("object", MemoryObject::new("OperatorNamespace").into_shared());
    let config = BridgeConfig {
        entry_points: vec!["objects".into()],
        failure_policy: if selector & 0x80 == 0 {
            FailurePolicy::Empty
        } else {
            FailurePolicy::Report
        },
        ..BridgeConfig::default()
    };
    let bridge = Bridge::new(Arc::new(host), config);

    // Every host function, with the right and the wrong number of selectors.
    let function = HostFunction::ALL[usize::from(selector & 0x03)];
    let selectors: &[&str] = match (selector >> 2) & 0x03 {
        0 => &["name"],
        1 => &["object", "select_all"],
        2 => &["select_set"],
        _ => &[],
    };

    let reply = bridge.dispatch_json(function.name(), selectors, args);
    assert!(serde_json::from_str::<serde_json::Value>(&reply).is_ok());
});
