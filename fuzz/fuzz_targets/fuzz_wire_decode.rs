// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hostlink::bridge::{lift, PointerTable, WireValue};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(wire) = WireValue::from_json_str(text) else {
        return;
    };

    // Nothing is registered, so every reference must lift as dangling.
    let table = PointerTable::default();
    let lifted = lift(&wire, &table);
    if wire.as_handle().is_some() {
        assert!(lifted.as_object().is_none());
    }

    let _ = WireValue::from_json_str(&wire.to_json_string());
});
