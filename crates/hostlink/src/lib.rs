// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hostlink: lets a sandboxed guest discover and drive a reflective host object model.
//!
//! Two halves:
//!
//! - **Schema extraction** ([`schema`]): walks the host's reflectable types, classifies every
//!   property into a closed set of kinds, applies per-type patches and emits a JSON artifact
//!   that guest binding generators consume.
//! - **Marshaling bridge** ([`bridge`]): the four guest-callable host functions (operator call,
//!   method call, attribute read, attribute write). Host objects cross the boundary only as
//!   opaque handles held weakly in a generational pointer table.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hostlink::config::HostlinkConfig;
//! use hostlink::schema::{HostSnapshot, SchemaExtractor};
//!
//! let config = HostlinkConfig::default();
//! let snapshot: HostSnapshot = serde_json::from_str(&dump)?;
//! let extraction = SchemaExtractor::new(&snapshot, &config.schema).extract()?;
//! println!("{}", extraction.schema.to_json_pretty()?);
//! ```
//!
//! ```rust,ignore
//! use hostlink::bridge::{Bridge, WireValue};
//!
//! let bridge = Bridge::new(host, config.bridge);
//! let reply = bridge.get_attribute("name", &args);
//! ```
//!
//! # Configuration File
//!
//! ```toml
//! [schema]
//! root_type = "object"
//! fallback_type = "bpy_struct"
//!
//! [[schema.renames]]
//! type_name = "RenderEngine"
//! property = "render"
//! rename_to = "render_settings"
//!
//! [bridge]
//! config_key = "bpy.data"
//! entry_points = ["objects", "scenes"]
//! failure_policy = "empty"
//! ```

pub mod bridge;
pub mod config;
pub mod schema;

pub use bridge::{
    Bridge, BridgeError, FailurePolicy, Handle, HostError, HostFunction, HostObject, HostRoot,
    HostValue, PointerTable, WireValue,
};
pub use config::{BridgeConfig, ConfigError, HostlinkConfig, SchemaConfig};
pub use schema::{Extraction, HostSnapshot, PropertyDescriptor, Schema, SchemaError, SchemaExtractor};
