// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host-function marshaling bridge.
//!
//! The guest never touches host memory. Objects cross as handles from the
//! [`PointerTable`], values cross as [`WireValue`]s, and the [`Bridge`] exposes the four
//! guest-callable operations.

pub mod dispatch;
pub mod host;
pub mod memory;
pub mod pointer;
pub mod transcode;
pub mod wire;

pub use dispatch::{Bridge, BridgeError, FailurePolicy, HostFunction, HOST_NAMESPACE};
pub use host::{HostCallable, HostError, HostObject, HostRoot, HostValue};
pub use memory::{FnCallable, MemoryHost, MemoryObject};
pub use pointer::{Handle, PointerTable};
pub use transcode::{lift, lower};
pub use wire::WireValue;
