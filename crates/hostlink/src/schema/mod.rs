// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reflection-driven schema extraction.
//!
//! Pipeline: [`hierarchy`] rebuilds the single-inheritance tree, [`classify`] turns each
//! reflected property into a [`PropertyDescriptor`], [`patch`] applies per-type overrides,
//! and [`fixup`] redirects references to types that were never emitted. [`extract`] runs
//! the whole thing; [`validate`] checks a finished artifact.

pub mod classify;
pub mod descriptor;
pub mod extract;
pub mod fixup;
pub mod hierarchy;
pub mod patch;
pub mod reflect;
pub mod snapshot;
pub mod validate;

pub use classify::{classify, PendingReferences, ReflectedKind};
pub use descriptor::{
    EnumItem, FunctionDescriptor, MethodDescriptor, OperatorDescriptor, PropertyCommon,
    PropertyDescriptor, PropertyFlags, ReferenceDescriptor, Schema, TypeNode,
};
pub use extract::{Extraction, SchemaExtractor};
pub use fixup::FixupReport;
pub use hierarchy::TypeTree;
pub use patch::{PatchRegistry, SchemaPatch};
pub use reflect::ReflectionSource;
pub use snapshot::HostSnapshot;
pub use validate::Violation;

use thiserror::Error;

/// Schema extraction errors. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("unexpected property kind `{kind}` for {owner}.{property}")]
    UnexpectedKind {
        owner: String,
        property: String,
        kind: String,
    },

    #[error("fallback type `{0}` is not part of the extracted hierarchy")]
    MissingFallback(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
