// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reference fixup pass.
//!
//! Runs once the walk is complete, when the full set of emitted classes is known. The
//! targets recorded during extraction that did not become classes are the unresolved set;
//! every pointer or collection naming one of them is redirected to the fallback base type.
//! References that were never recorded are left alone for [`validate`](super::validate)
//! to report.

use super::classify::PendingReferences;
use super::descriptor::Schema;
use super::SchemaError;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// What the fixup pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixupReport {
    /// References recorded during extraction.
    pub recorded: usize,
    /// Original target -> number of descriptors rewritten to the fallback.
    pub rewritten: BTreeMap<String, usize>,
}

impl FixupReport {
    pub fn total_rewritten(&self) -> usize {
        self.rewritten.values().sum()
    }
}

/// Redirect every reference to a recorded-but-unresolved target in `schema` to `fallback`.
///
/// Fails with [`SchemaError::MissingFallback`] when `fallback` is not itself an emitted
/// class, since the rewritten references would dangle too.
pub fn resolve_references(
    schema: &mut Schema,
    pending: &PendingReferences,
    fallback: &str,
) -> Result<FixupReport, SchemaError> {
    let known: BTreeSet<String> = schema.class_names().into_iter().map(str::to_string).collect();
    if !known.contains(fallback) {
        return Err(SchemaError::MissingFallback(fallback.to_string()));
    }

    let mut report = FixupReport {
        recorded: pending.len(),
        ..Default::default()
    };

    let mut unresolved: BTreeSet<&str> = BTreeSet::new();
    for reference in pending.iter().filter(|r| !known.contains(&r.fixed_type)) {
        debug!(
            owner = %reference.owner,
            property = %reference.property,
            target = %reference.fixed_type,
            "unresolved reference"
        );
        unresolved.insert(reference.fixed_type.as_str());
    }
    if unresolved.is_empty() {
        return Ok(report);
    }

    for reference in schema.references_mut() {
        if unresolved.contains(reference.fixed_type.as_str()) {
            let original = std::mem::replace(&mut reference.fixed_type, fallback.to_string());
            *report.rewritten.entry(original).or_default() += 1;
        }
    }

    if !report.rewritten.is_empty() {
        warn!(
            targets = report.rewritten.len(),
            descriptors = report.total_rewritten(),
            fallback,
            "references redirected to fallback type"
        );
    }
    Ok(report)
}
