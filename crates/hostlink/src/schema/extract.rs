// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Full extraction run: walk, classify, patch, operators, fixup.

use super::classify::{classify, describe_function, PendingReferences};
use super::descriptor::{
    MethodDescriptor, OperatorDescriptor, OperatorTable, PropertyDescriptor, Schema, TypeNode,
};
use super::fixup::{resolve_references, FixupReport};
use super::hierarchy::TypeTree;
use super::patch::PatchRegistry;
use super::reflect::{ReflectionSource, TypeHandle};
use super::SchemaError;
use crate::config::SchemaConfig;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub schema: Schema,
    pub fixup: FixupReport,
    /// Chain heads left out of the hierarchy (multiple bases, unknown bases).
    pub detached: Vec<String>,
}

/// Drives one extraction over a reflection source.
pub struct SchemaExtractor<'a> {
    source: &'a dyn ReflectionSource,
    config: &'a SchemaConfig,
    patches: PatchRegistry,
}

impl<'a> SchemaExtractor<'a> {
    /// Extractor with the patches declared in `config`.
    pub fn new(source: &'a dyn ReflectionSource, config: &'a SchemaConfig) -> Self {
        Self::with_patches(source, config, PatchRegistry::from_config(config))
    }

    pub fn with_patches(
        source: &'a dyn ReflectionSource,
        config: &'a SchemaConfig,
        patches: PatchRegistry,
    ) -> Self {
        Self {
            source,
            config,
            patches,
        }
    }

    /// Run the extraction. Any unclassifiable property aborts the whole run.
    ///
    /// Each class starts from its parent's finished properties; entries the host reports
    /// for the class itself replace inherited ones of the same name.
    pub fn extract(&self) -> Result<Extraction, SchemaError> {
        let root = self.config.root_type.as_str();
        let tree = TypeTree::build(self.source);
        let mut pending = PendingReferences::new();
        let mut classes = Vec::with_capacity(tree.len_under(root));
        // Finished property maps by class; parents are always emitted first.
        let mut inherited: HashMap<String, BTreeMap<String, PropertyDescriptor>> = HashMap::new();

        tree.walk(root, |name, parent| {
            let mut node = TypeNode::new(name, parent);
            if let Some(base) = inherited.get(parent) {
                node.properties.clone_from(base);
            }
            if let Some(handle) = self.source.lookup(name) {
                self.describe_members(handle, &mut node, &mut pending)?;
            }
            self.patches.apply(&mut node, &mut pending);
            inherited.insert(name.to_string(), node.properties.clone());
            let collisions = node.collisions();
            if !collisions.is_empty() {
                warn!(type_name = name, names = ?collisions, "property/method name collision");
            }
            classes.push(node);
            Ok::<(), SchemaError>(())
        })?;

        let operators = self.describe_operators(&mut pending)?;
        let mut schema = Schema { classes, operators };
        let fixup = resolve_references(&mut schema, &pending, &self.config.fallback_type)?;
        let detached = tree
            .detached_heads(root)
            .into_iter()
            .map(str::to_string)
            .collect();

        info!(
            classes = schema.classes.len(),
            operator_namespaces = schema.operators.len(),
            rewritten = fixup.total_rewritten(),
            "schema extracted"
        );
        Ok(Extraction {
            schema,
            fixup,
            detached,
        })
    }

    fn skipped(&self, name: &str) -> bool {
        self.config.skip_members.iter().any(|s| s == name)
    }

    fn describe_members(
        &self,
        handle: &dyn TypeHandle,
        node: &mut TypeNode,
        pending: &mut PendingReferences,
    ) -> Result<(), SchemaError> {
        for attr in handle.attributes() {
            if attr.name.starts_with("__") || self.skipped(&attr.name) || !attr.callable {
                continue;
            }
            node.methods
                .insert(attr.name, MethodDescriptor::native(attr.runtime_type));
        }

        let Some(reflection) = handle.reflection() else {
            return Ok(());
        };

        for function in reflection.functions() {
            let name = function.identifier();
            if self.skipped(name) {
                continue;
            }
            let item = describe_function(&node.name, function, pending)?;
            node.methods
                .insert(name.to_string(), MethodDescriptor::reflected(item));
        }

        for prop in reflection.properties() {
            let name = prop.identifier();
            if self.skipped(name) {
                continue;
            }
            let desc = classify(&node.name, prop, pending)?;
            node.properties.insert(name.to_string(), desc);
        }
        Ok(())
    }

    fn describe_operators(&self, pending: &mut PendingReferences) -> Result<OperatorTable, SchemaError> {
        let mut table = OperatorTable::new();
        for namespace in self.source.operator_namespaces() {
            let ns = namespace.name();
            if ns.contains("__") {
                continue;
            }
            let entry: &mut BTreeMap<String, OperatorDescriptor> =
                table.entry(ns.to_string()).or_default();

            for op in namespace.operators() {
                let name = op.name();
                if name.contains("__") {
                    continue;
                }
                let Some(rna) = op.parameters() else {
                    continue;
                };
                let owner = format!("{ns}.{name}");
                let parameters = rna
                    .properties()
                    .into_iter()
                    .filter(|p| {
                        !self
                            .config
                            .skip_operator_properties
                            .iter()
                            .any(|s| s == p.identifier())
                    })
                    .map(|p| classify(&owner, p, pending))
                    .collect::<Result<Vec<_>, _>>()?;

                entry.insert(
                    name.to_string(),
                    OperatorDescriptor {
                        description: rna.description().to_string(),
                        parameters,
                    },
                );
            }
        }
        Ok(table)
    }
}
