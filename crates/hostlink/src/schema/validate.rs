// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structural checks over a finished schema artifact.

use super::descriptor::Schema;
use std::collections::BTreeSet;
use thiserror::Error;

/// One structural problem in a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("class `{0}` is emitted more than once")]
    DuplicateClass(String),

    #[error("class `{0}` uses the root sentinel as its own name")]
    RootEmitted(String),

    #[error("class `{class}` has parent `{parent}` which is not an earlier class or the root")]
    UnreachableParent { class: String, parent: String },

    #[error("`{owner}` references `{target}` which is not a class")]
    DanglingReference { owner: String, target: String },
}

/// Every class has exactly one parent that is the root or appears earlier in the list.
///
/// This implies the hierarchy is acyclic and every class is reachable from the root.
pub fn check_hierarchy(schema: &Schema, root: &str) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for class in &schema.classes {
        if class.name == root {
            violations.push(Violation::RootEmitted(class.name.clone()));
        }
        if class.parent != root && !seen.contains(class.parent.as_str()) {
            violations.push(Violation::UnreachableParent {
                class: class.name.clone(),
                parent: class.parent.clone(),
            });
        }
        if !seen.insert(class.name.as_str()) {
            violations.push(Violation::DuplicateClass(class.name.clone()));
        }
    }
    violations
}

/// Every pointer/collection target names an emitted class.
pub fn check_references(schema: &Schema) -> Vec<Violation> {
    let known = schema.class_names();
    schema
        .references()
        .into_iter()
        .filter(|(_, r)| !known.contains(r.fixed_type.as_str()))
        .map(|(owner, r)| Violation::DanglingReference {
            owner: owner.to_string(),
            target: r.fixed_type.clone(),
        })
        .collect()
}

/// Both checks.
pub fn validate(schema: &Schema, root: &str) -> Vec<Violation> {
    let mut violations = check_hierarchy(schema, root);
    violations.extend(check_references(schema));
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::descriptor::{PropertyDescriptor, TypeNode};

    #[test]
    fn test_well_formed() {
        let schema = Schema {
            classes: vec![
                TypeNode::new("bpy_struct", "object"),
                TypeNode::new("ID", "bpy_struct"),
            ],
            ..Default::default()
        };
        assert!(validate(&schema, "object").is_empty());
    }

    #[test]
    fn test_child_before_parent_rejected() {
        let schema = Schema {
            classes: vec![
                TypeNode::new("ID", "bpy_struct"),
                TypeNode::new("bpy_struct", "object"),
                TypeNode::new("ID", "bpy_struct"),
            ],
            ..Default::default()
        };
        let violations = check_hierarchy(&schema, "object");
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], Violation::UnreachableParent { .. }));
        assert_eq!(violations[1], Violation::DuplicateClass("ID".into()));
    }

    #[test]
    fn test_dangling_reference_reported() {
        let mut node = TypeNode::new("bpy_struct", "object");
        node.properties.insert(
            "engine".into(),
            PropertyDescriptor::synthetic_reference("engine", "CyclesEngine", false),
        );
        let schema = Schema {
            classes: vec![node],
            ..Default::default()
        };
        let violations = check_references(&schema);
        assert_eq!(
            violations,
            vec![Violation::DanglingReference {
                owner: "bpy_struct".into(),
                target: "CyclesEngine".into()
            }]
        );
        assert!(violations[0].to_string().contains("CyclesEngine"));
    }
}
