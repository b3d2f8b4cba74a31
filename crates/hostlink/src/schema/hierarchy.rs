// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-inheritance hierarchy reconstruction.
//!
//! Every reflectable type contributes the chain of its ancestors, followed upward while
//! each link has exactly one base. Chains are merged into a prefix tree so shared ancestors
//! appear once. Only the subtree under the root sentinel is emitted; chains that end
//! anywhere else (a type with several bases, an unknown base, a cycle) are left out.

use super::reflect::ReflectionSource;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct TreeNode {
    children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    fn insert(&mut self, chain: &[String]) {
        let mut cursor = self;
        for name in chain {
            cursor = cursor.children.entry(name.clone()).or_default();
        }
    }

    fn count(&self) -> usize {
        self.children.values().map(|c| 1 + c.count()).sum()
    }
}

/// Prefix tree of inheritance chains, keyed by chain head.
#[derive(Debug, Default)]
pub struct TypeTree {
    heads: TreeNode,
}

impl TypeTree {
    /// Build the tree from every type the source enumerates.
    pub fn build(source: &dyn ReflectionSource) -> Self {
        let mut tree = Self::default();
        for ty in source.types() {
            if ty.bases().is_empty() {
                continue;
            }
            let chain = ancestor_chain(source, ty.identifier());
            tree.heads.insert(&chain);
        }
        debug!(heads = tree.heads.children.len(), "type tree built");
        tree
    }

    /// Chain heads other than `root`; their subtrees are not emitted.
    pub fn detached_heads(&self, root: &str) -> Vec<&str> {
        self.heads
            .children
            .keys()
            .filter(|k| k.as_str() != root)
            .map(String::as_str)
            .collect()
    }

    /// Number of types reachable under `root`.
    pub fn len_under(&self, root: &str) -> usize {
        self.heads.children.get(root).map_or(0, TreeNode::count)
    }

    /// Depth-first pre-order over the types under `root`: `visit(name, parent)` runs for a
    /// parent before any of its children.
    pub fn walk<E>(
        &self,
        root: &str,
        mut visit: impl FnMut(&str, &str) -> Result<(), E>,
    ) -> Result<(), E> {
        let Some(start) = self.heads.children.get(root) else {
            return Ok(());
        };
        let mut stack: Vec<(&str, &str, &TreeNode)> = start
            .children
            .iter()
            .rev()
            .map(|(name, node)| (name.as_str(), root, node))
            .collect();

        while let Some((name, parent, node)) = stack.pop() {
            visit(name, parent)?;
            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .map(|(child, grand)| (child.as_str(), name, grand)),
            );
        }
        Ok(())
    }

    /// `(name, parent)` pairs in walk order.
    pub fn entries(&self, root: &str) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let _ = self.walk::<()>(root, |name, parent| {
            out.push((name.to_string(), parent.to_string()));
            Ok(())
        });
        out
    }
}

/// Ancestors of `identifier`, head first, ending with `identifier` itself.
fn ancestor_chain(source: &dyn ReflectionSource, identifier: &str) -> Vec<String> {
    let mut chain = vec![identifier.to_string()];
    let mut seen: HashSet<String> = HashSet::from([identifier.to_string()]);
    let mut current = identifier.to_string();

    loop {
        let Some(ty) = source.lookup(&current) else {
            // Base outside the enumerated set: it becomes the head.
            break;
        };
        let bases = ty.bases();
        if bases.len() != 1 {
            break;
        }
        let base = bases[0].to_string();
        if !seen.insert(base.clone()) {
            warn!(type_name = identifier, base = %base, "inheritance cycle, chain dropped");
            chain.push(format!("<cycle:{base}>"));
            break;
        }
        chain.push(base.clone());
        current = base;
    }

    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::snapshot::{HostSnapshot, TypeSnapshot};

    fn host() -> HostSnapshot {
        HostSnapshot::new()
            .with_type(TypeSnapshot::new("bpy_struct").base("object"))
            .with_type(TypeSnapshot::new("ID").base("bpy_struct"))
            .with_type(TypeSnapshot::new("Object").base("ID"))
            .with_type(TypeSnapshot::new("Light").base("Object"))
            .with_type(TypeSnapshot::new("Mesh").base("ID"))
            .with_type(TypeSnapshot::new("Orphan"))
            .with_type(TypeSnapshot::new("Mixed").base("ID").base("Mesh"))
            .with_type(TypeSnapshot::new("UnderMixed").base("Mixed"))
    }

    #[test]
    fn test_walk_parent_before_children() {
        let tree = TypeTree::build(&host());
        let entries = tree.entries("object");
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["bpy_struct", "ID", "Mesh", "Object", "Light"]);

        let parents: BTreeMap<_, _> = entries.iter().map(|(n, p)| (n.as_str(), p.as_str())).collect();
        assert_eq!(parents["bpy_struct"], "object");
        assert_eq!(parents["Light"], "Object");
        assert_eq!(tree.len_under("object"), 5);
    }

    #[test]
    fn test_multi_base_and_orphans_excluded() {
        let tree = TypeTree::build(&host());
        let names: Vec<_> = tree.entries("object").into_iter().map(|(n, _)| n).collect();
        assert!(!names.contains(&"Mixed".to_string()));
        assert!(!names.contains(&"UnderMixed".to_string()));
        assert!(!names.contains(&"Orphan".to_string()));
        assert_eq!(tree.detached_heads("object"), vec!["Mixed"]);
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let host = HostSnapshot::new()
            .with_type(TypeSnapshot::new("A").base("B"))
            .with_type(TypeSnapshot::new("B").base("A"));
        let tree = TypeTree::build(&host);
        assert!(tree.entries("object").is_empty());
    }

    #[test]
    fn test_walk_stops_on_error() {
        let tree = TypeTree::build(&host());
        let mut visited = 0;
        let result = tree.walk("object", |name, _| {
            visited += 1;
            if name == "ID" {
                Err("stop")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(visited, 2);
    }
}
