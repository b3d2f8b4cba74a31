// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-type schema patches.
//!
//! Patches run right after generic extraction has populated a node, for the types they are
//! registered against. Every patch is idempotent: applying it to an already patched node
//! leaves the node unchanged.

use super::classify::PendingReferences;
use super::descriptor::{
    Bounds, FunctionDescriptor, MethodDescriptor, NumericScalar, PropertyCommon,
    PropertyDescriptor, StringDescriptor, TypeNode,
};
use crate::config::{ContextMember, SchemaConfig};
use tracing::debug;

/// A transformation applied to one type node after generic extraction.
pub trait SchemaPatch: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn apply(&self, node: &mut TypeNode, pending: &mut PendingReferences);
}

/// Ordered `(type identifier, patch)` pairs.
#[derive(Default)]
pub struct PatchRegistry {
    patches: Vec<(String, Box<dyn SchemaPatch>)>,
}

impl std::fmt::Debug for PatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.patches.iter().map(|(ty, p)| (ty, p.name())))
            .finish()
    }
}

impl PatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the renames, context members and keyframe method from `config`.
    pub fn from_config(config: &SchemaConfig) -> Self {
        let mut registry = Self::new();
        for rename in &config.renames {
            registry.register(
                &rename.type_name,
                RenameProperty::new(&rename.property, &rename.rename_to),
            );
        }
        if !config.context_type.is_empty() && !config.context_members.is_empty() {
            registry.register(
                &config.context_type,
                ContextMembers::new(config.context_members.clone()),
            );
        }
        if !config.keyframe_type.is_empty() {
            registry.register(
                &config.keyframe_type,
                InjectMethod::new("keyframe_insert", keyframe_insert_method()),
            );
        }
        registry
    }

    pub fn register(&mut self, type_identifier: &str, patch: impl SchemaPatch + 'static) {
        self.patches
            .push((type_identifier.to_string(), Box::new(patch)));
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Apply every patch registered for `node.name`; returns how many ran.
    pub fn apply(&self, node: &mut TypeNode, pending: &mut PendingReferences) -> usize {
        let mut applied = 0;
        for (ty, patch) in &self.patches {
            if *ty == node.name {
                patch.apply(node, pending);
                debug!(type_name = %node.name, patch = patch.name(), "patch applied");
                applied += 1;
            }
        }
        applied
    }
}

// ---------------------------------------------------------------------------
// Collision disambiguation
// ---------------------------------------------------------------------------

/// Moves a property that collides with a method of the same name to a new key.
#[derive(Debug, Clone)]
pub struct RenameProperty {
    property: String,
    rename_to: String,
}

impl RenameProperty {
    pub fn new(property: impl Into<String>, rename_to: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            rename_to: rename_to.into(),
        }
    }
}

impl SchemaPatch for RenameProperty {
    fn name(&self) -> &str {
        "rename-property"
    }

    fn apply(&self, node: &mut TypeNode, _pending: &mut PendingReferences) {
        if !node.methods.contains_key(&self.property) {
            return;
        }
        if let Some(mut prop) = node.properties.remove(&self.property) {
            prop.common_mut().identifier = self.rename_to.clone();
            node.properties.insert(self.rename_to.clone(), prop);
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic context members
// ---------------------------------------------------------------------------

/// Injects the declarative table of context members.
#[derive(Debug, Clone)]
pub struct ContextMembers {
    members: Vec<ContextMember>,
}

impl ContextMembers {
    pub fn new(members: Vec<ContextMember>) -> Self {
        Self { members }
    }
}

impl SchemaPatch for ContextMembers {
    fn name(&self) -> &str {
        "context-members"
    }

    fn apply(&self, node: &mut TypeNode, pending: &mut PendingReferences) {
        for member in &self.members {
            let desc = PropertyDescriptor::synthetic_reference(
                &member.name,
                &member.target,
                member.collection,
            );
            pending.record(&node.name, &member.name, &member.target);
            node.properties.insert(member.name.clone(), desc);
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic methods
// ---------------------------------------------------------------------------

/// Adds (or replaces) a method entry.
#[derive(Debug, Clone)]
pub struct InjectMethod {
    method: String,
    descriptor: MethodDescriptor,
}

impl InjectMethod {
    pub fn new(method: impl Into<String>, descriptor: MethodDescriptor) -> Self {
        Self {
            method: method.into(),
            descriptor,
        }
    }
}

impl SchemaPatch for InjectMethod {
    fn name(&self) -> &str {
        "inject-method"
    }

    fn apply(&self, node: &mut TypeNode, pending: &mut PendingReferences) {
        if let Some(function) = self.descriptor.function() {
            for param in &function.parameters {
                if let Some(r) = param.reference() {
                    pending.record(&node.name, param.identifier(), &r.fixed_type);
                }
            }
        }
        node.methods
            .insert(self.method.clone(), self.descriptor.clone());
    }
}

fn string_param(name: &str, description: &str, required: bool) -> PropertyDescriptor {
    PropertyDescriptor::String(StringDescriptor {
        common: PropertyCommon::new(name, "STRING")
            .with_description(description)
            .required(required),
        length_max: 0,
        default: String::new(),
    })
}

/// `keyframe_insert(data_path, index, frame, group, options)` on every struct.
pub fn keyframe_insert_method() -> MethodDescriptor {
    let int_range = Bounds::uniform(i64::from(i32::MIN), i64::from(i32::MAX));
    let float_range = Bounds::uniform(f64::from(i32::MIN), f64::from(i32::MAX));

    MethodDescriptor::reflected(FunctionDescriptor {
        description: "Insert a keyframe on the property given, adding fcurves and animation data when necessary.".into(),
        use_self: true,
        use_self_type: false,
        parameters: vec![
            string_param(
                "data_path",
                "path to the property to key, analogous to the fcurve's data path.",
                true,
            ),
            PropertyDescriptor::Int(NumericScalar {
                common: PropertyCommon::new("index", "INT")
                    .with_description("array index of the property to key. Defaults to -1 which will key all indices or a single channel if the property is not an array.")
                    .required(false),
                bounds: int_range,
                default: Some(-1),
            }),
            PropertyDescriptor::Float(NumericScalar {
                common: PropertyCommon::new("frame", "FLOAT")
                    .with_description("The frame on which the keyframe is inserted, defaulting to the current frame.")
                    .required(false),
                bounds: float_range,
                default: None,
            }),
            string_param(
                "group",
                "The name of the group the F-Curve should be added to if it doesn't exist yet.",
                false,
            ),
            string_param("options", "Optional set of flags", false),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_engine() -> TypeNode {
        let mut node = TypeNode::new("RenderEngine", "bpy_struct");
        node.properties.insert(
            "render".into(),
            PropertyDescriptor::synthetic_reference("render", "RenderSettings", false),
        );
        node.methods.insert("render".into(), MethodDescriptor::native("function"));
        node
    }

    #[test]
    fn test_rename_resolves_collision() {
        let mut node = render_engine();
        let mut pending = PendingReferences::new();
        let patch = RenameProperty::new("render", "render_settings");
        patch.apply(&mut node, &mut pending);

        assert!(node.collisions().is_empty());
        assert!(!node.properties.contains_key("render"));
        assert_eq!(node.properties["render_settings"].identifier(), "render_settings");
        assert!(node.methods.contains_key("render"));
    }

    #[test]
    fn test_rename_is_idempotent() {
        let mut once = render_engine();
        let mut pending = PendingReferences::new();
        let patch = RenameProperty::new("render", "render_settings");
        patch.apply(&mut once, &mut pending);
        let mut twice = once.clone();
        patch.apply(&mut twice, &mut pending);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rename_skips_without_collision() {
        let mut node = TypeNode::new("Scene", "ID");
        node.properties.insert(
            "render".into(),
            PropertyDescriptor::synthetic_reference("render", "RenderSettings", false),
        );
        RenameProperty::new("render", "render_settings").apply(&mut node, &mut PendingReferences::new());
        assert!(node.properties.contains_key("render"));
    }

    #[test]
    fn test_context_members_idempotent() {
        let members = vec![
            ContextMember::new("active_object", "Object", false),
            ContextMember::new("selected_objects", "Object", true),
        ];
        let patch = ContextMembers::new(members);
        let mut node = TypeNode::new("Context", "bpy_struct");
        let mut pending = PendingReferences::new();

        patch.apply(&mut node, &mut pending);
        let once = node.clone();
        patch.apply(&mut node, &mut pending);

        assert_eq!(node, once);
        assert_eq!(node.properties.len(), 2);
        assert_eq!(node.properties["selected_objects"].kind_tag(), "collection");
        assert_eq!(node.properties["active_object"].common().description, "");
        assert_eq!(pending.iter().next().unwrap().fixed_type, "Object");
    }

    #[test]
    fn test_keyframe_method_shape() {
        let method = keyframe_insert_method();
        let function = method.function().unwrap();
        let names: Vec<_> = function.parameters.iter().map(|p| p.identifier()).collect();
        assert_eq!(names, ["data_path", "index", "frame", "group", "options"]);
        assert!(function.parameters[0].common().flags.is_required);
        assert!(function.parameters[1].common().flags.is_argument_optional);
        match &function.parameters[1] {
            PropertyDescriptor::Int(i) => {
                assert_eq!(i.default, Some(-1));
                assert_eq!(i.bounds.hard_min, -2_147_483_648);
            }
            other => panic!("Expected int, got {other:?}"),
        }
    }

    #[test]
    fn test_registry_applies_by_type() {
        let config = SchemaConfig::default();
        let registry = PatchRegistry::from_config(&config);
        assert_eq!(registry.len(), 3);

        let mut node = render_engine();
        let mut pending = PendingReferences::new();
        assert_eq!(registry.apply(&mut node, &mut pending), 1);
        assert!(node.properties.contains_key("render_settings"));

        let mut other = TypeNode::new("Mesh", "ID");
        assert_eq!(registry.apply(&mut other, &mut pending), 0);
    }
}
