// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! hostlink configuration.
//!
//! Supports both programmatic and file-based (TOML) configuration. Every field has a
//! default, so an empty file yields the stock setup.

use crate::bridge::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostlinkConfig {
    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl HostlinkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schema.validate()?;
        self.bridge.validate()
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Schema extraction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Sentinel at the top of every inheritance chain. Never emitted as a class.
    #[serde(default = "default_root_type")]
    pub root_type: String,

    /// Universal base type that dangling references are redirected to.
    #[serde(default = "default_fallback_type")]
    pub fallback_type: String,

    /// Member names never emitted as properties or methods.
    #[serde(default = "default_skip_members")]
    pub skip_members: Vec<String>,

    /// Operator parameters never emitted.
    #[serde(default = "default_skip_operator_properties")]
    pub skip_operator_properties: Vec<String>,

    /// Type receiving `context_members`.
    #[serde(default = "default_context_type")]
    pub context_type: String,

    /// Type receiving the synthetic `keyframe_insert` method (empty disables it).
    #[serde(default = "default_fallback_type")]
    pub keyframe_type: String,

    #[serde(default = "default_renames")]
    pub renames: Vec<PropertyRename>,

    #[serde(default = "default_context_members")]
    pub context_members: Vec<ContextMember>,
}

fn default_root_type() -> String {
    "object".to_string()
}

fn default_fallback_type() -> String {
    "bpy_struct".to_string()
}

fn default_skip_members() -> Vec<String> {
    vec!["bl_rna".to_string()]
}

fn default_skip_operator_properties() -> Vec<String> {
    vec!["rna_type".to_string()]
}

fn default_context_type() -> String {
    "Context".to_string()
}

fn default_renames() -> Vec<PropertyRename> {
    vec![PropertyRename::new("RenderEngine", "render", "render_settings")]
}

fn default_context_members() -> Vec<ContextMember> {
    CONTEXT_MEMBERS
        .iter()
        .map(|&(name, target, collection)| ContextMember::new(name, target, collection))
        .collect()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            root_type: default_root_type(),
            fallback_type: default_fallback_type(),
            skip_members: default_skip_members(),
            skip_operator_properties: default_skip_operator_properties(),
            context_type: default_context_type(),
            keyframe_type: default_fallback_type(),
            renames: default_renames(),
            context_members: default_context_members(),
        }
    }
}

impl SchemaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_type.is_empty() {
            return Err(ConfigError::Invalid("schema.root_type is empty".into()));
        }
        if self.fallback_type.is_empty() {
            return Err(ConfigError::Invalid("schema.fallback_type is empty".into()));
        }
        if self.fallback_type == self.root_type {
            return Err(ConfigError::Invalid(format!(
                "schema.fallback_type `{}` is the root sentinel, which is never emitted",
                self.fallback_type
            )));
        }

        for (i, member) in self.context_members.iter().enumerate() {
            if member.name.is_empty() || member.target.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Context member {} has an empty name or target",
                    i
                )));
            }
        }

        for rename in &self.renames {
            if rename.property.is_empty() || rename.rename_to.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Rename on {} has an empty property name",
                    rename.type_name
                )));
            }
            if rename.property == rename.rename_to {
                return Err(ConfigError::Invalid(format!(
                    "Rename {}.{} maps to itself",
                    rename.type_name, rename.property
                )));
            }
        }

        Ok(())
    }
}

/// Rename of a property that collides with a method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRename {
    pub type_name: String,
    pub property: String,
    pub rename_to: String,
}

impl PropertyRename {
    pub fn new(type_name: &str, property: &str, rename_to: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            property: property.to_string(),
            rename_to: rename_to.to_string(),
        }
    }
}

/// Context member that reflection cannot discover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMember {
    pub name: String,
    /// Referenced type identifier.
    pub target: String,
    #[serde(default)]
    pub collection: bool,
}

impl ContextMember {
    pub fn new(name: &str, target: &str, collection: bool) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            collection,
        }
    }
}

/// Stock context members: (name, target type, is collection).
///
/// Bone-related members are absent: their types have multiple bases and never make it
/// into the hierarchy.
const CONTEXT_MEMBERS: &[(&str, &str, bool)] = &[
    ("active_action", "Action", false),
    ("active_annotation_layer", "GPencilLayer", false),
    ("active_file", "FileSelectEntry", false),
    ("active_gpencil_layer", "GPencilLayer", true),
    ("active_node", "Node", false),
    ("active_object", "Object", false),
    ("active_operator", "Operator", false),
    ("active_sequence_strip", "Sequence", false),
    ("active_editable_fcurve", "FCurve", false),
    ("active_nla_strip", "NlaStrip", false),
    ("active_nla_track", "NlaTrack", false),
    ("annotation_data", "GreasePencil", false),
    ("annotation_data_owner", "ID", false),
    ("armature", "Armature", false),
    ("asset_library_reference", "AssetLibraryReference", false),
    ("brush", "Brush", false),
    ("camera", "Camera", false),
    ("cloth", "ClothModifier", false),
    ("collection", "Collection", false),
    ("collision", "CollisionModifier", false),
    ("curve", "Curve", false),
    ("dynamic_paint", "DynamicPaintModifier", false),
    ("edit_image", "Image", false),
    ("edit_mask", "Mask", false),
    ("edit_movieclip", "MovieClip", false),
    ("edit_object", "Object", false),
    ("edit_text", "Text", false),
    ("editable_gpencil_strokes", "GPencilStroke", true),
    ("editable_objects", "Object", true),
    ("editable_fcurves", "FCurve", true),
    ("gpencil", "GreasePencil", false),
    ("gpencil_data", "GreasePencil", false),
    ("gpencil_data_owner", "ID", false),
    ("id", "ID", false),
    ("image_paint_object", "Object", false),
    ("lattice", "Lattice", false),
    ("light", "Light", false),
    ("lightprobe", "LightProbe", false),
    ("line_style", "FreestyleLineStyle", false),
    ("material", "Material", false),
    ("material_slot", "MaterialSlot", false),
    ("mesh", "Mesh", false),
    ("meta_ball", "MetaBall", false),
    ("object", "Object", false),
    ("objects_in_mode", "Object", true),
    ("objects_in_mode_unique_data", "Object", true),
    ("particle_edit_object", "Object", false),
    ("particle_settings", "ParticleSettings", false),
    ("particle_system", "ParticleSystem", false),
    ("particle_system_editable", "ParticleSystem", false),
    ("property", "ID", false),
    ("pointcloud", "PointCloud", false),
    ("pose_object", "Object", false),
    ("scene", "Scene", false),
    ("sculpt_object", "Object", false),
    ("selectable_objects", "Object", true),
    ("selected_assets", "AssetRepresentation", true),
    ("selected_editable_actions", "Action", true),
    ("selected_editable_fcurves", "FCurve", true),
    ("selected_editable_keyframes", "Keyframe", true),
    ("selected_editable_objects", "Object", true),
    ("selected_editable_sequences", "Sequence", true),
    ("selected_files", "FileSelectEntry", true),
    ("selected_ids", "ID", true),
    ("selected_nla_strips", "NlaStrip", true),
    ("selected_movieclip_tracks", "MovieTrackingTrack", true),
    ("selected_nodes", "Node", true),
    ("selected_objects", "Object", true),
    ("selected_sequences", "Sequence", true),
    ("selected_visible_actions", "Action", true),
    ("selected_visible_fcurves", "FCurve", true),
    ("sequences", "Sequence", true),
    ("soft_body", "SoftBodyModifier", false),
    ("speaker", "Speaker", false),
    ("texture", "Texture", false),
    ("texture_slot", "TextureSlot", false),
    ("texture_user", "ID", false),
    ("texture_user_property", "Property", false),
    ("vertex_paint_object", "Object", false),
    ("view_layer", "ViewLayer", false),
    ("visible_gpencil_layers", "GPencilLayer", true),
    ("visible_objects", "Object", true),
    ("visible_fcurves", "FCurve", true),
    ("weight_paint_object", "Object", false),
    ("volume", "Volume", false),
    ("world", "World", false),
];

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Marshaling bridge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Key under which the entry-point handle map is handed to the guest.
    #[serde(default = "default_config_key")]
    pub config_key: String,

    /// Top-level host objects registered before the guest starts.
    #[serde(default = "default_entry_points")]
    pub entry_points: Vec<String>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Pointer table size at which dead entries are swept.
    #[serde(default = "default_sweep_threshold")]
    pub sweep_threshold: usize,
}

fn default_config_key() -> String {
    "bpy.data".to_string()
}

fn default_entry_points() -> Vec<String> {
    ENTRY_POINTS.iter().map(|s| (*s).to_string()).collect()
}

fn default_sweep_threshold() -> usize {
    1024
}

const ENTRY_POINTS: &[&str] = &[
    "context",
    "actions",
    "armatures",
    "brushes",
    "cache_files",
    "cameras",
    "collections",
    "curves",
    "fonts",
    "grease_pencils",
    "hair_curves",
    "images",
    "lattices",
    "libraries",
    "lightprobes",
    "lights",
    "linestyles",
    "masks",
    "materials",
    "meshes",
    "metaballs",
    "movieclips",
    "node_groups",
    "objects",
    "paint_curves",
    "palettes",
    "particles",
    "pointclouds",
    "scenes",
    "screens",
    "shape_keys",
    "sounds",
    "speakers",
    "texts",
    "textures",
    "volumes",
    "window_managers",
    "workspaces",
    "worlds",
];

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            config_key: default_config_key(),
            entry_points: default_entry_points(),
            failure_policy: FailurePolicy::default(),
            sweep_threshold: default_sweep_threshold(),
        }
    }
}

impl BridgeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.config_key.is_empty() {
            return Err(ConfigError::Invalid("bridge.config_key is empty".into()));
        }
        if self.sweep_threshold == 0 {
            return Err(ConfigError::Invalid(
                "bridge.sweep_threshold must be at least 1".into(),
            ));
        }
        if let Some(empty) = self.entry_points.iter().position(String::is_empty) {
            return Err(ConfigError::Invalid(format!(
                "Entry point {} has an empty name",
                empty
            )));
        }
        Ok(())
    }
}
