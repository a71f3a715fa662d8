//! Configuration schema types for `packsmith.toml`
//!
//! Defines the structure and validation rules for a resource-pack project.

use crate::assets::AssetKind;
use crate::atlas::DefaultLayout;
use crate::project::ALL_PROFILES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Which transformer a profile uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TransformerKind {
    /// Legacy grid atlases (`terrain.png`, `gui/items.png`)
    BetaGrid,
    /// Copy every asset through unchanged
    #[default]
    Passthrough,
}

impl std::fmt::Display for TransformerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformerKind::BetaGrid => write!(f, "beta-grid"),
            TransformerKind::Passthrough => write!(f, "passthrough"),
        }
    }
}

/// Project metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,
    /// Human description written into every manifest
    #[serde(default)]
    pub description: String,
    /// Source root
    #[serde(default = "default_src")]
    pub src: PathBuf,
    /// Shared asset tree, relative to `src`
    #[serde(default = "default_shared")]
    pub shared: PathBuf,
    /// Directory of per-profile trees, relative to `src`
    #[serde(default = "default_versions")]
    pub versions: PathBuf,
    /// Build output directory
    #[serde(default = "default_out")]
    pub out: PathBuf,
    /// Packaged artifact directory
    #[serde(default = "default_dist")]
    pub dist: PathBuf,
}

fn default_name() -> String {
    "resource-pack".to_string()
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_shared() -> PathBuf {
    PathBuf::from("shared")
}

fn default_versions() -> PathBuf {
    PathBuf::from("versions")
}

fn default_out() -> PathBuf {
    PathBuf::from("build")
}

fn default_dist() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            description: String::new(),
            src: default_src(),
            shared: default_shared(),
            versions: default_versions(),
            out: default_out(),
            dist: default_dist(),
        }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Deploy each profile after a successful rebuild
    #[serde(default = "default_true")]
    pub deploy: bool,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), deploy: true }
    }
}

/// Deploy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Directory artifacts are installed into (e.g. a game's `resourcepacks`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<PathBuf>,
    /// Keep a timestamped copy of the artifact being replaced
    #[serde(default = "default_true")]
    pub backup: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self { target_dir: None, backup: true }
    }
}

/// One composite atlas of a grid profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Output path relative to the profile output directory
    pub output: String,
    /// Coordinate-map file, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<PathBuf>,
    /// Built-in table used when `map` is absent or missing
    #[serde(default)]
    pub layout: DefaultLayout,
    /// Asset kinds fed to the atlas when `map` is used
    #[serde(default = "default_atlas_kinds")]
    pub kinds: Vec<AssetKind>,
    /// Placeholder asset for `unused` cells
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PathBuf>,
}

fn default_atlas_kinds() -> Vec<AssetKind> {
    vec![AssetKind::BlockTexture]
}

/// A build target profile
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileConfig {
    /// Human description, written into the artifact manifest
    #[serde(default)]
    pub description: String,
    /// Transformer flavour
    #[serde(default)]
    pub transformer: TransformerKind,
    /// Explicit deploy destination, overriding `[deploy].target_dir`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_path: Option<PathBuf>,
    /// Atlas definitions; empty means the classic terrain + items pair
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub atlases: Vec<AtlasConfig>,
}

/// Complete packsmith.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PacksmithConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
    /// Profiles keyed by id
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "profiles.b1.7.3.atlases[0].output")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "packsmith.toml: '{}' {}", self.field, self.message)
    }
}

impl PacksmithConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: String, message: &str| {
            errors.push(ConfigValidationError { field, message: message.to_string() });
        };

        if self.project.name.is_empty() {
            push("project.name".to_string(), "must be a non-empty string");
        }
        if self.project.shared == self.project.versions {
            push("project.versions".to_string(), "must differ from project.shared");
        }
        if self.watch.debounce_ms == 0 {
            push("watch.debounce_ms".to_string(), "must be a positive integer");
        }

        for (id, profile) in &self.profiles {
            if id.trim().is_empty() || id.contains(['/', '\\']) {
                push(format!("profiles.{}", id), "id must be non-empty and contain no path separators");
            } else if id.trim().starts_with('.') {
                push(format!("profiles.{}", id), "id must not start with '.'");
            } else if id.trim() == ALL_PROFILES {
                push(format!("profiles.{}", id), "id 'all' is reserved for selecting every profile");
            }
            if profile.transformer == TransformerKind::Passthrough && !profile.atlases.is_empty() {
                push(format!("profiles.{}.atlases", id), "only beta-grid profiles compose atlases");
            }
            for (i, atlas) in profile.atlases.iter().enumerate() {
                if atlas.output.is_empty() {
                    push(format!("profiles.{}.atlases[{}].output", id, i), "must be a non-empty path");
                } else if Path::new(&atlas.output).components().any(|c| !matches!(c, Component::Normal(_))) {
                    push(
                        format!("profiles.{}.atlases[{}].output", id, i),
                        "must be a relative path inside the output directory",
                    );
                }
                if atlas.kinds.iter().any(|k| !k.is_texture()) {
                    push(format!("profiles.{}.atlases[{}].kinds", id, i), "must list texture kinds only");
                }
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Profile ids in sorted order
    pub fn profile_ids(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }
}
