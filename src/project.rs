//! A loaded project: configuration plus the root it was found in.
//!
//! All directory layout decisions live here so the pipeline, watcher and
//! CLI agree on where sources, outputs and artifacts are.

use crate::config::{
    load_config, resolve_path, AtlasConfig, ConfigError, PacksmithConfig, ProfileConfig,
    TransformerKind,
};
use crate::transform::{AtlasSpec, BetaGridTransformer, PassthroughTransformer, TransformerRegistry};
use std::env;
use std::path::{Path, PathBuf};

/// Selector accepted by commands that take `[profile|all]`.
pub const ALL_PROFILES: &str = "all";

/// Name of the scratch root inside the output directory
const SCRATCH_DIR: &str = ".scratch";

#[derive(Debug, Clone)]
pub struct Project {
    config: PacksmithConfig,
    root: PathBuf,
}

impl Project {
    pub fn new(config: PacksmithConfig, root: PathBuf) -> Self {
        Self { config, root }
    }

    /// Load the project from an explicit config file or by discovery.
    ///
    /// The project root is the directory holding `packsmith.toml`, or the
    /// current directory when running on defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, found) = load_config(config_path)?;
        let root = match found.as_deref().and_then(Path::parent) {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => env::current_dir()?,
        };
        Ok(Self::new(config, root))
    }

    pub fn config(&self) -> &PacksmithConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut PacksmithConfig {
        &mut self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_path(&self.root, path)
    }

    /// Source root; loose top-level files here are part of every profile.
    pub fn source_root(&self) -> PathBuf {
        self.resolve(&self.config.project.src)
    }

    pub fn shared_dir(&self) -> PathBuf {
        self.source_root().join(&self.config.project.shared)
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.source_root().join(&self.config.project.versions)
    }

    /// Profile-specific override tree.
    pub fn profile_source_dir(&self, profile_id: &str) -> PathBuf {
        self.versions_dir().join(profile_id)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.resolve(&self.config.project.out)
    }

    pub fn output_dir(&self, profile_id: &str) -> PathBuf {
        self.out_dir().join(profile_id)
    }

    /// Parent of every per-run scratch directory.
    pub fn scratch_root(&self) -> PathBuf {
        self.out_dir().join(SCRATCH_DIR)
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.resolve(&self.config.project.dist)
    }

    pub fn artifact_path(&self, profile_id: &str) -> PathBuf {
        self.dist_dir().join(format!("{}.zip", profile_id))
    }

    pub fn profile(&self, profile_id: &str) -> Result<&ProfileConfig, ConfigError> {
        self.config
            .profiles
            .get(profile_id)
            .ok_or_else(|| ConfigError::UnknownProfile(profile_id.to_string()))
    }

    /// Human description for a profile, falling back to the project's.
    pub fn description(&self, profile_id: &str) -> String {
        match self.config.profiles.get(profile_id) {
            Some(p) if !p.description.is_empty() => p.description.clone(),
            _ => self.config.project.description.clone(),
        }
    }

    pub fn profile_ids(&self) -> Vec<String> {
        self.config.profile_ids()
    }

    /// Expand a `[profile|all]` selector into profile ids.
    pub fn select_profiles(&self, selector: Option<&str>) -> Result<Vec<String>, ConfigError> {
        match selector {
            None | Some(ALL_PROFILES) => Ok(self.profile_ids()),
            Some(id) => {
                self.profile(id)?;
                Ok(vec![id.to_string()])
            }
        }
    }

    /// Where a profile's artifact is installed, if anywhere.
    pub fn deploy_target(&self, profile_id: &str) -> Option<PathBuf> {
        if let Some(path) = self.config.profiles.get(profile_id).and_then(|p| p.deploy_path.as_ref()) {
            return Some(self.resolve(path));
        }
        self.config
            .deploy
            .target_dir
            .as_ref()
            .map(|dir| self.resolve(dir).join(format!("{}.zip", profile_id)))
    }

    fn atlas_spec(&self, atlas: &AtlasConfig) -> AtlasSpec {
        AtlasSpec {
            output: atlas.output.clone(),
            map: atlas.map.as_deref().map(|p| self.resolve(p)),
            layout: atlas.layout,
            kinds: atlas.kinds.clone(),
            placeholder: atlas.placeholder.as_deref().map(|p| self.resolve(p)),
        }
    }

    /// Build the transformer registry from the profile table.
    pub fn transformer_registry(&self) -> TransformerRegistry {
        let mut registry = TransformerRegistry::new();
        for (id, profile) in &self.config.profiles {
            match profile.transformer {
                TransformerKind::BetaGrid if profile.atlases.is_empty() => {
                    registry.register(BetaGridTransformer::new(id.clone()));
                }
                TransformerKind::BetaGrid => {
                    let atlases = profile.atlases.iter().map(|a| self.atlas_spec(a)).collect();
                    registry.register(BetaGridTransformer::with_atlases(id.clone(), atlases));
                }
                TransformerKind::Passthrough => {
                    registry.register(PassthroughTransformer::new(id.clone()));
                }
            }
        }
        registry
    }
}
