//! Build pipeline orchestration.
//!
//! The pipeline runs one profile end to end: discovery, kind filtering,
//! transformation inside a private scratch directory, reconciliation of
//! profile-specific files and, for full builds, packaging.

use super::{Artifact, BuildContext, BuildOutcome, ProfileBuilder};
use crate::assets::{discover, discover_top_level, AssetKind, Inventory};
use crate::package::{package_dir, Manifest, PackageError};
use crate::project::Project;
use crate::transform::{copy_to_output, TransformResult, Transformer, TransformerRegistry};
use chrono::Utc;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Error during a profile run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    #[error("No transformer registered for profile '{0}'")]
    NoTransformer(String),
    #[error("Transformer '{name}' is not applicable to profile '{profile}'")]
    NotApplicable { name: String, profile: String },
    #[error("Failed to prepare output directory '{path}': {source}")]
    Output { path: PathBuf, source: io::Error },
    #[error("Failed to create scratch directory in '{path}': {source}")]
    Scratch { path: PathBuf, source: io::Error },
    #[error("Packaging failed: {0}")]
    Package(#[from] PackageError),
}

/// Orchestrates profile runs for one project.
#[derive(Debug, Clone)]
pub struct Pipeline {
    project: Project,
    registry: TransformerRegistry,
    package: bool,
}

impl Pipeline {
    /// Create a pipeline with the project's own transformer registry.
    pub fn new(project: Project) -> Self {
        let registry = project.transformer_registry();
        Self::with_registry(project, registry)
    }

    /// Create a pipeline with an explicit registry.
    pub fn with_registry(project: Project, registry: TransformerRegistry) -> Self {
        Self { project, registry, package: true }
    }

    /// Enable or disable packaging after a successful transform.
    pub fn with_packaging(mut self, package: bool) -> Self {
        self.package = package;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn registry(&self) -> &TransformerRegistry {
        &self.registry
    }

    /// Discover the shared tree plus loose files at the source root.
    ///
    /// Shared records win over loose files with the same relative path.
    pub fn discover_sources(&self) -> Inventory {
        let mut inventory = discover(&self.project.shared_dir());
        inventory.merge(discover_top_level(&self.project.source_root()));
        inventory
    }

    /// Run one profile into `output_dir`.
    ///
    /// Never fails outright: every error is reported as a failed
    /// [`TransformResult`]. An unknown profile touches nothing on disk.
    pub fn process_profile(&self, profile_id: &str, output_dir: &Path) -> TransformResult {
        match panic::catch_unwind(AssertUnwindSafe(|| self.run(profile_id, output_dir))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(profile = %profile_id, error = %e, "profile run failed");
                TransformResult::failed(e.to_string())
            }
            Err(_) => {
                error!(profile = %profile_id, "profile run panicked");
                TransformResult::failed(format!("profile '{}' panicked during transform", profile_id))
            }
        }
    }

    fn resolve(&self, profile_id: &str) -> Result<std::sync::Arc<dyn Transformer>, PipelineError> {
        let transformer =
            self.registry.get(profile_id).ok_or_else(|| PipelineError::NoTransformer(profile_id.to_string()))?;
        if !transformer.is_applicable(profile_id) {
            return Err(PipelineError::NotApplicable {
                name: transformer.name().to_string(),
                profile: profile_id.to_string(),
            });
        }
        Ok(transformer)
    }

    fn run(&self, profile_id: &str, output_dir: &Path) -> Result<TransformResult, PipelineError> {
        let transformer = self.resolve(profile_id)?;

        let inventory = self.discover_sources();
        if !inventory.failures.is_empty() {
            warn!(profile = %profile_id, count = inventory.failures.len(), "some source files could not be read");
        }

        let mut kinds = transformer.required_kinds().to_vec();
        for kind in AssetKind::METADATA {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        let records = inventory.filter_kinds(&kinds);
        debug!(
            profile = %profile_id,
            transformer = transformer.name(),
            discovered = inventory.records.len(),
            selected = records.len(),
            "inventory filtered"
        );

        recreate_dir(output_dir)?;

        let scratch_root = self.project.scratch_root();
        fs::create_dir_all(&scratch_root)
            .map_err(|source| PipelineError::Scratch { path: scratch_root.clone(), source })?;
        let started_at = Utc::now();
        let scratch = tempfile::Builder::new()
            .prefix(&BuildContext::scratch_prefix(profile_id, started_at))
            .tempdir_in(&scratch_root)
            .map_err(|source| PipelineError::Scratch { path: scratch_root.clone(), source })?;

        let mut ctx = BuildContext::new(profile_id, self.project.shared_dir(), output_dir, scratch.path());
        ctx.started_at = started_at;

        let mut result = transformer.transform(&records, &ctx);

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(profile = %profile_id, path = %scratch_path.display(), error = %e, "failed to remove scratch directory");
        }

        if result.is_success() {
            self.reconcile(profile_id, output_dir, &mut result);
        }
        Ok(result)
    }

    /// Copy profile-specific files over the transform's output.
    ///
    /// Overrides replace copied-through shared files. Sources folded into a
    /// composite and the composites themselves are left alone.
    fn reconcile(&self, profile_id: &str, output_dir: &Path, result: &mut TransformResult) {
        let profile_dir = self.project.profile_source_dir(profile_id);
        let overrides = discover(&profile_dir);
        for record in &overrides.records {
            let rel = record.relative_path.as_str();
            if result.was_consumed(rel) || result.is_output(rel) {
                debug!(profile = %profile_id, path = %rel, "owned by a composite, not copied");
                continue;
            }
            match copy_to_output(&record.source_path, output_dir, rel) {
                Ok(()) => {
                    if result.was_processed(rel) {
                        debug!(profile = %profile_id, path = %rel, "override replaced shared file");
                    }
                    result.skipped.retain(|s| s != rel);
                    result.mark_processed(rel);
                }
                Err(e) => {
                    warn!(profile = %profile_id, path = %rel, error = %e, "copy failed, skipping");
                    result.mark_skipped(rel);
                }
            }
        }
    }

    /// Build, then package on success.
    pub fn build(&self, profile_id: &str) -> BuildOutcome {
        let start = Instant::now();
        let output_dir = self.project.output_dir(profile_id);
        let mut result = self.process_profile(profile_id, &output_dir);

        let mut artifact = None;
        if result.is_success() && self.package {
            let path = self.project.artifact_path(profile_id);
            let manifest = Manifest::new(profile_id, self.project.description(profile_id));
            match package_dir(&output_dir, &path, &manifest) {
                Ok(size) => artifact = Some(Artifact { path, size }),
                Err(e) => {
                    let e = PipelineError::from(e);
                    error!(profile = %profile_id, error = %e, "packaging failed");
                    result.success = false;
                    result.error = Some(e.to_string());
                }
            }
        }

        let outcome = BuildOutcome { profile_id: profile_id.to_string(), result, artifact, duration: start.elapsed() };
        info!(
            profile = %profile_id,
            success = outcome.is_success(),
            processed = outcome.result.processed.len(),
            skipped = outcome.result.skipped.len(),
            "profile built"
        );
        outcome
    }
}

impl ProfileBuilder for Pipeline {
    fn build_profile(&self, profile_id: &str) -> BuildOutcome {
        self.build(profile_id)
    }
}

fn recreate_dir(dir: &Path) -> Result<(), PipelineError> {
    let wrap = |source| PipelineError::Output { path: dir.to_path_buf(), source };
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(wrap)?;
    }
    fs::create_dir_all(dir).map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PacksmithConfig;
    use crate::transform::PassthroughTransformer;
    use tempfile::TempDir;

    fn project(root: &Path) -> Project {
        Project::new(PacksmithConfig::default(), root.to_path_buf())
    }

    fn write(root: &Path, rel: &str, bytes: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_unknown_profile_fails_without_side_effects() {
        let temp = TempDir::new().unwrap();
        let pipeline = Pipeline::with_registry(project(temp.path()), TransformerRegistry::new());
        let out = temp.path().join("build/nonexistent");

        let result = pipeline.process_profile("nonexistent", &out);
        assert!(!result.is_success());
        assert!(result.processed.is_empty());
        assert!(result.skipped.is_empty());
        assert!(result.error.unwrap().contains("nonexistent"));
        assert!(!temp.path().join("build").exists());
    }

    #[test]
    fn test_shared_and_loose_files_are_combined() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/shared/block/stone.png", b"stone");
        write(temp.path(), "src/pack.mcmeta", b"{}");
        write(temp.path(), "src/versions/1.20/ignored-by-discovery.txt", b"x");

        let mut registry = TransformerRegistry::new();
        registry.register(PassthroughTransformer::new("1.20"));
        let pipeline = Pipeline::with_registry(project(temp.path()), registry);
        let out = temp.path().join("build/1.20");

        let result = pipeline.process_profile("1.20", &out);
        assert!(result.is_success());
        assert!(result.was_processed("block/stone.png"));
        assert!(result.was_processed("pack.mcmeta"));
        assert!(out.join("pack.mcmeta").exists());
    }

    #[test]
    fn test_profile_files_reconciled_after_transform() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/shared/block/stone.png", b"shared");
        write(temp.path(), "src/versions/1.20/block/stone.png", b"override");
        write(temp.path(), "src/versions/1.20/lang/en_us.lang", b"lang");

        let mut registry = TransformerRegistry::new();
        registry.register(PassthroughTransformer::new("1.20"));
        let pipeline = Pipeline::with_registry(project(temp.path()), registry);
        let out = temp.path().join("build/1.20");

        let result = pipeline.process_profile("1.20", &out);
        assert!(result.was_processed("lang/en_us.lang"));
        assert_eq!(fs::read(out.join("lang/en_us.lang")).unwrap(), b"lang");
        // The profile's copy replaces the shared one
        assert_eq!(fs::read(out.join("block/stone.png")).unwrap(), b"override");
        assert_eq!(result.processed.iter().filter(|p| *p == "block/stone.png").count(), 1);
    }

    struct ExplodingTransformer;

    impl Transformer for ExplodingTransformer {
        fn profile_id(&self) -> &str {
            "1.20"
        }

        fn required_kinds(&self) -> &[AssetKind] {
            &AssetKind::ALL
        }

        fn name(&self) -> &'static str {
            "exploding"
        }

        fn transform(&self, _records: &[crate::assets::AssetRecord], _ctx: &BuildContext) -> TransformResult {
            panic!("transformer exploded");
        }
    }

    #[test]
    fn test_panicking_transform_becomes_failed_result() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/shared/a.png", b"a");

        let mut registry = TransformerRegistry::new();
        registry.register(ExplodingTransformer);
        let pipeline = Pipeline::with_registry(project(temp.path()), registry);

        let outcome = pipeline.build("1.20");
        assert!(!outcome.is_success());
        assert!(outcome.error().unwrap().contains("panicked"));
        assert!(outcome.artifact.is_none());
        // Scratch dir is still cleaned up on unwind
        assert_eq!(fs::read_dir(temp.path().join("build/.scratch")).unwrap().count(), 0);
    }

    #[test]
    fn test_output_dir_is_recreated_and_scratch_removed() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/shared/block/stone.png", b"stone");
        write(temp.path(), "build/1.20/stale.txt", b"old");

        let mut registry = TransformerRegistry::new();
        registry.register(PassthroughTransformer::new("1.20"));
        let pipeline = Pipeline::with_registry(project(temp.path()), registry);

        let result = pipeline.process_profile("1.20", &temp.path().join("build/1.20"));
        assert!(result.is_success());
        assert!(!temp.path().join("build/1.20/stale.txt").exists());
        let leftovers = fs::read_dir(temp.path().join("build/.scratch")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_build_packages_artifact() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/shared/block/stone.png", b"stone");

        let mut registry = TransformerRegistry::new();
        registry.register(PassthroughTransformer::new("1.20"));
        let pipeline = Pipeline::with_registry(project(temp.path()), registry);

        let outcome = pipeline.build("1.20");
        assert!(outcome.is_success());
        let artifact = outcome.artifact.unwrap();
        assert_eq!(artifact.path, temp.path().join("dist/1.20.zip"));
        assert!(artifact.size > 0);
    }

    #[test]
    fn test_build_without_packaging() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/shared/a.png", b"a");

        let mut registry = TransformerRegistry::new();
        registry.register(PassthroughTransformer::new("1.20"));
        let pipeline = Pipeline::with_registry(project(temp.path()), registry).with_packaging(false);

        let outcome = pipeline.build("1.20");
        assert!(outcome.is_success());
        assert!(outcome.artifact.is_none());
        assert!(!temp.path().join("dist").exists());
    }
}
