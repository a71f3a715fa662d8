//! Per-profile transformers
//!
//! A [`Transformer`] turns the discovered inventory into one profile's output
//! tree. The registry dispatches by profile id; there is no hierarchy beyond
//! the trait itself.

pub mod beta_grid;
pub mod passthrough;
pub mod registry;

pub use beta_grid::*;
pub use passthrough::*;
pub use registry::*;

use crate::assets::{AssetKind, AssetRecord};
use crate::build::BuildContext;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Capability implemented once per profile flavour.
pub trait Transformer: Send + Sync {
    /// Profile this instance was registered for.
    fn profile_id(&self) -> &str;

    /// Asset kinds this transformer consumes. Metadata kinds are always
    /// added by the orchestrator.
    fn required_kinds(&self) -> &[AssetKind];

    /// Whether this transformer can serve `profile_id`.
    fn is_applicable(&self, profile_id: &str) -> bool {
        profile_id == self.profile_id()
    }

    /// Short human-readable name (`beta-grid`, `passthrough`).
    fn name(&self) -> &'static str;

    /// Produce the profile's output under `ctx.output_dir`.
    fn transform(&self, records: &[AssetRecord], ctx: &BuildContext) -> TransformResult;
}

/// Outcome of one profile run.
///
/// `processed` and `skipped` never share an entry. `skipped` holds relative
/// paths of files that failed, logical names missing from the inventory, and
/// atlas outputs that were not written because nothing was staged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformResult {
    pub success: bool,
    /// Relative paths consumed or copied
    pub processed: Vec<String>,
    pub skipped: Vec<String>,
    /// Composite files written, relative to the output directory
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    /// Source files folded into a composite instead of copied loose
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub consumed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransformResult {
    /// An empty successful result, ready to accumulate into.
    pub fn new() -> Self {
        Self { success: true, ..Default::default() }
    }

    /// A failed result with no processed or skipped files.
    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Default::default() }
    }

    /// Record a processed relative path, ignoring duplicates.
    pub fn mark_processed(&mut self, relative_path: &str) {
        if !self.processed.iter().any(|p| p == relative_path) {
            self.processed.push(relative_path.to_string());
        }
    }

    /// Record a skipped entry, ignoring duplicates and anything already processed.
    pub fn mark_skipped(&mut self, entry: &str) {
        if !self.skipped.iter().any(|s| s == entry) && !self.processed.iter().any(|p| p == entry) {
            self.skipped.push(entry.to_string());
        }
    }

    /// Record a source file that a composite output absorbed.
    pub fn mark_consumed(&mut self, relative_path: &str) {
        if !self.was_consumed(relative_path) {
            self.consumed.push(relative_path.to_string());
        }
    }

    /// Whether `relative_path` was folded into a composite.
    pub fn was_consumed(&self, relative_path: &str) -> bool {
        self.consumed.iter().any(|c| c == relative_path)
    }

    /// Whether `relative_path` names a composite this run wrote.
    pub fn is_output(&self, relative_path: &str) -> bool {
        self.outputs.iter().any(|o| o == relative_path)
    }

    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Whether `relative_path` is in the processed list.
    pub fn was_processed(&self, relative_path: &str) -> bool {
        self.processed.iter().any(|p| p == relative_path)
    }
}

/// Copy a file byte-for-byte to `output_dir/relative_path`.
pub fn copy_to_output(source: &Path, output_dir: &Path, relative_path: &str) -> std::io::Result<()> {
    let target = output_dir.join(relative_path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, target)?;
    Ok(())
}

/// Copy every record through, continuing past failures.
pub(crate) fn copy_records<'a>(
    records: impl IntoIterator<Item = &'a AssetRecord>,
    output_dir: &Path,
    result: &mut TransformResult,
) {
    for record in records {
        match copy_to_output(&record.source_path, output_dir, &record.relative_path) {
            Ok(()) => result.mark_processed(&record.relative_path),
            Err(e) => {
                warn!(path = %record.relative_path, error = %e, "copy failed, skipping");
                result.mark_skipped(&record.relative_path);
            }
        }
    }
}
