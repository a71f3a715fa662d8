//! Transformer for profiles that read per-file textures directly.

use super::{copy_records, TransformResult, Transformer};
use crate::assets::{AssetKind, AssetRecord};
use crate::build::BuildContext;
use tracing::debug;

/// Copies every record through unchanged, preserving relative paths.
#[derive(Debug, Clone)]
pub struct PassthroughTransformer {
    profile_id: String,
}

impl PassthroughTransformer {
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self { profile_id: profile_id.into() }
    }
}

impl Transformer for PassthroughTransformer {
    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn required_kinds(&self) -> &[AssetKind] {
        &AssetKind::ALL
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn transform(&self, records: &[AssetRecord], ctx: &BuildContext) -> TransformResult {
        let mut result = TransformResult::new();
        copy_records(records, &ctx.output_dir, &mut result);
        debug!(
            profile = %self.profile_id,
            copied = result.processed.len(),
            failed = result.skipped.len(),
            "passthrough complete"
        );
        result
    }
}
