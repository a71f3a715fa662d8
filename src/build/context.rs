//! Per-run build context.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Paths and timing for one profile run.
///
/// Created fresh by the orchestrator for every run and dropped when the run
/// ends. The scratch directory belongs to this run alone.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Profile being built
    pub profile_id: String,
    /// Shared source tree
    pub source_dir: PathBuf,
    /// Profile output directory
    pub output_dir: PathBuf,
    /// Run-private staging directory
    pub scratch_dir: PathBuf,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
}

impl BuildContext {
    /// Create a new build context stamped with the current time.
    pub fn new(
        profile_id: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            scratch_dir: scratch_dir.into(),
            started_at: Utc::now(),
        }
    }

    /// Resolve a path relative to the output directory.
    pub fn output_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.output_dir.join(relative)
    }

    /// Prefix for this run's scratch directory: profile plus start time.
    ///
    /// Path separators in the profile id are replaced so the prefix is
    /// always a single path component.
    pub fn scratch_prefix(profile_id: &str, started_at: DateTime<Utc>) -> String {
        let safe: String = profile_id
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        format!("{}-{}-", safe, started_at.format("%Y%m%dT%H%M%S%3f"))
    }
}
