//! Build result types.
//!
//! Contains types for representing the outcome of profile builds.

use crate::transform::TransformResult;
use std::path::PathBuf;
use std::time::Duration;

/// A packaged artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

/// Result of building a single profile.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// Profile that was built
    pub profile_id: String,
    /// Transformer result (failed when any stage failed)
    pub result: TransformResult,
    /// Packaged artifact, when packaging ran and succeeded
    pub artifact: Option<Artifact>,
    /// Build duration
    pub duration: Duration,
}

impl BuildOutcome {
    /// Create an outcome without an artifact.
    pub fn new(profile_id: impl Into<String>, result: TransformResult, duration: Duration) -> Self {
        Self { profile_id: profile_id.into(), result, artifact: None, duration }
    }

    /// Create a failed outcome.
    pub fn failed(profile_id: impl Into<String>, error: impl Into<String>, duration: Duration) -> Self {
        Self::new(profile_id, TransformResult::failed(error), duration)
    }

    /// Attach an artifact.
    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    /// Check if this build succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// Error message of a failed build.
    pub fn error(&self) -> Option<&str> {
        self.result.error.as_deref()
    }
}

/// Tally of a multi-profile build run.
#[derive(Debug, Default)]
pub struct BuildSummary {
    /// Outcomes in completion order
    pub outcomes: Vec<BuildOutcome>,
    /// Total wall-clock duration
    pub total_duration: Duration,
}

impl BuildSummary {
    /// Create a new empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a profile outcome.
    pub fn add(&mut self, outcome: BuildOutcome) {
        self.outcomes.push(outcome);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Number of profiles that built successfully.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Number of profiles that failed.
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    /// Check if every profile succeeded.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Failed outcomes.
    pub fn failures(&self) -> Vec<&BuildOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success()).collect()
    }

    /// Artifacts produced.
    pub fn artifacts(&self) -> Vec<&Artifact> {
        self.outcomes.iter().filter_map(|o| o.artifact.as_ref()).collect()
    }

    /// Format a summary of the run.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let failed = self.failed_count();
        let total = self.outcomes.len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} succeeded, {} failed ({} total)",
                success, failed, total
            ));
            for outcome in self.failures() {
                lines.push(format!(
                    "  - {}: {}",
                    outcome.profile_id,
                    outcome.error().unwrap_or("unknown error")
                ));
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} profile(s) in {:?}",
                success, self.total_duration
            ));
        }

        let skipped: usize = self.outcomes.iter().map(|o| o.result.skipped.len()).sum();
        if skipped > 0 {
            lines.push(format!("Skipped entries: {}", skipped));
        }

        lines.join("\n")
    }
}
