//! Install built artifacts into their deploy target.

use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeployError {
    /// Neither `deploy_path` nor `[deploy].target_dir` is configured
    #[error("No deploy target configured for profile '{0}'")]
    NoTarget(String),
    /// The profile has not been packaged yet
    #[error("Artifact '{0}' not found; run `packsmith build` first")]
    MissingArtifact(PathBuf),
    #[error("IO error for '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// What a deploy did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub target: PathBuf,
    /// Copy of the previous artifact, when one was replaced
    pub backup: Option<PathBuf>,
    pub bytes: u64,
}

/// Copies artifacts to targets, optionally backing up what it replaces.
#[derive(Debug, Clone, Copy)]
pub struct Deployer {
    backup: bool,
}

impl Deployer {
    pub fn new(backup: bool) -> Self {
        Self { backup }
    }

    /// Deploy `artifact` for `profile_id` to `target`.
    ///
    /// An existing file at `target` is first copied to a timestamped
    /// `.bak` sibling when backups are enabled.
    pub fn deploy(&self, profile_id: &str, artifact: &Path, target: Option<&Path>) -> Result<DeployReport, DeployError> {
        let target = target.ok_or_else(|| DeployError::NoTarget(profile_id.to_string()))?;
        if !artifact.is_file() {
            return Err(DeployError::MissingArtifact(artifact.to_path_buf()));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| DeployError::Io { path: parent.to_path_buf(), source })?;
        }

        let backup = if self.backup && target.is_file() {
            let path = backup_path(target, Local::now());
            fs::copy(target, &path).map_err(|source| DeployError::Io { path: path.clone(), source })?;
            Some(path)
        } else {
            None
        };

        let bytes =
            fs::copy(artifact, target).map_err(|source| DeployError::Io { path: target.to_path_buf(), source })?;
        info!(profile = %profile_id, target = %target.display(), bytes, "deployed");

        Ok(DeployReport { target: target.to_path_buf(), backup, bytes })
    }
}

/// Backup name for `target`: `<stem>-<YYYYmmdd-HHMMSS>.<ext>.bak`.
pub fn backup_path(target: &Path, at: DateTime<Local>) -> PathBuf {
    let stem = target.file_stem().and_then(|s| s.to_str()).unwrap_or("artifact");
    let stamp = at.format("%Y%m%d-%H%M%S");
    let name = match target.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}-{}.{}.bak", stem, stamp, ext),
        None => format!("{}-{}.bak", stem, stamp),
    };
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path_format() {
        let at = Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(
            backup_path(Path::new("/packs/b1.7.3.zip"), at),
            PathBuf::from("/packs/b1.7.3-20240506-070809.zip.bak")
        );
        assert_eq!(backup_path(Path::new("/packs/pack"), at), PathBuf::from("/packs/pack-20240506-070809.bak"));
    }

    #[test]
    fn test_deploy_without_target() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("a.zip");
        fs::write(&artifact, b"zip").unwrap();

        let result = Deployer::new(true).deploy("1.20", &artifact, None);
        assert!(matches!(result, Err(DeployError::NoTarget(id)) if id == "1.20"));
    }

    #[test]
    fn test_deploy_missing_artifact() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("packs/x.zip");
        let result = Deployer::new(true).deploy("x", &temp.path().join("missing.zip"), Some(&target));
        assert!(matches!(result, Err(DeployError::MissingArtifact(_))));
    }

    #[test]
    fn test_deploy_backs_up_existing() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("dist/1.20.zip");
        fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        fs::write(&artifact, b"new").unwrap();
        let target = temp.path().join("packs/1.20.zip");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"old").unwrap();

        let report = Deployer::new(true).deploy("1.20", &artifact, Some(&target)).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert_eq!(report.bytes, 3);
        let backup = report.backup.unwrap();
        assert_eq!(fs::read(&backup).unwrap(), b"old");
        assert!(backup.to_string_lossy().ends_with(".zip.bak"));
    }

    #[test]
    fn test_deploy_without_backup() {
        let temp = TempDir::new().unwrap();
        let artifact = temp.path().join("a.zip");
        fs::write(&artifact, b"new").unwrap();
        let target = temp.path().join("packs/a.zip");

        let report = Deployer::new(false).deploy("a", &artifact, Some(&target)).unwrap();
        assert!(report.backup.is_none());
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }
}
