//! Artifact packaging.
//!
//! Zips a profile's output directory and appends a plain-text
//! `manifest.txt` naming the profile, its description and the build time.

use crate::assets::to_relative_string;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Name of the manifest entry appended to every artifact
pub const MANIFEST_NAME: &str = "manifest.txt";

/// Errors raised while packaging.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackageError {
    /// Directory to package does not exist
    #[error("Nothing to package: '{0}' does not exist")]
    MissingInput(PathBuf),
    #[error("IO error for '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Failed to walk '{0}'")]
    Walk(#[from] walkdir::Error),
}

/// Manifest fields written into `manifest.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub profile_id: String,
    pub description: String,
    pub built_at: DateTime<Utc>,
}

impl Manifest {
    pub fn new(profile_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self { profile_id: profile_id.into(), description: description.into(), built_at: Utc::now() }
    }

    /// Render as `key: value` lines.
    pub fn render(&self) -> String {
        format!(
            "profile: {}\ndescription: {}\nbuilt: {}\n",
            self.profile_id,
            self.description,
            self.built_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

/// Package `input_dir` into the zip at `artifact`.
///
/// Files are stored deflated under their path relative to `input_dir`, in
/// sorted order. A `manifest.txt` already in the tree is replaced by the
/// generated one. The archive is written to a temporary file next to
/// `artifact` and renamed into place, so a failed run leaves any previous
/// artifact untouched.
///
/// # Returns
/// Size of the written artifact in bytes.
pub fn package_dir(input_dir: &Path, artifact: &Path, manifest: &Manifest) -> Result<u64, PackageError> {
    if !input_dir.is_dir() {
        return Err(PackageError::MissingInput(input_dir.to_path_buf()));
    }
    let parent = match artifact.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|source| PackageError::Io { path: parent.to_path_buf(), source })?;

    let stem = artifact.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let staged = tempfile::Builder::new()
        .prefix(&format!(".{}.", stem))
        .suffix(".partial")
        .tempfile_in(parent)
        .map_err(|source| PackageError::Io { path: parent.to_path_buf(), source })?;

    let (staged, entries) = write_archive(input_dir, staged, manifest)?;
    staged
        .persist(artifact)
        .map_err(|e| PackageError::Io { path: artifact.to_path_buf(), source: e.error })?;

    let size = fs::metadata(artifact)
        .map_err(|source| PackageError::Io { path: artifact.to_path_buf(), source })?
        .len();
    info!(profile = %manifest.profile_id, entries, bytes = size, artifact = %artifact.display(), "packaged");
    Ok(size)
}

/// Stream the tree plus manifest into `writer`, returning it with the entry count.
fn write_archive<W: Write + Seek>(
    input_dir: &Path,
    writer: W,
    manifest: &Manifest,
) -> Result<(W, usize), PackageError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0usize;
    for entry in WalkDir::new(input_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(input_dir).unwrap_or(entry.path());
        let name = to_relative_string(rel);
        if name == MANIFEST_NAME {
            debug!("existing manifest.txt replaced");
            continue;
        }

        let mut source = File::open(entry.path())
            .map_err(|source| PackageError::Io { path: entry.path().to_path_buf(), source })?;
        zip.start_file(name, options)?;
        io::copy(&mut source, &mut zip)
            .map_err(|source| PackageError::Io { path: entry.path().to_path_buf(), source })?;
        entries += 1;
    }

    zip.start_file(MANIFEST_NAME, options)?;
    zip.write_all(manifest.render().as_bytes())
        .map_err(|source| PackageError::Io { path: input_dir.to_path_buf(), source })?;
    let writer = zip.finish()?;
    Ok((writer, entries))
}
