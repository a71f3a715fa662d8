//! Source tree discovery.
//!
//! Walks a directory, classifies every regular file and attaches filesystem
//! metadata. A missing root yields an empty inventory, and a file that cannot
//! be stat'ed is logged and dropped without aborting the walk.

use crate::assets::{classify, AssetKind};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Filesystem facts captured at discovery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMetadata {
    /// Last modification time
    pub last_modified: SystemTime,
    /// Lowercase image format tag (texture kinds only)
    pub format: Option<String>,
    /// File size in bytes
    pub size: Option<u64>,
}

/// A discovered, classified source file.
///
/// Identity is `relative_path`. Records are never cached across builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Absolute (or root-joined) path to the file
    pub source_path: PathBuf,
    /// Path relative to the discovery root, `/`-separated
    pub relative_path: String,
    /// Semantic category
    pub kind: AssetKind,
    pub metadata: AssetMetadata,
}

impl AssetRecord {
    /// Logical asset name used by coordinate maps (file stem).
    pub fn name(&self) -> &str {
        Path::new(&self.relative_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.relative_path)
    }
}

/// Result of a discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    /// Successfully stat'ed records, sorted by relative path
    pub records: Vec<AssetRecord>,
    /// Every regular file encountered, including ones that failed
    pub total_files: usize,
    /// Distinct kinds present in `records`
    pub kinds_seen: BTreeSet<AssetKind>,
    /// Files dropped because their metadata could not be read
    pub failures: Vec<PathBuf>,
}

impl Inventory {
    /// Create an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if no records were discovered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge another inventory into this one.
    ///
    /// Records whose relative path is already present are ignored, so the
    /// inventory merged first takes precedence.
    pub fn merge(&mut self, other: Inventory) {
        let existing: HashSet<String> =
            self.records.iter().map(|r| r.relative_path.clone()).collect();

        for record in other.records {
            if existing.contains(&record.relative_path) {
                debug!(path = %record.relative_path, "duplicate relative path, keeping first");
                continue;
            }
            self.kinds_seen.insert(record.kind);
            self.records.push(record);
        }
        self.total_files += other.total_files;
        self.failures.extend(other.failures);
        self.records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    }

    /// Keep only records whose kind is in `kinds`.
    pub fn filter_kinds(&self, kinds: &[AssetKind]) -> Vec<AssetRecord> {
        self.records.iter().filter(|r| kinds.contains(&r.kind)).cloned().collect()
    }

    /// Count records of a given kind.
    pub fn count_kind(&self, kind: AssetKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }
}

/// Recursively discover every regular file under `source_dir`.
///
/// # Returns
/// An [`Inventory`]; empty if `source_dir` does not exist.
pub fn discover(source_dir: &Path) -> Inventory {
    walk(source_dir, None)
}

/// Discover only the files sitting directly inside `dir` (no recursion).
pub fn discover_top_level(dir: &Path) -> Inventory {
    walk(dir, Some(1))
}

fn walk(root: &Path, max_depth: Option<usize>) -> Inventory {
    let mut inventory = Inventory::new();

    if !root.is_dir() {
        debug!(root = %root.display(), "discovery root missing, empty inventory");
        return inventory;
    }

    let mut walker = WalkDir::new(root).min_depth(1).follow_links(false);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // Unreadable directory; its contents are simply not visited
                warn!(error = %e, "error walking source tree");
                continue;
            }
        };

        if entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        let relative = match path.strip_prefix(root) {
            Ok(rel) => to_relative_string(rel),
            Err(_) => continue,
        };

        // Follows symlinks, so a dangling link surfaces as a stat failure
        let stat = match fs::metadata(path) {
            Ok(stat) => stat,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot stat file, dropping");
                inventory.total_files += 1;
                inventory.failures.push(path.to_path_buf());
                continue;
            }
        };

        if stat.is_dir() {
            continue;
        }
        inventory.total_files += 1;

        let last_modified = match stat.modified() {
            Ok(time) => time,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "no modification time, dropping");
                inventory.failures.push(path.to_path_buf());
                continue;
            }
        };

        let kind = classify(&relative);
        let format = if kind.is_texture() { format_tag(path) } else { None };

        inventory.kinds_seen.insert(kind);
        inventory.records.push(AssetRecord {
            source_path: path.to_path_buf(),
            relative_path: relative,
            kind,
            metadata: AssetMetadata { last_modified, format, size: Some(stat.len()) },
        });
    }

    inventory.records.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    debug!(
        root = %root.display(),
        records = inventory.records.len(),
        failures = inventory.failures.len(),
        "discovery complete"
    );
    inventory
}

/// Best-effort image format tag from the file extension.
fn format_tag(path: &Path) -> Option<String> {
    image::ImageFormat::from_path(path)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .map(str::to_string)
}

/// Render a relative path with `/` separators on every platform.
pub fn to_relative_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}
