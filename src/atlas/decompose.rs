//! Atlas decomposition: slice a grid atlas back into per-name unit images.

use super::codec;
use super::{AtlasError, CellAssignment, CoordinateMap};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Grid geometry detected from an atlas image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDetection {
    pub width: u32,
    pub height: u32,
    pub cols: u32,
    pub rows: u32,
    pub cell_size: u32,
}

impl GridDetection {
    /// Scale relative to the map's nominal cell size (2 for a 32px pack on a 16px map).
    pub fn scale(&self, map: &CoordinateMap) -> f32 {
        self.cell_size as f32 / map.cell_size as f32
    }
}

/// Options for [`decompose_atlas`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DecomposeOptions {
    /// Overwrite unit images that already exist
    pub force: bool,
    /// Only detect the grid; write nothing
    pub detect_only: bool,
}

/// Outcome of a decomposition.
#[derive(Debug)]
pub struct DecomposeReport {
    pub detection: GridDetection,
    /// Unit images written
    pub written: Vec<PathBuf>,
    /// Names skipped because the output already existed
    pub existing: Vec<String>,
    /// Cells marked `unused`
    pub unused: usize,
    /// Cell keys outside the grid
    pub out_of_bounds: Vec<String>,
    /// Names that would write outside the output directory
    pub unsafe_names: Vec<String>,
}

/// Detect the cell size of an atlas with the given pixel dimensions.
///
/// The cell size is `width / cols`; the atlas must divide evenly into
/// square cells on the map's grid.
pub fn detect_grid(width: u32, height: u32, map: &CoordinateMap) -> Result<GridDetection, AtlasError> {
    let mismatch = || AtlasError::GridMismatch { width, height, cols: map.cols, rows: map.rows };

    if width == 0 || width % map.cols != 0 || height % map.rows != 0 {
        return Err(mismatch());
    }
    let cell_size = width / map.cols;
    if cell_size == 0 || height / map.rows != cell_size {
        return Err(mismatch());
    }

    Ok(GridDetection { width, height, cols: map.cols, rows: map.rows, cell_size })
}

/// Slice `atlas_path` into `<out_dir>/<name>.png` for every named cell.
///
/// Existing outputs are left alone unless `options.force` is set. `unused`
/// cells and out-of-range keys are never written.
pub fn decompose_atlas(
    atlas_path: &Path,
    map: &CoordinateMap,
    out_dir: &Path,
    options: DecomposeOptions,
) -> Result<DecomposeReport, AtlasError> {
    let atlas = codec::decode(atlas_path)?;
    let detection = detect_grid(atlas.width(), atlas.height(), map)?;
    let cell = detection.cell_size;

    let mut report = DecomposeReport {
        detection,
        written: Vec::new(),
        existing: Vec::new(),
        unused: 0,
        out_of_bounds: Vec::new(),
        unsafe_names: Vec::new(),
    };

    if !options.detect_only {
        fs::create_dir_all(out_dir)
            .map_err(|source| AtlasError::Io { path: out_dir.to_path_buf(), source })?;
    }

    let mut seen = HashSet::new();
    for entry in map.entries() {
        if !map.in_bounds(entry.x, entry.y) {
            warn!(key = %entry.key, "cell outside grid, skipping");
            report.out_of_bounds.push(entry.key.clone());
            continue;
        }
        let name = match &entry.assignment {
            CellAssignment::Unused => {
                report.unused += 1;
                continue;
            }
            CellAssignment::Asset(name) => name,
        };
        if !is_plain_name(name) {
            warn!(key = %entry.key, name = %name, "name is not a plain file name, skipping");
            report.unsafe_names.push(name.clone());
            continue;
        }

        let output = out_dir.join(format!("{}.png", name));
        // Earlier cells for the same name were already handled this run
        let first_seen = seen.insert(name.clone());
        if !first_seen || (output.exists() && !options.force) {
            debug!(name = %name, "unit image exists, skipping");
            report.existing.push(name.clone());
            continue;
        }
        if options.detect_only {
            continue;
        }

        let tile = codec::crop(&atlas, entry.x as u32 * cell, entry.y as u32 * cell, cell, cell);
        codec::encode_png(&tile, &output)?;
        report.written.push(output);
    }

    Ok(report)
}

/// A name usable as a single file stem: no separators, not `.` or `..`.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
