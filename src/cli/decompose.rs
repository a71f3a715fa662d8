//! Decompose command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::atlas::{decompose_atlas, CoordinateMap, DecomposeOptions, DefaultLayout};

/// Default output directory: a sibling of the atlas named after its stem.
fn default_out_dir(atlas: &Path) -> PathBuf {
    let stem = atlas.file_stem().and_then(|s| s.to_str()).unwrap_or("atlas");
    atlas.with_file_name(stem)
}

/// Run the decompose command
pub fn run_decompose(
    atlas: &Path,
    map_path: Option<&Path>,
    out: Option<&Path>,
    detect_only: bool,
    force: bool,
) -> ExitCode {
    let map = match map_path {
        Some(path) => match CoordinateMap::load(path) {
            Ok(map) => map,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        },
        None => DefaultLayout::for_atlas_file(atlas).map(),
    };

    let out_dir = out.map(Path::to_path_buf).unwrap_or_else(|| default_out_dir(atlas));
    let options = DecomposeOptions { force, detect_only };

    let report = match decompose_atlas(atlas, &map, &out_dir, options) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let grid = report.detection;
    println!(
        "{}: {}x{} px, {}x{} cells of {}px (scale {}x)",
        atlas.display(),
        grid.width,
        grid.height,
        grid.cols,
        grid.rows,
        grid.cell_size,
        grid.scale(&map)
    );
    if detect_only {
        return ExitCode::from(EXIT_SUCCESS);
    }

    println!("Wrote {} image(s) to {}", report.written.len(), out_dir.display());
    if !report.existing.is_empty() {
        println!("Kept {} existing image(s) (use --force to overwrite)", report.existing.len());
    }
    for key in &report.out_of_bounds {
        eprintln!("Warning: cell '{}' is outside the grid", key);
    }
    for name in &report.unsafe_names {
        eprintln!("Warning: name '{}' is not a plain file name, not written", name);
    }
    ExitCode::from(EXIT_SUCCESS)
}
