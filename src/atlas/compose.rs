//! Atlas composition.
//!
//! Walks a [`CoordinateMap`] in entry order, stages one layer per resolvable
//! cell and composites them onto a transparent canvas. A missing or broken
//! texture only skips its own cell; `unused` cells get the magenta
//! placeholder so legacy renderers can tell "blank on purpose" from "empty".

use super::codec::{self, Layer};
use super::{AtlasError, CellAssignment, CoordinateMap};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fill color for `unused` cells when no placeholder asset is available.
pub const PLACEHOLDER_COLOR: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// Transparent canvas background
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Outcome of composing one atlas.
#[derive(Debug, Default)]
pub struct Composition {
    /// Finished canvas, or `None` if no texture layer was staged
    pub image: Option<RgbaImage>,
    /// Asset names placed on the canvas, in application order
    pub placed: Vec<String>,
    /// Asset names the map references but no source provides
    pub missing: Vec<String>,
    /// Asset names whose source image failed to decode
    pub failed: Vec<String>,
    /// Cell keys outside the grid
    pub out_of_bounds: Vec<String>,
    /// Number of cells filled with the placeholder
    pub placeholders: usize,
}

impl Composition {
    /// Whether a canvas was produced.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Names that did not make it onto the canvas.
    pub fn skipped_names(&self) -> impl Iterator<Item = &String> {
        self.missing.iter().chain(self.failed.iter())
    }
}

/// Solid placeholder tile of the given size.
pub fn placeholder_tile(cell_size: u32) -> RgbaImage {
    RgbaImage::from_pixel(cell_size, cell_size, PLACEHOLDER_COLOR)
}

/// Compose an atlas from a map and a `name → source image` lookup.
///
/// # Arguments
/// * `map` - Grid layout and cell assignments
/// * `sources` - Logical asset name to image path
/// * `placeholder` - Optional on-disk placeholder asset for `unused` cells
///
/// # Returns
/// A [`Composition`]. The image is `None` when no texture layer was staged;
/// placeholder cells alone do not count.
pub fn compose_atlas(
    map: &CoordinateMap,
    sources: &HashMap<String, PathBuf>,
    placeholder: Option<&Path>,
) -> Composition {
    let cell = map.cell_size;
    let mut result = Composition::default();
    let (width, height) = match map.checked_canvas_size() {
        Ok(size) => size,
        Err(e) => {
            warn!(error = %e, "atlas canvas too large, skipping");
            return result;
        }
    };
    let mut layers: Vec<Layer> = Vec::new();
    let mut placeholder_image: Option<RgbaImage> = None;
    let mut texture_layers = 0usize;

    for entry in map.entries() {
        if !map.in_bounds(entry.x, entry.y) {
            warn!(key = %entry.key, cols = map.cols, rows = map.rows, "cell outside grid, skipping");
            result.out_of_bounds.push(entry.key.clone());
            continue;
        }
        // in_bounds plus the canvas check keep both within the canvas
        let x = entry.x as u32 * cell;
        let y = entry.y as u32 * cell;

        match &entry.assignment {
            CellAssignment::Unused => {
                let tile = placeholder_image
                    .get_or_insert_with(|| load_placeholder(placeholder, cell))
                    .clone();
                layers.push(Layer { image: tile, x, y });
                result.placeholders += 1;
            }
            CellAssignment::Asset(name) => {
                let Some(path) = sources.get(name) else {
                    debug!(name = %name, "no source for mapped asset");
                    result.missing.push(name.clone());
                    continue;
                };
                match codec::decode(path) {
                    Ok(image) => {
                        layers.push(Layer { image: codec::resize(image, cell, cell), x, y });
                        result.placed.push(name.clone());
                        texture_layers += 1;
                    }
                    Err(e) => {
                        warn!(name = %name, error = %e, "failed to decode texture, skipping");
                        result.failed.push(name.clone());
                    }
                }
            }
        }
    }

    if texture_layers == 0 {
        debug!("no texture layers staged, atlas skipped");
        return result;
    }

    let mut canvas = RgbaImage::from_pixel(width, height, TRANSPARENT);
    codec::composite(&mut canvas, &layers);
    result.image = Some(canvas);
    result
}

/// Compose and, if anything was staged, write the atlas as PNG.
///
/// # Returns
/// The composition; `image` is `None` when nothing was written.
pub fn compose_to_file(
    map: &CoordinateMap,
    sources: &HashMap<String, PathBuf>,
    placeholder: Option<&Path>,
    output: &Path,
) -> Result<Composition, AtlasError> {
    map.checked_canvas_size()?;
    let composition = compose_atlas(map, sources, placeholder);
    if let Some(image) = &composition.image {
        codec::encode_png(image, output)?;
    }
    Ok(composition)
}

fn load_placeholder(path: Option<&Path>, cell: u32) -> RgbaImage {
    if let Some(path) = path.filter(|p| p.is_file()) {
        match codec::decode(path) {
            Ok(image) => return codec::resize(image, cell, cell),
            Err(e) => warn!(error = %e, "placeholder asset unreadable, generating one"),
        }
    }
    placeholder_tile(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tile(dir: &Path, name: &str, size: u32, color: Rgba<u8>) -> PathBuf {
        let path = dir.join(format!("{}.png", name));
        RgbaImage::from_pixel(size, size, color).save(&path).unwrap();
        path
    }

    #[test]
    fn test_compose_places_tiles() {
        let temp = TempDir::new().unwrap();
        let red = Rgba([255, 0, 0, 255]);
        let blue = Rgba([0, 0, 255, 255]);
        let sources = HashMap::from([
            ("red".to_string(), write_tile(temp.path(), "red", 4, red)),
            ("blue".to_string(), write_tile(temp.path(), "blue", 4, blue)),
        ]);
        let map = CoordinateMap::from_positions(2, 2, 4, &[("red", 0, 0), ("blue", 1, 1)]);

        let result = compose_atlas(&map, &sources, None);
        let image = result.image.unwrap();
        assert_eq!(image.dimensions(), (8, 8));
        assert_eq!(*image.get_pixel(0, 0), red);
        assert_eq!(*image.get_pixel(7, 7), blue);
        assert_eq!(*image.get_pixel(7, 0), TRANSPARENT);
        assert_eq!(result.placed, vec!["red", "blue"]);
    }

    #[test]
    fn test_unused_cells_get_placeholder() {
        let temp = TempDir::new().unwrap();
        let sources = HashMap::from([(
            "stone".to_string(),
            write_tile(temp.path(), "stone", 2, Rgba([1, 1, 1, 255])),
        )]);
        let map = CoordinateMap::from_positions(1, 3, 2, &[("stone", 0, 0), ("unused", 2, 0)]);

        let result = compose_atlas(&map, &sources, None);
        let image = result.image.unwrap();
        for y in 0..2 {
            for x in 4..6 {
                assert_eq!(*image.get_pixel(x, y), PLACEHOLDER_COLOR);
            }
        }
        assert_eq!(result.placeholders, 1);
    }

    #[test]
    fn test_placeholder_asset_used_when_present() {
        let temp = TempDir::new().unwrap();
        let green = Rgba([0, 255, 0, 255]);
        let placeholder = write_tile(temp.path(), "placeholder", 1, green);
        let sources = HashMap::from([(
            "stone".to_string(),
            write_tile(temp.path(), "stone", 2, Rgba([1, 1, 1, 255])),
        )]);
        let map = CoordinateMap::from_positions(1, 2, 2, &[("stone", 0, 0), ("unused", 1, 0)]);

        let image = compose_atlas(&map, &sources, Some(&placeholder)).image.unwrap();
        assert_eq!(*image.get_pixel(3, 1), green);
    }

    #[test]
    fn test_missing_texture_is_skipped() {
        let temp = TempDir::new().unwrap();
        let sources = HashMap::from([(
            "stone".to_string(),
            write_tile(temp.path(), "stone", 2, Rgba([1, 1, 1, 255])),
        )]);
        let map = CoordinateMap::from_positions(1, 2, 2, &[("stone", 0, 0), ("dirt", 1, 0)]);

        let result = compose_atlas(&map, &sources, None);
        assert!(result.has_image());
        assert_eq!(result.missing, vec!["dirt"]);
        assert_eq!(*result.image.unwrap().get_pixel(3, 0), TRANSPARENT);
    }

    #[test]
    fn test_undecodable_texture_is_skipped() {
        let temp = TempDir::new().unwrap();
        let bad = temp.path().join("bad.png");
        std::fs::write(&bad, b"not a png").unwrap();
        let sources = HashMap::from([
            ("bad".to_string(), bad),
            ("good".to_string(), write_tile(temp.path(), "good", 2, Rgba([5, 5, 5, 255]))),
        ]);
        let map = CoordinateMap::from_positions(1, 2, 2, &[("bad", 0, 0), ("good", 1, 0)]);

        let result = compose_atlas(&map, &sources, None);
        assert_eq!(result.failed, vec!["bad"]);
        assert_eq!(result.placed, vec!["good"]);
        assert_eq!(result.skipped_names().count(), 1);
    }

    #[test]
    fn test_out_of_bounds_coordinates_skipped() {
        let temp = TempDir::new().unwrap();
        let color = Rgba([3, 3, 3, 255]);
        let sources = HashMap::from([("a".to_string(), write_tile(temp.path(), "a", 2, color))]);
        let map = CoordinateMap::from_json_str(
            r#"{"rows": 1, "cols": 1, "tile_size": 2,
                "coordinates": {"0,0": "a", "1,0": "a", "0,1": "a", "-1,0": "unused"}}"#,
        )
        .unwrap();

        let result = compose_atlas(&map, &sources, None);
        assert_eq!(result.out_of_bounds.len(), 3);
        assert_eq!(result.placeholders, 0);
        let image = result.image.unwrap();
        assert_eq!(image.dimensions(), (2, 2));
    }

    #[test]
    fn test_resizes_to_cell() {
        let temp = TempDir::new().unwrap();
        let color = Rgba([8, 8, 8, 255]);
        let sources = HashMap::from([("big".to_string(), write_tile(temp.path(), "big", 32, color))]);
        let map = CoordinateMap::from_positions(1, 2, 16, &[("big", 1, 0)]);

        let image = compose_atlas(&map, &sources, None).image.unwrap();
        assert_eq!(image.dimensions(), (32, 16));
        assert_eq!(*image.get_pixel(16, 0), color);
        assert_eq!(*image.get_pixel(15, 0), TRANSPARENT);
    }

    #[test]
    fn test_same_cell_last_entry_wins() {
        let temp = TempDir::new().unwrap();
        let first = Rgba([1, 0, 0, 255]);
        let second = Rgba([2, 0, 0, 255]);
        let sources = HashMap::from([
            ("first".to_string(), write_tile(temp.path(), "first", 1, first)),
            ("second".to_string(), write_tile(temp.path(), "second", 1, second)),
        ]);
        // " 0,0" sorts before "0,0", so "0,0" is applied last
        let map = CoordinateMap::from_json_str(
            r#"{"rows": 1, "cols": 1, "tile_size": 1,
                "coordinates": {"0,0": "second", " 0,0": "first"}}"#,
        )
        .unwrap();

        let image = compose_atlas(&map, &sources, None).image.unwrap();
        assert_eq!(*image.get_pixel(0, 0), second);
    }

    #[test]
    fn test_nothing_staged_skips_atlas() {
        let map = CoordinateMap::from_positions(2, 2, 4, &[("a", 0, 0), ("unused", 1, 1)]);
        let result = compose_atlas(&map, &HashMap::new(), None);
        assert!(!result.has_image());
        assert_eq!(result.missing, vec!["a"]);
    }

    #[test]
    fn test_compose_to_file_skips_empty() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("terrain.png");
        let map = CoordinateMap::from_positions(1, 1, 4, &[("a", 0, 0)]);

        let result = compose_to_file(&map, &HashMap::new(), None, &output).unwrap();
        assert!(!result.has_image());
        assert!(!output.exists());
    }

    #[test]
    fn test_oversized_grid_is_refused_before_allocating() {
        let temp = TempDir::new().unwrap();
        let sources = HashMap::from([("a".to_string(), write_tile(temp.path(), "a", 4, Rgba([1, 2, 3, 255])))]);
        let map = CoordinateMap::from_positions(1, 1, 4, &[("a", 0, 0)]).with_cell_size(u32::MAX / 2);

        let result = compose_atlas(&map, &sources, None);
        assert!(!result.has_image());
        assert!(result.placed.is_empty());

        let output = temp.path().join("terrain.png");
        let err = compose_to_file(&map, &sources, None, &output).unwrap_err();
        assert!(matches!(err, AtlasError::MalformedMap(_)));
        assert!(!output.exists());
    }
}
