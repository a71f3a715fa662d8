//! Coordinate map loading.
//!
//! On-disk format:
//!
//! ```json
//! {
//!   "rows": 16, "cols": 16, "tile_size": 16,
//!   "coordinates": { "0,0": "grass_block_top", "1,0": "unused", "remaining_tiles": 12 }
//! }
//! ```
//!
//! Entries are kept in cell-key order, so two keys that land on the same
//! cell always resolve the same way: the key that sorts last wins.

use super::AtlasError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Sentinel name marking a cell that must be filled with the placeholder.
pub const UNUSED: &str = "unused";

/// Bookkeeping key in map files; its value is ignored.
pub const REMAINING_TILES_KEY: &str = "remaining_tiles";

/// Largest canvas edge, in pixels, an atlas may have.
pub const MAX_CANVAS_SIDE: u32 = 16384;

/// What a map cell holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellAssignment {
    /// A logical asset name
    Asset(String),
    /// Intentionally blank; rendered as the placeholder tile
    Unused,
}

impl CellAssignment {
    fn from_name(name: &str) -> Self {
        if name == UNUSED {
            CellAssignment::Unused
        } else {
            CellAssignment::Asset(name.to_string())
        }
    }
}

/// One decoded `"x,y" → name` entry.
///
/// Coordinates are signed so that out-of-range keys such as `"-1,0"` survive
/// loading and can be rejected at composition time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub key: String,
    pub x: i64,
    pub y: i64,
    pub assignment: CellAssignment,
}

/// Grid layout plus name assignments for an atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateMap {
    pub rows: u32,
    pub cols: u32,
    pub cell_size: u32,
    entries: Vec<MapEntry>,
}

#[derive(Deserialize)]
struct MapFile {
    rows: u32,
    cols: u32,
    tile_size: u32,
    #[serde(default)]
    coordinates: BTreeMap<String, serde_json::Value>,
}

impl CoordinateMap {
    /// Build a map from `(name, x, y)` positions, in the given order.
    pub fn from_positions(rows: u32, cols: u32, cell_size: u32, positions: &[(&str, u32, u32)]) -> Self {
        let entries = positions
            .iter()
            .map(|&(name, x, y)| MapEntry {
                key: format!("{},{}", x, y),
                x: i64::from(x),
                y: i64::from(y),
                assignment: CellAssignment::from_name(name),
            })
            .collect();
        Self { rows, cols, cell_size, entries }
    }

    /// Parse a map from its JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, AtlasError> {
        let file: MapFile =
            serde_json::from_str(text).map_err(|e| AtlasError::MalformedMap(e.to_string()))?;

        if file.rows == 0 || file.cols == 0 || file.tile_size == 0 {
            return Err(AtlasError::MalformedMap(
                "rows, cols and tile_size must be positive".to_string(),
            ));
        }

        let mut entries = Vec::with_capacity(file.coordinates.len());
        for (key, value) in file.coordinates {
            if key == REMAINING_TILES_KEY {
                continue;
            }
            let name = value.as_str().ok_or_else(|| {
                AtlasError::MalformedMap(format!("value for '{}' must be a string", key))
            })?;
            let (x, y) = parse_cell_key(&key)?;
            entries.push(MapEntry { key, x, y, assignment: CellAssignment::from_name(name) });
        }

        let map = Self { rows: file.rows, cols: file.cols, cell_size: file.tile_size, entries };
        map.checked_canvas_size()?;
        Ok(map)
    }

    /// Load a map file from disk.
    pub fn load(path: &Path) -> Result<Self, AtlasError> {
        let text = fs::read_to_string(path)
            .map_err(|source| AtlasError::MapIo { path: path.to_path_buf(), source })?;
        Self::from_json_str(&text)
    }

    /// All entries in application order.
    pub fn entries(&self) -> &[MapEntry] {
        &self.entries
    }

    /// Pixel size of the full canvas: `(cols * cell_size, rows * cell_size)`.
    ///
    /// Saturates instead of wrapping; use [`checked_canvas_size`](Self::checked_canvas_size)
    /// before allocating.
    pub fn canvas_size(&self) -> (u32, u32) {
        (self.cols.saturating_mul(self.cell_size), self.rows.saturating_mul(self.cell_size))
    }

    /// Canvas size, rejecting grids whose edges overflow or exceed
    /// [`MAX_CANVAS_SIDE`].
    pub fn checked_canvas_size(&self) -> Result<(u32, u32), AtlasError> {
        let side = |cells: u32| cells.checked_mul(self.cell_size).filter(|&px| px <= MAX_CANVAS_SIDE);
        match (side(self.cols), side(self.rows)) {
            (Some(width), Some(height)) => Ok((width, height)),
            _ => Err(AtlasError::MalformedMap(format!(
                "{}x{} grid of {}px cells exceeds the {}px canvas limit",
                self.cols, self.rows, self.cell_size, MAX_CANVAS_SIDE
            ))),
        }
    }

    /// Whether a decoded coordinate lies within `[0, cols) × [0, rows)`.
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < i64::from(self.cols) && y < i64::from(self.rows)
    }

    /// Logical asset names referenced by the map (excluding `unused`).
    pub fn asset_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match &e.assignment {
            CellAssignment::Asset(name) => Some(name.as_str()),
            CellAssignment::Unused => None,
        })
    }

    /// Same map with a different cell size (used for high-resolution atlases).
    pub fn with_cell_size(mut self, cell_size: u32) -> Self {
        self.cell_size = cell_size;
        self
    }
}

/// Decode a `"<x>,<y>"` key into signed grid coordinates.
pub fn parse_cell_key(key: &str) -> Result<(i64, i64), AtlasError> {
    let (x, y) = key.split_once(',').ok_or_else(|| AtlasError::InvalidCellKey(key.to_string()))?;
    let x = x.trim().parse::<i64>().map_err(|_| AtlasError::InvalidCellKey(key.to_string()))?;
    let y = y.trim().parse::<i64>().map_err(|_| AtlasError::InvalidCellKey(key.to_string()))?;
    Ok((x, y))
}
