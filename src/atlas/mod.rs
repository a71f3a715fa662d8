//! Coordinate-driven grid atlases
//!
//! An atlas is a fixed-size image made of `cols × rows` square cells. A
//! [`CoordinateMap`] names the asset that belongs in each cell; composing
//! places unit images into their cells and decomposing slices them back out.
//!
//! When a profile has no external map, the hand-authored tables in
//! [`defaults`] are used instead.

pub mod codec;
pub mod compose;
pub mod decompose;
pub mod defaults;
pub mod map;

pub use compose::*;
pub use decompose::*;
pub use defaults::*;
pub use map::*;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading maps or reading/writing atlas images.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AtlasError {
    /// Coordinate map file could not be read
    #[error("Failed to read coordinate map '{path}': {source}")]
    MapIo { path: PathBuf, source: std::io::Error },
    /// Coordinate map is not valid JSON or has the wrong shape
    #[error("Malformed coordinate map: {0}")]
    MalformedMap(String),
    /// A cell key does not decode to integer grid coordinates
    #[error("Invalid cell key '{0}' (expected \"<x>,<y>\")")]
    InvalidCellKey(String),
    /// Image decode or encode failure
    #[error("Image error for '{path}': {source}")]
    Image { path: PathBuf, source: image::ImageError },
    /// IO failure writing outputs
    #[error("IO error for '{path}': {source}")]
    Io { path: PathBuf, source: std::io::Error },
    /// Atlas dimensions do not fit the map's grid
    #[error("Atlas is {width}x{height}, which does not divide into a {cols}x{rows} grid of square cells")]
    GridMismatch { width: u32, height: u32, cols: u32, rows: u32 },
}
