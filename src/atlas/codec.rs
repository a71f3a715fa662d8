//! Thin RGBA codec primitives over the `image` crate.

use super::AtlasError;
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::path::Path;

/// A unit image staged at a pixel offset on a canvas.
#[derive(Debug, Clone)]
pub struct Layer {
    pub image: RgbaImage,
    pub x: u32,
    pub y: u32,
}

/// Decode any supported image file into RGBA8.
pub fn decode(path: &Path) -> Result<RgbaImage, AtlasError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| AtlasError::Image { path: path.to_path_buf(), source })
}

/// Copy a rectangle out of an image.
pub fn crop(image: &RgbaImage, x: u32, y: u32, width: u32, height: u32) -> RgbaImage {
    imageops::crop_imm(image, x, y, width, height).to_image()
}

/// Resize with nearest-neighbour sampling. Same-size input is returned untouched.
pub fn resize(image: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.width() == width && image.height() == height {
        return image;
    }
    imageops::resize(&image, width, height, FilterType::Nearest)
}

/// Apply layers in order; later layers replace earlier pixels outright.
pub fn composite(canvas: &mut RgbaImage, layers: &[Layer]) {
    for layer in layers {
        imageops::replace(canvas, &layer.image, i64::from(layer.x), i64::from(layer.y));
    }
}

/// Encode as PNG, creating parent directories as needed.
pub fn encode_png(image: &RgbaImage, path: &Path) -> Result<(), AtlasError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| AtlasError::Io { path: parent.to_path_buf(), source })?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| AtlasError::Image { path: path.to_path_buf(), source })
}
