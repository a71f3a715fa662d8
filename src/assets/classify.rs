//! Path-based asset classification.
//!
//! Rule precedence, first match wins:
//! 1. Filename rules (pack descriptor, config-like files)
//! 2. Directory rules for image files (`block/`, `item/`, `gui/`, ...)
//! 3. Extension default (image ⇒ block texture, anything else ⇒ unknown)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image extensions the codec can decode.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tga"];

/// Semantic category of a source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    BlockTexture,
    ItemTexture,
    InterfaceTexture,
    EnvironmentTexture,
    ParticleTexture,
    MiscTexture,
    PackMetadata,
    PackConfig,
    Unknown,
}

impl AssetKind {
    /// Every kind, in declaration order.
    pub const ALL: [AssetKind; 9] = [
        AssetKind::BlockTexture,
        AssetKind::ItemTexture,
        AssetKind::InterfaceTexture,
        AssetKind::EnvironmentTexture,
        AssetKind::ParticleTexture,
        AssetKind::MiscTexture,
        AssetKind::PackMetadata,
        AssetKind::PackConfig,
        AssetKind::Unknown,
    ];

    /// Kinds that are always handed to a transformer regardless of what it requires.
    pub const METADATA: [AssetKind; 2] = [AssetKind::PackMetadata, AssetKind::PackConfig];

    /// Whether this kind is an image texture.
    pub fn is_texture(self) -> bool {
        matches!(
            self,
            AssetKind::BlockTexture
                | AssetKind::ItemTexture
                | AssetKind::InterfaceTexture
                | AssetKind::EnvironmentTexture
                | AssetKind::ParticleTexture
                | AssetKind::MiscTexture
        )
    }

    /// Stable identifier, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::BlockTexture => "block-texture",
            AssetKind::ItemTexture => "item-texture",
            AssetKind::InterfaceTexture => "interface-texture",
            AssetKind::EnvironmentTexture => "environment-texture",
            AssetKind::ParticleTexture => "particle-texture",
            AssetKind::MiscTexture => "misc-texture",
            AssetKind::PackMetadata => "pack-metadata",
            AssetKind::PackConfig => "pack-config",
            AssetKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check if a path has a decodable image extension.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Classify a file by its path relative to the source root.
///
/// Pure and total: no I/O, and every input maps to exactly one kind.
///
/// # Examples
///
/// ```
/// use packsmith::assets::{classify, AssetKind};
///
/// assert_eq!(classify("pack.mcmeta"), AssetKind::PackMetadata);
/// assert_eq!(classify("textures/item/apple.png"), AssetKind::ItemTexture);
/// assert_eq!(classify("stone.png"), AssetKind::BlockTexture);
/// assert_eq!(classify("sounds/dig.ogg"), AssetKind::Unknown);
/// ```
pub fn classify(relative_path: impl AsRef<Path>) -> AssetKind {
    let path = relative_path.as_ref();
    let file_name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.to_ascii_lowercase(),
        None => return AssetKind::Unknown,
    };

    if let Some(kind) = classify_by_filename(&file_name) {
        return kind;
    }

    if !is_image_file(path) {
        return AssetKind::Unknown;
    }

    // Innermost recognised directory decides, so `gui/block/x.png` is a block.
    let parents: Vec<String> = path
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .filter_map(|c| c.as_os_str().to_str())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    parents
        .iter()
        .rev()
        .find_map(|dir| classify_by_directory(dir))
        .unwrap_or(AssetKind::BlockTexture)
}

fn classify_by_filename(file_name: &str) -> Option<AssetKind> {
    match file_name {
        "pack.mcmeta" | "pack.txt" | "pack.png" => return Some(AssetKind::PackMetadata),
        _ => {}
    }

    if file_name.ends_with(".mcmeta")
        || file_name.ends_with(".properties")
        || file_name.ends_with(".json")
        || file_name.contains("config")
    {
        return Some(AssetKind::PackConfig);
    }

    None
}

fn classify_by_directory(dir: &str) -> Option<AssetKind> {
    match dir {
        "block" | "blocks" | "terrain" => Some(AssetKind::BlockTexture),
        "item" | "items" => Some(AssetKind::ItemTexture),
        "gui" | "interface" | "title" => Some(AssetKind::InterfaceTexture),
        "environment" | "sky" => Some(AssetKind::EnvironmentTexture),
        "particle" | "particles" => Some(AssetKind::ParticleTexture),
        "misc" | "art" => Some(AssetKind::MiscTexture),
        _ => None,
    }
}
