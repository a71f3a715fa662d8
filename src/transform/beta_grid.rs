//! Transformer for legacy grid-atlas profiles.
//!
//! Block and item textures are composed into fixed 16×16 grids
//! (`terrain.png`, `gui/items.png`), everything else is copied through.

use super::{copy_records, TransformResult, Transformer};
use crate::assets::{AssetKind, AssetRecord};
use crate::atlas::{compose_to_file, legacy_category, AtlasError, CoordinateMap, DefaultLayout};
use crate::build::BuildContext;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const REQUIRED_KINDS: &[AssetKind] = &[
    AssetKind::BlockTexture,
    AssetKind::ItemTexture,
    AssetKind::InterfaceTexture,
    AssetKind::EnvironmentTexture,
    AssetKind::ParticleTexture,
    AssetKind::MiscTexture,
];

/// One composite output of a grid profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasSpec {
    /// Output path relative to the profile output directory
    pub output: String,
    /// External coordinate map; the built-in table is used when absent or missing
    pub map: Option<PathBuf>,
    /// Built-in table to fall back to
    pub layout: DefaultLayout,
    /// Kinds fed to the atlas when an external map is used
    pub kinds: Vec<AssetKind>,
    /// Placeholder asset for `unused` cells
    pub placeholder: Option<PathBuf>,
}

impl AtlasSpec {
    /// The classic `terrain.png` block grid.
    pub fn terrain() -> Self {
        Self {
            output: "terrain.png".to_string(),
            map: None,
            layout: DefaultLayout::Terrain,
            kinds: vec![AssetKind::BlockTexture],
            placeholder: None,
        }
    }

    /// The classic `gui/items.png` item grid.
    pub fn items() -> Self {
        Self {
            output: "gui/items.png".to_string(),
            map: None,
            layout: DefaultLayout::Items,
            kinds: vec![AssetKind::ItemTexture],
            placeholder: None,
        }
    }

    pub fn with_map(mut self, map: impl Into<PathBuf>) -> Self {
        self.map = Some(map.into());
        self
    }

    /// Resolve the coordinate map for this atlas.
    ///
    /// # Returns
    /// The map plus `true` when it is the built-in fallback table. A map
    /// file that exists but cannot be parsed is an error.
    pub fn resolve_map(&self) -> Result<(CoordinateMap, bool), AtlasError> {
        match &self.map {
            Some(path) if path.is_file() => Ok((CoordinateMap::load(path)?, false)),
            Some(path) => {
                info!(map = %path.display(), "coordinate map not found, using built-in table");
                Ok((self.layout.map(), true))
            }
            None => Ok((self.layout.map(), true)),
        }
    }
}

/// Grid-atlas transformer for one legacy profile.
#[derive(Debug, Clone)]
pub struct BetaGridTransformer {
    profile_id: String,
    atlases: Vec<AtlasSpec>,
}

impl BetaGridTransformer {
    /// Create a transformer with the classic terrain + items atlases.
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self::with_atlases(profile_id, vec![AtlasSpec::terrain(), AtlasSpec::items()])
    }

    /// Create a transformer with explicit atlas definitions.
    pub fn with_atlases(profile_id: impl Into<String>, atlases: Vec<AtlasSpec>) -> Self {
        Self { profile_id: profile_id.into(), atlases }
    }

    pub fn atlases(&self) -> &[AtlasSpec] {
        &self.atlases
    }

    /// Records feeding one atlas.
    ///
    /// With an external map the atlas takes its declared kinds. With the
    /// built-in table, block and item textures are routed by name.
    fn candidates<'a>(
        spec: &AtlasSpec,
        fallback: bool,
        records: &'a [AssetRecord],
    ) -> Vec<&'a AssetRecord> {
        records
            .iter()
            .filter(|r| {
                if fallback {
                    matches!(r.kind, AssetKind::BlockTexture | AssetKind::ItemTexture)
                        && legacy_category(r.name(), r.kind) == spec.layout.category()
                } else {
                    spec.kinds.contains(&r.kind)
                }
            })
            .collect()
    }

    fn build_atlas(
        &self,
        spec: &AtlasSpec,
        records: &[AssetRecord],
        ctx: &BuildContext,
        result: &mut TransformResult,
    ) -> Result<(), AtlasError> {
        let (map, fallback) = spec.resolve_map()?;
        let candidates = Self::candidates(spec, fallback, records);

        // Records are sorted by relative path; the first record per name wins
        let mut sources: HashMap<String, PathBuf> = HashMap::new();
        let mut relative: HashMap<String, String> = HashMap::new();
        for record in candidates {
            if !sources.contains_key(record.name()) {
                sources.insert(record.name().to_string(), record.source_path.clone());
                relative.insert(record.name().to_string(), record.relative_path.clone());
            }
        }

        let staged = ctx.scratch_dir.join(&spec.output);
        let composition = compose_to_file(&map, &sources, spec.placeholder.as_deref(), &staged)?;

        for name in &composition.placed {
            if let Some(rel) = relative.get(name) {
                result.mark_consumed(rel);
                result.mark_processed(rel);
            }
        }
        for name in &composition.failed {
            if let Some(rel) = relative.get(name) {
                result.mark_consumed(rel);
                result.mark_skipped(rel);
            }
        }
        for name in &composition.missing {
            result.mark_skipped(name);
        }

        if composition.has_image() {
            install(&staged, &ctx.output_dir.join(&spec.output))?;
            result.outputs.push(spec.output.clone());
            info!(
                profile = %self.profile_id,
                atlas = %spec.output,
                placed = composition.placed.len(),
                missing = composition.missing.len(),
                "atlas composed"
            );
        } else {
            warn!(profile = %self.profile_id, atlas = %spec.output, "no textures staged, atlas skipped");
            result.mark_skipped(&spec.output);
        }

        Ok(())
    }
}

impl Transformer for BetaGridTransformer {
    fn profile_id(&self) -> &str {
        &self.profile_id
    }

    fn required_kinds(&self) -> &[AssetKind] {
        REQUIRED_KINDS
    }

    fn name(&self) -> &'static str {
        "beta-grid"
    }

    fn transform(&self, records: &[AssetRecord], ctx: &BuildContext) -> TransformResult {
        let accepted: Vec<AssetRecord> = records
            .iter()
            .filter(|r| REQUIRED_KINDS.contains(&r.kind) || AssetKind::METADATA.contains(&r.kind))
            .cloned()
            .collect();

        let mut result = TransformResult::new();

        for spec in &self.atlases {
            if let Err(e) = self.build_atlas(spec, &accepted, ctx, &mut result) {
                return TransformResult::failed(format!("atlas '{}': {}", spec.output, e));
            }
        }

        let rest: Vec<&AssetRecord> = accepted.iter().filter(|r| !result.was_consumed(&r.relative_path)).collect();
        copy_records(rest, &ctx.output_dir, &mut result);

        debug!(
            profile = %self.profile_id,
            processed = result.processed.len(),
            skipped = result.skipped.len(),
            "beta-grid transform complete"
        );
        result
    }
}

/// Move a staged file into place, falling back to copy across filesystems.
fn install(staged: &Path, target: &Path) -> Result<(), AtlasError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| AtlasError::Io { path: parent.to_path_buf(), source })?;
    }
    if fs::rename(staged, target).is_err() {
        fs::copy(staged, target)
            .map_err(|source| AtlasError::Io { path: target.to_path_buf(), source })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::discover;
    use crate::atlas::{codec, PLACEHOLDER_COLOR};
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        src: PathBuf,
        ctx: BuildContext,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("shared");
        let out = temp.path().join("out");
        let scratch = temp.path().join("scratch");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&scratch).unwrap();
        let ctx = BuildContext::new("b1.7.3", &src, &out, &scratch);
        Fixture { _temp: temp, src, ctx }
    }

    fn write_png(root: &Path, rel: &str, color: Rgba<u8>) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(16, 16, color).save(path).unwrap();
    }

    #[test]
    fn test_default_layout_composes_terrain_and_items() {
        let f = fixture();
        write_png(&f.src, "block/stone.png", Rgba([100, 100, 100, 255]));
        write_png(&f.src, "item/apple.png", Rgba([200, 0, 0, 255]));
        write_png(&f.src, "item/torch.png", Rgba([250, 200, 0, 255]));
        fs::write(f.src.join("pack.txt"), b"My pack").unwrap();

        let records = discover(&f.src).records;
        let result = BetaGridTransformer::new("b1.7.3").transform(&records, &f.ctx);

        assert!(result.is_success());
        assert_eq!(result.outputs, vec!["terrain.png", "gui/items.png"]);

        let terrain = codec::decode(&f.ctx.output_dir.join("terrain.png")).unwrap();
        assert_eq!(terrain.dimensions(), (256, 256));
        // stone at (1,0), torch routed onto terrain at (0,5)
        assert_eq!(*terrain.get_pixel(16, 0), Rgba([100, 100, 100, 255]));
        assert_eq!(*terrain.get_pixel(0, 80), Rgba([250, 200, 0, 255]));
        // (14,0) is marked unused
        assert_eq!(*terrain.get_pixel(14 * 16, 0), PLACEHOLDER_COLOR);

        let items = codec::decode(&f.ctx.output_dir.join("gui/items.png")).unwrap();
        assert_eq!(*items.get_pixel(10 * 16, 0), Rgba([200, 0, 0, 255]));

        // Composed textures are not copied through; metadata is
        assert!(!f.ctx.output_dir.join("block/stone.png").exists());
        assert_eq!(fs::read(f.ctx.output_dir.join("pack.txt")).unwrap(), b"My pack");

        assert!(result.was_processed("block/stone.png"));
        assert!(result.was_processed("item/torch.png"));
        assert!(result.was_processed("pack.txt"));
        assert!(result.skipped.contains(&"dirt".to_string()));

        assert!(result.was_consumed("block/stone.png"));
        assert!(result.was_consumed("item/torch.png"));
        assert!(!result.was_consumed("pack.txt"));
    }

    #[test]
    fn test_unplaced_textures_are_copied_through() {
        let f = fixture();
        write_png(&f.src, "block/stone.png", Rgba([1, 1, 1, 255]));
        write_png(&f.src, "block/chest_front.png", Rgba([2, 2, 2, 255]));
        write_png(&f.src, "gui/gui.png", Rgba([3, 3, 3, 255]));

        let records = discover(&f.src).records;
        let result = BetaGridTransformer::new("b1.7.3").transform(&records, &f.ctx);

        assert!(f.ctx.output_dir.join("block/chest_front.png").exists());
        assert!(f.ctx.output_dir.join("gui/gui.png").exists());
        assert!(result.was_processed("block/chest_front.png"));
    }

    #[test]
    fn test_empty_atlas_is_reported_skipped() {
        let f = fixture();
        write_png(&f.src, "block/stone.png", Rgba([1, 1, 1, 255]));

        let records = discover(&f.src).records;
        let result = BetaGridTransformer::new("b1.7.3").transform(&records, &f.ctx);

        assert_eq!(result.outputs, vec!["terrain.png"]);
        assert!(result.skipped.contains(&"gui/items.png".to_string()));
        assert!(!f.ctx.output_dir.join("gui/items.png").exists());
    }

    #[test]
    fn test_external_map_takes_declared_kinds() {
        let f = fixture();
        write_png(&f.src, "block/stone.png", Rgba([9, 9, 9, 255]));
        let map_path = f.ctx.scratch_dir.join("map.json");
        fs::write(
            &map_path,
            r#"{"rows": 1, "cols": 2, "tile_size": 16, "coordinates": {"1,0": "stone"}}"#,
        )
        .unwrap();
        let spec = AtlasSpec::terrain().with_map(&map_path);

        let records = discover(&f.src).records;
        let result =
            BetaGridTransformer::with_atlases("b1.7.3", vec![spec]).transform(&records, &f.ctx);

        let terrain = codec::decode(&f.ctx.output_dir.join("terrain.png")).unwrap();
        assert_eq!(terrain.dimensions(), (32, 16));
        assert_eq!(*terrain.get_pixel(16, 0), Rgba([9, 9, 9, 255]));
        assert!(result.is_success());
    }

    #[test]
    fn test_malformed_map_fails_the_run() {
        let f = fixture();
        write_png(&f.src, "block/stone.png", Rgba([9, 9, 9, 255]));
        let map_path = f.ctx.scratch_dir.join("map.json");
        fs::write(&map_path, "{ broken").unwrap();
        let spec = AtlasSpec::terrain().with_map(&map_path);

        let records = discover(&f.src).records;
        let result =
            BetaGridTransformer::with_atlases("b1.7.3", vec![spec]).transform(&records, &f.ctx);

        assert!(!result.is_success());
        assert!(result.error.unwrap().contains("terrain.png"));
    }

    #[test]
    fn test_missing_map_file_falls_back() {
        let spec = AtlasSpec::items().with_map("/nonexistent/items.json");
        let (map, fallback) = spec.resolve_map().unwrap();
        assert!(fallback);
        assert_eq!(map, DefaultLayout::Items.map());
    }

    #[test]
    fn test_unknown_files_are_ignored() {
        let f = fixture();
        write_png(&f.src, "block/stone.png", Rgba([1, 1, 1, 255]));
        fs::write(f.src.join("sound.ogg"), b"ogg").unwrap();

        let records = discover(&f.src).records;
        let result = BetaGridTransformer::new("b1.7.3").transform(&records, &f.ctx);

        assert!(!f.ctx.output_dir.join("sound.ogg").exists());
        assert!(!result.was_processed("sound.ogg"));
    }
}
