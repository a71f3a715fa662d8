//! Pipeline integration tests
//!
//! Drives whole profile builds over a temporary project:
//!
//! - Grid profiles compose `terrain.png` and `gui/items.png`
//! - Passthrough profiles copy the tree
//! - Per-version files are reconciled into the output
//! - Failures are contained to the profile that caused them

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

use image::{Rgba, RgbaImage};
use packsmith::atlas::PLACEHOLDER_COLOR;
use packsmith::build::{BuildSummary, Pipeline};
use packsmith::config::parse_config;
use packsmith::project::Project;

// ============================================================================
// Test Utilities
// ============================================================================

const CONFIG: &str = r#"
[project]
name = "test-pack"
description = "Shared description"

[profiles."b1.7.3"]
transformer = "beta-grid"
description = "Beta 1.7.3"

[profiles."1.20"]
transformer = "passthrough"
"#;

const RED: Rgba<u8> = Rgba([200, 20, 20, 255]);
const GREEN: Rgba<u8> = Rgba([20, 200, 20, 255]);

fn write_bytes(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}

fn write_png(root: &Path, rel: &str, size: u32, color: Rgba<u8>) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(size, size, color).save(path).unwrap();
}

/// A project with a small shared tree, one loose file and one override.
fn create_project() -> (TempDir, Project) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write_png(root, "src/shared/textures/block/stone.png", 16, RED);
    write_png(root, "src/shared/textures/item/apple.png", 16, GREEN);
    write_png(root, "src/shared/textures/gui/widgets.png", 32, RED);
    write_bytes(root, "src/shared/sounds/dig.ogg", b"not a texture");
    write_bytes(root, "src/pack.mcmeta", b"{\"pack\":{}}");
    write_bytes(root, "src/versions/b1.7.3/pack.txt", b"Beta pack");

    let project = Project::new(parse_config(CONFIG).unwrap(), root.to_path_buf());
    (temp, project)
}

fn read_zip_entry(artifact: &Path, name: &str) -> String {
    let mut archive = zip::ZipArchive::new(File::open(artifact).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut contents = String::new();
    entry.read_to_string(&mut contents).unwrap();
    contents
}

fn zip_names(artifact: &Path) -> Vec<String> {
    let archive = zip::ZipArchive::new(File::open(artifact).unwrap()).unwrap();
    archive.file_names().map(String::from).collect()
}

fn cell_pixel(atlas: &RgbaImage, cx: u32, cy: u32) -> Rgba<u8> {
    *atlas.get_pixel(cx * 16 + 8, cy * 16 + 8)
}

// ============================================================================
// Grid Profiles
// ============================================================================

#[test]
fn test_beta_grid_profile_end_to_end() {
    let (temp, project) = create_project();
    let pipeline = Pipeline::new(project);

    let outcome = pipeline.build("b1.7.3");
    assert!(outcome.is_success(), "{:?}", outcome.error());

    let out = temp.path().join("build/b1.7.3");
    let terrain = image::open(out.join("terrain.png")).unwrap().to_rgba8();
    assert_eq!(terrain.dimensions(), (256, 256));
    assert_eq!(cell_pixel(&terrain, 1, 0), RED);
    assert_eq!(cell_pixel(&terrain, 14, 0), PLACEHOLDER_COLOR);
    assert_eq!(cell_pixel(&terrain, 2, 0)[3], 0);

    let items = image::open(out.join("gui/items.png")).unwrap().to_rgba8();
    assert_eq!(cell_pixel(&items, 10, 0), GREEN);

    // Composed textures are not copied loose; everything else is
    assert!(!out.join("textures/block/stone.png").exists());
    assert!(!out.join("textures/item/apple.png").exists());
    assert!(out.join("textures/gui/widgets.png").is_file());
    assert!(out.join("pack.mcmeta").is_file());
    assert!(out.join("pack.txt").is_file());
    assert!(!out.join("sounds/dig.ogg").exists());

    let result = &outcome.result;
    assert!(result.was_processed("textures/block/stone.png"));
    assert!(result.was_processed("pack.txt"));
    assert_eq!(result.outputs, vec!["terrain.png".to_string(), "gui/items.png".to_string()]);
    assert!(result.skipped.contains(&"dirt".to_string()));

    let artifact = outcome.artifact.expect("artifact");
    assert_eq!(artifact.path, temp.path().join("dist/b1.7.3.zip"));
    let manifest = read_zip_entry(&artifact.path, "manifest.txt");
    assert!(manifest.starts_with("profile: b1.7.3\ndescription: Beta 1.7.3\nbuilt: "));
    let names = zip_names(&artifact.path);
    assert!(names.contains(&"terrain.png".to_string()));
    assert!(names.contains(&"gui/items.png".to_string()));
    assert!(names.contains(&"pack.txt".to_string()));
}

#[test]
fn test_undecodable_texture_is_skipped_not_fatal() {
    let (temp, project) = create_project();
    write_bytes(temp.path(), "src/shared/textures/block/dirt.png", b"definitely not a png");
    let pipeline = Pipeline::new(project).with_packaging(false);

    let outcome = pipeline.build("b1.7.3");
    assert!(outcome.is_success());
    assert!(outcome.artifact.is_none());

    let result = &outcome.result;
    assert!(result.skipped.contains(&"textures/block/dirt.png".to_string()));
    assert!(!result.was_processed("textures/block/dirt.png"));

    let terrain = image::open(temp.path().join("build/b1.7.3/terrain.png")).unwrap().to_rgba8();
    assert_eq!(cell_pixel(&terrain, 1, 0), RED);
    assert_eq!(cell_pixel(&terrain, 2, 0)[3], 0);
}

#[test]
fn test_configured_map_drives_layout() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_png(root, "src/shared/textures/block/stone.png", 16, RED);
    write_bytes(
        root,
        "maps/terrain.json",
        br#"{"rows": 2, "cols": 2, "tile_size": 16, "coordinates": {"1,1": "stone", "0,0": "unused"}}"#,
    );
    let config = parse_config(
        r#"
[profiles.old]
transformer = "beta-grid"

[[profiles.old.atlases]]
output = "terrain.png"
map = "maps/terrain.json"
"#,
    )
    .unwrap();
    let pipeline = Pipeline::new(Project::new(config, root.to_path_buf())).with_packaging(false);

    let outcome = pipeline.build("old");
    assert!(outcome.is_success(), "{:?}", outcome.error());

    let terrain = image::open(root.join("build/old/terrain.png")).unwrap().to_rgba8();
    assert_eq!(terrain.dimensions(), (32, 32));
    assert_eq!(cell_pixel(&terrain, 1, 1), RED);
    assert_eq!(cell_pixel(&terrain, 0, 0), PLACEHOLDER_COLOR);
}

#[test]
fn test_malformed_map_fails_profile() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write_png(root, "src/shared/textures/block/stone.png", 16, RED);
    write_bytes(root, "maps/terrain.json", b"{ not json");
    let config = parse_config(
        r#"
[profiles.old]
transformer = "beta-grid"

[[profiles.old.atlases]]
output = "terrain.png"
map = "maps/terrain.json"
"#,
    )
    .unwrap();
    let pipeline = Pipeline::new(Project::new(config, root.to_path_buf()));

    let outcome = pipeline.build("old");
    assert!(!outcome.is_success());
    assert!(outcome.error().unwrap().starts_with("atlas 'terrain.png'"));
    assert!(outcome.artifact.is_none());
    assert!(!root.join("dist/old.zip").exists());
}

#[test]
fn test_oversized_map_fails_only_its_profile() {
    let (temp, _) = create_project();
    let root = temp.path();
    write_bytes(
        root,
        "maps/terrain.json",
        br#"{"rows": 1, "cols": 3000000000, "tile_size": 2, "coordinates": {"0,0": "stone"}}"#,
    );
    let config = parse_config(
        r#"
[profiles.old]
transformer = "beta-grid"

[[profiles.old.atlases]]
output = "terrain.png"
map = "maps/terrain.json"

[profiles."1.20"]
transformer = "passthrough"
"#,
    )
    .unwrap();
    let pipeline = Pipeline::new(Project::new(config, root.to_path_buf()));

    let mut summary = BuildSummary::new();
    for id in ["old", "1.20"] {
        summary.add(pipeline.build(id));
    }
    assert_eq!(summary.failed_count(), 1);
    assert_eq!(summary.success_count(), 1);
    assert!(!root.join("dist/old.zip").exists());
    assert!(root.join("dist/1.20.zip").is_file());
}

// ============================================================================
// Passthrough Profiles and Reconciliation
// ============================================================================

#[test]
fn test_passthrough_copies_tree() {
    let (temp, project) = create_project();
    let pipeline = Pipeline::new(project).with_packaging(false);

    let outcome = pipeline.build("1.20");
    assert!(outcome.is_success());

    let out = temp.path().join("build/1.20");
    assert!(out.join("textures/block/stone.png").is_file());
    assert!(out.join("textures/item/apple.png").is_file());
    assert!(out.join("pack.mcmeta").is_file());
    assert!(!out.join("terrain.png").exists());
    // Other profiles' overrides do not leak in
    assert!(!out.join("pack.txt").exists());
}

#[test]
fn test_profile_override_replaces_shared_file() {
    let (temp, project) = create_project();
    write_bytes(temp.path(), "src/versions/1.20/pack.mcmeta", b"override");
    write_bytes(temp.path(), "src/versions/1.20/textures/block/extra.png", b"extra");
    let pipeline = Pipeline::new(project);

    let outcome = pipeline.build("1.20");
    assert!(outcome.is_success());

    let out = temp.path().join("build/1.20");
    assert_eq!(fs::read(out.join("pack.mcmeta")).unwrap(), b"override");
    assert_eq!(fs::read(out.join("textures/block/extra.png")).unwrap(), b"extra");
    assert!(outcome.result.was_processed("textures/block/extra.png"));
    assert!(!outcome.result.skipped.contains(&"pack.mcmeta".to_string()));

    let artifact = outcome.artifact.expect("artifact");
    assert_eq!(read_zip_entry(&artifact.path, "pack.mcmeta"), "override");
}

#[test]
fn test_grid_profile_override_skips_composited_sources() {
    let (temp, project) = create_project();
    write_bytes(temp.path(), "src/versions/b1.7.3/pack.mcmeta", b"beta override");
    write_bytes(temp.path(), "src/versions/b1.7.3/textures/block/stone.png", b"loose stone");
    write_bytes(temp.path(), "src/versions/b1.7.3/terrain.png", b"hand made atlas");
    let pipeline = Pipeline::new(project).with_packaging(false);

    let outcome = pipeline.build("b1.7.3");
    assert!(outcome.is_success(), "{:?}", outcome.error());

    let out = temp.path().join("build/b1.7.3");
    // Copied-through file is replaced by the override
    assert_eq!(fs::read(out.join("pack.mcmeta")).unwrap(), b"beta override");
    // Composited source and the composite itself are not overwritten
    assert!(!out.join("textures/block/stone.png").exists());
    let terrain = image::open(out.join("terrain.png")).unwrap().to_rgba8();
    assert_eq!(cell_pixel(&terrain, 1, 0), RED);
}

#[test]
fn test_rebuild_clears_stale_output() {
    let (temp, project) = create_project();
    let pipeline = Pipeline::new(project).with_packaging(false);
    let stale = temp.path().join("build/1.20/old.png");
    write_bytes(temp.path(), "build/1.20/old.png", b"stale");

    assert!(pipeline.build("1.20").is_success());
    assert!(!stale.exists());
    // Scratch directories never outlive a run
    let scratch = temp.path().join("build/.scratch");
    assert_eq!(fs::read_dir(scratch).unwrap().count(), 0);
}

// ============================================================================
// Failure Containment
// ============================================================================

#[test]
fn test_unknown_profile_has_no_side_effects() {
    let (temp, project) = create_project();
    let pipeline = Pipeline::new(project);

    let outcome = pipeline.build("ghost");
    assert!(!outcome.is_success());
    assert!(outcome.error().unwrap().contains("ghost"));
    assert!(!temp.path().join("build").exists());
    assert!(!temp.path().join("dist").exists());
}

#[test]
fn test_one_failing_profile_does_not_stop_others() {
    let (_temp, project) = create_project();
    let pipeline = Pipeline::new(project).with_packaging(false);

    let mut summary = BuildSummary::new();
    for id in ["ghost", "1.20", "b1.7.3"] {
        summary.add(pipeline.build(id));
    }

    assert_eq!(summary.success_count(), 2);
    assert_eq!(summary.failed_count(), 1);
    assert!(!summary.is_success());
    assert!(summary.summary().contains("  - ghost: "));
}
