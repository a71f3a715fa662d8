//! Built-in legacy layouts.
//!
//! Fallback position tables for the classic 16×16 `terrain.png` and
//! `gui/items.png` grids, used when a profile has no coordinate-map file.
//! Names follow the modern per-file texture names so a current asset tree
//! can feed them directly.

use super::CoordinateMap;
use crate::assets::AssetKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Legacy grids are always 16 cells square.
pub const LEGACY_GRID: u32 = 16;

/// Nominal cell size of the legacy grids.
pub const LEGACY_CELL_SIZE: u32 = 16;

/// Which built-in table an atlas falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefaultLayout {
    #[default]
    Terrain,
    Items,
}

impl DefaultLayout {
    /// Guess the layout from an atlas file name (`items.png` ⇒ items).
    pub fn for_atlas_file(path: &Path) -> Self {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if stem.eq_ignore_ascii_case("items") {
            DefaultLayout::Items
        } else {
            DefaultLayout::Terrain
        }
    }

    /// The built-in coordinate map for this layout.
    pub fn map(self) -> CoordinateMap {
        let positions = match self {
            DefaultLayout::Terrain => TERRAIN_POSITIONS,
            DefaultLayout::Items => ITEM_POSITIONS,
        };
        CoordinateMap::from_positions(LEGACY_GRID, LEGACY_GRID, LEGACY_CELL_SIZE, positions)
    }

    /// Matching routing category.
    pub fn category(self) -> LegacyCategory {
        match self {
            DefaultLayout::Terrain => LegacyCategory::Terrain,
            DefaultLayout::Items => LegacyCategory::Items,
        }
    }
}

/// Where the legacy heuristics send a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyCategory {
    /// Composed into the terrain grid
    Terrain,
    /// Composed into the items grid
    Items,
    /// Rendered from an entity sheet; never composed
    Entity,
}

/// Route a texture by name for the legacy fallback layouts.
///
/// Names are matched on `_`-separated segments, so `redstone_torch` is a
/// torch but `chestplate` is not a chest. Torches and placed door halves
/// live on the terrain grid even when they sit under an item directory;
/// door items use the items grid; chests are entity-rendered and stay out
/// of both grids.
pub fn legacy_category(name: &str, kind: AssetKind) -> LegacyCategory {
    let lower = name.to_ascii_lowercase();
    let has = |word: &str| lower.split('_').any(|segment| segment == word);

    if has("chest") {
        return LegacyCategory::Entity;
    }
    if has("torch") {
        return LegacyCategory::Terrain;
    }
    if has("door") {
        return if kind == AssetKind::ItemTexture {
            LegacyCategory::Items
        } else {
            LegacyCategory::Terrain
        };
    }

    match kind {
        AssetKind::ItemTexture => LegacyCategory::Items,
        _ => LegacyCategory::Terrain,
    }
}

#[rustfmt::skip]
const TERRAIN_POSITIONS: &[(&str, u32, u32)] = &[
    ("grass_block_top", 0, 0), ("stone", 1, 0), ("dirt", 2, 0), ("grass_block_side", 3, 0),
    ("oak_planks", 4, 0), ("smooth_stone_slab_side", 5, 0), ("smooth_stone", 6, 0),
    ("bricks", 7, 0), ("tnt_side", 8, 0), ("tnt_top", 9, 0), ("tnt_bottom", 10, 0),
    ("cobweb", 11, 0), ("poppy", 12, 0), ("dandelion", 13, 0), ("unused", 14, 0),
    ("oak_sapling", 15, 0),
    ("cobblestone", 0, 1), ("bedrock", 1, 1), ("sand", 2, 1), ("gravel", 3, 1),
    ("oak_log", 4, 1), ("oak_log_top", 5, 1), ("iron_block", 6, 1), ("gold_block", 7, 1),
    ("diamond_block", 8, 1), ("unused", 9, 1), ("unused", 10, 1), ("unused", 11, 1),
    ("red_mushroom", 12, 1), ("brown_mushroom", 13, 1),
    ("gold_ore", 0, 2), ("iron_ore", 1, 2), ("coal_ore", 2, 2), ("bookshelf", 3, 2),
    ("mossy_cobblestone", 4, 2), ("obsidian", 5, 2), ("grass_block_side_overlay", 6, 2),
    ("short_grass", 7, 2), ("crafting_table_top", 11, 2), ("furnace_front", 12, 2),
    ("furnace_side", 13, 2), ("dispenser_front", 14, 2),
    ("sponge", 0, 3), ("glass", 1, 3), ("diamond_ore", 2, 3), ("redstone_ore", 3, 3),
    ("oak_leaves", 4, 3), ("crafting_table_side", 11, 3), ("crafting_table_front", 12, 3),
    ("furnace_front_on", 13, 3), ("furnace_top", 14, 3), ("spruce_sapling", 15, 3),
    ("white_wool", 0, 4), ("spawner", 1, 4), ("snow", 2, 4), ("ice", 3, 4),
    ("grass_block_snow", 4, 4), ("cactus_top", 5, 4), ("cactus_side", 6, 4),
    ("cactus_bottom", 7, 4), ("clay", 8, 4), ("sugar_cane", 9, 4), ("jukebox_side", 10, 4),
    ("jukebox_top", 11, 4), ("birch_sapling", 15, 4),
    ("torch", 0, 5), ("oak_door_top", 1, 5), ("iron_door_top", 2, 5), ("ladder", 3, 5),
    ("farmland_moist", 6, 5), ("farmland", 7, 5), ("wheat_stage0", 8, 5),
    ("lever", 0, 6), ("oak_door_bottom", 1, 6), ("iron_door_bottom", 2, 6),
    ("redstone_torch", 3, 6), ("pumpkin_top", 6, 6), ("netherrack", 7, 6),
    ("soul_sand", 8, 6), ("glowstone", 9, 6),
    ("rail_corner", 0, 7), ("pumpkin_side", 6, 7), ("carved_pumpkin", 7, 7),
    ("jack_o_lantern", 8, 7), ("cake_top", 9, 7),
    ("rail", 0, 8), ("cake_side", 10, 7),
    ("lapis_ore", 0, 10), ("lapis_block", 0, 9),
    ("sandstone_top", 0, 11), ("sandstone", 0, 12), ("sandstone_bottom", 0, 13),
    ("water_still", 13, 12), ("lava_still", 13, 14),
];

#[rustfmt::skip]
const ITEM_POSITIONS: &[(&str, u32, u32)] = &[
    ("leather_helmet", 0, 0), ("chainmail_helmet", 1, 0), ("iron_helmet", 2, 0),
    ("diamond_helmet", 3, 0), ("golden_helmet", 4, 0), ("flint_and_steel", 5, 0),
    ("flint", 6, 0), ("coal", 7, 0), ("string", 8, 0), ("wheat_seeds", 9, 0),
    ("apple", 10, 0), ("golden_apple", 11, 0), ("egg", 12, 0), ("sugar", 13, 0),
    ("snowball", 14, 0),
    ("leather_chestplate", 0, 1), ("chainmail_chestplate", 1, 1), ("iron_chestplate", 2, 1),
    ("diamond_chestplate", 3, 1), ("golden_chestplate", 4, 1), ("bow", 5, 1),
    ("brick", 6, 1), ("iron_ingot", 7, 1), ("feather", 8, 1), ("wheat", 9, 1),
    ("painting", 10, 1), ("sugar_cane", 11, 1), ("bone", 12, 1), ("cake", 13, 1),
    ("slime_ball", 14, 1),
    ("bucket", 10, 4), ("water_bucket", 11, 4), ("lava_bucket", 12, 4), ("milk_bucket", 13, 4),
    ("oak_door", 11, 2), ("iron_door", 12, 2), ("bed", 13, 2),
    ("stick", 5, 3), ("compass", 6, 3), ("diamond", 7, 3), ("redstone", 8, 3),
    ("clay_ball", 9, 3), ("paper", 10, 3), ("book", 11, 3), ("map", 12, 3),
    ("wooden_sword", 0, 4), ("stone_sword", 1, 4), ("iron_sword", 2, 4),
    ("diamond_sword", 3, 4), ("golden_sword", 4, 4),
    ("wooden_shovel", 0, 5), ("stone_shovel", 1, 5), ("iron_shovel", 2, 5),
    ("diamond_shovel", 3, 5), ("golden_shovel", 4, 5),
    ("wooden_pickaxe", 0, 6), ("stone_pickaxe", 1, 6), ("iron_pickaxe", 2, 6),
    ("diamond_pickaxe", 3, 6), ("golden_pickaxe", 4, 6),
    ("wooden_axe", 0, 7), ("stone_axe", 1, 7), ("iron_axe", 2, 7),
    ("diamond_axe", 3, 7), ("golden_axe", 4, 7),
    ("gold_ingot", 7, 2), ("bowl", 7, 4), ("mushroom_stew", 8, 4),
    ("minecart", 7, 8), ("saddle", 8, 6), ("fishing_rod", 5, 4), ("clock", 6, 4),
    ("gunpowder", 8, 2), ("unused", 15, 15),
];
