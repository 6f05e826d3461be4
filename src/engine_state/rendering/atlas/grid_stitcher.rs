//! # Grid Stitcher
//!
//! Packs one tile per distinct face texture into a square grid.
//!
//! Tiles are read from `<texture_dir>/<name>.png`, resized to the tile size
//! and premultiplied. Missing files get a generated checker tile so the scene
//! stays readable without any assets.
//!
//! Mip levels are built tile by tile and packed into the same grid, so a
//! tile never blends with its neighbours at any level.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use image::{imageops, imageops::FilterType, Rgba, RgbaImage};
use log::{debug, warn};

use super::{FaceTable, StitchedAtlas, Stitcher};
use crate::engine_state::{error::AtlasBuildError, voxels::block::BlockDefinition};

pub struct GridStitcher {
    texture_dir: PathBuf,
    tile_size: u32,
}

impl GridStitcher {
    pub fn new(texture_dir: impl Into<PathBuf>, tile_size: u32) -> Self {
        Self {
            texture_dir: texture_dir.into(),
            tile_size: tile_size.max(1),
        }
    }

    fn tile_path(&self, name: &str) -> PathBuf {
        self.texture_dir.join(format!("{name}.png"))
    }

    fn load_tile(&self, name: &str) -> Result<RgbaImage, AtlasBuildError> {
        let path = self.tile_path(name);
        if !path.exists() {
            warn!(
                "Texture `{name}` not found at {}, using a generated tile",
                path.display()
            );
            return Ok(placeholder_tile(name, self.tile_size));
        }

        let tile = open_rgba(&path, name)?;
        if tile.dimensions() == (self.tile_size, self.tile_size) {
            Ok(tile)
        } else {
            Ok(imageops::resize(
                &tile,
                self.tile_size,
                self.tile_size,
                FilterType::Nearest,
            ))
        }
    }
}

fn open_rgba(path: &Path, name: &str) -> Result<RgbaImage, AtlasBuildError> {
    let bytes = std::fs::read(path).map_err(|source| AtlasBuildError::Io {
        name: name.to_string(),
        source,
    })?;
    let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png).map_err(
        |source| AtlasBuildError::Decode {
            name: name.to_string(),
            source,
        },
    )?;
    Ok(decoded.to_rgba8())
}

/// A two-tone checker whose colour is derived from the texture name.
fn placeholder_tile(name: &str, tile_size: u32) -> RgbaImage {
    let hash = name
        .bytes()
        .fold(0x811c_9dc5_u32, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(0x0100_0193));
    let [r, g, b, _] = hash.to_le_bytes();
    let light = Rgba([r | 0x40, g | 0x40, b | 0x40, 255]);
    let dark = Rgba([r / 2, g / 2, b / 2, 255]);
    let half = (tile_size / 2).max(1);

    RgbaImage::from_fn(tile_size, tile_size, |x, y| {
        if (x / half + y / half) % 2 == 0 {
            light
        } else {
            dark
        }
    })
}

/// Scales colour channels by alpha, rounding to nearest.
fn premultiply(tile: &mut RgbaImage) {
    for pixel in tile.pixels_mut() {
        let alpha = u16::from(pixel[3]);
        for channel in &mut pixel.0[..3] {
            *channel = ((u16::from(*channel) * alpha + 127) / 255) as u8;
        }
    }
}

/// Smallest square grid side that fits `tiles` tiles.
fn tiles_per_row(tiles: usize) -> u32 {
    let mut side = 1u32;
    while (side as usize) * (side as usize) < tiles {
        side += 1;
    }
    side
}

/// Lays `tiles` out row-major, `tile_count` to a row.
fn pack(tiles: &[RgbaImage], tile_count: u32, tile_side: u32) -> RgbaImage {
    let side = tile_count * tile_side;
    let mut atlas = RgbaImage::new(side, side);
    for (tile, image) in tiles.iter().enumerate() {
        let tile = tile as u32;
        let x = (tile % tile_count) * tile_side;
        let y = (tile / tile_count) * tile_side;
        imageops::replace(&mut atlas, image, i64::from(x), i64::from(y));
    }
    atlas
}

impl Stitcher for GridStitcher {
    fn stitch(&self, blocks: &[BlockDefinition]) -> Result<StitchedAtlas, AtlasBuildError> {
        let mut names: Vec<&str> = Vec::new();
        let mut tile_of_name: HashMap<&str, u32> = HashMap::new();
        let mut face_tiles = FaceTable::new();
        let mut face_sizes = FaceTable::new();

        for block in blocks {
            let faces = block.texture.faces().map(|name| {
                *tile_of_name.entry(name).or_insert_with(|| {
                    names.push(name);
                    (names.len() - 1) as u32
                })
            });
            face_tiles.insert(block.index, faces);
            face_sizes.insert(block.index, [self.tile_size; 6]);
        }

        if names.is_empty() {
            return Err(AtlasBuildError::Stitch(
                "no face textures to stitch".to_string(),
            ));
        }

        let tile_count = tiles_per_row(names.len());
        let side = tile_count
            .checked_mul(self.tile_size)
            .ok_or_else(|| AtlasBuildError::Stitch("atlas dimensions overflow".to_string()))?;

        let mut tiles = names
            .iter()
            .map(|name| {
                let mut tile = self.load_tile(name)?;
                premultiply(&mut tile);
                Ok(tile)
            })
            .collect::<Result<Vec<_>, AtlasBuildError>>()?;
        let atlas = pack(&tiles, tile_count, self.tile_size);

        let mut mip_levels = Vec::new();
        let mut tile_side = self.tile_size;
        while tile_side % 2 == 0 {
            tile_side /= 2;
            tiles = tiles
                .iter()
                .map(|tile| imageops::resize(tile, tile_side, tile_side, FilterType::Triangle))
                .collect();
            mip_levels.push(pack(&tiles, tile_count, tile_side).into_raw());
        }

        debug!(
            "Stitched {} tiles for {} blocks into a {side}x{side} atlas with {} mip levels",
            names.len(),
            blocks.len(),
            mip_levels.len()
        );

        Ok(StitchedAtlas {
            pixels: atlas.into_raw(),
            width: side,
            height: side,
            tile_size: self.tile_size,
            tile_count,
            face_tiles,
            face_sizes,
            mip_levels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::block::{block_side::BlockSide, BlockRegistry, TextureSpec};

    fn scratch_dir(test: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "voxel-terrain-viewer-{test}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn pixel(atlas: &StitchedAtlas, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * atlas.width + x) * 4) as usize;
        atlas.pixels[offset..offset + 4].try_into().unwrap()
    }

    #[test]
    fn test_packs_loaded_and_missing_tiles() {
        let dir = scratch_dir("pack");
        RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128]))
            .save(dir.join("glass.png"))
            .unwrap();
        // Twice the tile size, gets scaled down.
        RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255]))
            .save(dir.join("grass_top.png"))
            .unwrap();

        let mut registry = BlockRegistry::new();
        registry
            .register_block("glass", TextureSpec::single("glass"), true)
            .unwrap();
        registry
            .register_block(
                "grass",
                TextureSpec::top_bottom_sides("grass_top", "dirt", "grass_side"),
                false,
            )
            .unwrap();
        let blocks: Vec<_> = registry.blocks().cloned().collect();

        let atlas = GridStitcher::new(&dir, 4).stitch(&blocks).unwrap();

        // glass, grass_side, dirt, grass_top -> 2x2 grid
        assert_eq!(atlas.tile_count, 2);
        assert_eq!((atlas.width, atlas.height), (8, 8));
        assert_eq!(atlas.pixels.len(), 8 * 8 * 4);
        assert_eq!(atlas.face_tiles.get(1), Some([0; 6]));
        assert_eq!(atlas.face_tiles.face(2, BlockSide::LEFT), Some(1));
        assert_eq!(atlas.face_tiles.face(2, BlockSide::BOTTOM), Some(2));
        assert_eq!(atlas.face_tiles.face(2, BlockSide::TOP), Some(3));
        assert_eq!(atlas.face_sizes.get(2), Some([4; 6]));

        // Premultiplied glass in tile 0, scaled grass_top in tile 3.
        assert_eq!(pixel(&atlas, 1, 1), [128, 0, 0, 128]);
        assert_eq!(pixel(&atlas, 5, 5), [0, 0, 255, 255]);
        // Generated tiles are opaque.
        assert_eq!(pixel(&atlas, 5, 1)[3], 255);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_mip_levels_halve_each_tile() {
        let dir = scratch_dir("mips");
        // Left half opaque white, right half transparent.
        RgbaImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
        .save(dir.join("half.png"))
        .unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]))
            .save(dir.join("blue.png"))
            .unwrap();

        let mut registry = BlockRegistry::new();
        registry
            .register_block("half", TextureSpec::single("half"), true)
            .unwrap();
        registry
            .register_block("blue", TextureSpec::single("blue"), false)
            .unwrap();
        let blocks: Vec<_> = registry.blocks().cloned().collect();

        let atlas = GridStitcher::new(&dir, 4).stitch(&blocks).unwrap();

        // 8x8 base, then 4x4 and 2x2
        assert_eq!(atlas.mip_levels.len(), 2);
        assert_eq!(atlas.mip_levels[0].len(), 4 * 4 * 4);
        assert_eq!(atlas.mip_levels[1].len(), 2 * 2 * 4);
        assert_eq!(atlas.level_size(2), (2, 2));

        // The blue tile keeps its colour at the smallest level.
        let smallest = &atlas.mip_levels[1];
        assert_eq!(&smallest[4..8], &[0, 0, 255, 255]);
        // The half-transparent tile averages on its own, untouched by blue.
        assert_eq!(smallest[2], smallest[0]);
        assert!(smallest[3] > 0 && smallest[3] < 255);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_odd_tile_size_has_no_mips() {
        let mut registry = BlockRegistry::new();
        registry
            .register_block("dirt", TextureSpec::single("dirt"), false)
            .unwrap();
        let blocks: Vec<_> = registry.blocks().cloned().collect();

        let atlas = GridStitcher::new(std::env::temp_dir().join("voxel-terrain-viewer-no-tiles"), 3)
            .stitch(&blocks)
            .unwrap();
        assert!(atlas.mip_levels.is_empty());
        assert_eq!(atlas.pixels.len(), 3 * 3 * 4);
    }

    #[test]
    fn test_undecodable_texture_fails() {
        let dir = scratch_dir("decode");
        std::fs::write(dir.join("broken.png"), b"definitely not a png").unwrap();

        let mut registry = BlockRegistry::new();
        registry
            .register_block("broken", TextureSpec::single("broken"), false)
            .unwrap();
        let blocks: Vec<_> = registry.blocks().cloned().collect();

        let error = GridStitcher::new(&dir, 4).stitch(&blocks).unwrap_err();
        assert!(matches!(error, AtlasBuildError::Decode { ref name, .. } if name == "broken"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_empty_block_list_fails() {
        assert!(matches!(
            GridStitcher::new("unused", 16).stitch(&[]),
            Err(AtlasBuildError::Stitch(_))
        ));
    }

    #[test]
    fn test_square_grid_side() {
        assert_eq!(tiles_per_row(1), 1);
        assert_eq!(tiles_per_row(4), 2);
        assert_eq!(tiles_per_row(5), 3);
        assert_eq!(tiles_per_row(10), 4);
    }
}
