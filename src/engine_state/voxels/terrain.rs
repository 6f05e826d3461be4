//! # Terrain Generation
//!
//! Procedural terrain for the viewer. Generators only see block names through
//! the [`MaterialTable`], so any registry whose names match gets the same shape.

use cgmath::{Point3, Vector3};
use noise::{NoiseFn, Perlin};

use super::{
    block::material::{MaterialCode, MaterialTable, OPAQUE_BIT},
    grid::VoxelGrid,
};
use crate::config::TerrainConfig;

/// Scale applied to world coordinates before sampling the height noise
const HEIGHT_SCALE_FACTOR: f64 = 0.045;
/// Scale applied to world coordinates before sampling the cave noise
const CAVE_SCALE_FACTOR: f64 = 0.11;
/// Cave noise magnitude above which a voxel is carved out
const CAVE_THRESHOLD: f64 = 0.55;
/// Depth of the dirt layer below the surface
const DIRT_DEPTH: usize = 3;
/// One in this many stone voxels turns into diamond ore
const ORE_RARITY: u32 = 60;

/// Code written for blocks the table does not know, e.g. when the registry is
/// empty and the viewer renders without textures.
pub const FALLBACK_MATERIAL: MaterialCode = MaterialCode::from_raw(OPAQUE_BIT);

/// Anything that can fill a [`VoxelGrid`] with material codes.
pub trait TerrainGenerator {
    fn generate(&self, materials: &MaterialTable) -> VoxelGrid;
}

/// Rolling hills with caves, ore veins and lava pools, driven by Perlin noise.
pub struct PerlinTerrain {
    dimensions: Vector3<usize>,
    seed: u32,
    sea_level: usize,
}

impl PerlinTerrain {
    pub fn new(config: &TerrainConfig) -> Self {
        let [x, y, z] = config.size;
        Self {
            dimensions: Vector3::new(x, y, z),
            seed: config.seed,
            sea_level: config.sea_level,
        }
    }

    /// Surface height of column `(x, z)`, always inside the grid.
    fn column_height(&self, height_noise: &Perlin, x: usize, z: usize) -> usize {
        let max_height = self.dimensions.y.saturating_sub(1);
        if max_height == 0 {
            return 0;
        }

        let sample = height_noise.get([
            x as f64 * HEIGHT_SCALE_FACTOR,
            z as f64 * HEIGHT_SCALE_FACTOR,
        ]);
        // Perlin output is roughly in [-1, 1]; map it to the middle of the grid.
        let normalized = ((sample + 1.0) * 0.5).clamp(0.0, 1.0);
        let base = max_height as f64 * 0.3;
        let relief = max_height as f64 * 0.5;
        ((base + normalized * relief) as usize).min(max_height)
    }
}

fn code_or_fallback(materials: &MaterialTable, name: &str) -> MaterialCode {
    materials.code_of(name).unwrap_or(FALLBACK_MATERIAL)
}

impl TerrainGenerator for PerlinTerrain {
    fn generate(&self, materials: &MaterialTable) -> VoxelGrid {
        let height_noise = Perlin::new(self.seed);
        let cave_noise = Perlin::new(self.seed.wrapping_add(1));
        let mut rng = fastrand::Rng::with_seed(u64::from(self.seed));

        let grass = code_or_fallback(materials, "grass");
        let dirt = code_or_fallback(materials, "dirt");
        let stone = code_or_fallback(materials, "stone");
        let cobblestone = code_or_fallback(materials, "cobblestone");
        let ore = code_or_fallback(materials, "oreDiamond");
        let lava = code_or_fallback(materials, "lava");

        let mut grid = VoxelGrid::new(self.dimensions);

        for z in 0..self.dimensions.z {
            for x in 0..self.dimensions.x {
                let height = self.column_height(&height_noise, x, z);

                for y in 0..=height {
                    let depth = height - y;
                    let material = if y == 0 {
                        cobblestone
                    } else if depth == 0 {
                        grass
                    } else if depth <= DIRT_DEPTH {
                        dirt
                    } else if rng.u32(0..ORE_RARITY) == 0 {
                        ore
                    } else {
                        stone
                    };

                    let carved = y > 0
                        && depth > 0
                        && cave_noise
                            .get([
                                x as f64 * CAVE_SCALE_FACTOR,
                                y as f64 * CAVE_SCALE_FACTOR,
                                z as f64 * CAVE_SCALE_FACTOR,
                            ])
                            .abs()
                            > CAVE_THRESHOLD;

                    let cell = if carved { None } else { Some(material) };
                    grid.set(Point3::new(x, y, z), cell);
                }

                // Low valleys become lava pools.
                for y in (height + 1)..self.sea_level.min(self.dimensions.y) {
                    grid.set(Point3::new(x, y, z), Some(lava));
                }
            }
        }

        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ViewerConfig,
        engine_state::voxels::block::material,
    };

    fn small_terrain() -> TerrainConfig {
        TerrainConfig {
            size: [16, 12, 16],
            seed: 42,
            sea_level: 4,
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let registry = ViewerConfig::default().block_registry().unwrap();
        let table = material::encode(Some(&registry)).unwrap();
        let generator = PerlinTerrain::new(&small_terrain());

        assert_eq!(generator.generate(&table), generator.generate(&table));
    }

    #[test]
    fn test_uses_registered_codes() {
        let registry = ViewerConfig::default().block_registry().unwrap();
        let table = material::encode(Some(&registry)).unwrap();
        let grid = PerlinTerrain::new(&small_terrain()).generate(&table);

        let known: Vec<MaterialCode> = table.iter().map(|(_, code)| code).collect();
        assert!(grid.solid_count() > 0);
        assert!(grid.iter_solid().all(|(_, code)| known.contains(&code)));
        // Bedrock row is never carved.
        assert_eq!(
            grid.get(Point3::new(0, 0, 0)),
            table.code_of("cobblestone")
        );
    }

    #[test]
    fn test_empty_table_falls_back() {
        let table = material::encode(None).unwrap();
        let grid = PerlinTerrain::new(&small_terrain()).generate(&table);

        assert!(grid.solid_count() > 0);
        assert!(grid.iter_solid().all(|(_, code)| code == FALLBACK_MATERIAL));
    }
}
