//! # Viewer Configuration
//!
//! Settings for the viewer, read from `assets/viewer.json` on native targets.
//! Every field has a default, so a partial file (or none at all) is valid.

use std::{fs, io, path::Path};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use winit::keyboard::KeyCode;

use crate::engine_state::{
    error::RegistryError,
    voxels::block::{BlockRegistry, TextureSpec},
};

/// Path the native binary reads its configuration from.
pub const CONFIG_PATH: &str = "assets/viewer.json";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A block entry as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    pub name: String,
    pub texture: TextureSpec,
    #[serde(default)]
    pub transparent: bool,
}

impl BlockConfig {
    fn opaque(name: &str, texture: TextureSpec) -> Self {
        Self {
            name: name.to_string(),
            texture,
            transparent: false,
        }
    }
}

/// Parameters of the procedural terrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Grid dimensions in voxels, `[x, y, z]`
    pub size: [usize; 3],
    pub seed: u32,
    /// Height below which empty columns are filled with lava
    pub sea_level: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: [48, 32, 48],
            seed: 1337,
            sea_level: 6,
        }
    }
}

/// Top-level viewer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Directory holding one `<name>.png` per texture
    pub texture_dir: String,
    /// Edge length of one atlas tile in pixels
    pub tile_size: u32,
    pub field_of_view_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    /// RGBA clear colour in `0.0..=1.0`
    pub clear_color: [f64; 4],
    /// Key that toggles the wireframe overlay
    pub wireframe_key: KeyCode,
    pub terrain: TerrainConfig,
    /// Fly camera speed in voxels per second
    pub camera_speed: f32,
    pub mouse_sensitivity: f32,
    pub blocks: Vec<BlockConfig>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            texture_dir: "assets/textures".to_string(),
            tile_size: 16,
            field_of_view_degrees: 45.0,
            z_near: 1.0,
            z_far: 1000.0,
            clear_color: [0.0, 0.0, 0.0, 0.0],
            wireframe_key: KeyCode::KeyF,
            terrain: TerrainConfig::default(),
            camera_speed: 12.0,
            mouse_sensitivity: 0.4,
            blocks: vec![
                BlockConfig::opaque("dirt", TextureSpec::single("dirt")),
                BlockConfig::opaque("stone", TextureSpec::single("stone")),
                BlockConfig::opaque("cobblestone", TextureSpec::single("cobblestone")),
                BlockConfig::opaque("lava", TextureSpec::single("lava_still")),
                BlockConfig::opaque("oreDiamond", TextureSpec::single("diamond_ore")),
                BlockConfig::opaque(
                    "grass",
                    TextureSpec::top_bottom_sides("grass_top", "dirt", "grass_side"),
                ),
            ],
        }
    }
}

impl ViewerConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads the configuration at `path`, falling back to defaults if the file
    /// does not exist.
    ///
    /// # Errors
    /// Any other I/O failure, or malformed JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => {
                info!("Loaded configuration from {}", path.display());
                Self::from_json(&json)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No configuration at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Builds a registry holding the configured blocks in list order.
    pub fn block_registry(&self) -> Result<BlockRegistry, RegistryError> {
        let mut registry = BlockRegistry::new();
        for block in &self.blocks {
            registry.register_block(&block.name, block.texture.clone(), block.transparent)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip() {
        let config = ViewerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ViewerConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ViewerConfig::from_json(
            r#"{ "wireframe_key": "KeyG", "terrain": { "seed": 7 }, "tile_size": 32 }"#,
        )
        .unwrap();

        assert_eq!(config.wireframe_key, KeyCode::KeyG);
        assert_eq!(config.tile_size, 32);
        assert_eq!(config.terrain.seed, 7);
        assert_eq!(config.terrain.size, [48, 32, 48]);
        assert_eq!(config.z_far, 1000.0);
    }

    #[test]
    fn test_block_list_from_json() {
        let config = ViewerConfig::from_json(
            r#"{ "blocks": [
                { "name": "glass", "texture": "glass", "transparent": true },
                { "name": "grass", "texture": ["grass_top", "dirt", "grass_side"] }
            ] }"#,
        )
        .unwrap();

        let registry = config.block_registry().unwrap();
        assert_eq!(registry.index_of("glass"), Some(1));
        assert_eq!(registry.is_transparent("glass"), Some(true));
        assert_eq!(registry.is_transparent("grass"), Some(false));
    }

    #[test]
    fn test_default_blocks_register() {
        let registry = ViewerConfig::default().block_registry().unwrap();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.index_of("grass"), Some(6));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("voxel-terrain-viewer-missing-config.json");
        let _ = fs::remove_file(&path);
        assert_eq!(ViewerConfig::load(&path).unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            ViewerConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
