//! # Block Module
//!
//! Block definitions, the registry that hands out their indices, and the
//! material codes derived from them.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::engine_state::error::RegistryError;

use block_side::BlockSide;

pub mod block_side;
pub mod material;

/// Texture names for the faces of a block.
///
/// Deserializes from a plain string, a `[top, bottom, sides]` triple or a full
/// per-face array in [`BlockSide::all`] order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextureSpec {
    /// One texture on every face
    Single(String),
    /// Distinct top and bottom with a shared texture on the four sides
    TopBottomSides([String; 3]),
    /// One texture per face, ordered like [`BlockSide::all`]
    PerFace([String; 6]),
}

impl TextureSpec {
    pub fn single(name: impl Into<String>) -> Self {
        Self::Single(name.into())
    }

    pub fn top_bottom_sides(
        top: impl Into<String>,
        bottom: impl Into<String>,
        sides: impl Into<String>,
    ) -> Self {
        Self::TopBottomSides([top.into(), bottom.into(), sides.into()])
    }

    /// Resolves the texture name used by `side`.
    pub fn face(&self, side: BlockSide) -> &str {
        match self {
            TextureSpec::Single(name) => name,
            TextureSpec::TopBottomSides([top, bottom, sides]) => match side {
                BlockSide::TOP => top,
                BlockSide::BOTTOM => bottom,
                _ => sides,
            },
            TextureSpec::PerFace(names) => &names[side as usize],
        }
    }

    /// Texture names for all six faces in [`BlockSide::all`] order.
    pub fn faces(&self) -> [&str; 6] {
        BlockSide::all().map(|side| self.face(side))
    }
}

/// An immutable block registered with a [`BlockRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDefinition {
    /// Unique block name
    pub name: String,
    /// Face textures
    pub texture: TextureSpec,
    /// Whether light passes through the block
    pub transparent: bool,
    /// 1-based registry index
    pub index: u32,
}

/// Owns every [`BlockDefinition`] and assigns their 1-based indices.
///
/// Indices follow registration order unless a block is placed explicitly
/// with [`BlockRegistry::register_block_at`].
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    blocks: BTreeMap<u32, BlockDefinition>,
    name_to_index: HashMap<String, u32>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a block at the next free index after the highest one in use.
    ///
    /// # Returns
    /// The index assigned to the block
    pub fn register_block(
        &mut self,
        name: &str,
        texture: TextureSpec,
        transparent: bool,
    ) -> Result<u32, RegistryError> {
        let index = self.blocks.keys().next_back().map_or(1, |last| last + 1);
        self.register_block_at(index, name, texture, transparent)
    }

    /// Registers a block at a manually chosen index.
    ///
    /// The index is not range-checked against the material budget here; that
    /// happens when the registry is encoded.
    pub fn register_block_at(
        &mut self,
        index: u32,
        name: &str,
        texture: TextureSpec,
        transparent: bool,
    ) -> Result<u32, RegistryError> {
        if index == 0 {
            return Err(RegistryError::ZeroIndex(name.to_string()));
        }
        if self.name_to_index.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        if let Some(existing) = self.blocks.get(&index) {
            return Err(RegistryError::IndexTaken {
                index,
                existing: existing.name.clone(),
            });
        }
        if texture.faces().iter().any(|face| face.is_empty()) {
            return Err(RegistryError::EmptyTextureName(name.to_string()));
        }

        self.name_to_index.insert(name.to_string(), index);
        self.blocks.insert(
            index,
            BlockDefinition {
                name: name.to_string(),
                texture,
                transparent,
                index,
            },
        );

        Ok(index)
    }

    /// Index assigned to `name`, if registered.
    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.name_to_index.get(name).copied()
    }

    /// Transparency property of `name`, if registered.
    pub fn is_transparent(&self, name: &str) -> Option<bool> {
        self.get(name).map(|block| block.transparent)
    }

    pub fn get(&self, name: &str) -> Option<&BlockDefinition> {
        self.index_of(name).and_then(|index| self.blocks.get(&index))
    }

    /// All blocks in ascending index order.
    pub fn blocks(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
