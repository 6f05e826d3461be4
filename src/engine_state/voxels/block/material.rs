//! # Material Encoding
//!
//! Packs a block's registry index and its opacity into the 16-bit code stored
//! in every voxel of a [`VoxelGrid`](crate::engine_state::voxels::grid::VoxelGrid).
//!
//! ## Layout
//!
//! ```text
//!  15 | 14 ............................ 0
//! ----+-----------------------------------
//!  O  |            index - 1
//! ```
//!
//! `O` is the opaque bit: set for solid blocks, clear for transparent ones.

use std::{collections::HashMap, fmt};

use log::warn;

use super::BlockRegistry;
use crate::engine_state::error::IndexRangeError;

/// High bit of a material code, set when the block is not transparent.
pub const OPAQUE_BIT: u16 = 0x8000;

/// Mask selecting the `index - 1` part of a material code.
pub const INDEX_MASK: u16 = 0x7FFF;

/// Largest registry index that still fits into the 15 index bits.
pub const MAX_MATERIAL_INDEX: u32 = INDEX_MASK as u32 + 1;

/// A 16-bit packed material as consumed by the mesher and the shaders.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialCode(u16);

impl MaterialCode {
    /// Packs a 1-based registry index and a transparency flag.
    ///
    /// # Errors
    /// Returns [`IndexRangeError`] if `index` is zero or larger than
    /// [`MAX_MATERIAL_INDEX`].
    pub fn encode(name: &str, index: u32, transparent: bool) -> Result<Self, IndexRangeError> {
        if index == 0 || index > MAX_MATERIAL_INDEX {
            return Err(IndexRangeError {
                name: name.to_string(),
                index,
            });
        }

        let packed = (index - 1) as u16;
        if transparent {
            Ok(Self(packed))
        } else {
            Ok(Self(OPAQUE_BIT | packed))
        }
    }

    /// Wraps a raw code, e.g. one read back from a voxel buffer.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// The raw 16-bit value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Recovers the 1-based registry index.
    pub const fn index(self) -> u32 {
        (self.0 & INDEX_MASK) as u32 + 1
    }

    /// Whether the opaque bit is set.
    pub const fn is_opaque(self) -> bool {
        self.0 & OPAQUE_BIT != 0
    }
}

impl fmt::Display for MaterialCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Non-fatal signal that no blocks were available to encode.
///
/// Callers keep going and render without textures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedModeWarning;

impl fmt::Display for DegradedModeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block registry is missing or empty, falling back to textureless rendering"
        )
    }
}

/// Block name to material code mapping produced by [`encode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialTable {
    codes: HashMap<String, MaterialCode>,
    warning: Option<DegradedModeWarning>,
}

impl MaterialTable {
    /// Looks up the material code registered under `name`.
    pub fn code_of(&self, name: &str) -> Option<MaterialCode> {
        self.codes.get(name).copied()
    }

    /// Iterates over every `(name, code)` pair in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, MaterialCode)> {
        self.codes.iter().map(|(name, code)| (name.as_str(), *code))
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The degraded-mode warning raised while encoding, if any.
    pub fn warning(&self) -> Option<&DegradedModeWarning> {
        self.warning.as_ref()
    }
}

/// Encodes every block of `registry` into its material code.
///
/// An absent or empty registry is not an error: the table comes back empty
/// and carries a [`DegradedModeWarning`].
///
/// # Errors
/// Fails on the first block whose index does not fit into 15 bits.
pub fn encode(registry: Option<&BlockRegistry>) -> Result<MaterialTable, IndexRangeError> {
    let Some(registry) = registry.filter(|registry| !registry.is_empty()) else {
        let warning = DegradedModeWarning;
        warn!("{warning}");
        return Ok(MaterialTable {
            codes: HashMap::new(),
            warning: Some(warning),
        });
    };

    let mut codes = HashMap::with_capacity(registry.len());
    for block in registry.blocks() {
        let code = MaterialCode::encode(&block.name, block.index, block.transparent)?;
        codes.insert(block.name.clone(), code);
    }

    Ok(MaterialTable {
        codes,
        warning: None,
    })
}
