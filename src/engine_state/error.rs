//! # Engine Errors
//!
//! Error types raised by the material encoder, the atlas lifecycle, the
//! graphics context and the block registry, plus the [`EngineError`] that
//! aggregates them.

use thiserror::Error;

use crate::config::ConfigError;

/// A block index does not fit into the 15 index bits of a material code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("block `{name}` has index {index}, material codes only address indices 1..=32768")]
pub struct IndexRangeError {
    pub name: String,
    pub index: u32,
}

/// Rejected block registrations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("block `{0}` cannot use index 0, indices are 1-based")]
    ZeroIndex(String),
    #[error("block `{0}` is already registered")]
    DuplicateName(String),
    #[error("index {index} is already taken by block `{existing}`")]
    IndexTaken { index: u32, existing: String },
    #[error("block `{0}` has an empty texture name")]
    EmptyTextureName(String),
}

/// Failures while stitching the atlas or handing it to the GPU.
#[derive(Error, Debug)]
pub enum AtlasBuildError {
    #[error("atlas stitching failed: {0}")]
    Stitch(String),
    #[error("failed to decode texture `{name}`: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to read texture `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("atlas upload failed: {0}")]
    Upload(String),
}

/// Unrecoverable graphics context failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("failed to create window: {0}")]
    Window(String),
    #[error("failed to create rendering surface: {0}")]
    Surface(String),
    #[error("no compatible graphics adapter found: {0}")]
    Adapter(String),
    #[error("failed to acquire graphics device: {0}")]
    Device(String),
    #[error("graphics device ran out of memory")]
    OutOfMemory,
    #[error("graphics device was lost: {0}")]
    Lost(String),
}

/// Any error that stops the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    IndexRange(#[from] IndexRangeError),
    #[error(transparent)]
    AtlasBuild(#[from] AtlasBuildError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("mesh rebuild requested before the texture atlas is ready")]
    AtlasNotReady,
}

impl EngineError {
    /// Whether the error came from the graphics context itself.
    ///
    /// Those are reported through the diagnostic surface instead of a plain log.
    pub fn is_context_error(&self) -> bool {
        matches!(self, EngineError::Context(_))
    }
}
