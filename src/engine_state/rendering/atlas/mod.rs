//! # Texture Atlas
//!
//! The atlas lifecycle: stitch requests leave the render path through a
//! [`StitchScheduler`], come back as a [`StitchOutcome`], and are turned into a
//! ready [`AtlasState`] by the [`AtlasLifecycleController`].
//!
//! ## Lifecycle
//!
//! 1. `request_stitch` bumps the generation and schedules a [`StitchJob`]
//! 2. the job runs the [`Stitcher`] off the render path
//! 3. `complete` uploads the packed image, records the tile layout and the
//!    per-face tables, and swaps in a ready atlas in one assignment
//!
//! The caller rebuilds the mesh as soon as `complete` reports
//! [`StitchCompletion::Ready`].

use std::{collections::HashMap, sync::Arc};

use log::{debug, info};

use super::RenderBackend;
use crate::engine_state::{
    error::AtlasBuildError,
    voxels::block::{block_side::BlockSide, BlockDefinition, BlockRegistry},
};

pub mod grid_stitcher;

/// Per-material, per-face values keyed by the material's registry index.
///
/// Used both for tile ids and for tile pixel sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceTable {
    entries: HashMap<u32, [u32; 6]>,
}

impl FaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, material_index: u32, faces: [u32; 6]) {
        self.entries.insert(material_index, faces);
    }

    /// All six face values of a material in [`BlockSide::all`] order.
    pub fn get(&self, material_index: u32) -> Option<[u32; 6]> {
        self.entries.get(&material_index).copied()
    }

    pub fn face(&self, material_index: u32, side: BlockSide) -> Option<u32> {
        self.get(material_index).map(|faces| faces[side as usize])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A packed atlas image and its layout, as produced by a [`Stitcher`].
#[derive(Debug, Clone, PartialEq)]
pub struct StitchedAtlas {
    /// RGBA8 pixels with premultiplied alpha, row-major
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Edge length of one tile in pixels
    pub tile_size: u32,
    /// Tiles per atlas row (the atlas is square)
    pub tile_count: u32,
    /// Tile id of every face of every stitched material
    pub face_tiles: FaceTable,
    /// Pixel size of every face's tile
    pub face_sizes: FaceTable,
    /// Downsampled copies of `pixels`, level 1 first, each half the size of
    /// the one before
    pub mip_levels: Vec<Vec<u8>>,
}

impl StitchedAtlas {
    /// Pixel size of mip `level`, where level 0 is `pixels`.
    pub fn level_size(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }

    /// Every level's pixels, full size first.
    pub fn levels(&self) -> impl Iterator<Item = &[u8]> {
        std::iter::once(self.pixels.as_slice()).chain(self.mip_levels.iter().map(Vec::as_slice))
    }
}

/// Computes a packed atlas from block definitions.
pub trait Stitcher: Send + Sync {
    fn stitch(&self, blocks: &[BlockDefinition]) -> Result<StitchedAtlas, AtlasBuildError>;
}

/// A self-contained stitch request that can run on any thread.
pub struct StitchJob {
    pub generation: u64,
    pub blocks: Vec<BlockDefinition>,
    pub stitcher: Arc<dyn Stitcher>,
}

impl StitchJob {
    pub fn run(self) -> StitchOutcome {
        StitchOutcome {
            generation: self.generation,
            result: self.stitcher.stitch(&self.blocks),
        }
    }
}

/// The result of a [`StitchJob`], tagged with its request generation.
#[derive(Debug)]
pub struct StitchOutcome {
    pub generation: u64,
    pub result: Result<StitchedAtlas, AtlasBuildError>,
}

/// Runs stitch jobs away from the render path and reports their outcome back
/// to the engine.
pub trait StitchScheduler {
    fn schedule(&mut self, job: StitchJob);
}

/// The rendering subsystem's view of the atlas.
#[derive(Debug)]
pub struct AtlasState<T> {
    pub ready: bool,
    pub tile_size: u32,
    pub tile_count: u32,
    pub face_tiles: FaceTable,
    pub face_sizes: Option<FaceTable>,
    /// GPU texture, absent until the first upload
    pub texture: Option<T>,
    /// Generation of the stitch this state came from, 0 before any
    pub generation: u64,
}

impl<T> AtlasState<T> {
    /// Not ready, nothing uploaded.
    pub fn pending() -> Self {
        Self {
            ready: false,
            tile_size: 0,
            tile_count: 0,
            face_tiles: FaceTable::new(),
            face_sizes: None,
            texture: None,
            generation: 0,
        }
    }

    /// Ready without a texture. Used when there are no blocks to stitch.
    pub fn textureless() -> Self {
        Self {
            ready: true,
            tile_count: 1,
            ..Self::pending()
        }
    }
}

/// How a completed stitch was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StitchCompletion {
    /// The atlas is uploaded and ready; the mesh must be rebuilt.
    Ready { generation: u64 },
    /// A newer request is in flight; this result was dropped.
    Stale { generation: u64, latest: u64 },
}

/// Drives the stitch request/response cycle and surfaces a single ready signal.
#[derive(Debug, Default)]
pub struct AtlasLifecycleController {
    latest_generation: u64,
}

impl AtlasLifecycleController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest_generation
    }

    /// Schedules a stitch of every block in `registry`.
    ///
    /// # Returns
    /// The generation number of the new request
    pub fn request_stitch<S: StitchScheduler + ?Sized>(
        &mut self,
        registry: &BlockRegistry,
        stitcher: &Arc<dyn Stitcher>,
        scheduler: &mut S,
    ) -> u64 {
        self.latest_generation += 1;
        let generation = self.latest_generation;
        info!(
            "Requesting atlas stitch #{generation} for {} blocks",
            registry.len()
        );

        scheduler.schedule(StitchJob {
            generation,
            blocks: registry.blocks().cloned().collect(),
            stitcher: Arc::clone(stitcher),
        });

        generation
    }

    /// Applies a finished stitch.
    ///
    /// In order: uploads the texture, records tile size and count, records the
    /// per-face tables and marks the atlas ready. `atlas` is replaced in a
    /// single assignment, so it is never seen half updated.
    ///
    /// # Errors
    /// A failed stitch or a failed upload. Both are fatal; `atlas` is left as is.
    pub fn complete<B: RenderBackend>(
        &mut self,
        outcome: StitchOutcome,
        backend: &mut B,
        atlas: &mut AtlasState<B::Texture>,
    ) -> Result<StitchCompletion, AtlasBuildError> {
        let generation = outcome.generation;
        if generation < self.latest_generation {
            debug!(
                "Dropping stale atlas stitch #{generation}, latest is #{}",
                self.latest_generation
            );
            return Ok(StitchCompletion::Stale {
                generation,
                latest: self.latest_generation,
            });
        }

        let stitched = outcome.result?;
        let texture = backend.upload_atlas(&stitched)?;

        *atlas = AtlasState {
            ready: true,
            tile_size: stitched.tile_size,
            tile_count: stitched.tile_count,
            face_tiles: stitched.face_tiles,
            face_sizes: Some(stitched.face_sizes),
            texture: Some(texture),
            generation,
        };

        info!(
            "Atlas #{generation} ready: {}x{} tiles of {}px",
            atlas.tile_count, atlas.tile_count, atlas.tile_size
        );

        Ok(StitchCompletion::Ready { generation })
    }
}
