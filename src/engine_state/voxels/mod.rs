//! # Voxels
//!
//! Everything that describes the voxel scene before it reaches the GPU.
//!
//! * **Block**: block definitions, the registry and material codes
//! * **Grid**: the dense volume of material codes the mesher reads
//! * **Terrain**: procedural generators that fill a grid

pub mod block;
pub mod grid;
pub mod terrain;
