//! Mesh generation and management for voxel rendering.
//!
//! The [`MeshBuildOrchestrator`] turns a voxel grid into GPU vertex buffers
//! once the atlas is ready:
//! 1. derive per-material, per-face tile ids from the material codes and the atlas
//! 2. run the [`Mesher`] to get triangles, wire lines and bounds
//! 3. upload both buffers and replace the current [`MeshState`] in one assignment
//! 4. reframe the camera on the new bounds
//!
//! # Architecture
//! - `MeshBuildOrchestrator`: Main interface for mesh (re)builds
//! - `TileLookup`: Material code to atlas tile resolution
//! - `culled`: The default face-culling mesher

use std::collections::HashMap;

use cgmath::Point3;
use log::debug;

use super::{
    atlas::FaceTable,
    vertex::{TerrainVertex, WireVertex},
    RenderBackend, RenderState,
};
use crate::engine_state::{
    camera_state::CameraState,
    error::EngineError,
    voxels::{
        block::{
            block_side::BlockSide,
            material::{MaterialCode, MaterialTable},
        },
        grid::VoxelGrid,
    },
};

pub mod culled;

/// Label of the terrain triangle vertex buffer
pub const TRIANGLE_BUFFER_NAME: &str = "Terrain Triangle Buffer";
/// Label of the wireframe line vertex buffer
pub const WIREFRAME_BUFFER_NAME: &str = "Terrain Wireframe Buffer";

/// Tile ids for every face of every known material.
#[derive(Debug, Clone, Default)]
pub struct TileLookup {
    tiles: HashMap<MaterialCode, [u32; 6]>,
    tile_count: u32,
}

impl TileLookup {
    /// Resolves each material of `materials` through the atlas's per-face table.
    ///
    /// # Arguments
    /// * `materials` - Block name to material code mapping
    /// * `face_tiles` - Per-face tile ids keyed by registry index
    /// * `tile_count` - Tiles per atlas row
    pub fn new(materials: &MaterialTable, face_tiles: &FaceTable, tile_count: u32) -> Self {
        let tiles = materials
            .iter()
            .filter_map(|(_, code)| face_tiles.get(code.index()).map(|faces| (code, faces)))
            .collect();

        Self { tiles, tile_count }
    }

    /// Tile id for one face of a material. Unknown materials use tile 0.
    pub fn tile(&self, code: MaterialCode, side: BlockSide) -> u32 {
        self.tiles
            .get(&code)
            .map_or(0, |faces| faces[side as usize])
    }

    pub fn tile_count(&self) -> u32 {
        self.tile_count
    }
}

/// CPU-side output of a [`Mesher`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub triangles: Vec<TerrainVertex>,
    /// Line list, two vertices per edge
    pub wires: Vec<WireVertex>,
    pub center: Point3<f32>,
    pub radius: f32,
}

/// Converts a voxel grid into renderable geometry.
pub trait Mesher {
    fn build(&self, grid: &VoxelGrid, tiles: &TileLookup) -> MeshData;
}

/// A mesh living on the GPU.
#[derive(Debug)]
pub struct MeshState<B> {
    pub triangle_buffer: B,
    pub triangle_vertex_count: u32,
    pub wireframe_buffer: B,
    pub wire_vertex_count: u32,
    pub bounding_center: Point3<f32>,
    pub bounding_radius: f32,
}

/// Rebuilds the terrain mesh whenever the grid or the atlas changes.
pub struct MeshBuildOrchestrator<M> {
    mesher: M,
    rebuilds: u64,
}

impl<M: Mesher> MeshBuildOrchestrator<M> {
    pub fn new(mesher: M) -> Self {
        Self {
            mesher,
            rebuilds: 0,
        }
    }

    /// Number of completed rebuilds.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Builds a mesh from `grid`, swaps it into `render_state` and reframes the camera.
    ///
    /// Safe to call repeatedly; every call fully replaces the previous mesh.
    ///
    /// # Errors
    /// [`EngineError::AtlasNotReady`] if the atlas has not been stitched yet. The
    /// current mesh is left untouched in that case.
    pub fn rebuild<B: RenderBackend>(
        &mut self,
        grid: &VoxelGrid,
        materials: &MaterialTable,
        render_state: &mut RenderState<B::Texture, B::Buffer>,
        backend: &mut B,
        camera: &mut CameraState,
    ) -> Result<(), EngineError> {
        let atlas = &render_state.atlas;
        if !atlas.ready {
            return Err(EngineError::AtlasNotReady);
        }

        let tiles = TileLookup::new(materials, &atlas.face_tiles, atlas.tile_count);
        let data = self.mesher.build(grid, &tiles);

        let triangle_buffer =
            backend.upload_vertices(TRIANGLE_BUFFER_NAME, bytemuck::cast_slice(&data.triangles));
        let wireframe_buffer =
            backend.upload_vertices(WIREFRAME_BUFFER_NAME, bytemuck::cast_slice(&data.wires));

        render_state.mesh = Some(MeshState {
            triangle_buffer,
            triangle_vertex_count: data.triangles.len() as u32,
            wireframe_buffer,
            wire_vertex_count: data.wires.len() as u32,
            bounding_center: data.center,
            bounding_radius: data.radius,
        });

        camera.frame_bounds(data.center, data.radius);
        self.rebuilds += 1;

        debug!(
            "Mesh rebuild #{}: {} triangle vertices, {} wire vertices, radius {:.1}",
            self.rebuilds,
            data.triangles.len(),
            data.wires.len(),
            data.radius
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::{culled::CulledMesher, *};
    use crate::engine_state::{
        rendering::{atlas::AtlasState, testing::RecordingBackend},
        voxels::block::{BlockRegistry, TextureSpec},
    };

    fn materials() -> MaterialTable {
        let mut registry = BlockRegistry::new();
        registry
            .register_block("stone", TextureSpec::single("stone"), false)
            .unwrap();
        registry
            .register_block(
                "grass",
                TextureSpec::top_bottom_sides("grass_top", "dirt", "grass_side"),
                false,
            )
            .unwrap();
        crate::engine_state::voxels::block::material::encode(Some(&registry)).unwrap()
    }

    fn ready_state(backend: &mut RecordingBackend) -> RenderState<u32, u32> {
        let mut face_tiles = FaceTable::new();
        face_tiles.insert(1, [0; 6]);
        face_tiles.insert(2, [3, 3, 1, 2, 3, 3]);

        let mut state = RenderState::new();
        state.atlas = AtlasState {
            ready: true,
            tile_size: 16,
            tile_count: 2,
            face_tiles,
            face_sizes: None,
            texture: Some(backend.next_handle()),
            generation: 1,
        };
        state
    }

    fn grid(materials: &MaterialTable) -> VoxelGrid {
        let mut grid = VoxelGrid::new(Vector3::new(4, 2, 4));
        for x in 0..4 {
            for z in 0..4 {
                grid.set(Point3::new(x, 0, z), materials.code_of("stone"));
            }
        }
        grid.set(Point3::new(1, 1, 1), materials.code_of("grass"));
        grid
    }

    #[test]
    fn test_tile_lookup_resolves_faces() {
        let materials = materials();
        let mut face_tiles = FaceTable::new();
        face_tiles.insert(2, [3, 3, 1, 2, 3, 3]);
        let tiles = TileLookup::new(&materials, &face_tiles, 2);

        let grass = materials.code_of("grass").unwrap();
        assert_eq!(tiles.tile(grass, BlockSide::TOP), 2);
        assert_eq!(tiles.tile(grass, BlockSide::BOTTOM), 1);
        assert_eq!(tiles.tile(grass, BlockSide::LEFT), 3);
        // Stone has no entry in the face table.
        assert_eq!(tiles.tile(materials.code_of("stone").unwrap(), BlockSide::TOP), 0);
    }

    #[test]
    fn test_rebuild_requires_ready_atlas() {
        let materials = materials();
        let mut backend = RecordingBackend::new(800, 600);
        let mut state: RenderState<u32, u32> = RenderState::new();
        let mut camera = CameraState::new(1.0, 1.0);
        let mut orchestrator = MeshBuildOrchestrator::new(CulledMesher::new());

        let result = orchestrator.rebuild(
            &grid(&materials),
            &materials,
            &mut state,
            &mut backend,
            &mut camera,
        );

        assert!(matches!(result, Err(EngineError::AtlasNotReady)));
        assert!(state.mesh.is_none());
        assert_eq!(backend.vertex_uploads().len(), 0);
        assert_eq!(orchestrator.rebuilds(), 0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let materials = materials();
        let grid = grid(&materials);
        let mut backend = RecordingBackend::new(800, 600);
        let mut state = ready_state(&mut backend);
        let mut camera = CameraState::new(1.0, 1.0);
        let mut orchestrator = MeshBuildOrchestrator::new(CulledMesher::new());

        orchestrator
            .rebuild(&grid, &materials, &mut state, &mut backend, &mut camera)
            .unwrap();
        let first = state.mesh.take().unwrap();
        let first_camera = camera.camera.clone();

        orchestrator
            .rebuild(&grid, &materials, &mut state, &mut backend, &mut camera)
            .unwrap();
        let second = state.mesh.as_ref().unwrap();

        assert_eq!(first.triangle_vertex_count, second.triangle_vertex_count);
        assert_eq!(first.wire_vertex_count, second.wire_vertex_count);
        assert_eq!(first.bounding_center, second.bounding_center);
        assert_eq!(first.bounding_radius, second.bounding_radius);
        assert_ne!(first.triangle_buffer, second.triangle_buffer);
        assert_eq!(camera.camera, first_camera);
        assert_eq!(orchestrator.rebuilds(), 2);
        assert_eq!(backend.vertex_uploads().len(), 4);
    }

    #[test]
    fn test_rebuild_reframes_camera_and_uses_tiles() {
        let materials = materials();
        let grid = grid(&materials);
        let mut backend = RecordingBackend::new(800, 600);
        let mut state = ready_state(&mut backend);
        let mut camera = CameraState::new(1.0, 1.0);
        let mut orchestrator = MeshBuildOrchestrator::new(CulledMesher::new());

        orchestrator
            .rebuild(&grid, &materials, &mut state, &mut backend, &mut camera)
            .unwrap();

        let mesh = state.mesh.as_ref().unwrap();
        let expected_eye = mesh.bounding_center + Vector3::new(mesh.bounding_radius * 2.0, 0.0, 0.0);
        assert_eq!(camera.camera.position, expected_eye);

        let uploaded = &backend.vertex_uploads()[0];
        assert_eq!(uploaded.0, TRIANGLE_BUFFER_NAME);
        let vertices: &[TerrainVertex] = bytemuck::cast_slice(&uploaded.1);
        assert!(vertices.iter().any(|vertex| vertex.tile() == 2));
    }
}
