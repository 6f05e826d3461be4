//! # Face-Culling Mesher
//!
//! Emits one quad per visible voxel face with per-corner ambient occlusion,
//! and the quad outlines as a line list for the wireframe overlay.

use cgmath::{InnerSpace, Point3, Vector3};

use super::{MeshData, Mesher, TileLookup};
use crate::engine_state::{
    rendering::vertex::{TerrainVertex, WireVertex},
    voxels::{block::block_side::BlockSide, grid::VoxelGrid},
};

/// Corner walk order inside a face, in `(u, v)` steps.
const CORNERS: [(i64, i64); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];

/// Light factor per occlusion level, from fully occluded to open.
const AO_CURVE: [f32; 4] = [0.45, 0.65, 0.82, 1.0];

#[derive(Debug, Default, Clone, Copy)]
pub struct CulledMesher;

impl CulledMesher {
    pub fn new() -> Self {
        Self
    }
}

fn to_i64(v: Vector3<i32>) -> Vector3<i64> {
    Vector3::new(i64::from(v.x), i64::from(v.y), i64::from(v.z))
}

fn occludes(grid: &VoxelGrid, position: Point3<i64>) -> bool {
    grid.get_signed(position).is_some_and(|code| code.is_opaque())
}

/// Classic three-sample vertex occlusion: two edge neighbours and the corner
/// between them, all taken in the layer in front of the face.
fn ambient_occlusion(side1: bool, side2: bool, corner: bool) -> usize {
    if side1 && side2 {
        0
    } else {
        3 - (side1 as usize + side2 as usize + corner as usize)
    }
}

/// Texture coordinates of a corner, with `v` growing downwards on side faces
/// so textures stand upright.
fn corner_uv(side: BlockSide, local: Vector3<i64>) -> [f32; 2] {
    let (x, y, z) = (local.x as f32, local.y as f32, local.z as f32);
    match side {
        BlockSide::TOP | BlockSide::BOTTOM => [x, z],
        BlockSide::FRONT | BlockSide::BACK => [x, 1.0 - y],
        BlockSide::LEFT | BlockSide::RIGHT => [z, 1.0 - y],
    }
}

impl Mesher for CulledMesher {
    fn build(&self, grid: &VoxelGrid, tiles: &TileLookup) -> MeshData {
        let mut triangles = Vec::new();
        let mut wires = Vec::new();
        let mut min = Vector3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vector3::new(f32::MIN, f32::MIN, f32::MIN);

        for (position, code) in grid.iter_solid() {
            let voxel = Point3::new(position.x as i64, position.y as i64, position.z as i64);

            for side in BlockSide::all() {
                let normal = to_i64(side.normal());
                let outside = voxel + normal;

                let visible = match grid.get_signed(outside) {
                    None => true,
                    Some(neighbour) => !neighbour.is_opaque() && neighbour != code,
                };
                if !visible {
                    continue;
                }

                let (u, v) = side.tangents();
                let (u, v) = (to_i64(u), to_i64(v));
                // Faces on the positive side of an axis sit one voxel further out.
                let origin = voxel + normal.map(|n| n.max(0));
                let tile = tiles.tile(code, side);

                let mut corners = [Point3::new(0.0f32, 0.0, 0.0); 4];
                let mut shade = [0usize; 4];
                let mut uvs = [[0.0f32; 2]; 4];

                for (i, &(a, b)) in CORNERS.iter().enumerate() {
                    let corner = origin + u * a + v * b;
                    corners[i] = Point3::new(corner.x as f32, corner.y as f32, corner.z as f32);
                    uvs[i] = corner_uv(side, corner - voxel);

                    let du = if a == 1 { u } else { -u };
                    let dv = if b == 1 { v } else { -v };
                    shade[i] = ambient_occlusion(
                        occludes(grid, outside + du),
                        occludes(grid, outside + dv),
                        occludes(grid, outside + du + dv),
                    );
                }

                // Split along the brighter diagonal to keep occlusion gradients symmetric.
                let order: [usize; 6] = if shade[0] + shade[2] >= shade[1] + shade[3] {
                    [0, 1, 2, 0, 2, 3]
                } else {
                    [1, 2, 3, 1, 3, 0]
                };
                for i in order {
                    triangles.push(TerrainVertex::new(
                        corners[i].into(),
                        AO_CURVE[shade[i]],
                        uvs[i],
                        tile,
                        side as u32,
                    ));
                }

                for i in 0..4 {
                    wires.push(WireVertex {
                        position: corners[i].into(),
                    });
                    wires.push(WireVertex {
                        position: corners[(i + 1) % 4].into(),
                    });
                }

                for corner in corners {
                    min = Vector3::new(min.x.min(corner.x), min.y.min(corner.y), min.z.min(corner.z));
                    max = Vector3::new(max.x.max(corner.x), max.y.max(corner.y), max.z.max(corner.z));
                }
            }
        }

        if triangles.is_empty() {
            let dimensions = grid.dimensions();
            min = Vector3::new(0.0, 0.0, 0.0);
            max = Vector3::new(
                dimensions.x as f32,
                dimensions.y as f32,
                dimensions.z as f32,
            );
        }

        let center = (min + max) * 0.5;
        let radius = (max - min).magnitude() * 0.5;

        MeshData {
            triangles,
            wires,
            center: Point3::new(center.x, center.y, center.z),
            radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        rendering::atlas::FaceTable,
        voxels::block::material::{MaterialCode, MaterialTable},
    };

    const STONE: MaterialCode = MaterialCode::from_raw(0x8000);
    const GLASS: MaterialCode = MaterialCode::from_raw(0x0001);
    const WATER: MaterialCode = MaterialCode::from_raw(0x0002);

    fn no_tiles() -> TileLookup {
        TileLookup::new(&MaterialTable::default(), &FaceTable::new(), 1)
    }

    fn grid_with(cells: &[((usize, usize, usize), MaterialCode)]) -> VoxelGrid {
        let mut grid = VoxelGrid::new(Vector3::new(3, 3, 3));
        for &((x, y, z), code) in cells {
            grid.set(Point3::new(x, y, z), Some(code));
        }
        grid
    }

    fn faces(data: &MeshData) -> usize {
        assert_eq!(data.triangles.len() % 6, 0);
        data.triangles.len() / 6
    }

    #[test]
    fn test_lone_voxel() {
        let mut grid = VoxelGrid::new(Vector3::new(1, 1, 1));
        grid.set(Point3::new(0, 0, 0), Some(STONE));

        let data = CulledMesher::new().build(&grid, &no_tiles());

        assert_eq!(data.triangles.len(), 36);
        assert_eq!(data.wires.len(), 48);
        assert_eq!(data.center, Point3::new(0.5, 0.5, 0.5));
        assert!((data.radius - 3f32.sqrt() / 2.0).abs() < 1e-6);
        // Nothing around it, so every corner is fully lit.
        assert!(data.triangles.iter().all(|vertex| vertex.attrib0[3] == 1.0));
    }

    #[test]
    fn test_shared_opaque_faces_are_hidden() {
        let data = CulledMesher::new().build(
            &grid_with(&[((0, 0, 0), STONE), ((1, 0, 0), STONE)]),
            &no_tiles(),
        );
        assert_eq!(faces(&data), 10);
    }

    #[test]
    fn test_transparent_neighbours() {
        let same = CulledMesher::new().build(
            &grid_with(&[((0, 0, 0), GLASS), ((1, 0, 0), GLASS)]),
            &no_tiles(),
        );
        assert_eq!(faces(&same), 10);

        let different = CulledMesher::new().build(
            &grid_with(&[((0, 0, 0), GLASS), ((1, 0, 0), WATER)]),
            &no_tiles(),
        );
        assert_eq!(faces(&different), 12);

        // The stone face behind glass shows, the glass face against stone does not.
        let mixed = CulledMesher::new().build(
            &grid_with(&[((0, 0, 0), STONE), ((1, 0, 0), GLASS)]),
            &no_tiles(),
        );
        assert_eq!(faces(&mixed), 11);
    }

    #[test]
    fn test_triangles_face_outwards() {
        let mut grid = VoxelGrid::new(Vector3::new(1, 1, 1));
        grid.set(Point3::new(0, 0, 0), Some(STONE));
        let data = CulledMesher::new().build(&grid, &no_tiles());

        for triangle in data.triangles.chunks(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|vertex| {
                let [x, y, z] = vertex.position();
                Vector3::new(x, y, z)
            });
            let normal = (b - a).cross(c - a);
            let face = BlockSide::all()[triangle[0].attrib1[3] as usize].normal();
            let expected = Vector3::new(face.x as f32, face.y as f32, face.z as f32);
            assert!(normal.dot(expected) > 0.0);
        }
    }

    #[test]
    fn test_occluded_corner_is_darker() {
        // A step: the top face of (0,0,0) has a wall at (1,1,0) beside it.
        let data = CulledMesher::new().build(
            &grid_with(&[((0, 0, 0), STONE), ((1, 0, 0), STONE), ((1, 1, 0), STONE)]),
            &no_tiles(),
        );
        let darkest = data
            .triangles
            .iter()
            .filter(|vertex| vertex.attrib1[3] as u32 == BlockSide::TOP as u32)
            .map(|vertex| vertex.attrib0[3])
            .fold(1.0f32, f32::min);
        assert!(darkest < 1.0);
    }

    #[test]
    fn test_empty_grid_bounds_cover_grid() {
        let grid = VoxelGrid::new(Vector3::new(2, 4, 2));
        let data = CulledMesher::new().build(&grid, &no_tiles());

        assert!(data.triangles.is_empty());
        assert!(data.wires.is_empty());
        assert_eq!(data.center, Point3::new(1.0, 2.0, 1.0));
    }
}
