//! # Voxel Grid
//!
//! Dense 3D storage of material codes, laid out x-fastest then y then z.

use cgmath::{Point3, Vector3};

use super::block::material::MaterialCode;

/// A dense voxel volume. Empty cells are air.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    dimensions: Vector3<usize>,
    cells: Vec<Option<MaterialCode>>,
}

impl VoxelGrid {
    /// Creates an all-air grid.
    pub fn new(dimensions: Vector3<usize>) -> Self {
        Self {
            dimensions,
            cells: vec![None; dimensions.x * dimensions.y * dimensions.z],
        }
    }

    pub fn dimensions(&self) -> Vector3<usize> {
        self.dimensions
    }

    fn offset(&self, position: Point3<usize>) -> Option<usize> {
        let d = self.dimensions;
        if position.x >= d.x || position.y >= d.y || position.z >= d.z {
            return None;
        }
        Some(position.x + position.y * d.x + position.z * d.x * d.y)
    }

    /// Material at `position`; `None` for air and for anything outside the grid.
    pub fn get(&self, position: Point3<usize>) -> Option<MaterialCode> {
        self.offset(position).and_then(|offset| self.cells[offset])
    }

    /// Signed lookup used by neighbour queries; negative coordinates are air.
    pub fn get_signed(&self, position: Point3<i64>) -> Option<MaterialCode> {
        if position.x < 0 || position.y < 0 || position.z < 0 {
            return None;
        }
        self.get(Point3::new(
            position.x as usize,
            position.y as usize,
            position.z as usize,
        ))
    }

    /// Writes a cell. Out-of-bounds writes are ignored and reported as `false`.
    pub fn set(&mut self, position: Point3<usize>, material: Option<MaterialCode>) -> bool {
        match self.offset(position) {
            Some(offset) => {
                self.cells[offset] = material;
                true
            }
            None => false,
        }
    }

    /// Iterates over every solid cell with its position.
    pub fn iter_solid(&self) -> impl Iterator<Item = (Point3<usize>, MaterialCode)> + '_ {
        let d = self.dimensions;
        self.cells.iter().enumerate().filter_map(move |(offset, cell)| {
            cell.map(|code| {
                let x = offset % d.x;
                let y = (offset / d.x) % d.y;
                let z = offset / (d.x * d.y);
                (Point3::new(x, y, z), code)
            })
        })
    }

    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_and_bounds() {
        let mut grid = VoxelGrid::new(Vector3::new(4, 3, 2));
        let stone = MaterialCode::from_raw(0x8001);

        assert!(grid.set(Point3::new(3, 2, 1), Some(stone)));
        assert!(!grid.set(Point3::new(4, 0, 0), Some(stone)));

        assert_eq!(grid.get(Point3::new(3, 2, 1)), Some(stone));
        assert_eq!(grid.get_signed(Point3::new(-1, 0, 0)), None);
        assert_eq!(grid.solid_count(), 1);

        let solid: Vec<_> = grid.iter_solid().collect();
        assert_eq!(solid, vec![(Point3::new(3, 2, 1), stone)]);
    }

    #[test]
    fn test_transparent_first_block_is_not_air() {
        let mut grid = VoxelGrid::new(Vector3::new(1, 1, 1));
        let water = MaterialCode::from_raw(0x0000);
        grid.set(Point3::new(0, 0, 0), Some(water));
        assert_eq!(grid.get(Point3::new(0, 0, 0)), Some(water));
    }
}
