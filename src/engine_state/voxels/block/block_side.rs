//! # Block Side Module
//!
//! The six faces of a voxel. Face numbers index the per-face texture tables
//! produced by atlas stitching.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// The order is: [FRONT, BACK, BOTTOM, TOP, LEFT, RIGHT]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The front face (facing positive Z)
    FRONT = 0,

    /// The back face (facing negative Z)
    BACK = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The left face (facing negative X)
    LEFT = 4,

    /// The right face (facing positive X)
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in face-number order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Outward unit normal of the face.
    pub fn normal(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(0, 0, 1),
            BlockSide::BACK => Vector3::new(0, 0, -1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(-1, 0, 0),
            BlockSide::RIGHT => Vector3::new(1, 0, 0),
        }
    }

    /// The two in-plane axes `(u, v)` of the face as unit vectors.
    ///
    /// `u × v` points along [`BlockSide::normal`], so corners walked in
    /// `(0,0) (1,0) (1,1) (0,1)` order wind counter-clockwise seen from outside.
    pub fn tangents(self) -> (Vector3<i32>, Vector3<i32>) {
        match self {
            BlockSide::FRONT => (Vector3::new(1, 0, 0), Vector3::new(0, 1, 0)),
            BlockSide::BACK => (Vector3::new(0, 1, 0), Vector3::new(1, 0, 0)),
            BlockSide::BOTTOM => (Vector3::new(1, 0, 0), Vector3::new(0, 0, 1)),
            BlockSide::TOP => (Vector3::new(0, 0, 1), Vector3::new(1, 0, 0)),
            BlockSide::LEFT => (Vector3::new(0, 0, 1), Vector3::new(0, 1, 0)),
            BlockSide::RIGHT => (Vector3::new(0, 1, 0), Vector3::new(0, 0, 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector3;

    #[test]
    fn test_tangents_are_right_handed() {
        for side in BlockSide::all() {
            let (u, v) = side.tangents();
            let u = Vector3::new(u.x as f32, u.y as f32, u.z as f32);
            let v = Vector3::new(v.x as f32, v.y as f32, v.z as f32);
            let n = side.normal();
            assert_eq!(u.cross(v), Vector3::new(n.x as f32, n.y as f32, n.z as f32));
        }
    }
}
