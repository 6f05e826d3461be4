//! Vertex data structures and layouts for voxel rendering.
//!
//! Terrain vertices feed the ambient-occlusion shader through two packed
//! attributes; wireframe vertices carry a bare position.

/// A vertex of the textured terrain mesh.
///
/// # Memory Layout
/// - `attrib0`: position xyz + ambient occlusion factor (16 bytes)
/// - `attrib1`: tile-local uv, atlas tile id, face number (16 bytes)
///
/// Total size: 32 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    pub attrib0: [f32; 4],
    pub attrib1: [f32; 4],
}

impl TerrainVertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `position` - World-space position
    /// * `ambient` - Light factor in `0.0..=1.0` from ambient occlusion
    /// * `uv` - Coordinates inside the tile, `0.0..=1.0`
    /// * `tile` - Atlas tile id
    /// * `face` - Face number of the voxel side
    pub fn new(position: [f32; 3], ambient: f32, uv: [f32; 2], tile: u32, face: u32) -> Self {
        Self {
            attrib0: [position[0], position[1], position[2], ambient],
            attrib1: [uv[0], uv[1], tile as f32, face as f32],
        }
    }

    pub fn position(&self) -> [f32; 3] {
        [self.attrib0[0], self.attrib0[1], self.attrib0[2]]
    }

    pub fn tile(&self) -> u32 {
        self.attrib1[2] as u32
    }

    /// Returns the vertex buffer layout description for the shader pipeline.
    ///
    /// # Shader Attributes
    /// - `location = 0`: attrib0 (vec4<f32>)
    /// - `location = 1`: attrib1 (vec4<f32>)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// A line-list vertex of the wireframe overlay.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WireVertex {
    pub position: [f32; 3],
}

impl WireVertex {
    /// # Shader Attributes
    /// - `location = 0`: position (vec3<f32>)
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<WireVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }
}
