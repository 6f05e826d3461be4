//! Manages WebGPU bind groups and their layouts.
//!
//! Group 0 of both pipelines holds their uniform buffer. Group 1 of the
//! terrain pipeline holds the atlas texture and sampler; every uploaded
//! texture gets its own bind group against the shared layout.

use wgpu::{util::DeviceExt, BindGroup, BindGroupLayout, Buffer, Device};

use super::{
    frame::{TerrainUniforms, WireUniforms},
    texture::{BoundTexture, Texture},
};

/// Name of the terrain uniform buffer
pub const TERRAIN_UNIFORM_BUFFER: &str = "terrain_uniform_buffer";
/// Name of the terrain uniform bind group
pub const TERRAIN_UNIFORM_BIND_GROUP: &str = "terrain_uniform_bind_group";
/// Name of the terrain uniform bind group layout
pub const TERRAIN_UNIFORM_BIND_GROUP_LAYOUT: &str = "terrain_uniform_bind_group_layout";
/// Name of the wireframe uniform buffer
pub const WIRE_UNIFORM_BUFFER: &str = "wire_uniform_buffer";
/// Name of the wireframe uniform bind group
pub const WIRE_UNIFORM_BIND_GROUP: &str = "wire_uniform_bind_group";
/// Name of the wireframe uniform bind group layout
pub const WIRE_UNIFORM_BIND_GROUP_LAYOUT: &str = "wire_uniform_bind_group_layout";
/// Name of the texture bind group
pub const TEXTURE_BIND_GROUP: &str = "texture_bind_group";
/// Name of the texture bind group layout
pub const TEXTURE_BIND_GROUP_LAYOUT: &str = "texture_bind_group_layout";

pub struct BindGroupState {
    pub terrain_uniform_buffer: Buffer,
    pub terrain_uniform_bind_group: BindGroup,
    pub terrain_uniform_layout: BindGroupLayout,
    pub wire_uniform_buffer: Buffer,
    pub wire_uniform_bind_group: BindGroup,
    pub wire_uniform_layout: BindGroupLayout,
    pub texture_layout: BindGroupLayout,
}

impl BindGroupState {
    /// Creates the uniform buffers, their bind groups and the texture layout.
    pub fn new(device: &Device) -> Self {
        let (terrain_uniform_buffer, terrain_uniform_bind_group, terrain_uniform_layout) =
            Self::generate_uniform_bindgroups(
                device,
                bytemuck::bytes_of(&<TerrainUniforms as bytemuck::Zeroable>::zeroed()),
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                [
                    TERRAIN_UNIFORM_BUFFER,
                    TERRAIN_UNIFORM_BIND_GROUP,
                    TERRAIN_UNIFORM_BIND_GROUP_LAYOUT,
                ],
            );

        let (wire_uniform_buffer, wire_uniform_bind_group, wire_uniform_layout) =
            Self::generate_uniform_bindgroups(
                device,
                bytemuck::bytes_of(&<WireUniforms as bytemuck::Zeroable>::zeroed()),
                wgpu::ShaderStages::VERTEX,
                [
                    WIRE_UNIFORM_BUFFER,
                    WIRE_UNIFORM_BIND_GROUP,
                    WIRE_UNIFORM_BIND_GROUP_LAYOUT,
                ],
            );

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    // This should match the filterable field of the corresponding Texture entry above.
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some(TEXTURE_BIND_GROUP_LAYOUT),
        });

        Self {
            terrain_uniform_buffer,
            terrain_uniform_bind_group,
            terrain_uniform_layout,
            wire_uniform_buffer,
            wire_uniform_bind_group,
            wire_uniform_layout,
            texture_layout,
        }
    }

    /// Creates a uniform buffer and a single-entry bind group around it.
    ///
    /// `labels` are the buffer, bind group and layout names in that order.
    fn generate_uniform_bindgroups(
        device: &Device,
        contents: &[u8],
        visibility: wgpu::ShaderStages,
        labels: [&'static str; 3],
    ) -> (Buffer, BindGroup, BindGroupLayout) {
        let [buffer_label, bind_group_label, layout_label] = labels;

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(buffer_label),
            contents,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some(layout_label),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some(bind_group_label),
        });

        (buffer, bind_group, layout)
    }

    /// Wraps `texture` in a bind group usable as group 1 of the terrain pipeline.
    pub fn bind_texture(&self, device: &Device, texture: Texture) -> BoundTexture {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
            label: Some(TEXTURE_BIND_GROUP),
        });

        BoundTexture {
            texture,
            bind_group,
        }
    }
}
