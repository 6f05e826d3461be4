//! Manages the WebGPU render pipelines and executes frame plans.
//!
//! # Architecture
//!
//! - Terrain pipeline: ambient-occlusion shader, triangle list, fixed-function
//!   state taken from [`FIXED_FUNCTION_STATE`]
//! - Wire pipeline: flat shader, line list, depth-tested but not depth-writing,
//!   biased towards the camera so lines win over the faces they outline
//!
//! Both draw into a single render pass that clears colour and depth.

use wgpu::{
    CommandEncoder, Device, Queue, RenderPipeline, SurfaceConfiguration, TextureFormat,
    TextureView,
};

use super::{
    bind_group_state::BindGroupState,
    frame::{FixedFunctionState, FramePlan, FIXED_FUNCTION_STATE},
    texture::{BoundTexture, Texture},
    vertex::{TerrainVertex, WireVertex},
};

const TERRAIN_SHADER: &str = include_str!("shaders/terrain_ao.wgsl");
const WIRE_SHADER: &str = include_str!("shaders/wireframe.wgsl");

/// Label of the depth buffer
pub const DEPTH_TEXTURE_NAME: &str = "DEPTH TEXTURE";

pub struct PipelineManager {
    pub bind_group_state: BindGroupState,
    pub depth_texture: Texture,
    /// Bound while the atlas is absent
    pub placeholder: BoundTexture,
    terrain_pipeline: RenderPipeline,
    wire_pipeline: RenderPipeline,
}

impl PipelineManager {
    /// Creates both pipelines, the depth buffer and the placeholder texture.
    pub fn new(
        device: &Device,
        queue: &Queue,
        config: &SurfaceConfiguration,
        texture_format: TextureFormat,
    ) -> Self {
        let bind_group_state = BindGroupState::new(device);
        let depth_texture = Texture::create_depth_texture(device, config, DEPTH_TEXTURE_NAME);
        let placeholder = bind_group_state.bind_texture(device, Texture::placeholder(device, queue));

        let terrain_pipeline = Self::create_terrain_pipeline(
            device,
            &bind_group_state,
            texture_format,
            FIXED_FUNCTION_STATE,
        );
        let wire_pipeline =
            Self::create_wire_pipeline(device, &bind_group_state, texture_format, FIXED_FUNCTION_STATE);

        Self {
            bind_group_state,
            depth_texture,
            placeholder,
            terrain_pipeline,
            wire_pipeline,
        }
    }

    fn create_terrain_pipeline(
        device: &Device,
        bind_group_state: &BindGroupState,
        texture_format: TextureFormat,
        fixed: FixedFunctionState,
    ) -> RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Render Pipeline Layout"),
            bind_group_layouts: &[
                &bind_group_state.terrain_uniform_layout,
                &bind_group_state.texture_layout,
            ],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(TERRAIN_SHADER.into()),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Terrain Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[TerrainVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(fixed.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: fixed.cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled: fixed.depth_write,
                depth_compare: fixed.depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_wire_pipeline(
        device: &Device,
        bind_group_state: &BindGroupState,
        texture_format: TextureFormat,
        fixed: FixedFunctionState,
    ) -> RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Wire Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_state.wire_uniform_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Wire Shader"),
            source: wgpu::ShaderSource::Wgsl(WIRE_SHADER.into()),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Wire Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[WireVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(fixed.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: -1,
                    slope_scale: -1.0,
                    clamp: 0.0,
                },
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Records one frame into `encoder`.
    ///
    /// Draw calls with zero vertices are skipped; the pass still clears.
    pub fn encode(
        &self,
        encoder: &mut CommandEncoder,
        view: &TextureView,
        queue: &Queue,
        plan: &FramePlan<'_, BoundTexture, wgpu::Buffer>,
    ) {
        queue.write_buffer(
            &self.bind_group_state.terrain_uniform_buffer,
            0,
            bytemuck::bytes_of(&plan.terrain.uniforms),
        );
        if let Some(wire) = &plan.wireframe {
            queue.write_buffer(
                &self.bind_group_state.wire_uniform_buffer,
                0,
                bytemuck::bytes_of(&wire.uniforms),
            );
        }

        let [r, g, b, a] = plan.clear_color;
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Terrain Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        if let Some(draw) = plan.terrain.draw.as_ref().filter(|draw| draw.vertex_count > 0) {
            let texture = plan.terrain.texture.unwrap_or(&self.placeholder);

            rpass.set_pipeline(&self.terrain_pipeline);
            rpass.set_bind_group(0, &self.bind_group_state.terrain_uniform_bind_group, &[]);
            rpass.set_bind_group(1, &texture.bind_group, &[]);
            rpass.set_vertex_buffer(0, draw.buffer.slice(..));
            rpass.draw(0..draw.vertex_count, 0..1);
        }

        if let Some(wire) = plan.wireframe.as_ref().filter(|wire| wire.draw.vertex_count > 0) {
            rpass.set_pipeline(&self.wire_pipeline);
            rpass.set_bind_group(0, &self.bind_group_state.wire_uniform_bind_group, &[]);
            rpass.set_vertex_buffer(0, wire.draw.buffer.slice(..));
            rpass.draw(0..wire.draw.vertex_count, 0..1);
        }
    }

    /// Handles window resize events by recreating the depth texture.
    pub fn resize(&mut self, device: &Device, config: &SurfaceConfiguration) {
        self.depth_texture = Texture::create_depth_texture(device, config, DEPTH_TEXTURE_NAME);
    }
}
