//! Rendering system for the terrain viewer.
//!
//! The engine talks to the GPU only through [`RenderBackend`]. [`WgpuBackend`]
//! is the real implementation; tests use the recording backend from
//! [`testing`].
//!
//! Shared render data lives in one [`RenderState`], written by the atlas
//! controller, the mesh orchestrator and the wireframe toggle, and read by the
//! frame renderer.

use log::{info, warn};
use wgpu::{util::DeviceExt, Device, Queue, Surface, SurfaceConfiguration};

use atlas::{AtlasState, StitchedAtlas};
use frame::FramePlan;
use meshing::MeshState;
use pipeline_manager::PipelineManager;
use texture::{BoundTexture, Texture};

use super::error::{AtlasBuildError, ContextError};

pub mod atlas;
mod bind_group_state;
pub mod frame;
pub mod meshing;
mod pipeline_manager;
pub mod texture;
pub mod vertex;

/// Label of the uploaded atlas texture
pub const ATLAS_TEXTURE_NAME: &str = "Terrain Atlas";

/// Whether a submitted frame reached the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Presented,
    /// The surface was unavailable this frame; nothing was drawn.
    Skipped,
}

/// GPU operations the engine depends on.
pub trait RenderBackend {
    type Texture;
    type Buffer;

    /// Uploads a stitched atlas. Failures are fatal to the engine.
    fn upload_atlas(&mut self, atlas: &StitchedAtlas) -> Result<Self::Texture, AtlasBuildError>;

    /// Creates a vertex buffer holding `contents`.
    fn upload_vertices(&mut self, label: &'static str, contents: &[u8]) -> Self::Buffer;

    /// Current drawable size in pixels.
    fn viewport_size(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32);

    /// Executes one frame plan.
    fn submit(
        &mut self,
        plan: &FramePlan<'_, Self::Texture, Self::Buffer>,
    ) -> Result<FrameStatus, ContextError>;
}

/// Everything the frame renderer reads.
#[derive(Debug)]
pub struct RenderState<T, B> {
    pub atlas: AtlasState<T>,
    pub mesh: Option<MeshState<B>>,
    pub wireframe_visible: bool,
}

impl<T, B> RenderState<T, B> {
    /// No texture, no mesh, wireframe hidden.
    pub fn new() -> Self {
        Self {
            atlas: AtlasState::pending(),
            mesh: None,
            wireframe_visible: false,
        }
    }

    pub fn current_texture(&self) -> Option<&T> {
        self.atlas.texture.as_ref()
    }
}

impl<T, B> Default for RenderState<T, B> {
    fn default() -> Self {
        Self::new()
    }
}

/// The wgpu implementation of [`RenderBackend`].
///
/// Owns the surface, device and queue along with the pipelines drawing into
/// them.
pub struct WgpuBackend {
    /// The WebGPU surface being rendered to
    pub surface: Surface<'static>,
    /// Configuration for the surface (size, format, etc.)
    pub surface_config: SurfaceConfiguration,
    pub device: Device,
    pub queue: Queue,
    pipeline_manager: PipelineManager,
}

impl WgpuBackend {
    /// Builds the pipelines for an already configured surface.
    pub fn new(
        surface: Surface<'static>,
        surface_config: SurfaceConfiguration,
        device: Device,
        queue: Queue,
    ) -> Self {
        let pipeline_manager =
            PipelineManager::new(&device, &queue, &surface_config, surface_config.format);

        info!(
            "Render backend ready: {}x{} {:?}",
            surface_config.width, surface_config.height, surface_config.format
        );

        Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline_manager,
        }
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }
}

impl RenderBackend for WgpuBackend {
    type Texture = BoundTexture;
    type Buffer = wgpu::Buffer;

    fn upload_atlas(&mut self, atlas: &StitchedAtlas) -> Result<BoundTexture, AtlasBuildError> {
        let texture = Texture::from_atlas(&self.device, &self.queue, atlas, ATLAS_TEXTURE_NAME)?;
        Ok(self
            .pipeline_manager
            .bind_group_state
            .bind_texture(&self.device, texture))
    }

    fn upload_vertices(&mut self, label: &'static str, contents: &[u8]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::VERTEX,
            })
    }

    fn viewport_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// Zero sizes (a minimized window) are ignored; the surface keeps its last size.
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.reconfigure();
        self.pipeline_manager
            .resize(&self.device, &self.surface_config);
    }

    fn submit(
        &mut self,
        plan: &FramePlan<'_, BoundTexture, wgpu::Buffer>,
    ) -> Result<FrameStatus, ContextError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                return Ok(FrameStatus::Skipped);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Surface timed out, skipping frame");
                return Ok(FrameStatus::Skipped);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(ContextError::OutOfMemory),
            Err(err) => return Err(ContextError::Lost(err.to_string())),
        };

        let view = frame.texture.create_view(&Default::default());
        let mut encoder = self.device.create_command_encoder(&Default::default());
        self.pipeline_manager
            .encode(&mut encoder, &view, &self.queue, plan);

        self.queue.submit([encoder.finish()]);
        frame.present();

        Ok(FrameStatus::Presented)
    }
}

#[cfg(test)]
pub mod testing {
    //! A GPU-free backend that records what the engine asks of it.

    use super::*;

    /// What one submitted plan asked for, with handles in place of resources.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedFrame {
        pub texture: Option<u32>,
        pub use_texture: u32,
        pub tile_count: f32,
        /// `(buffer, vertex_count)`
        pub triangle_draw: Option<(u32, u32)>,
        /// `(buffer, vertex_count)`
        pub wire_draw: Option<(u32, u32)>,
    }

    /// Hands out increasing integer handles for textures and buffers.
    #[derive(Debug, Default)]
    pub struct RecordingBackend {
        width: u32,
        height: u32,
        next_handle: u32,
        atlas_uploads: usize,
        vertex_uploads: Vec<(&'static str, Vec<u8>)>,
        frames: Vec<RecordedFrame>,
        /// Makes every atlas upload fail
        pub fail_atlas_uploads: bool,
        /// Returned from every submit when set
        pub fail_submit: Option<ContextError>,
    }

    impl RecordingBackend {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                ..Default::default()
            }
        }

        /// Reserves a handle, as if a resource had been created outside the backend.
        pub fn next_handle(&mut self) -> u32 {
            let handle = self.next_handle;
            self.next_handle += 1;
            handle
        }

        pub fn atlas_uploads(&self) -> usize {
            self.atlas_uploads
        }

        pub fn vertex_uploads(&self) -> &[(&'static str, Vec<u8>)] {
            &self.vertex_uploads
        }

        pub fn frames(&self) -> &[RecordedFrame] {
            &self.frames
        }
    }

    impl RenderBackend for RecordingBackend {
        type Texture = u32;
        type Buffer = u32;

        fn upload_atlas(&mut self, atlas: &StitchedAtlas) -> Result<u32, AtlasBuildError> {
            if self.fail_atlas_uploads {
                return Err(AtlasBuildError::Upload(format!(
                    "refusing {}x{} atlas",
                    atlas.width, atlas.height
                )));
            }
            self.atlas_uploads += 1;
            Ok(self.next_handle())
        }

        fn upload_vertices(&mut self, label: &'static str, contents: &[u8]) -> u32 {
            self.vertex_uploads.push((label, contents.to_vec()));
            self.next_handle()
        }

        fn viewport_size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn resize(&mut self, width: u32, height: u32) {
            self.width = width;
            self.height = height;
        }

        fn submit(&mut self, plan: &FramePlan<'_, u32, u32>) -> Result<FrameStatus, ContextError> {
            if let Some(error) = &self.fail_submit {
                return Err(error.clone());
            }
            self.frames.push(RecordedFrame {
                texture: plan.terrain.texture.copied(),
                use_texture: plan.terrain.uniforms.use_texture,
                tile_count: plan.terrain.uniforms.tile_count,
                triangle_draw: plan
                    .terrain
                    .draw
                    .as_ref()
                    .map(|draw| (*draw.buffer, draw.vertex_count)),
                wire_draw: plan
                    .wireframe
                    .as_ref()
                    .map(|wire| (*wire.draw.buffer, wire.draw.vertex_count)),
            });
            Ok(FrameStatus::Presented)
        }
    }
}
