//! # Frame Renderer
//!
//! Turns the current [`RenderState`] into a [`FramePlan`] once per display
//! refresh and hands it to the backend.
//!
//! A plan is always produced. Missing pieces only remove parts of it:
//! - no atlas texture: the terrain pass runs with `use_texture = 0`
//! - no mesh: neither draw call is issued
//! - wireframe hidden: no wire pass

use cgmath::{Matrix4, SquareMatrix};
use log::info;

use super::{FrameStatus, RenderBackend, RenderState};
use crate::engine_state::{
    camera_state::camera::{Camera, Projection},
    error::ContextError,
    wireframe_toggle::WireframeToggle,
};

/// Culling, depth and blending shared by every draw.
///
/// wgpu bakes this into the pipelines, so the same value builds them and is
/// carried by each plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFunctionState {
    pub cull_mode: Option<wgpu::Face>,
    pub depth_compare: wgpu::CompareFunction,
    pub depth_write: bool,
    /// `src = ONE, dst = ONE_MINUS_SRC_ALPHA`, matching the premultiplied atlas
    pub blend: wgpu::BlendState,
}

pub const FIXED_FUNCTION_STATE: FixedFunctionState = FixedFunctionState {
    cull_mode: Some(wgpu::Face::Back),
    depth_compare: wgpu::CompareFunction::Less,
    depth_write: true,
    blend: wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
};

/// Uniform block of the ambient-occlusion terrain shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// Tiles per atlas row
    pub tile_count: f32,
    /// 1 when the atlas texture is bound, 0 for a flat draw
    pub use_texture: u32,
    pub _padding: [u32; 2],
}

/// Uniform block of the flat wireframe shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct WireUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
}

#[derive(Debug)]
pub struct DrawCall<'a, B> {
    pub buffer: &'a B,
    pub vertex_count: u32,
}

#[derive(Debug)]
pub struct TerrainPass<'a, T, B> {
    pub uniforms: TerrainUniforms,
    pub texture: Option<&'a T>,
    pub draw: Option<DrawCall<'a, B>>,
}

#[derive(Debug)]
pub struct WirePass<'a, B> {
    pub uniforms: WireUniforms,
    pub draw: DrawCall<'a, B>,
}

/// Everything the backend needs to draw one frame.
#[derive(Debug)]
pub struct FramePlan<'a, T, B> {
    pub clear_color: [f64; 4],
    pub fixed_function: FixedFunctionState,
    pub terrain: TerrainPass<'a, T, B>,
    pub wireframe: Option<WirePass<'a, B>>,
}

pub struct FrameRenderer {
    projection: Projection,
    clear_color: [f64; 4],
}

impl FrameRenderer {
    pub fn new(projection: Projection, clear_color: [f64; 4]) -> Self {
        Self {
            projection,
            clear_color,
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Draws one frame.
    ///
    /// The wireframe toggle is sampled exactly once, before the plan is built.
    ///
    /// # Returns
    /// Whether the frame reached the screen
    ///
    /// # Errors
    /// Context failures reported by the backend
    pub fn render<B: RenderBackend>(
        &mut self,
        render_state: &mut RenderState<B::Texture, B::Buffer>,
        camera: &Camera,
        toggle: &mut WireframeToggle,
        backend: &mut B,
    ) -> Result<FrameStatus, ContextError> {
        if toggle.was_triggered() {
            render_state.wireframe_visible = !render_state.wireframe_visible;
            info!(
                "Wireframe {}",
                if render_state.wireframe_visible { "on" } else { "off" }
            );
        }

        let (width, height) = backend.viewport_size();
        self.projection.resize(width, height);

        let projection: [[f32; 4]; 4] = self.projection.calc_matrix().into();
        let view: [[f32; 4]; 4] = camera.calc_matrix().into();
        let model: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();

        let texture = render_state.current_texture();
        let mesh = render_state.mesh.as_ref();

        let terrain = TerrainPass {
            uniforms: TerrainUniforms {
                projection,
                view,
                model,
                tile_count: render_state.atlas.tile_count.max(1) as f32,
                use_texture: u32::from(texture.is_some()),
                _padding: [0; 2],
            },
            texture,
            draw: mesh.map(|mesh| DrawCall {
                buffer: &mesh.triangle_buffer,
                vertex_count: mesh.triangle_vertex_count,
            }),
        };

        let wireframe = mesh
            .filter(|_| render_state.wireframe_visible)
            .map(|mesh| WirePass {
                uniforms: WireUniforms {
                    projection,
                    view,
                    model,
                },
                draw: DrawCall {
                    buffer: &mesh.wireframe_buffer,
                    vertex_count: mesh.wire_vertex_count,
                },
            });

        let plan = FramePlan {
            clear_color: self.clear_color,
            fixed_function: FIXED_FUNCTION_STATE,
            terrain,
            wireframe,
        };

        backend.submit(&plan)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Point3};
    use winit::keyboard::KeyCode;

    use super::*;
    use crate::engine_state::rendering::{
        atlas::AtlasState, meshing::MeshState, testing::RecordingBackend,
    };

    fn renderer() -> FrameRenderer {
        FrameRenderer::new(
            Projection::new(1, 1, Deg(45.0), 1.0, 1000.0),
            [0.0, 0.0, 0.0, 0.0],
        )
    }

    fn camera() -> Camera {
        Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(0.0), Deg(0.0))
    }

    fn with_mesh(backend: &mut RecordingBackend) -> RenderState<u32, u32> {
        let mut state = RenderState::new();
        state.mesh = Some(MeshState {
            triangle_buffer: backend.next_handle(),
            triangle_vertex_count: 36,
            wireframe_buffer: backend.next_handle(),
            wire_vertex_count: 48,
            bounding_center: Point3::new(0.5, 0.5, 0.5),
            bounding_radius: 1.0,
        });
        state
    }

    #[test]
    fn test_empty_state_renders_untextured() {
        let mut backend = RecordingBackend::new(800, 600);
        let mut state: RenderState<u32, u32> = RenderState::new();
        let mut toggle = WireframeToggle::new(KeyCode::KeyF);
        let mut renderer = renderer();

        let status = renderer
            .render(&mut state, &camera(), &mut toggle, &mut backend)
            .unwrap();

        assert_eq!(status, FrameStatus::Presented);
        let frame = &backend.frames()[0];
        assert_eq!(frame.texture, None);
        assert_eq!(frame.use_texture, 0);
        assert_eq!(frame.triangle_draw, None);
        assert_eq!(frame.wire_draw, None);
        assert_eq!(frame.tile_count, 1.0);
        assert!((renderer.projection().aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_mesh_without_texture_still_draws() {
        let mut backend = RecordingBackend::new(800, 600);
        let mut state = with_mesh(&mut backend);
        let mut toggle = WireframeToggle::new(KeyCode::KeyF);

        renderer()
            .render(&mut state, &camera(), &mut toggle, &mut backend)
            .unwrap();

        let frame = &backend.frames()[0];
        assert_eq!(frame.use_texture, 0);
        assert_eq!(frame.triangle_draw, Some((0, 36)));
        assert_eq!(frame.wire_draw, None);
    }

    #[test]
    fn test_texture_is_bound_when_present() {
        let mut backend = RecordingBackend::new(800, 600);
        let mut state = with_mesh(&mut backend);
        let texture = backend.next_handle();
        state.atlas = AtlasState {
            ready: true,
            tile_count: 4,
            texture: Some(texture),
            ..AtlasState::pending()
        };
        let mut toggle = WireframeToggle::new(KeyCode::KeyF);

        renderer()
            .render(&mut state, &camera(), &mut toggle, &mut backend)
            .unwrap();

        let frame = &backend.frames()[0];
        assert_eq!(frame.texture, Some(texture));
        assert_eq!(frame.use_texture, 1);
        assert_eq!(frame.tile_count, 4.0);
    }

    #[test]
    fn test_wireframe_flips_once_per_trigger() {
        let mut backend = RecordingBackend::new(800, 600);
        let mut state = with_mesh(&mut backend);
        let mut toggle = WireframeToggle::new(KeyCode::KeyF);
        let mut renderer = renderer();

        toggle.intake_key(KeyCode::KeyF, true);
        toggle.intake_key(KeyCode::KeyF, false);
        for _ in 0..3 {
            renderer
                .render(&mut state, &camera(), &mut toggle, &mut backend)
                .unwrap();
        }
        assert!(state.wireframe_visible);

        toggle.intake_key(KeyCode::KeyF, true);
        renderer
            .render(&mut state, &camera(), &mut toggle, &mut backend)
            .unwrap();
        assert!(!state.wireframe_visible);

        let wires: Vec<_> = backend.frames().iter().map(|frame| frame.wire_draw).collect();
        assert_eq!(wires, vec![Some((1, 48)), Some((1, 48)), Some((1, 48)), None]);
    }

    #[test]
    fn test_wireframe_without_mesh_draws_nothing() {
        let mut backend = RecordingBackend::new(800, 600);
        let mut state: RenderState<u32, u32> = RenderState::new();
        let mut toggle = WireframeToggle::new(KeyCode::KeyF);
        toggle.intake_key(KeyCode::KeyF, true);

        renderer()
            .render(&mut state, &camera(), &mut toggle, &mut backend)
            .unwrap();

        assert!(state.wireframe_visible);
        assert_eq!(backend.frames()[0].wire_draw, None);
    }

    #[test]
    fn test_context_failure_is_returned() {
        let mut backend = RecordingBackend::new(800, 600);
        backend.fail_submit = Some(ContextError::OutOfMemory);
        let mut state: RenderState<u32, u32> = RenderState::new();
        let mut toggle = WireframeToggle::new(KeyCode::KeyF);

        assert_eq!(
            renderer().render(&mut state, &camera(), &mut toggle, &mut backend),
            Err(ContextError::OutOfMemory)
        );
    }

    #[test]
    fn test_fixed_function_state_blends_premultiplied() {
        let blend = FIXED_FUNCTION_STATE.blend.color;
        assert_eq!(blend.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(FIXED_FUNCTION_STATE.cull_mode, Some(wgpu::Face::Back));
        assert!(FIXED_FUNCTION_STATE.depth_write);
    }
}
