//! # Engine State Module
//!
//! The viewer's core: a small state machine that owns the render context and
//! turns the four engine events into calls on its components.
//!
//! ## Key Components
//!
//! * `Engine` - The state machine and owner of all render data
//! * `camera_state` - Camera positioning, fly controls and reframing
//! * `rendering` - Atlas lifecycle, mesh builds, frame plans and the wgpu backend
//! * `voxels` - Block registry, material codes, voxel grid and terrain
//! * `wireframe_toggle` - Edge-triggered wireframe key
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --ContextInitialized--> AwaitingAtlas --AtlasStitched--> Ready
//!        \_________________(no blocks: textureless)______________________/
//! any --fatal error--> Halted
//! ```
//!
//! Frames render in every live phase; before the atlas arrives they are simply
//! empty.

use std::sync::Arc;

use camera_state::{camera::Projection, CameraState, FlyActions};
use cgmath::Deg;
use log::{debug, error, info, warn};
use rendering::{
    atlas::{AtlasLifecycleController, AtlasState, StitchCompletion, StitchOutcome, StitchScheduler, Stitcher},
    frame::FrameRenderer,
    meshing::{MeshBuildOrchestrator, Mesher},
    FrameStatus, RenderBackend, RenderState,
};
use voxels::{
    block::{
        material::{self, MaterialTable},
        BlockRegistry, TextureSpec,
    },
    grid::VoxelGrid,
    terrain::TerrainGenerator,
};
use winit::keyboard::KeyCode;
use wireframe_toggle::WireframeToggle;

use crate::config::ViewerConfig;
use error::{ContextError, EngineError};

pub mod camera_state;
pub mod error;
pub mod rendering;
pub mod voxels;
pub mod wireframe_toggle;


/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// No render context yet
    Uninitialized,
    /// Context ready, first atlas still stitching
    AwaitingAtlas,
    /// Atlas uploaded and mesh built
    Ready,
    /// A fatal error occurred; every later event is ignored
    Halted,
}

/// Inputs that drive the engine.
pub enum EngineEvent<B> {
    /// The graphics context is up and the backend can be used
    ContextInitialized(B),
    /// One display refresh
    Render { dt: web_time::Duration },
    /// The graphics context failed
    ContextError(ContextError),
    /// A stitch job finished
    AtlasStitched(StitchOutcome),
}

/// The render context and everything that mutates it.
pub struct Engine<B: RenderBackend, M, S> {
    phase: EnginePhase,
    registry: BlockRegistry,
    materials: MaterialTable,
    grid: VoxelGrid,
    backend: Option<B>,
    render_state: RenderState<B::Texture, B::Buffer>,
    camera_state: CameraState,
    wireframe_toggle: WireframeToggle,
    atlas_controller: AtlasLifecycleController,
    orchestrator: MeshBuildOrchestrator<M>,
    frame_renderer: FrameRenderer,
    stitcher: Arc<dyn Stitcher>,
    scheduler: S,
    frames_rendered: u64,
}

impl<B, M, S> Engine<B, M, S>
where
    B: RenderBackend,
    M: Mesher,
    S: StitchScheduler,
{
    /// Encodes the registry's materials and generates the terrain.
    ///
    /// A missing or empty registry is not an error: the engine will render
    /// without textures.
    ///
    /// # Errors
    /// [`EngineError::IndexRange`] if a block index does not fit a material code
    pub fn new(
        config: &ViewerConfig,
        registry: Option<BlockRegistry>,
        terrain: &dyn TerrainGenerator,
        mesher: M,
        stitcher: Arc<dyn Stitcher>,
        scheduler: S,
    ) -> Result<Self, EngineError> {
        let materials = material::encode(registry.as_ref())?;
        let grid = terrain.generate(&materials);
        info!(
            "Generated {}x{}x{} terrain with {} solid voxels",
            grid.dimensions().x,
            grid.dimensions().y,
            grid.dimensions().z,
            grid.solid_count()
        );

        let projection = Projection::new(
            1,
            1,
            Deg(config.field_of_view_degrees),
            config.z_near,
            config.z_far,
        );

        Ok(Self {
            phase: EnginePhase::Uninitialized,
            registry: registry.unwrap_or_default(),
            materials,
            grid,
            backend: None,
            render_state: RenderState::new(),
            camera_state: CameraState::new(config.camera_speed, config.mouse_sensitivity),
            wireframe_toggle: WireframeToggle::new(config.wireframe_key),
            atlas_controller: AtlasLifecycleController::new(),
            orchestrator: MeshBuildOrchestrator::new(mesher),
            frame_renderer: FrameRenderer::new(projection, config.clear_color),
            stitcher,
            scheduler,
            frames_rendered: 0,
        })
    }

    /// Applies one event.
    ///
    /// Any error is fatal: the engine moves to [`EnginePhase::Halted`] and
    /// returns it. A halted engine ignores every later event.
    pub fn handle_event(&mut self, event: EngineEvent<B>) -> Result<(), EngineError> {
        if self.phase == EnginePhase::Halted {
            debug!("Engine halted, ignoring event");
            return Ok(());
        }

        let result = match event {
            EngineEvent::ContextInitialized(backend) => self.on_context_initialized(backend),
            EngineEvent::Render { dt } => self.on_render(dt),
            EngineEvent::ContextError(err) => Err(err.into()),
            EngineEvent::AtlasStitched(outcome) => self.on_atlas_stitched(outcome),
        };

        if let Err(err) = &result {
            error!("Fatal engine error: {err}");
            self.phase = EnginePhase::Halted;
        }
        result
    }

    fn on_context_initialized(&mut self, backend: B) -> Result<(), EngineError> {
        if self.phase != EnginePhase::Uninitialized {
            warn!("Render context initialized twice, keeping the first one");
            return Ok(());
        }
        self.backend = Some(backend);

        if self.materials.is_empty() {
            info!("Installing a textureless atlas");
            self.render_state.atlas = AtlasState::textureless();
            self.rebuild_mesh()?;
            self.phase = EnginePhase::Ready;
        } else {
            self.atlas_controller
                .request_stitch(&self.registry, &self.stitcher, &mut self.scheduler);
            self.phase = EnginePhase::AwaitingAtlas;
        }
        info!("Engine phase: {:?}", self.phase);
        Ok(())
    }

    fn on_render(&mut self, dt: web_time::Duration) -> Result<(), EngineError> {
        self.camera_state.update(dt);

        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };

        let status = self.frame_renderer.render(
            &mut self.render_state,
            &self.camera_state.camera,
            &mut self.wireframe_toggle,
            backend,
        )?;

        if status == FrameStatus::Skipped {
            debug!("Frame {} skipped", self.frames_rendered);
        }
        self.frames_rendered += 1;
        Ok(())
    }

    fn on_atlas_stitched(&mut self, outcome: StitchOutcome) -> Result<(), EngineError> {
        let Some(backend) = self.backend.as_mut() else {
            warn!("Atlas stitch #{} finished without a render context", outcome.generation);
            return Ok(());
        };

        let completion =
            self.atlas_controller
                .complete(outcome, backend, &mut self.render_state.atlas)?;

        if let StitchCompletion::Ready { .. } = completion {
            self.rebuild_mesh()?;
            if self.phase == EnginePhase::AwaitingAtlas {
                self.phase = EnginePhase::Ready;
                info!("Engine phase: {:?}", self.phase);
            }
        }
        Ok(())
    }

    /// Materials are always encoded before the mesh is built, and the atlas
    /// must be ready.
    fn rebuild_mesh(&mut self) -> Result<(), EngineError> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(());
        };
        self.orchestrator.rebuild(
            &self.grid,
            &self.materials,
            &mut self.render_state,
            backend,
            &mut self.camera_state,
        )
    }

    /// Registers a block during the session.
    ///
    /// Material codes are re-encoded immediately. Once a render context exists
    /// the atlas is re-stitched, which leads to exactly one mesh rebuild when
    /// the newest stitch completes.
    ///
    /// # Returns
    /// The new block's registry index
    ///
    /// # Errors
    /// A rejected registration leaves the engine untouched. A failed encoding
    /// halts it.
    pub fn register_block(
        &mut self,
        name: &str,
        texture: TextureSpec,
        transparent: bool,
    ) -> Result<u32, EngineError> {
        let index = self.registry.register_block(name, texture, transparent)?;
        self.materials = match material::encode(Some(&self.registry)) {
            Ok(materials) => materials,
            Err(err) => {
                error!("Fatal engine error: {err}");
                self.phase = EnginePhase::Halted;
                return Err(err.into());
            }
        };

        if self.backend.is_some() && self.phase != EnginePhase::Halted {
            self.atlas_controller
                .request_stitch(&self.registry, &self.stitcher, &mut self.scheduler);
        }
        Ok(index)
    }

    /// Swaps in a new voxel grid, rebuilding the mesh right away if the atlas
    /// is ready. Otherwise the build waits for the atlas.
    pub fn replace_voxel_grid(&mut self, grid: VoxelGrid) -> Result<(), EngineError> {
        self.grid = grid;
        if self.phase != EnginePhase::Halted && self.render_state.atlas.ready {
            self.rebuild_mesh()?;
        }
        Ok(())
    }

    /// Feeds a key state change to the wireframe toggle.
    pub fn key_input(&mut self, key: KeyCode, pressed: bool) {
        self.wireframe_toggle.intake_key(key, pressed);
    }

    /// Drops held keys, e.g. when the window loses focus.
    pub fn release_keys(&mut self) {
        self.wireframe_toggle.reset();
    }

    pub fn set_fly_input(&mut self, actions: &FlyActions) {
        self.camera_state.intake_actions(actions);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(backend) = self.backend.as_mut() {
            backend.resize(width, height);
        }
    }

    pub fn phase(&self) -> EnginePhase {
        self.phase
    }

    pub fn render_state(&self) -> &RenderState<B::Texture, B::Buffer> {
        &self.render_state
    }

    pub fn camera_state(&self) -> &CameraState {
        &self.camera_state
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Number of completed mesh builds.
    pub fn mesh_rebuilds(&self) -> u64 {
        self.orchestrator.rebuilds()
    }
}
