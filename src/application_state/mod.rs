//! # Application State Management
//!
//! The winit side of the viewer:
//! - Window and graphics initialization
//! - Input handling and translation into fly-camera actions
//! - Forwarding frames, stitch results and context failures to the engine
//! - Stopping the event loop once the engine halts

pub mod diagnostic;
pub mod graphics_resources_builder;
pub mod input_manager;
pub mod input_state;
pub mod stitch_scheduler;

use std::sync::Arc;

use graphics_resources_builder::{Graphics, MaybeGraphics};
use input_manager::InputManager;
use input_state::ProcessedInputState;
use log::{error, info};
use stitch_scheduler::EventLoopStitchScheduler;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    config::ViewerConfig,
    engine_state::{
        camera_state::FlyActions,
        error::{ContextError, EngineError},
        rendering::{
            atlas::{grid_stitcher::GridStitcher, StitchOutcome, Stitcher},
            meshing::culled::CulledMesher,
            WgpuBackend,
        },
        voxels::terrain::PerlinTerrain,
        Engine, EngineEvent,
    },
};

/// Events posted to the event loop from outside it.
#[derive(Debug)]
pub enum AppEvent {
    /// Graphics initialization finished
    Graphics(Result<Graphics, ContextError>),
    /// A stitch job finished on a worker
    AtlasStitched(StitchOutcome),
}

/// The engine as the application runs it.
pub type ViewerEngine = Engine<WgpuBackend, CulledMesher, EventLoopStitchScheduler>;

/// The main application state container.
///
/// The engine exists from the start; it receives its render backend once
/// graphics initialization completes.
pub struct ApplicationState {
    /// The current graphics state, which may be initializing or ready
    pub graphics: MaybeGraphics,

    pub engine: ViewerEngine,

    /// Window and input, present once graphics are handed to the engine
    pub state: Option<InitializedApplicationState>,

    /// Cached window size for web platforms during initialization
    pub web_window_size: Option<PhysicalSize<u32>>,

    halt: HaltReport,
}

/// Reports fatal engine errors and keeps the first one for the exit status.
#[derive(Debug, Default)]
pub struct HaltReport {
    error: Option<EngineError>,
}

impl HaltReport {
    /// Context failures go to the diagnostic surface, everything else to the log.
    pub fn record(&mut self, err: EngineError) {
        if err.is_context_error() {
            diagnostic::show_context_error(&err);
        } else {
            error!("Stopping the viewer: {err}");
        }
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub fn take(&mut self) -> Option<EngineError> {
        self.error.take()
    }
}

/// The running part of the application.
pub struct InitializedApplicationState {
    /// Handle to the application window
    pub window: Arc<Window>,

    /// Manages input state and event processing
    pub input_manager: InputManager,

    /// Timestamp of the last frame for delta time calculations
    pub last_frame_time: web_time::Instant,
}

impl ApplicationState {
    /// Builds the engine from `config`. Graphics start on the first resume.
    ///
    /// # Errors
    /// Invalid block configuration, or block indices beyond the material code range
    pub fn new(config: &ViewerConfig, proxy: EventLoopProxy<AppEvent>) -> Result<Self, EngineError> {
        let registry = config.block_registry()?;
        info!("Registered {} blocks", registry.len());

        let stitcher: Arc<dyn Stitcher> = Arc::new(GridStitcher::new(
            config.texture_dir.clone(),
            config.tile_size,
        ));
        let engine = Engine::new(
            config,
            Some(registry),
            &PerlinTerrain::new(&config.terrain),
            CulledMesher::new(),
            stitcher,
            EventLoopStitchScheduler::new(proxy.clone()),
        )?;

        Ok(Self {
            graphics: MaybeGraphics::Builder(graphics_resources_builder::GraphicsBuilder::new(proxy)),
            engine,
            state: None,
            web_window_size: None,
            halt: HaltReport::default(),
        })
    }

    /// Configures a surface that was created without a size, then starts the
    /// engine once the size is usable.
    fn resized(&mut self, event_loop: &ActiveEventLoop, size: PhysicalSize<u32>) {
        let MaybeGraphics::Graphics(gfx) = &mut self.graphics else {
            return;
        };

        if gfx.configure_surface(size.width, size.height) {
            self.initialize_application_state(event_loop);
        }
    }

    /// Hands the graphics resources to the engine as its render backend.
    fn initialize_application_state(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self.graphics, MaybeGraphics::Graphics(_)) {
            return;
        }
        let MaybeGraphics::Graphics(gfx) = std::mem::replace(&mut self.graphics, MaybeGraphics::Moved)
        else {
            return;
        };

        let backend = WgpuBackend::new(gfx.surface, gfx.surface_config, gfx.device, gfx.queue);
        self.state = Some(InitializedApplicationState {
            window: gfx.window,
            input_manager: InputManager::new(),
            last_frame_time: web_time::Instant::now(),
        });

        self.dispatch(event_loop, EngineEvent::ContextInitialized(backend));
    }

    /// Applies an engine event and stops the application if the engine halts.
    fn dispatch(&mut self, event_loop: &ActiveEventLoop, event: EngineEvent<WgpuBackend>) {
        if let Err(err) = self.engine.handle_event(event) {
            self.halt.record(err);
            event_loop.exit();
        }
    }

    /// The error that halted the engine, if any.
    pub fn take_halt_error(&mut self) -> Option<EngineError> {
        self.halt.take()
    }
}

/// Maps held keys and a left-button drag to camera movement.
fn fly_actions(input: &ProcessedInputState) -> FlyActions {
    let held = |key| input.get_key_state(key).is_active();
    let looking = input.get_mouse_button_state(MouseButton::Left).is_active();

    FlyActions {
        move_forward: held(KeyCode::KeyW),
        move_backward: held(KeyCode::KeyS),
        move_left: held(KeyCode::KeyA),
        move_right: held(KeyCode::KeyD),
        move_up: held(KeyCode::Space),
        move_down: held(KeyCode::ShiftLeft),
        rotate_view: input.get_mouse_delta().filter(|_| looking),
    }
}

fn is_exit_request(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state: ElementState::Pressed,
                    physical_key: PhysicalKey::Code(KeyCode::Escape),
                    ..
                },
                ..
            }
    )
}

impl ApplicationHandler<AppEvent> for ApplicationState {
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if is_exit_request(&event) {
            event_loop.exit();
            return;
        }

        if self.state.is_none() {
            if let WindowEvent::Resized(size) = event {
                self.web_window_size = Some(size);
                self.resized(event_loop, size);
            }
            return;
        }
        let Some(state) = &mut self.state else {
            return;
        };

        state.input_manager.intake_input(&event);

        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: key_state,
                        physical_key: PhysicalKey::Code(key),
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.engine.key_input(key, key_state == ElementState::Pressed);
            }
            WindowEvent::Resized(size) => {
                self.engine.resize(size.width, size.height);
            }
            WindowEvent::Focused(false) => {
                state.input_manager.release_all();
                self.engine.release_keys();
            }
            WindowEvent::RedrawRequested => {
                let now = web_time::Instant::now();
                let dt = now - state.last_frame_time;
                state.last_frame_time = now;
                self.dispatch(event_loop, EngineEvent::Render { dt });
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            if let DeviceEvent::MouseMotion { delta } = event {
                state.input_manager.intake_mouse_motion(delta);
            }
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let MaybeGraphics::Builder(builder) = &mut self.graphics {
            builder.build_and_send(event_loop);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Graphics(Ok(graphics)) => {
                let is_surface_configured = graphics.is_surface_configured;
                self.graphics = MaybeGraphics::Graphics(graphics);

                if is_surface_configured {
                    self.initialize_application_state(event_loop);
                } else if let Some(size) = self.web_window_size {
                    self.resized(event_loop, size);
                }
            }
            AppEvent::Graphics(Err(err)) => {
                self.graphics = MaybeGraphics::Moved;
                self.dispatch(event_loop, EngineEvent::ContextError(err));
            }
            AppEvent::AtlasStitched(outcome) => {
                self.dispatch(event_loop, EngineEvent::AtlasStitched(outcome));
            }
        }
    }

    /// Feeds this frame's input to the camera and schedules the next redraw.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &mut self.state {
            let processed_input = state.input_manager.get_and_reset_processed_input();
            self.engine.set_fly_input(&fly_actions(&processed_input));
            state.window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use input_state::RawInputState;

    #[test]
    fn test_fly_actions_from_held_keys() {
        let mut input = ProcessedInputState::default();
        input.keyboard_states.insert(KeyCode::KeyW, RawInputState::Held);
        input.keyboard_states.insert(KeyCode::Space, RawInputState::Pressed);
        input.keyboard_states.insert(KeyCode::KeyS, RawInputState::Released);

        let actions = fly_actions(&input);
        assert!(actions.move_forward);
        assert!(actions.move_up);
        assert!(!actions.move_backward);
        assert_eq!(actions.rotate_view, None);
    }

    #[test]
    fn test_halt_report_keeps_first_error() {
        let mut halt = HaltReport::default();
        assert!(halt.take().is_none());

        halt.record(EngineError::AtlasNotReady);
        halt.record(EngineError::Context(ContextError::OutOfMemory));

        assert!(matches!(halt.take(), Some(EngineError::AtlasNotReady)));
        assert!(halt.take().is_none());
    }

    #[test]
    fn test_mouse_rotates_only_while_dragging() {
        let mut input = ProcessedInputState {
            mouse_delta: Some((3.0, -2.0)),
            ..Default::default()
        };
        assert_eq!(fly_actions(&input).rotate_view, None);

        input
            .mouse_button_states
            .insert(MouseButton::Left, RawInputState::Held);
        assert_eq!(fly_actions(&input).rotate_view, Some((3.0, -2.0)));
    }
}
