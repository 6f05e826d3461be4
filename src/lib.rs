#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Terrain Viewer
//!
//! Renders a textured voxel terrain with wgpu, natively and in the browser.
//!
//! Block textures are stitched into a single atlas off the event loop. Every
//! block's material code is packed with its registry index and opacity, and
//! the terrain mesh is built once the atlas is on the GPU. Frames render
//! from the first display refresh; until the atlas arrives they are simply
//! empty.
//!
//! ## Key Modules
//!
//! * `application_state` - Window, input and graphics initialization
//! * `config` - Viewer settings and the configured block list
//! * `engine_state` - The engine state machine with its rendering, voxel and camera components
//!
//! ## Usage
//!
//! ```no_run
//! fn main() -> Result<(), voxel_terrain_viewer::engine_state::error::EngineError> {
//!     voxel_terrain_viewer::run()
//! }
//! ```
//!
//! In the browser, `run_web` is exported to JavaScript and draws into the
//! canvas with id `wgpu-canvas`.
//!
//! ## Controls
//!
//! * `W` `A` `S` `D`, `Space` and `Left Shift` fly the camera
//! * Dragging with the left mouse button looks around
//! * `F` toggles the wireframe overlay
//! * `Escape` quits

use application_state::ApplicationState;
#[cfg(target_family = "wasm")]
use wasm_bindgen::prelude::wasm_bindgen;

use engine_state::error::{ContextError, EngineError};
use log::info;
use winit::event_loop::EventLoop;

mod application_state;
pub mod config;
pub mod engine_state;

#[cfg(target_family = "wasm")]
const CANVAS_ID: &str = "wgpu-canvas";

/// Runs the viewer in a native window until it is closed or the engine halts.
///
/// Reads [`config::CONFIG_PATH`] and logs to stdout, filtered by `RUST_LOG`.
///
/// # Errors
/// Unreadable configuration, invalid blocks, an event loop that fails to
/// start, or the fatal error that halted the engine
#[cfg(not(target_family = "wasm"))]
pub fn run() -> Result<(), EngineError> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();
    info!("Logger initialized");

    let config = config::ViewerConfig::load(config::CONFIG_PATH)?;

    let event_loop = EventLoop::with_user_event()
        .build()
        .map_err(|err| ContextError::Window(err.to_string()))?;
    let mut state = ApplicationState::new(&config, event_loop.create_proxy())?;

    event_loop
        .run_app(&mut state)
        .map_err(|err| ContextError::Window(err.to_string()))?;
    info!("Rendered {} frames", state.engine.frames_rendered());

    match state.take_halt_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Starts the viewer in the page's canvas with the default configuration.
#[cfg(target_family = "wasm")]
#[wasm_bindgen]
pub fn run_web() {
    use log::error;
    use winit::platform::web::EventLoopExtWebSys;

    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    if console_log::init_with_level(log::Level::Info).is_ok() {
        info!("Logger initialized");
    }

    let config = config::ViewerConfig::default();
    let event_loop = match EventLoop::with_user_event().build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let err = EngineError::from(ContextError::Window(err.to_string()));
            application_state::diagnostic::show_context_error(&err);
            return;
        }
    };

    match ApplicationState::new(&config, event_loop.create_proxy()) {
        Ok(state) => event_loop.spawn_app(state),
        Err(err) => error!("Could not start the viewer: {err}"),
    }
}
