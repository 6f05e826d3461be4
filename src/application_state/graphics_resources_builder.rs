//! # Graphics Resources Builder
//!
//! Creates the window, surface, device and queue the render backend needs.
//! Initialization is asynchronous on the web, so the result is delivered to
//! the event loop as an [`AppEvent::Graphics`] instead of being returned.
//!
//! The main components are:
//! - `Graphics`: The resources handed to the render backend
//! - `GraphicsBuilder`: Starts initialization and sends the result back
//! - `MaybeGraphics`: Where initialization currently stands

use std::future::Future;
use std::sync::Arc;

use log::{error, info};
use wgpu::{Device, Features, Queue, Surface, SurfaceConfiguration};
use winit::{
    event_loop::{ActiveEventLoop, EventLoopProxy},
    window::Window,
};

#[cfg(target_family = "wasm")]
use crate::CANVAS_ID;
use crate::engine_state::error::ContextError;

use super::AppEvent;

const WINDOW_TITLE: &str = "Voxel Terrain Viewer";

/// Resources for one live graphics context.
pub struct Graphics {
    pub window: Arc<Window>,
    pub surface: Surface<'static>,
    pub surface_config: SurfaceConfiguration,
    pub device: Device,
    pub queue: Queue,
    /// False on the web until the canvas reports a non-zero size
    pub is_surface_configured: bool,
}

impl std::fmt::Debug for Graphics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graphics")
            .field("surface_config", &self.surface_config)
            .field("is_surface_configured", &self.is_surface_configured)
            .finish_non_exhaustive()
    }
}

impl Graphics {
    /// Applies a new drawable size to the surface configuration.
    ///
    /// Returns false for zero sizes, which leave the surface unconfigured.
    pub fn configure_surface(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&self.device, &self.surface_config);
        self.is_surface_configured = true;
        true
    }
}

#[cfg(target_family = "wasm")]
fn canvas_attributes() -> Result<winit::window::WindowAttributes, ContextError> {
    use web_sys::wasm_bindgen::JsCast;
    use winit::platform::web::WindowAttributesExtWebSys;

    let canvas = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id(CANVAS_ID))
        .ok_or_else(|| ContextError::Window(format!("no element with id `{CANVAS_ID}`")))?;
    let canvas = canvas
        .dyn_into::<web_sys::HtmlCanvasElement>()
        .map_err(|_| ContextError::Window(format!("element `{CANVAS_ID}` is not a canvas")))?;

    Ok(Window::default_attributes().with_canvas(Some(canvas)))
}

/// Creates the window and surface right away, then resolves the adapter and
/// device asynchronously.
fn create_graphics(
    event_loop: &ActiveEventLoop,
) -> impl Future<Output = Result<Graphics, ContextError>> + 'static {
    #[cfg(not(target_family = "wasm"))]
    let window_attrs = Ok(Window::default_attributes().with_title(WINDOW_TITLE));
    #[cfg(target_family = "wasm")]
    let window_attrs = canvas_attributes().map(|attrs| attrs.with_title(WINDOW_TITLE));

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        #[cfg(not(target_family = "wasm"))]
        backends: wgpu::Backends::PRIMARY,
        #[cfg(target_family = "wasm")]
        backends: wgpu::Backends::GL,
        flags: wgpu::InstanceFlags::empty(),
        backend_options: wgpu::BackendOptions::from_env_or_default(),
    });

    let window_and_surface = window_attrs
        .and_then(|attrs| {
            event_loop
                .create_window(attrs)
                .map(Arc::new)
                .map_err(|err| ContextError::Window(err.to_string()))
        })
        .and_then(|window| {
            instance
                .create_surface(window.clone())
                .map(|surface| (window, surface))
                .map_err(|err| ContextError::Surface(err.to_string()))
        });

    async move {
        let (window, surface) = window_and_surface?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| ContextError::Adapter(err.to_string()))?;

        let required_limits = if cfg!(target_family = "wasm") {
            wgpu::Limits::downlevel_webgl2_defaults()
        } else {
            wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: Features::empty(),
                required_limits,
                label: None,
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|err| ContextError::Device(err.to_string()))?;

        let info = adapter.get_info();
        info!("Using {} ({:?})", info.name, info.backend);

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| {
                ContextError::Surface("surface is not supported by the adapter".to_string())
            })?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let mut graphics = Graphics {
            window,
            surface,
            surface_config,
            device,
            queue,
            is_surface_configured: false,
        };
        // The canvas has no size yet on the web; the first resize configures it.
        graphics.configure_surface(size.width, size.height);
        Ok(graphics)
    }
}

/// Starts graphics initialization and sends the result to the event loop.
pub struct GraphicsBuilder {
    event_loop_proxy: Option<EventLoopProxy<AppEvent>>,
}

/// Represents the possible states of the graphics initialization process.
pub enum MaybeGraphics {
    /// State during asynchronous graphics initialization
    Builder(GraphicsBuilder),

    /// Resources are ready but the surface may still await its first size
    Graphics(Graphics),

    /// Resources have been handed to the render backend
    Moved,
}

impl GraphicsBuilder {
    pub fn new(event_loop_proxy: EventLoopProxy<AppEvent>) -> Self {
        Self {
            event_loop_proxy: Some(event_loop_proxy),
        }
    }

    /// Begins initialization. Calling it again is a no-op.
    ///
    /// Native targets block on the future; the web spawns it on the browser's
    /// task queue.
    pub fn build_and_send(&mut self, event_loop: &ActiveEventLoop) {
        let Some(event_loop_proxy) = self.event_loop_proxy.take() else {
            return;
        };

        #[cfg(target_family = "wasm")]
        {
            let gfx_fut = create_graphics(event_loop);
            wasm_bindgen_futures::spawn_local(async move {
                let gfx = gfx_fut.await;
                send_graphics(&event_loop_proxy, gfx);
            });
        }

        #[cfg(not(target_family = "wasm"))]
        {
            let gfx = pollster::block_on(create_graphics(event_loop));
            send_graphics(&event_loop_proxy, gfx);
        }
    }
}

fn send_graphics(proxy: &EventLoopProxy<AppEvent>, gfx: Result<Graphics, ContextError>) {
    if proxy.send_event(AppEvent::Graphics(gfx)).is_err() {
        error!("Event loop closed before graphics initialization finished");
    }
}
