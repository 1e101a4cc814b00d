//! Application event loop.
//!
//! `App` creates the window and the GPU context, loads the [`Scene`] and
//! maps winit input to camera operations. Rendering is driven by
//! invalidation: every handler that changes what is on screen calls
//! `Scene::resume`, and only then is a redraw requested from the window.
//!
//! Texture images are fetched off the render path. Each finished fetch comes
//! back as a `TableEvent` and is handed to the texture registry, which
//! swaps it in during the next frame.

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::TableConfig,
    context::Context,
    data_structures::texture::{TextureId, TextureRequest},
    pipelines::Renderer,
    resources::texture::load_image,
    scene::Scene,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Everything that exists once initialization succeeded.
pub struct AppState {
    pub(crate) ctx: Context,
    pub(crate) scene: Scene,
    renderer: Renderer,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: TableConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        let renderer = Renderer::new(
            &ctx.device,
            &ctx.queue,
            ctx.config.format,
            ctx.depth_sampling,
            config.shadow_map_cap,
        )?;
        let scene = Scene::load(&ctx.device, &ctx.queue, &config, ctx.aspect()).await?;
        Ok(Self {
            ctx,
            scene,
            renderer,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
            let resumed = self.scene.resize(width, height);
            // A frame may have been scheduled while the surface was unusable.
            self.redraw_if(resumed || self.scene.scheduler.is_pending());
        }
    }

    /// Ask the window for a redraw if `resumed` says a frame was scheduled.
    fn redraw_if(&self, resumed: bool) {
        if resumed {
            self.ctx.window.request_redraw();
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }
        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.renderer.render(
            &self.ctx.device,
            &self.ctx.queue,
            &mut self.scene,
            &view,
            &self.ctx.depth_texture.view,
            self.ctx.clear_colour,
        );
        self.ctx.window.pre_present_notify();
        output.present();
        Ok(())
    }

    fn handle_touch(&mut self, touch: Touch, active: &mut Option<u64>) -> bool {
        let (x, y) = (touch.location.x as f32, touch.location.y as f32);
        match touch.phase {
            TouchPhase::Started if active.is_none() => {
                *active = Some(touch.id);
                self.scene.camera.begin_drag(x, y);
                false
            }
            TouchPhase::Moved if *active == Some(touch.id) => {
                let update = self.scene.camera.drag_to(x, y);
                self.scene.apply_camera(update)
            }
            TouchPhase::Ended | TouchPhase::Cancelled if *active == Some(touch.id) => {
                *active = None;
                self.scene.camera.end_drag();
                false
            }
            _ => false,
        }
    }
}

impl Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ctx", &self.ctx)
            .field("things", &self.scene.things.len())
            .field("is_surface_configured", &self.is_surface_configured)
            .finish()
    }
}

pub(crate) enum TableEvent {
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Initialized(Box<AppState>),
    TextureLoaded {
        id: TextureId,
        image: image::DynamicImage,
    },
    TextureFailed {
        id: TextureId,
        file: String,
        error: String,
    },
    Exit,
}

impl Debug for TableEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(state) => f.debug_tuple("Initialized").field(state).finish(),
            Self::TextureLoaded { id, .. } => {
                f.debug_struct("TextureLoaded").field("id", id).finish()
            }
            Self::TextureFailed { id, file, error } => f
                .debug_struct("TextureFailed")
                .field("id", id)
                .field("file", file)
                .field("error", error)
                .finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<TableEvent>,
    config: Option<TableConfig>,
    state: Option<AppState>,
    cursor: (f32, f32),
    touch: Option<u64>,
}

impl App {
    fn new(event_loop: &EventLoop<TableEvent>, config: TableConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy,
            config: Some(config),
            state: None,
            cursor: (0.0, 0.0),
            touch: None,
        })
    }

    /// Start fetching every texture the scene queued.
    fn fetch_textures(&mut self) {
        let Some(state) = &mut self.state else {
            return;
        };
        for request in state.scene.textures.take_requests() {
            let proxy = self.proxy.clone();
            let fut = fetch_texture(request, proxy);
            #[cfg(not(target_arch = "wasm32"))]
            self.async_runtime.spawn(fut);
            #[cfg(target_arch = "wasm32")]
            wasm_bindgen_futures::spawn_local(fut);
        }
    }

    fn initialized(&mut self, mut state: AppState) {
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);
        log::info!("Scene ready with {} things", state.scene.things.len());
        state.ctx.window.request_redraw();
        self.state = Some(state);
        self.fetch_textures();
    }
}

async fn fetch_texture(request: TextureRequest, proxy: EventLoopProxy<TableEvent>) {
    let event = match load_image(&request.file).await {
        Ok(image) => TableEvent::TextureLoaded {
            id: request.id,
            image,
        },
        Err(e) => TableEvent::TextureFailed {
            id: request.id,
            file: request.file,
            error: format!("{:#}", e),
        },
    };
    if proxy.send_event(event).is_err() {
        log::warn!("Event loop closed before a texture arrived");
    }
}

impl ApplicationHandler<TableEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(config) = self.config.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("table-ngin");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let init_future = AppState::new(window, config);

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.initialized(state),
                Err(e) => {
                    log::error!("Initialization failed: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok(state) => TableEvent::Initialized(Box::new(state)),
                    Err(e) => {
                        log::error!("Initialization failed: {:#}", e);
                        TableEvent::Exit
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: TableEvent) {
        match event {
            TableEvent::Initialized(state) => self.initialized(*state),
            TableEvent::TextureLoaded { id, image } => {
                if let Some(state) = &mut self.state {
                    let resumed = state.scene.deliver_texture(id, image);
                    state.redraw_if(resumed);
                }
            }
            TableEvent::TextureFailed { id, file, error } => {
                log::warn!("Texture {} (slot {}) keeps its placeholder: {}", file, id.0, error);
            }
            TableEvent::Exit => event_loop.exit(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match state.render() {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.ctx.window.inner_size();
                    state.resize(size.width, size.height);
                    let resumed = state.scene.resume();
                    state.redraw_if(resumed);
                }
                Err(e) => log::error!("Unable to render {}", e),
            },
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => match button_state {
                ElementState::Pressed => state.scene.camera.begin_drag(self.cursor.0, self.cursor.1),
                ElementState::Released => state.scene.camera.end_drag(),
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
                let update = state.scene.camera.drag_to(self.cursor.0, self.cursor.1);
                let resumed = state.scene.apply_camera(update);
                state.redraw_if(resumed);
            }
            WindowEvent::CursorLeft { .. } => state.scene.camera.end_drag(),
            WindowEvent::Touch(touch) => {
                let resumed = state.handle_touch(touch, &mut self.touch);
                state.redraw_if(resumed);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                // winit reports scrolling away from the user as positive.
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y,
                    MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                };
                let update = state.scene.camera.handle_wheel(delta_y);
                let resumed = state.scene.apply_camera(update);
                state.redraw_if(resumed);
            }
            _ => {}
        }
    }
}

/// Open a window and show the tabletop described by `config`.
pub fn run(config: TableConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<TableEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
