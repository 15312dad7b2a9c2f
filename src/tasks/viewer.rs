mod wgpu_context;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes},
};

use wgpu_context::{FramePipeline, TextureTable, WgpuContext};

use crate::dispatch::{RenderMode, RenderQueue, Waker};
use crate::events::RenderCommand;
use crate::renderer::WallpaperRenderer;
use crate::tasks::loader::LoaderHandle;

#[derive(Debug)]
pub enum ViewerEvent {
    /// A render command was queued from another thread.
    Wake,
    Cancelled,
}

pub fn build_event_loop() -> Result<EventLoop<ViewerEvent>> {
    EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build viewer event loop")
}

/// Waker for a [`RenderDispatcher`](crate::dispatch::RenderDispatcher) that
/// nudges the event loop out of `ControlFlow::Wait`.
pub fn waker(proxy: EventLoopProxy<ViewerEvent>) -> Waker {
    let proxy = Mutex::new(proxy);
    Arc::new(move || {
        if let Ok(proxy) = proxy.lock() {
            let _ = proxy.send_event(ViewerEvent::Wake);
        }
    })
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: FramePipeline,
    table: TextureTable,
}

struct ViewerApp {
    renderer: WallpaperRenderer<LoaderHandle>,
    commands: RenderQueue,
    cancel: CancellationToken,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    cursor: PhysicalPosition<f64>,
    wake_at: Option<Instant>,
}

impl ViewerApp {
    fn new(
        renderer: WallpaperRenderer<LoaderHandle>,
        commands: RenderQueue,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            renderer,
            commands,
            cancel,
            window: None,
            gpu: None,
            cursor: PhysicalPosition::new(0.0, 0.0),
            wake_at: None,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let attrs = WindowAttributes::default().with_title("PhotoPhase");
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create viewer window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("surface reports no formats")?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("viewer-device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "viewer surface configured",
        );

        let pipeline = FramePipeline::new(&device, &queue, format);
        self.gpu = Some(GpuState {
            surface,
            config,
            device,
            queue,
            pipeline,
            table: TextureTable::default(),
        });
        Ok(())
    }

    /// Feeds `command` to the renderer with a live GPU context.
    fn dispatch(&mut self, command: RenderCommand) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let mut ctx = WgpuContext::new(&gpu.device, &gpu.queue, &mut gpu.table, &gpu.pipeline);
        self.renderer.handle(command, &mut ctx, Instant::now());
    }

    /// Drains queued commands and runs due timers.
    fn pump(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let now = Instant::now();
        let mut ctx = WgpuContext::new(&gpu.device, &gpu.queue, &mut gpu.table, &gpu.pipeline);
        for command in self.commands.drain() {
            self.renderer.handle(command, &mut ctx, now);
        }
        self.renderer.tick(&mut ctx, now);
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        gpu.config.width = new_size.width.max(1);
        gpu.config.height = new_size.height.max(1);
        gpu.surface.configure(&gpu.device, &gpu.config);
        debug!(
            width = gpu.config.width,
            height = gpu.config.height,
            "viewer surface resized",
        );
        let (width, height) = (gpu.config.width, gpu.config.height);
        self.dispatch(RenderCommand::SurfaceChanged { width, height });
        self.request_redraw();
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("viewer surface lost; reconfiguring");
                self.handle_resize(window.inner_size());
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("viewer surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("viewer surface acquisition timed out");
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("viewer surface reported an unknown error; retrying");
                self.handle_resize(window.inner_size());
                return;
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("viewer-encoder"),
            });

        let clear = self.renderer.settings().background;
        let mut ctx = WgpuContext::new(&gpu.device, &gpu.queue, &mut gpu.table, &gpu.pipeline);
        let outcome = self.renderer.draw_frame(&mut ctx, Instant::now());
        ctx.finish(&mut encoder, &view, clear);

        gpu.queue.submit(std::iter::once(encoder.finish()));
        window.pre_present_notify();
        frame.present();

        self.wake_at = outcome.wake_at;
        if outcome.mode == RenderMode::Continuously {
            window.request_redraw();
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.gpu.is_none() {
            if let Err(err) = self.init_gpu(window.clone()) {
                error!(error = ?err, "failed to initialize GPU state");
                event_loop.exit();
                return;
            }
        }

        let size = window.inner_size();
        self.dispatch(RenderCommand::SurfaceChanged {
            width: size.width.max(1),
            height: size.height.max(1),
        });
        self.dispatch(RenderCommand::Resume);
        self.request_redraw();
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.dispatch(RenderCommand::Pause);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("viewer window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::Focused(focused) => {
                self.dispatch(if focused {
                    RenderCommand::Resume
                } else {
                    RenderCommand::Pause
                });
                self.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                let (x, y) = (self.cursor.x as f32, self.cursor.y as f32);
                self.dispatch(RenderCommand::Touch { x, y });
                self.request_redraw();
            }
            WindowEvent::Touch(touch) if touch.phase == TouchPhase::Started => {
                let (x, y) = (touch.location.x as f32, touch.location.y as f32);
                self.dispatch(RenderCommand::Touch { x, y });
                self.request_redraw();
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.logical_key.as_ref() {
                    Key::Character(c) if c.eq_ignore_ascii_case("r") => {
                        self.dispatch(RenderCommand::ReloadMedia);
                        self.request_redraw();
                    }
                    Key::Named(NamedKey::Escape) => event_loop.exit(),
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                self.pump();
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.pump();
        if self.renderer.needs_redraw() {
            self.request_redraw();
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        }
        let next = [self.wake_at, self.renderer.next_transition_at()]
            .into_iter()
            .flatten()
            .min();
        match next {
            Some(at) if at <= Instant::now() => {
                self.request_redraw();
                event_loop.set_control_flow(ControlFlow::Wait);
            }
            Some(at) => event_loop.set_control_flow(ControlFlow::WaitUntil(at)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Wake => {}
            ViewerEvent::Cancelled => {
                info!("viewer received cancellation event");
                event_loop.exit();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.dispatch(RenderCommand::Recycle);
        if let Some(gpu) = self.gpu.as_ref() {
            debug!(live_textures = gpu.table.len(), "viewer exiting");
        }
    }
}

/// Runs the viewer on the calling thread until the window closes or
/// `cancel` fires.
pub fn run_windowed(
    event_loop: EventLoop<ViewerEvent>,
    renderer: WallpaperRenderer<LoaderHandle>,
    commands: RenderQueue,
    cancel: CancellationToken,
) -> Result<()> {
    let proxy = event_loop.create_proxy();
    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = ViewerApp::new(renderer, commands, cancel);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("viewer event loop failed")
}
