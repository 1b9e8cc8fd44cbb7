// ABOUTME: Live window host for the CRT effect.
// ABOUTME: Drives the frame loop from winit redraw requests and presents with wgpu.

use std::sync::Arc;

use crt_core::WindowSettings;
use crt_effects::{FrameBuffer, FrameLoop, FrameScheduler, LoopState, Surface, SurfaceError};
use crt_renderer::{RenderError, Renderer};
use rand::rngs::StdRng;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes, WindowId};

use crate::content::Content;

/// Window plus GPU renderer, seen by the frame loop as its drawing surface
struct WindowSurface {
    window: Arc<Window>,
    renderer: Renderer,
    content: Content,
}

impl Surface for WindowSurface {
    fn size(&self) -> Option<(u32, u32)> {
        let size = self.window.inner_size();
        Some((size.width, size.height))
    }

    fn read_frame(&mut self, frame: &mut FrameBuffer) -> Result<(), SurfaceError> {
        self.content.fill(frame);
        Ok(())
    }

    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<(), SurfaceError> {
        self.renderer.present(frame).map_err(|e| match e {
            RenderError::FrameDropped(_) => SurfaceError::FrameDropped(e.to_string()),
            _ => SurfaceError::Other(e.to_string()),
        })
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.renderer.set_flicker(alpha);
    }
}

/// Display refresh scheduling through winit redraw requests
struct RedrawScheduler(Arc<Window>);

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) {
        self.0.request_redraw();
    }
}

pub struct App {
    window_settings: WindowSettings,
    frame_loop: FrameLoop<StdRng>,
    /// Handed to the surface once the window exists
    content: Option<Content>,
    surface: Option<WindowSurface>,
}

impl App {
    pub fn new(window_settings: WindowSettings, frame_loop: FrameLoop<StdRng>, content: Content) -> Self {
        Self {
            window_settings,
            frame_loop,
            content: Some(content),
            surface: None,
        }
    }

    fn start_loop(&mut self) {
        if let Some(surface) = &self.surface {
            let mut scheduler = RedrawScheduler(Arc::clone(&surface.window));
            self.frame_loop.attach(surface, &mut scheduler);
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }
        let Some(content) = self.content.take() else {
            return;
        };

        let window_attrs = WindowAttributes::default()
            .with_title(self.window_settings.title.clone())
            .with_inner_size(LogicalSize::new(
                self.window_settings.width,
                self.window_settings.height,
            ));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                tracing::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let renderer = match pollster::block_on(Renderer::new(Arc::clone(&window))) {
            Ok(renderer) => renderer,
            Err(e) => {
                tracing::error!("Failed to create renderer: {}", e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        tracing::info!(
            "Window created: {}x{} physical pixels, scale factor: {}",
            size.width,
            size.height,
            window.scale_factor()
        );

        self.surface = Some(WindowSurface {
            window,
            renderer,
            content,
        });
        self.start_loop();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("Close requested, exiting");
                // Stop before the surface is dropped so no tick touches it
                self.frame_loop.detach();
                self.surface = None;
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(surface) = &mut self.surface {
                    surface.renderer.resize(new_size.width, new_size.height);
                }
                // A minimised window stops the loop; bring it back when visible again
                if self.frame_loop.state() == LoopState::Idle {
                    self.start_loop();
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(surface) = &mut self.surface {
                    let mut scheduler = RedrawScheduler(Arc::clone(&surface.window));
                    self.frame_loop.tick(surface, &mut scheduler);
                }
            }
            _ => {}
        }
    }
}
