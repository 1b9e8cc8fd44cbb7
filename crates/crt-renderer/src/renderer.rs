// ABOUTME: Window renderer using wgpu.
// ABOUTME: Presents processed CRT frames with the per-frame flicker applied.

use std::sync::Arc;
use winit::window::Window;

use crt_effects::FrameBuffer;

use crate::gpu::GpuState;
use crate::present_pipeline::PresentPipeline;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// The swap chain could not hand out a texture this time; try the next frame
    #[error("Frame dropped: {0}")]
    FrameDropped(wgpu::SurfaceError),

    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("Failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Surface reports no supported formats")]
    NoSurfaceFormat,
}

pub struct Renderer {
    gpu: GpuState,
    present_pipeline: PresentPipeline,
    flicker: f32,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let gpu = GpuState::new(window).await?;
        let present_pipeline = PresentPipeline::new(&gpu.device, gpu.config.format);

        Ok(Self {
            gpu,
            present_pipeline,
            flicker: 1.0,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    /// Brightness modifier applied when presenting the next frame
    pub fn set_flicker(&mut self, flicker: f32) {
        self.flicker = flicker;
    }

    /// Upload `frame` and draw it to the window.
    ///
    /// Transient swap chain failures come back as `RenderError::FrameDropped`.
    pub fn present(&mut self, frame: &FrameBuffer) -> Result<(), RenderError> {
        self.present_pipeline
            .upload(&self.gpu.device, &self.gpu.queue, frame);
        self.present_pipeline
            .set_flicker(&self.gpu.queue, self.flicker);

        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                // The next frame renders against the fresh swap chain
                tracing::debug!("Surface {}, reconfiguring", e);
                self.gpu.reconfigure();
                return Err(RenderError::FrameDropped(e));
            }
            Err(e @ wgpu::SurfaceError::Timeout) => return Err(RenderError::FrameDropped(e)),
            Err(e) => return Err(e.into()),
        };
        let screen_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Present Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &screen_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.present_pipeline.render(&mut render_pass);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
