// ABOUTME: Offscreen host for rendering CRT frames to image files.
// ABOUTME: In-memory surface plus a scheduler that hands out a fixed number of ticks.

use std::path::Path;

use anyhow::{Context, Result};
use crt_core::EffectSettings;
use crt_effects::flicker::bake_flicker;
use crt_effects::{FrameBuffer, FrameLoop, FrameScheduler, RandomSource, Surface, SurfaceError, TickOutcome};
use image::RgbaImage;

use crate::content::Content;

/// Surface backed by plain memory
pub struct MemorySurface {
    size: (u32, u32),
    content: Content,
    presented: Option<FrameBuffer>,
    global_alpha: f32,
}

impl MemorySurface {
    pub fn new(width: u32, height: u32, content: Content) -> Self {
        Self {
            size: (width, height),
            content,
            presented: None,
            global_alpha: 1.0,
        }
    }

    /// Last written frame with the global alpha baked into its colours
    pub fn composited(&self) -> Option<FrameBuffer> {
        let mut frame = self.presented.clone()?;
        bake_flicker(&mut frame, self.global_alpha);
        Some(frame)
    }
}

impl Surface for MemorySurface {
    fn size(&self) -> Option<(u32, u32)> {
        Some(self.size)
    }

    fn read_frame(&mut self, frame: &mut FrameBuffer) -> Result<(), SurfaceError> {
        self.content.fill(frame);
        Ok(())
    }

    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<(), SurfaceError> {
        let reusable = self
            .presented
            .as_mut()
            .filter(|presented| presented.size() == frame.size());
        if let Some(presented) = reusable {
            presented
                .copy_from(frame)
                .map_err(|e| SurfaceError::Other(e.to_string()))?;
        } else {
            self.presented = Some(frame.clone());
        }
        Ok(())
    }

    fn set_global_alpha(&mut self, alpha: f32) {
        self.global_alpha = alpha;
    }
}

/// Grants one pending refresh per request
#[derive(Default)]
pub struct StepScheduler {
    pending: bool,
}

impl StepScheduler {
    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl FrameScheduler for StepScheduler {
    fn request_frame(&mut self) {
        self.pending = true;
    }
}

/// Run `frames` ticks over `content` and return the final composited frame
pub fn render_frames<R: RandomSource>(
    settings: EffectSettings,
    rng: R,
    content: Content,
    size: (u32, u32),
    frames: u32,
) -> Result<FrameBuffer> {
    let mut frame_loop = FrameLoop::new(settings, rng)?;
    let mut surface = MemorySurface::new(size.0, size.1, content);
    let mut scheduler = StepScheduler::default();

    if !frame_loop.attach(&surface, &mut scheduler) {
        anyhow::bail!("cannot render into a {}x{} surface", size.0, size.1);
    }

    for _ in 0..frames.max(1) {
        if !scheduler.take() {
            break;
        }
        if let TickOutcome::Stopped = frame_loop.tick(&mut surface, &mut scheduler) {
            anyhow::bail!("frame loop stopped unexpectedly");
        }
    }
    frame_loop.detach();

    surface
        .composited()
        .context("no frame was rendered")
}

/// Render `input` through the effect and save the result as PNG
pub fn render_file<R: RandomSource>(
    settings: EffectSettings,
    rng: R,
    input: &Path,
    output: &Path,
    frames: u32,
) -> Result<()> {
    let original = image::open(input)
        .with_context(|| format!("reading {}", input.display()))?
        .to_rgba8();
    let size = original.dimensions();
    let content = Content::from_image(original);

    let frame = render_frames(settings, rng, content, size, frames)?;
    let (width, height) = frame.size();
    let image = RgbaImage::from_raw(width, height, frame.into_bytes())
        .context("frame buffer does not match its dimensions")?;
    image
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;

    tracing::info!("Wrote {} ({} frames)", output.display(), frames.max(1));
    Ok(())
}
