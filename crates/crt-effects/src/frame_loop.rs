// ABOUTME: Frame loop driver - renders one frame per refresh callback.
// ABOUTME: Idle/Running state machine over injectable surface, scheduler and RNG.

use crt_core::{EffectSettings, SettingsError};

use crate::{FrameBuffer, FramePipeline, RandomSource};

/// Log a frame counter this often (~5 seconds at 60fps)
const LOG_INTERVAL: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("Drawing surface is not available")]
    Unavailable,

    #[error("Drawing surface has zero size")]
    ZeroSize,

    /// The surface could not take this frame but stays usable
    #[error("Frame dropped: {0}")]
    FrameDropped(String),

    #[error("Surface error: {0}")]
    Other(String),
}

/// The drawing surface the effect is mounted on
pub trait Surface {
    /// Current drawable size in pixels, None once the surface is gone
    fn size(&self) -> Option<(u32, u32)>;

    /// Copy the content under the effect into `frame`, which already has the
    /// size last reported by `size()`
    fn read_frame(&mut self, frame: &mut FrameBuffer) -> Result<(), SurfaceError>;

    /// Replace the surface contents with `frame`
    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<(), SurfaceError>;

    /// Global compositing alpha / brightness used when presenting
    fn set_global_alpha(&mut self, alpha: f32);
}

/// Display-refresh synchronised callback request
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No surface attached, ticks do nothing
    Idle,
    /// Rendering and rescheduling every tick
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Loop was idle; nothing rendered, nothing scheduled
    Skipped,
    /// Frame presented and the next one requested
    Rendered { phase: u64, flicker: f32 },
    /// Surface skipped this frame; phase unchanged, next one requested
    Dropped,
    /// Surface became unusable; loop went idle
    Stopped,
}

pub struct FrameLoop<R> {
    pipeline: FramePipeline,
    rng: R,
    state: LoopState,
    phase: u64,
}

impl<R: RandomSource> FrameLoop<R> {
    pub fn new(settings: EffectSettings, rng: R) -> Result<Self, SettingsError> {
        Ok(Self {
            pipeline: FramePipeline::new(settings)?,
            rng,
            state: LoopState::Idle,
            phase: 0,
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Frames rendered since the loop was last attached
    pub fn phase(&self) -> u64 {
        self.phase
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    /// Start running against `surface` and request the first frame.
    ///
    /// Does nothing (and returns false) if the surface has no usable size.
    pub fn attach<S, F>(&mut self, surface: &S, scheduler: &mut F) -> bool
    where
        S: Surface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        if self.state == LoopState::Running {
            return true;
        }
        if let Err(e) = usable_size(surface) {
            tracing::debug!("CRT loop not started: {}", e);
            return false;
        }

        self.state = LoopState::Running;
        self.phase = 0;
        tracing::info!("CRT loop started");
        scheduler.request_frame();
        true
    }

    /// Stop on surface teardown. Any tick already scheduled becomes a no-op.
    pub fn detach(&mut self) {
        if self.state == LoopState::Running {
            tracing::info!("CRT loop stopped after {} frames", self.phase);
        }
        self.state = LoopState::Idle;
        self.pipeline.release();
    }

    /// Render one frame, then request the next
    pub fn tick<S, F>(&mut self, surface: &mut S, scheduler: &mut F) -> TickOutcome
    where
        S: Surface + ?Sized,
        F: FrameScheduler + ?Sized,
    {
        if self.state == LoopState::Idle {
            return TickOutcome::Skipped;
        }

        match self.render_frame(surface) {
            Ok(flicker) => {
                let phase = self.phase;
                self.phase = self.phase.wrapping_add(1);
                if self.phase % LOG_INTERVAL == 0 {
                    tracing::debug!("CRT frame {}", self.phase);
                }
                scheduler.request_frame();
                TickOutcome::Rendered { phase, flicker }
            }
            Err(SurfaceError::FrameDropped(reason)) => {
                tracing::debug!("CRT frame {} dropped: {}", self.phase, reason);
                scheduler.request_frame();
                TickOutcome::Dropped
            }
            Err(e) => {
                // Decorative effect: never surface this to the caller
                tracing::debug!("CRT loop stopping: {}", e);
                self.detach();
                TickOutcome::Stopped
            }
        }
    }

    fn render_frame<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<f32, SurfaceError> {
        let (width, height) = usable_size(surface)?;

        let reallocated = self
            .pipeline
            .prepare(width, height)
            .map_err(|e| SurfaceError::Other(e.to_string()))?;
        if reallocated {
            tracing::info!("CRT buffers allocated at {}x{}", width, height);
        }

        let source = self.pipeline.source_mut().ok_or(SurfaceError::Unavailable)?;
        surface.read_frame(source)?;

        let rendered = self
            .pipeline
            .render(self.phase, &mut self.rng)
            .map_err(|e| SurfaceError::Other(e.to_string()))?;

        surface.set_global_alpha(rendered.flicker);
        surface.write_frame(rendered.frame)?;
        Ok(rendered.flicker)
    }
}

fn usable_size<S: Surface + ?Sized>(surface: &S) -> Result<(u32, u32), SurfaceError> {
    match surface.size() {
        None => Err(SurfaceError::Unavailable),
        Some((0, _)) | Some((_, 0)) => Err(SurfaceError::ZeroSize),
        Some(size) => Ok(size),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crt_core::Rgba8;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Default)]
    struct MockScheduler {
        requests: usize,
    }

    impl FrameScheduler for MockScheduler {
        fn request_frame(&mut self) {
            self.requests += 1;
        }
    }

    struct MockSurface {
        size: Option<(u32, u32)>,
        content: Rgba8,
        written: Vec<FrameBuffer>,
        alpha: f32,
        fail_reads: bool,
        dropped_writes: usize,
    }

    impl MockSurface {
        fn new(width: u32, height: u32) -> Self {
            Self {
                size: Some((width, height)),
                content: Rgba8::WHITE,
                written: Vec::new(),
                alpha: 1.0,
                fail_reads: false,
                dropped_writes: 0,
            }
        }
    }

    impl Surface for MockSurface {
        fn size(&self) -> Option<(u32, u32)> {
            self.size
        }

        fn read_frame(&mut self, frame: &mut FrameBuffer) -> Result<(), SurfaceError> {
            if self.fail_reads {
                return Err(SurfaceError::Other("context lost".to_string()));
            }
            frame.fill(self.content);
            Ok(())
        }

        fn write_frame(&mut self, frame: &FrameBuffer) -> Result<(), SurfaceError> {
            if self.dropped_writes > 0 {
                self.dropped_writes -= 1;
                return Err(SurfaceError::FrameDropped("swap chain timeout".to_string()));
            }
            self.written.push(frame.clone());
            Ok(())
        }

        fn set_global_alpha(&mut self, alpha: f32) {
            self.alpha = alpha;
        }
    }

    /// Always the middle of [0, 1): zero noise, flicker 1.0
    struct Midpoint;

    impl RandomSource for Midpoint {
        fn next_unit(&mut self) -> f32 {
            0.5
        }
    }

    fn running_loop(surface: &MockSurface, scheduler: &mut MockScheduler) -> FrameLoop<StdRng> {
        let mut frame_loop =
            FrameLoop::new(EffectSettings::default(), StdRng::seed_from_u64(5)).unwrap();
        assert!(frame_loop.attach(surface, scheduler));
        frame_loop
    }

    #[test]
    fn idle_until_attached() {
        let mut surface = MockSurface::new(8, 8);
        let mut scheduler = MockScheduler::default();
        let mut frame_loop =
            FrameLoop::new(EffectSettings::default(), StdRng::seed_from_u64(5)).unwrap();

        assert_eq!(frame_loop.state(), LoopState::Idle);
        assert_eq!(frame_loop.tick(&mut surface, &mut scheduler), TickOutcome::Skipped);
        assert_eq!(scheduler.requests, 0);
        assert!(surface.written.is_empty());
    }

    #[test]
    fn attach_without_surface_is_silent_noop() {
        let mut scheduler = MockScheduler::default();
        let mut frame_loop =
            FrameLoop::new(EffectSettings::default(), StdRng::seed_from_u64(5)).unwrap();

        let mut gone = MockSurface::new(8, 8);
        gone.size = None;
        assert!(!frame_loop.attach(&gone, &mut scheduler));

        let empty = MockSurface::new(0, 8);
        assert!(!frame_loop.attach(&empty, &mut scheduler));

        assert_eq!(frame_loop.state(), LoopState::Idle);
        assert_eq!(scheduler.requests, 0);
    }

    #[test]
    fn each_tick_renders_and_reschedules() {
        let mut surface = MockSurface::new(8, 8);
        let mut scheduler = MockScheduler::default();
        let mut frame_loop = running_loop(&surface, &mut scheduler);
        assert_eq!(scheduler.requests, 1);

        for expected_phase in 0..5 {
            match frame_loop.tick(&mut surface, &mut scheduler) {
                TickOutcome::Rendered { phase, flicker } => {
                    assert_eq!(phase, expected_phase);
                    assert!((0.98..=1.02).contains(&flicker));
                    assert_eq!(surface.alpha, flicker);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        assert_eq!(frame_loop.phase(), 5);
        assert_eq!(scheduler.requests, 6);
        assert_eq!(surface.written.len(), 5);
        assert!(surface.written.iter().all(|f| f.size() == (8, 8)));
    }

    #[test]
    fn detach_suppresses_scheduled_tick() {
        let mut surface = MockSurface::new(8, 8);
        let mut scheduler = MockScheduler::default();
        let mut frame_loop = running_loop(&surface, &mut scheduler);
        frame_loop.tick(&mut surface, &mut scheduler);

        frame_loop.detach();
        let requests = scheduler.requests;
        assert_eq!(frame_loop.tick(&mut surface, &mut scheduler), TickOutcome::Skipped);
        assert_eq!(scheduler.requests, requests);
        assert_eq!(surface.written.len(), 1);
        assert_eq!(frame_loop.pipeline().size(), None);
    }

    #[test]
    fn reattach_restarts_phase() {
        let mut surface = MockSurface::new(8, 8);
        let mut scheduler = MockScheduler::default();
        let mut frame_loop = running_loop(&surface, &mut scheduler);
        frame_loop.tick(&mut surface, &mut scheduler);
        frame_loop.tick(&mut surface, &mut scheduler);
        frame_loop.detach();

        assert!(frame_loop.attach(&surface, &mut scheduler));
        assert_eq!(frame_loop.phase(), 0);
    }

    #[test]
    fn surface_loss_stops_loop() {
        let mut surface = MockSurface::new(8, 8);
        let mut scheduler = MockScheduler::default();
        let mut frame_loop = running_loop(&surface, &mut scheduler);

        surface.size = None;
        assert_eq!(frame_loop.tick(&mut surface, &mut scheduler), TickOutcome::Stopped);
        assert_eq!(frame_loop.state(), LoopState::Idle);
        assert_eq!(scheduler.requests, 1);
        assert!(surface.written.is_empty());
    }

    #[test]
    fn read_failure_stops_loop() {
        let mut surface = MockSurface::new(8, 8);
        let mut scheduler = MockScheduler::default();
        let mut frame_loop = running_loop(&surface, &mut scheduler);

        surface.fail_reads = true;
        assert_eq!(frame_loop.tick(&mut surface, &mut scheduler), TickOutcome::Stopped);
        assert_eq!(frame_loop.state(), LoopState::Idle);
    }

    #[test]
    fn dropped_frame_keeps_loop_running() {
        let mut surface = MockSurface::new(8, 8);
        let mut scheduler = MockScheduler::default();
        let mut frame_loop = running_loop(&surface, &mut scheduler);

        surface.dropped_writes = 1;
        assert_eq!(frame_loop.tick(&mut surface, &mut scheduler), TickOutcome::Dropped);
        assert_eq!(frame_loop.state(), LoopState::Running);
        assert_eq!(frame_loop.phase(), 0);
        assert_eq!(scheduler.requests, 2);
        assert!(surface.written.is_empty());

        match frame_loop.tick(&mut surface, &mut scheduler) {
            TickOutcome::Rendered { phase, .. } => assert_eq!(phase, 0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(scheduler.requests, 3);
        assert_eq!(surface.written.len(), 1);
    }

    #[test]
    fn write_failure_stops_loop() {
        struct BrokenSurface;

        impl Surface for BrokenSurface {
            fn size(&self) -> Option<(u32, u32)> {
                Some((4, 4))
            }

            fn read_frame(&mut self, frame: &mut FrameBuffer) -> Result<(), SurfaceError> {
                frame.fill(Rgba8::WHITE);
                Ok(())
            }

            fn write_frame(&mut self, _frame: &FrameBuffer) -> Result<(), SurfaceError> {
                Err(SurfaceError::Other("device lost".to_string()))
            }

            fn set_global_alpha(&mut self, _alpha: f32) {}
        }

        let mut surface = BrokenSurface;
        let mut scheduler = MockScheduler::default();
        let mut frame_loop =
            FrameLoop::new(EffectSettings::default(), StdRng::seed_from_u64(5)).unwrap();
        assert!(frame_loop.attach(&surface, &mut scheduler));

        assert_eq!(frame_loop.tick(&mut surface, &mut scheduler), TickOutcome::Stopped);
        assert_eq!(frame_loop.state(), LoopState::Idle);
        assert_eq!(scheduler.requests, 1);
    }

    #[test]
    fn resize_reallocates_buffers() {
        let mut surface = MockSurface::new(8, 8);
        let mut scheduler = MockScheduler::default();
        let mut frame_loop = running_loop(&surface, &mut scheduler);
        frame_loop.tick(&mut surface, &mut scheduler);

        surface.size = Some((12, 5));
        frame_loop.tick(&mut surface, &mut scheduler);

        assert_eq!(surface.written[0].size(), (8, 8));
        assert_eq!(surface.written[1].size(), (12, 5));
        assert_eq!(frame_loop.pipeline().size(), Some((12, 5)));
    }

    #[test]
    fn midpoint_random_gives_unit_flicker() {
        let mut surface = MockSurface::new(4, 4);
        let mut scheduler = MockScheduler::default();
        let mut frame_loop = FrameLoop::new(EffectSettings::default(), Midpoint).unwrap();
        assert!(frame_loop.attach(&surface, &mut scheduler));

        match frame_loop.tick(&mut surface, &mut scheduler) {
            TickOutcome::Rendered { flicker, .. } => assert!((flicker - 1.0).abs() < 1e-6),
            other => panic!("unexpected {other:?}"),
        }
    }
}
