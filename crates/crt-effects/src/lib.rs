// ABOUTME: CPU frame pipeline for the CRT screen effect.
// ABOUTME: Scanlines, noise, chromatic aberration, barrel distortion and flicker.

pub mod barrel;
mod buffer;
pub mod flicker;
pub mod frame_loop;
pub mod perturb;
mod pipeline;
mod random;
pub mod scanline;

pub use barrel::BarrelMap;
pub use buffer::{BufferError, FrameBuffer};
pub use frame_loop::{FrameLoop, FrameScheduler, LoopState, Surface, SurfaceError, TickOutcome};
pub use pipeline::{FramePipeline, RenderedFrame};
pub use random::{rng_from_seed, RandomSource};
