// ABOUTME: Flicker modulator - per-frame global brightness scalar.
// ABOUTME: Hosts apply it as a compositing alpha or bake it into the colors.

use crt_core::clamp_channel;

use crate::{FrameBuffer, RandomSource};

pub const FLICKER_MIN: f32 = 0.98;
pub const FLICKER_SPAN: f32 = 0.04;
pub const FLICKER_MAX: f32 = FLICKER_MIN + FLICKER_SPAN;

/// Draw this frame's brightness scalar in [0.98, 1.02]
#[inline]
pub fn sample_flicker<R: RandomSource + ?Sized>(rng: &mut R) -> f32 {
    (FLICKER_MIN + rng.next_unit() * FLICKER_SPAN).clamp(FLICKER_MIN, FLICKER_MAX)
}

/// Multiply RGB by `flicker` in place, for hosts without a compositing alpha
pub fn bake_flicker(buffer: &mut FrameBuffer, flicker: f32) {
    for px in buffer.pixels_mut() {
        px.r = clamp_channel(px.r as f32 * flicker);
        px.g = clamp_channel(px.g as f32 * flicker);
        px.b = clamp_channel(px.b as f32 * flicker);
    }
}
