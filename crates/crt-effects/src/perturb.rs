// ABOUTME: Color perturbation pass - static noise plus chromatic aberration.
// ABOUTME: Both terms are summed per channel and clamped once, so they commute.

use crt_core::clamp_channel;

use crate::{FrameBuffer, RandomSource};

/// Peak channel shift of the aberration wave, in 8-bit units
pub const ABERRATION_AMPLITUDE: f64 = 5.0;

/// Byte-offset period divisor of the aberration wave
pub const ABERRATION_PERIOD: f64 = 100.0;

/// Deterministic channel separation for the pixel at `pixel_index`.
///
/// The wave runs over the packed byte offset of the pixel's red channel, so
/// it advances four steps per pixel. Red and blue get `+d`, green gets `-d`.
#[inline]
pub fn aberration_offset(pixel_index: usize) -> f32 {
    let byte_index = (pixel_index * 4) as f64;
    ((byte_index / ABERRATION_PERIOD).sin() * ABERRATION_AMPLITUDE) as f32
}

/// One uniform noise sample in [-amplitude/2, amplitude/2)
#[inline]
pub fn noise_sample<R: RandomSource + ?Sized>(rng: &mut R, amplitude: f32) -> f32 {
    rng.next_unit() * amplitude - amplitude / 2.0
}

/// Add per-pixel noise and channel separation to every RGB sample.
///
/// Alpha is left alone. With `noise_amplitude == 0` no random values are
/// drawn and the pass is fully deterministic.
pub fn apply_color_perturbation<R: RandomSource + ?Sized>(
    buffer: &mut FrameBuffer,
    noise_amplitude: f32,
    rng: &mut R,
) {
    let noisy = noise_amplitude > 0.0;

    for (index, px) in buffer.pixels_mut().iter_mut().enumerate() {
        let noise = if noisy {
            noise_sample(rng, noise_amplitude)
        } else {
            0.0
        };
        let shift = aberration_offset(index);

        px.r = clamp_channel(px.r as f32 + noise + shift);
        px.g = clamp_channel(px.g as f32 + noise - shift);
        px.b = clamp_channel(px.b as f32 + noise + shift);
    }
}
