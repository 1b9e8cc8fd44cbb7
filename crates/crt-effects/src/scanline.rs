// ABOUTME: Scanline pass - darkens periodic horizontal bands.
// ABOUTME: Band opacity follows a sine of row plus animation phase.

use crt_core::{clamp_channel, Rgba8};

use crate::FrameBuffer;

/// Rows between the start of consecutive bands
pub const BAND_SPACING: u32 = 4;

/// Rows covered by each band
pub const BAND_HEIGHT: u32 = 2;

/// Angular frequency of the opacity wobble, per row
pub const PHASE_FREQUENCY: f64 = 0.05;

/// Wobble amplitude for the pass that runs before distortion
pub const PRE_DISTORTION_AMPLITUDE: f32 = 0.2;

/// Wobble amplitude for the overlay drawn on top of the curved image
pub const POST_DISTORTION_AMPLITUDE: f32 = 0.1;

/// Unclamped band opacity for the band starting at `row`
#[inline]
pub fn scanline_opacity(row: u32, phase: u64, intensity: f32, amplitude: f32) -> f32 {
    let angle = (row as f64 + phase as f64) * PHASE_FREQUENCY;
    intensity + amplitude * angle.sin() as f32
}

/// Composite black with `alpha` over `px` (source-over)
#[inline]
fn darken(px: &mut Rgba8, alpha: f32) {
    let keep = 1.0 - alpha;
    px.r = clamp_channel(px.r as f32 * keep);
    px.g = clamp_channel(px.g as f32 * keep);
    px.b = clamp_channel(px.b as f32 * keep);
    px.a = clamp_channel(alpha * 255.0 + px.a as f32 * keep);
}

/// Draw every scanline band into `buffer`.
///
/// Opacity is clamped to [0, 1] like a canvas fill; bands that come out fully
/// transparent are skipped.
pub fn apply_scanlines(buffer: &mut FrameBuffer, phase: u64, intensity: f32, amplitude: f32) {
    let width = buffer.width() as usize;
    let height = buffer.height();
    let pixels = buffer.pixels_mut();

    for band_start in (0..height).step_by(BAND_SPACING as usize) {
        let alpha = scanline_opacity(band_start, phase, intensity, amplitude).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            continue;
        }
        let band_end = (band_start + BAND_HEIGHT).min(height);
        let rows = band_start as usize * width..band_end as usize * width;
        for px in &mut pixels[rows] {
            darken(px, alpha);
        }
    }
}
