// ABOUTME: 8-bit RGBA pixel representation shared by every pass.
// ABOUTME: Provides saturating channel helpers and the off-screen "void" color.

use bytemuck::{Pod, Zeroable};

/// One pixel of a frame buffer, laid out exactly as packed RGBA8 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque black written wherever the curved screen does not reach
    pub const VOID: Self = Self::rgb(0, 0, 0);

    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Fully transparent
    pub const CLEAR: Self = Self::rgba(0, 0, 0, 0);
}

/// Round a floating-point channel value and clamp it into 0..=255.
///
/// NaN maps to 0 so a bad sample can never wrap around.
#[inline]
pub fn clamp_channel(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}
