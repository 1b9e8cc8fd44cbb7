// ABOUTME: Barrel distortion pass - inverse radial lens mapping.
// ABOUTME: Precomputes a per-pixel source lookup and applies it row-parallel.

use crt_core::{clamp_channel, Rgba8, SampleMode};
use rayon::prelude::*;

use crate::{BufferError, FrameBuffer};

/// Where a destination pixel reads from
#[derive(Debug, Clone, Copy, PartialEq)]
struct MapEntry {
    /// Pixel index of the rounded source coordinate, `VOID_INDEX` if off-screen
    index: u32,
    /// Unrounded source coordinate, only read for bilinear sampling
    fx: f32,
    fy: f32,
}

const VOID_INDEX: u32 = u32::MAX;

impl MapEntry {
    const VOID: Self = Self {
        index: VOID_INDEX,
        fx: 0.0,
        fy: 0.0,
    };
}

/// Distortion center for a buffer of the given size
#[inline]
pub fn distortion_center(width: u32, height: u32) -> (f64, f64) {
    (width as f64 / 2.0, height as f64 / 2.0)
}

/// Inverse-map a destination coordinate into source space.
///
/// r' = r * (1 + k * r^2), measured from `center`. At r = 0 the point maps to
/// itself for every k.
#[inline]
pub fn source_coordinate(x: f64, y: f64, center: (f64, f64), k: f64) -> (f64, f64) {
    let (cx, cy) = center;
    let dx = x - cx;
    let dy = y - cy;

    let r = (dx * dx + dy * dy).sqrt();
    let theta = dy.atan2(dx);
    let distorted_r = r * (1.0 + k * r * r);

    (
        cx + distorted_r * theta.cos(),
        cy + distorted_r * theta.sin(),
    )
}

/// Round half toward positive infinity
#[inline]
pub fn round_half_up(v: f64) -> f64 {
    (v + 0.5).floor()
}

/// Precomputed inverse mapping for one geometry and coefficient
#[derive(Debug, Clone)]
pub struct BarrelMap {
    width: u32,
    height: u32,
    k: f64,
    entries: Vec<MapEntry>,
}

impl BarrelMap {
    pub fn new(width: u32, height: u32, k: f64) -> Result<Self, BufferError> {
        if width == 0 || height == 0 {
            return Err(BufferError::ZeroSize { width, height });
        }
        let count = (width as usize)
            .checked_mul(height as usize)
            .filter(|&n| n < VOID_INDEX as usize)
            .ok_or(BufferError::TooLarge { width, height })?;

        let center = distortion_center(width, height);
        let mut entries = vec![MapEntry::VOID; count];

        entries
            .par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, entry) in row.iter_mut().enumerate() {
                    let (sx, sy) = source_coordinate(x as f64, y as f64, center, k);
                    let src_x = round_half_up(sx);
                    let src_y = round_half_up(sy);

                    if src_x >= 0.0 && src_x < width as f64 && src_y >= 0.0 && src_y < height as f64 {
                        *entry = MapEntry {
                            index: src_y as u32 * width + src_x as u32,
                            fx: sx as f32,
                            fy: sy as f32,
                        };
                    }
                }
            });

        Ok(Self {
            width,
            height,
            k,
            entries,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True if this map was built for the given geometry and coefficient
    pub fn matches(&self, width: u32, height: u32, k: f64) -> bool {
        self.width == width && self.height == height && self.k == k
    }

    /// Source pixel index for destination (x, y), None for void pixels
    pub fn source_index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let entry = self.entries[y as usize * self.width as usize + x as usize];
        (entry.index != VOID_INDEX).then_some(entry.index as usize)
    }

    /// Resample `src` into `dst`. Every destination pixel is written once.
    pub fn apply(
        &self,
        src: &FrameBuffer,
        dst: &mut FrameBuffer,
        mode: SampleMode,
    ) -> Result<(), BufferError> {
        if src.size() != self.size() {
            return Err(BufferError::SizeMismatch(self.size(), src.size()));
        }
        if dst.size() != self.size() {
            return Err(BufferError::SizeMismatch(self.size(), dst.size()));
        }

        let width = self.width as usize;
        let source = src.pixels();

        dst.pixels_mut()
            .par_chunks_mut(width)
            .zip(self.entries.par_chunks(width))
            .for_each(|(row, entries)| {
                for (px, entry) in row.iter_mut().zip(entries) {
                    *px = if entry.index == VOID_INDEX {
                        Rgba8::VOID
                    } else {
                        match mode {
                            SampleMode::Nearest => source[entry.index as usize],
                            SampleMode::Bilinear => {
                                sample_bilinear(source, self.width, self.height, entry.fx, entry.fy)
                            }
                        }
                    };
                }
            });

        Ok(())
    }
}

/// Blend the four pixels around (fx, fy), clamping taps to the buffer edge
fn sample_bilinear(source: &[Rgba8], width: u32, height: u32, fx: f32, fy: f32) -> Rgba8 {
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;

    let x_floor = fx.floor();
    let y_floor = fy.floor();
    let tx = (fx - x_floor).clamp(0.0, 1.0);
    let ty = (fy - y_floor).clamp(0.0, 1.0);

    let x0 = x_floor.clamp(0.0, max_x) as usize;
    let y0 = y_floor.clamp(0.0, max_y) as usize;
    let x1 = (x_floor + 1.0).clamp(0.0, max_x) as usize;
    let y1 = (y_floor + 1.0).clamp(0.0, max_y) as usize;

    let w = width as usize;
    let p00 = source[y0 * w + x0];
    let p10 = source[y0 * w + x1];
    let p01 = source[y1 * w + x0];
    let p11 = source[y1 * w + x1];

    let lerp = |a: u8, b: u8, t: f32| a as f32 + (b as f32 - a as f32) * t;
    let channel = |c00: u8, c10: u8, c01: u8, c11: u8| {
        let top = lerp(c00, c10, tx);
        let bottom = lerp(c01, c11, tx);
        clamp_channel(top + (bottom - top) * ty)
    };

    Rgba8 {
        r: channel(p00.r, p10.r, p01.r, p11.r),
        g: channel(p00.g, p10.g, p01.g, p11.g),
        b: channel(p00.b, p10.b, p01.b, p11.b),
        a: channel(p00.a, p10.a, p01.a, p11.a),
    }
}

/// One-shot distortion without keeping the lookup table around
pub fn apply_barrel_distortion(
    src: &FrameBuffer,
    dst: &mut FrameBuffer,
    k: f64,
    mode: SampleMode,
) -> Result<(), BufferError> {
    let map = BarrelMap::new(src.width(), src.height(), k)?;
    map.apply(src, dst, mode)
}
