// ABOUTME: Content shown underneath the CRT effect.
// ABOUTME: Either a loaded image scaled to the surface or a generated test pattern.

use std::path::Path;

use crt_core::Rgba8;
use crt_effects::FrameBuffer;
use image::imageops::FilterType;
use image::RgbaImage;

/// Classic seven colour bars
const BARS: [Rgba8; 7] = [
    Rgba8::rgb(192, 192, 192),
    Rgba8::rgb(192, 192, 0),
    Rgba8::rgb(0, 192, 192),
    Rgba8::rgb(0, 192, 0),
    Rgba8::rgb(192, 0, 192),
    Rgba8::rgb(192, 0, 0),
    Rgba8::rgb(0, 0, 192),
];

pub enum Content {
    TestPattern,
    Image {
        original: RgbaImage,
        /// Last scaled copy, reused while the surface size is unchanged
        scaled: Option<FrameBuffer>,
    },
}

impl Content {
    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        let original = image::open(path)?.to_rgba8();
        tracing::info!(
            "Loaded {} ({}x{})",
            path.display(),
            original.width(),
            original.height()
        );
        Ok(Self::from_image(original))
    }

    pub fn from_image(original: RgbaImage) -> Self {
        Self::Image {
            original,
            scaled: None,
        }
    }

    /// Draw the content at `frame`'s size
    pub fn fill(&mut self, frame: &mut FrameBuffer) {
        match self {
            Content::TestPattern => draw_test_pattern(frame),
            Content::Image { original, scaled } => {
                let stale = scaled.as_ref().map(|s| s.size()) != Some(frame.size());
                if stale {
                    *scaled = scale_to(original, frame.width(), frame.height());
                }
                match scaled {
                    Some(image) => {
                        if let Err(e) = frame.copy_from(image) {
                            tracing::debug!("Scaled content not usable: {}", e);
                            frame.fill(Rgba8::BLACK);
                        }
                    }
                    None => frame.fill(Rgba8::BLACK),
                }
            }
        }
    }
}

fn scale_to(original: &RgbaImage, width: u32, height: u32) -> Option<FrameBuffer> {
    let resized = if original.dimensions() == (width, height) {
        original.clone()
    } else {
        image::imageops::resize(original, width, height, FilterType::Triangle)
    };
    FrameBuffer::from_rgba(width, height, resized.into_raw()).ok()
}

/// Colour bars over the top two thirds, a grey ramp below
fn draw_test_pattern(frame: &mut FrameBuffer) {
    let (width, height) = frame.size();
    let bars_end = height * 2 / 3;

    for y in 0..height {
        for x in 0..width {
            let color = if y < bars_end {
                BARS[(x as usize * BARS.len()) / width as usize]
            } else {
                let v = ((x as u64 * 255) / (width.max(2) - 1) as u64) as u8;
                Rgba8::rgb(v, v, v)
            };
            frame.set(x, y, color);
        }
    }
}
