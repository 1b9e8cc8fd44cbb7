// ABOUTME: Frame effect pipeline - runs every pass for one frame.
// ABOUTME: Owns the reusable source/destination buffers and the barrel lookup.

use crt_core::{EffectSettings, SettingsError};

use crate::barrel::BarrelMap;
use crate::flicker::sample_flicker;
use crate::perturb::apply_color_perturbation;
use crate::scanline::{apply_scanlines, POST_DISTORTION_AMPLITUDE, PRE_DISTORTION_AMPLITUDE};
use crate::{BufferError, FrameBuffer, RandomSource};

/// Buffers sized for the current geometry
struct Frames {
    /// Host content, then scanlines and perturbation in place
    source: FrameBuffer,
    /// Barrel output plus the post-distortion scanlines
    destination: FrameBuffer,
    map: BarrelMap,
}

/// Result of one pipeline run
pub struct RenderedFrame<'a> {
    pub frame: &'a FrameBuffer,
    /// Global brightness / alpha modifier for presenting `frame`
    pub flicker: f32,
}

pub struct FramePipeline {
    settings: EffectSettings,
    frames: Option<Frames>,
}

impl FramePipeline {
    pub fn new(settings: EffectSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            settings,
            frames: None,
        })
    }

    /// Current buffer geometry, None before the first `prepare`
    pub fn size(&self) -> Option<(u32, u32)> {
        self.frames.as_ref().map(|f| f.source.size())
    }

    /// Make sure buffers match the given geometry.
    ///
    /// Returns true when buffers were (re)allocated. Stale buffers are never
    /// reused across a size change.
    pub fn prepare(&mut self, width: u32, height: u32) -> Result<bool, BufferError> {
        if self.size() == Some((width, height)) {
            return Ok(false);
        }

        let map = BarrelMap::new(width, height, self.settings.distortion_strength)?;
        self.frames = Some(Frames {
            source: FrameBuffer::new(width, height)?,
            destination: FrameBuffer::new(width, height)?,
            map,
        });
        Ok(true)
    }

    /// Drop all buffers, e.g. when the surface goes away
    pub fn release(&mut self) {
        self.frames = None;
    }

    /// Buffer the host fills with the content under the effect
    pub fn source_mut(&mut self) -> Option<&mut FrameBuffer> {
        self.frames.as_mut().map(|f| &mut f.source)
    }

    /// Source buffer after the last render: scanlines, noise and aberration applied
    pub fn perturbed(&self) -> Option<&FrameBuffer> {
        self.frames.as_ref().map(|f| &f.source)
    }

    /// Run every pass over the prepared source buffer.
    ///
    /// Order: scanlines (0.2 wobble), noise + aberration, barrel distortion,
    /// scanlines again over the curved image (0.1 wobble), flicker.
    pub fn render<R: RandomSource + ?Sized>(
        &mut self,
        phase: u64,
        rng: &mut R,
    ) -> Result<RenderedFrame<'_>, BufferError> {
        let settings = &self.settings;
        let frames = self
            .frames
            .as_mut()
            .ok_or(BufferError::NotPrepared)?;

        apply_scanlines(
            &mut frames.source,
            phase,
            settings.scanline_intensity,
            PRE_DISTORTION_AMPLITUDE,
        );
        apply_color_perturbation(&mut frames.source, settings.noise_intensity, rng);

        frames
            .map
            .apply(&frames.source, &mut frames.destination, settings.sample_mode)?;

        apply_scanlines(
            &mut frames.destination,
            phase,
            settings.scanline_intensity,
            POST_DISTORTION_AMPLITUDE,
        );

        let flicker = if settings.flicker_enabled {
            sample_flicker(rng)
        } else {
            1.0
        };

        Ok(RenderedFrame {
            frame: &frames.destination,
            flicker,
        })
    }

    /// Prepare for `input`'s size, copy it in and render
    pub fn process<R: RandomSource + ?Sized>(
        &mut self,
        input: &FrameBuffer,
        phase: u64,
        rng: &mut R,
    ) -> Result<RenderedFrame<'_>, BufferError> {
        self.prepare(input.width(), input.height())?;
        if let Some(source) = self.source_mut() {
            source.copy_from(input)?;
        }
        self.render(phase, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barrel::apply_barrel_distortion;
    use crate::flicker::{FLICKER_MAX, FLICKER_MIN};
    use crt_core::{Rgba8, SampleMode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn quiet() -> EffectSettings {
        EffectSettings {
            scanline_intensity: 0.0,
            noise_intensity: 0.0,
            distortion_strength: 0.0,
            sample_mode: SampleMode::Nearest,
            flicker_enabled: true,
        }
    }

    fn gradient(width: u32, height: u32) -> FrameBuffer {
        let mut buffer = FrameBuffer::new(width, height).unwrap();
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 255) / width.max(1)) as u8;
                buffer.set(x, y, Rgba8::rgba(v, 255 - v, (y % 256) as u8, 255));
            }
        }
        buffer
    }

    #[test]
    fn invalid_settings_rejected() {
        let settings = EffectSettings {
            noise_intensity: -5.0,
            ..EffectSettings::default()
        };
        assert!(FramePipeline::new(settings).is_err());
    }

    #[test]
    fn render_before_prepare_fails() {
        let mut pipeline = FramePipeline::new(EffectSettings::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            pipeline.render(0, &mut rng),
            Err(BufferError::NotPrepared)
        ));

        pipeline.prepare(4, 4).unwrap();
        pipeline.release();
        assert!(matches!(
            pipeline.render(0, &mut rng),
            Err(BufferError::NotPrepared)
        ));
    }

    #[test]
    fn white_square_distortion_is_identity() {
        // 4 rows at phase 0: the only band starts at row 0 where sin(0) = 0,
        // so the post-distortion scanlines are a no-op and the output is the
        // barrel pass alone.
        let input = FrameBuffer::filled(4, 4, Rgba8::WHITE).unwrap();
        let mut pipeline = FramePipeline::new(quiet()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let output = pipeline.process(&input, 0, &mut rng).unwrap().frame.clone();
        assert_eq!(&output, pipeline.perturbed().unwrap());
    }

    #[test]
    fn matches_manual_pass_composition() {
        let settings = EffectSettings {
            noise_intensity: 0.0,
            distortion_strength: 0.0002,
            flicker_enabled: false,
            ..EffectSettings::default()
        };
        let input = gradient(48, 36);
        let phase = 17;

        let mut expected = input.clone();
        apply_scanlines(&mut expected, phase, 0.3, PRE_DISTORTION_AMPLITUDE);
        let mut rng = StdRng::seed_from_u64(0);
        apply_color_perturbation(&mut expected, 0.0, &mut rng);
        let mut distorted = FrameBuffer::new(48, 36).unwrap();
        apply_barrel_distortion(&expected, &mut distorted, 0.0002, SampleMode::Nearest).unwrap();
        apply_scanlines(&mut distorted, phase, 0.3, POST_DISTORTION_AMPLITUDE);

        let mut pipeline = FramePipeline::new(settings).unwrap();
        let rendered = pipeline.process(&input, phase, &mut rng).unwrap();
        assert_eq!(rendered.flicker, 1.0);
        assert_eq!(rendered.frame, &distorted);
    }

    #[test]
    fn same_seed_same_frame() {
        let input = gradient(32, 24);
        let mut a = FramePipeline::new(EffectSettings::default()).unwrap();
        let mut b = FramePipeline::new(EffectSettings::default()).unwrap();
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);

        let frame_a = a.process(&input, 5, &mut rng_a).unwrap();
        let (frame_a, flicker_a) = (frame_a.frame.clone(), frame_a.flicker);
        let frame_b = b.process(&input, 5, &mut rng_b).unwrap();

        assert_eq!(&frame_a, frame_b.frame);
        assert_eq!(flicker_a, frame_b.flicker);
        assert!((FLICKER_MIN..=FLICKER_MAX).contains(&flicker_a));
    }

    #[test]
    fn prepare_reallocates_on_resize_only() {
        let mut pipeline = FramePipeline::new(EffectSettings::default()).unwrap();
        assert!(pipeline.prepare(8, 8).unwrap());
        assert!(!pipeline.prepare(8, 8).unwrap());
        assert!(pipeline.prepare(16, 4).unwrap());
        assert_eq!(pipeline.size(), Some((16, 4)));
        assert!(pipeline.prepare(0, 4).is_err());

        pipeline.release();
        assert_eq!(pipeline.size(), None);
    }

    #[test]
    fn corners_go_void_under_default_curvature() {
        // Default k only bites on large screens
        let input = FrameBuffer::filled(1200, 900, Rgba8::WHITE).unwrap();
        let mut pipeline = FramePipeline::new(EffectSettings::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let rendered = pipeline.process(&input, 0, &mut rng).unwrap();

        // Row 2 is never under a scanline band
        assert_eq!(rendered.frame.get(0, 2), Some(Rgba8::VOID));
        assert_ne!(rendered.frame.get(600, 452), Some(Rgba8::VOID));
    }
}
