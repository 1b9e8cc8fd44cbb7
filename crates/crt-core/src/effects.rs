// ABOUTME: CRT visual effect parameters.
// ABOUTME: Controls scanlines, static noise, barrel curvature, sampling and flicker.

use serde::{Deserialize, Serialize};

/// How the barrel pass reads the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// Nearest source pixel - fastest, blocky at strong curvature
    #[default]
    Nearest,
    /// Weighted blend of the four surrounding pixels
    Bilinear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    /// Base opacity of the dark scanline bands (0.0 = none)
    pub scanline_intensity: f32,

    /// Peak-to-peak random noise added to each color channel, in 8-bit units
    pub noise_intensity: f32,

    /// Radial curvature coefficient k (positive = barrel, negative = pincushion)
    pub distortion_strength: f64,

    /// Sampling used by the barrel distortion pass
    pub sample_mode: SampleMode,

    /// Randomly modulate frame brightness between 0.98 and 1.02
    pub flicker_enabled: bool,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            scanline_intensity: 0.3,
            noise_intensity: 25.0,
            distortion_strength: 0.000_000_07,
            sample_mode: SampleMode::Nearest,
            flicker_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("scanline_intensity must be a finite value >= 0, got {0}")]
    ScanlineIntensity(f32),

    #[error("noise_intensity must be a finite value >= 0, got {0}")]
    NoiseIntensity(f32),

    #[error("distortion_strength must be finite, got {0}")]
    DistortionStrength(f64),
}

impl EffectSettings {
    /// Everything off: the pipeline becomes a plain copy of the input
    pub fn passthrough() -> Self {
        Self {
            scanline_intensity: 0.0,
            noise_intensity: 0.0,
            distortion_strength: 0.0,
            sample_mode: SampleMode::Nearest,
            flicker_enabled: false,
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.scanline_intensity.is_finite() || self.scanline_intensity < 0.0 {
            return Err(SettingsError::ScanlineIntensity(self.scanline_intensity));
        }
        if !self.noise_intensity.is_finite() || self.noise_intensity < 0.0 {
            return Err(SettingsError::NoiseIntensity(self.noise_intensity));
        }
        if !self.distortion_strength.is_finite() {
            return Err(SettingsError::DistortionStrength(self.distortion_strength));
        }
        Ok(())
    }
}
