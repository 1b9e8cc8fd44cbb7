// ABOUTME: Shared types and configuration for crt-mask.
// ABOUTME: Defines the RGBA pixel, effect settings, and config file handling.

pub mod color;
pub mod config;
pub mod effects;

pub use color::{clamp_channel, Rgba8};
pub use config::{Config, ConfigError, WindowSettings};
pub use effects::{EffectSettings, SampleMode, SettingsError};
