// ABOUTME: Application configuration handling.
// ABOUTME: Loads and saves effect settings from TOML config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::effects::SettingsError;
use crate::EffectSettings;

/// Window settings for the live preview host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 960,
            height: 720,
            title: "crt-mask".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Visual effect settings
    pub effects: EffectSettings,

    /// Preview window
    pub window: WindowSettings,

    /// Seed for the noise and flicker generator (None = seeded from the OS)
    pub seed: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Invalid effect settings: {0}")]
    Invalid(#[from] SettingsError),

    #[error("Could not determine config directory")]
    NoConfigDir,
}

impl Config {
    /// Get the default config file path (~/.config/crt-mask/config.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("crt-mask").join("config.toml"))
    }

    /// Parse and validate config text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.effects.validate()?;
        Ok(config)
    }

    /// Load config from a path
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load config from default path, or return default config if not found
    pub fn load_or_default() -> Self {
        Self::default_path()
            .and_then(|path| Self::load(&path).ok())
            .unwrap_or_default()
    }

    /// Save config to a path
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        self.effects.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save config to default path
    pub fn save_to_default(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        self.save(&path)?;
        Ok(path)
    }
}
