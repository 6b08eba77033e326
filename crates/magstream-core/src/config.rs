//! Capture configuration loaded from a TOML file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML or is missing required keys.
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but a value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Overlay/runtime behaviour selected by the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behaviour {
    /// Plain magnification, no overlay, fixed zoom.
    #[default]
    None,

    /// Draw centre crosshairs on every presented frame.
    Crosshairs,

    /// Interactive mode: pause toggle and runtime zoom multiplier.
    Flex,
}

/// Validated capture configuration.
///
/// All fields come from the TOML config file; [`CaptureConfig::load`]
/// rejects any configuration that the engine could not run with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Presented window width in pixels.
    pub display_width: u32,

    /// Presented window height in pixels.
    pub display_height: u32,

    /// Declared capture intent width (informational).
    pub record_width: u32,

    /// Declared capture intent height (informational).
    pub record_height: u32,

    /// Magnification factor. The captured region is `display / zoom`.
    pub zoom_factor: f64,

    /// Presentation cadence in frames per second.
    pub frames_per_second: f64,

    /// Selected behaviour.
    #[serde(default)]
    pub behaviour: Behaviour,
}

impl CaptureConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every startup invariant the capture loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display_width == 0 {
            return Err(ConfigError::Invalid("display_width must be > 0".into()));
        }
        if self.display_height == 0 {
            return Err(ConfigError::Invalid("display_height must be > 0".into()));
        }
        if self.record_width == 0 {
            return Err(ConfigError::Invalid("record_width must be > 0".into()));
        }
        if self.record_height == 0 {
            return Err(ConfigError::Invalid("record_height must be > 0".into()));
        }
        if !self.zoom_factor.is_finite() || self.zoom_factor <= 0.0 {
            return Err(ConfigError::Invalid(
                "zoom_factor must be a finite number > 0".into(),
            ));
        }
        if !self.frames_per_second.is_finite() || self.frames_per_second <= 0.0 {
            return Err(ConfigError::Invalid(
                "frames_per_second must be a finite number > 0".into(),
            ));
        }

        // The statically derived capture region must be at least one pixel
        // on each axis or there is nothing to magnify.
        let capture_width = (self.display_width as f64 / self.zoom_factor) as u32;
        let capture_height = (self.display_height as f64 / self.zoom_factor) as u32;
        if capture_width < 1 || capture_height < 1 {
            return Err(ConfigError::Invalid(
                "computed capture dimensions must be at least 1x1; \
                 adjust display size or zoom_factor"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Fixed tick interval, derived once per run.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frames_per_second)
    }
}
