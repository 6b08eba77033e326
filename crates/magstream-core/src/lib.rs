//! Shared types for the magstream capture engine.
//!
//! This crate defines the validated capture configuration, the cross-thread
//! control block shared between the window host and the capture loop, and
//! the terminal status the loop reports back to its host.

mod config;
mod controls;
mod status;

pub use config::{Behaviour, CaptureConfig, ConfigError};
pub use controls::{multiplier_for_level, EngineControls, ZOOM_MULTIPLIER_LEVELS};
pub use status::CaptureStatus;
