//! The magstream capture loop.
//!
//! This crate owns the per-tick engine: the zoom/crop policy, the overlay
//! contract, and the scheduler that drives a [`FrameSource`] and a
//! [`FramePresenter`] at the configured cadence until cancellation or a
//! fatal outcome.
//!
//! The loop is generic over its source and presenter so the whole state
//! machine runs under test with in-memory fakes; the Windows DXGI source
//! and GDI presenter plug in from the outside.

pub mod overlay;
pub mod scheduler;
pub mod zoom;

pub use overlay::{overlay_for_behaviour, OverlayContext, OverlayError, OverlayFn};
pub use scheduler::run_loop;

use magstream_capture::PresentationBuffer;
use thiserror::Error;

/// A presentation target failure.
///
/// Not part of the terminal outcome taxonomy: the loop logs it and moves
/// on, since the window may simply be mid-destruction.
#[derive(Debug, Error)]
#[error("presentation failed: {0}")]
pub struct PresentError(pub String);

/// A sink that shows the presentation buffer to the user, scaled to the
/// configured display size.
pub trait FramePresenter {
    /// Blit `buffer` to the display surface.
    fn present(&mut self, buffer: &PresentationBuffer) -> Result<(), PresentError>;

    /// Show a blank (cleared) frame; used while paused.
    fn present_blank(&mut self) -> Result<(), PresentError>;
}
