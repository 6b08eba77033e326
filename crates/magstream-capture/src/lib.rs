//! Desktop frame acquisition for magstream.
//!
//! The real implementation ([`DxgiFrameSource`]) wraps the DXGI desktop
//! duplication pipeline and is only compiled on Windows; the engine runs
//! against the [`FrameSource`] trait so its loop is testable anywhere.

mod buffer;
mod error;
mod region;

#[cfg(target_os = "windows")]
mod dxgi;

pub use buffer::PresentationBuffer;
pub use error::CaptureError;
pub use region::{CaptureRegion, DesktopExtent};

#[cfg(target_os = "windows")]
pub use dxgi::DxgiFrameSource;

use std::time::Duration;

/// Bounded wait for the next desktop frame.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_millis(100);

/// Result type for capture setup.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Per-tick result of one acquisition attempt.
///
/// Consumed immediately by the capture loop; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A fresh frame was copied into the presentation buffer.
    Delivered,

    /// No new frame within the timeout. The previous buffer stays valid
    /// and the window keeps showing it.
    Timeout,

    /// The duplication source was invalidated; the run cannot continue.
    AccessLost,

    /// A transient acquisition or mapping failure. Treated like a timeout
    /// by the loop so one driver hiccup does not tear the pipeline down.
    Error,
}

/// A source of desktop frames.
pub trait FrameSource {
    /// Size of the duplicated output, discovered once at startup.
    fn desktop_extent(&self) -> DesktopExtent;

    /// Wait up to `timeout` for the next frame and copy `region` of it
    /// into `buffer`.
    ///
    /// The caller guarantees `region` fits the desktop extent and that
    /// `buffer` is sized to `region`.
    fn acquire_into(
        &mut self,
        region: &CaptureRegion,
        buffer: &mut PresentationBuffer,
        timeout: Duration,
    ) -> FrameOutcome;
}
