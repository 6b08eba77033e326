//! Error types for capture setup.

use thiserror::Error;

/// Errors raised while building the duplication pipeline.
///
/// Any of these is fatal to the whole engine run: there is no partial
/// retry of device/duplication/staging setup.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// A Windows API call failed.
    #[error("Windows API error: {message}")]
    WindowsApi {
        message: String,
        #[cfg(windows)]
        #[source]
        source: Option<windows::core::Error>,
    },

    /// Desktop duplication is not available on this platform or session.
    #[error("desktop duplication unavailable: {0}")]
    Unavailable(String),
}

#[cfg(windows)]
impl From<windows::core::Error> for CaptureError {
    fn from(err: windows::core::Error) -> Self {
        Self::WindowsApi {
            message: err.message().to_string(),
            source: Some(err),
        }
    }
}
