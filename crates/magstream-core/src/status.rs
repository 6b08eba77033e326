//! Terminal outcome of a capture run.

/// How a capture run ended.
///
/// The capture thread returns exactly one of these; the host turns it into
/// a user-visible message and the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// The loop exited because cancellation was requested.
    Success,

    /// Device, duplication, or buffer setup failed. Never retried: partial
    /// GPU resource state is not safely resumable.
    InitFailure,

    /// The duplication source was invalidated mid-run (resolution change,
    /// desktop switch, secure desktop). The stale handles cannot be reused.
    AccessLost,

    /// The overlay callback failed; the frame may be corrupted, so the
    /// loop stops rather than presenting it.
    OverlayError,
}

impl CaptureStatus {
    /// Whether the run ended cleanly.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Process exit code for this outcome.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::InitFailure => 1,
            Self::AccessLost => 2,
            Self::OverlayError => 3,
        }
    }

    /// User-facing description of a failed run.
    pub fn message(self) -> &'static str {
        match self {
            Self::Success => "",
            Self::InitFailure => "Capture initialization failed.",
            Self::AccessLost => "Capture access was lost.",
            Self::OverlayError => "Overlay callback failed.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let statuses = [
            CaptureStatus::Success,
            CaptureStatus::InitFailure,
            CaptureStatus::AccessLost,
            CaptureStatus::OverlayError,
        ];
        for (i, a) in statuses.iter().enumerate() {
            for b in &statuses[i + 1..] {
                assert_ne!(a.exit_code(), b.exit_code());
            }
        }
    }

    #[test]
    fn only_success_is_success() {
        assert!(CaptureStatus::Success.is_success());
        assert_eq!(CaptureStatus::Success.exit_code(), 0);
        assert!(!CaptureStatus::AccessLost.is_success());
        assert!(!CaptureStatus::AccessLost.message().is_empty());
    }
}
