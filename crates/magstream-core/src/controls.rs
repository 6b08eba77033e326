//! Cross-thread control block shared between the host and the capture loop.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Discrete zoom multiplier levels selectable at runtime (flex mode).
///
/// Level 1 is the configured zoom unchanged; each step adds 0.25 up to 3x.
pub const ZOOM_MULTIPLIER_LEVELS: [f64; 9] =
    [1.0, 1.25, 1.5, 1.75, 2.0, 2.25, 2.5, 2.75, 3.0];

/// Map a 1-based multiplier level to its value, if in range.
pub fn multiplier_for_level(level: u8) -> Option<f64> {
    ZOOM_MULTIPLIER_LEVELS.get(level.checked_sub(1)? as usize).copied()
}

/// Shared state between the controlling (window) thread and the capture
/// loop thread.
///
/// The host mutates, the loop reads once per tick. There is no other
/// shared mutable state: device handles and pixel buffers are owned
/// exclusively by the capture thread.
#[derive(Debug)]
pub struct EngineControls {
    /// Cooperative cancellation: the loop finishes its current tick and
    /// then exits.
    running: AtomicBool,

    /// Pause flag, only consulted in flex mode.
    paused: AtomicBool,

    /// Runtime zoom multiplier (flex mode). A mutex rather than an atomic
    /// because it is a float; reads still see a single consistent value.
    multiplier: Mutex<f64>,
}

impl EngineControls {
    /// New control block: running, not paused, multiplier 1.0.
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            multiplier: Mutex::new(1.0),
        }
    }

    /// Whether the capture loop should keep ticking.
    pub fn should_run(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the capture loop to stop after its current tick.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether presentation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Set the pause flag.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Flip the pause flag, returning the new value.
    pub fn toggle_paused(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    /// Current zoom multiplier snapshot.
    pub fn multiplier(&self) -> f64 {
        *self.multiplier.lock()
    }

    /// Replace the zoom multiplier.
    pub fn set_multiplier(&self, value: f64) {
        *self.multiplier.lock() = value;
    }
}

impl Default for EngineControls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running_unpaused() {
        let controls = EngineControls::new();
        assert!(controls.should_run());
        assert!(!controls.is_paused());
        assert_eq!(controls.multiplier(), 1.0);
    }

    #[test]
    fn stop_request_is_sticky() {
        let controls = EngineControls::new();
        controls.request_stop();
        assert!(!controls.should_run());
        assert!(!controls.should_run());
    }

    #[test]
    fn toggle_paused_returns_new_state() {
        let controls = EngineControls::new();
        assert!(controls.toggle_paused());
        assert!(controls.is_paused());
        assert!(!controls.toggle_paused());
        assert!(!controls.is_paused());
    }

    #[test]
    fn multiplier_levels_are_ordered() {
        assert_eq!(multiplier_for_level(1), Some(1.0));
        assert_eq!(multiplier_for_level(5), Some(2.0));
        assert_eq!(multiplier_for_level(9), Some(3.0));
        assert_eq!(multiplier_for_level(0), None);
        assert_eq!(multiplier_for_level(10), None);

        for pair in ZOOM_MULTIPLIER_LEVELS.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn multiplier_roundtrips() {
        let controls = EngineControls::new();
        controls.set_multiplier(2.5);
        assert_eq!(controls.multiplier(), 2.5);
    }
}
