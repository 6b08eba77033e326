//! The capture loop: acquire, crop-copy, overlay, present, sleep.

use std::thread;

use tracing::{debug, error, info, warn};

use magstream_capture::{
    FrameOutcome, FrameSource, PresentationBuffer, ACQUIRE_TIMEOUT,
};
use magstream_core::{Behaviour, CaptureConfig, CaptureStatus, EngineControls};

use crate::overlay::{OverlayContext, OverlayFn};
use crate::zoom::region_for_zoom;
use crate::FramePresenter;

/// Consecutive soft errors (timeouts excluded) before the loop gives up
/// and reports access loss instead of spinning on a dead source forever.
pub const SOFT_FAILURE_ESCALATION: u32 = 240;

/// Run the capture loop to completion.
///
/// Ticks at the fixed interval derived from `config` until cancellation
/// is requested through `controls` or a fatal outcome occurs. In flex
/// mode the zoom multiplier and pause flag are re-read every tick; in
/// static mode the capture region is computed once up front.
///
/// Every device/buffer resource lives on this thread and is released when
/// the function returns, on every exit path.
pub fn run_loop<S: FrameSource, P: FramePresenter>(
    config: &CaptureConfig,
    controls: &EngineControls,
    source: &mut S,
    presenter: &mut P,
    mut overlay: Option<OverlayFn>,
) -> CaptureStatus {
    let interval = config.frame_interval();
    let extent = source.desktop_extent();
    let dynamic = config.behaviour == Behaviour::Flex;

    let mut buffer = PresentationBuffer::new();
    let mut region = region_for_zoom(
        extent,
        config.display_width,
        config.display_height,
        config.zoom_factor,
    );
    if !dynamic {
        buffer.ensure_sized(region.width, region.height);
    }

    info!(
        desktop_width = extent.width,
        desktop_height = extent.height,
        zoom = config.zoom_factor,
        fps = config.frames_per_second,
        dynamic,
        "capture loop starting"
    );

    let mut soft_failures: u32 = 0;

    while controls.should_run() {
        if dynamic && controls.is_paused() {
            // No acquisition while paused; just keep the window cleared.
            if let Err(e) = presenter.present_blank() {
                warn!("{e}");
            }
            thread::sleep(interval);
            continue;
        }

        if dynamic {
            let zoom = config.zoom_factor * controls.multiplier();
            region = region_for_zoom(extent, config.display_width, config.display_height, zoom);
            buffer.ensure_sized(region.width, region.height);
        }

        match source.acquire_into(&region, &mut buffer, ACQUIRE_TIMEOUT) {
            FrameOutcome::Delivered => {
                soft_failures = 0;

                if let Some(hook) = overlay.as_mut() {
                    let (width, height, stride) = (buffer.width(), buffer.height(), buffer.stride());
                    let mut ctx = OverlayContext {
                        pixels: buffer.as_mut_slice(),
                        width,
                        height,
                        stride,
                    };
                    if let Err(e) = hook(&mut ctx) {
                        error!("overlay hook failed, stopping: {e}");
                        return CaptureStatus::OverlayError;
                    }
                }

                if let Err(e) = presenter.present(&buffer) {
                    warn!("{e}");
                }
            }
            FrameOutcome::Timeout => {
                // Nothing new on screen; the window keeps showing the
                // previous frame.
                soft_failures = 0;
            }
            FrameOutcome::Error => {
                soft_failures += 1;
                debug!(streak = soft_failures, "transient acquisition failure");
                if soft_failures >= SOFT_FAILURE_ESCALATION {
                    warn!(
                        streak = soft_failures,
                        "persistent acquisition failures, treating source as lost"
                    );
                    return CaptureStatus::AccessLost;
                }
            }
            FrameOutcome::AccessLost => {
                warn!("duplication source invalidated, stopping");
                return CaptureStatus::AccessLost;
            }
        }

        thread::sleep(interval);
    }

    info!("capture loop stopped");
    CaptureStatus::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::OverlayError;
    use crate::PresentError;
    use magstream_capture::{CaptureRegion, DesktopExtent};
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    const EXTENT: DesktopExtent = DesktopExtent {
        width: 1920,
        height: 1080,
    };

    fn config(behaviour: Behaviour, zoom: f64) -> CaptureConfig {
        CaptureConfig {
            display_width: 1920,
            display_height: 1080,
            record_width: 960,
            record_height: 540,
            zoom_factor: zoom,
            frames_per_second: 2000.0, // keep test sleeps negligible
            behaviour,
        }
    }

    /// Plays back a fixed outcome script; requests cancellation once the
    /// script is exhausted. Each delivered frame fills the buffer with the
    /// next fill byte (1, 2, ...).
    struct ScriptedSource {
        script: VecDeque<FrameOutcome>,
        controls: Arc<EngineControls>,
        /// Multipliers to install after each acquire, taking effect on
        /// the following tick.
        multipliers: VecDeque<f64>,
        fill: u8,
        realloc_log: Vec<u64>,
        size_log: Vec<(u32, u32)>,
        first_byte_log: Vec<u8>,
    }

    impl ScriptedSource {
        fn new(controls: Arc<EngineControls>, script: &[FrameOutcome]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                controls,
                multipliers: VecDeque::new(),
                fill: 0,
                realloc_log: Vec::new(),
                size_log: Vec::new(),
                first_byte_log: Vec::new(),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn desktop_extent(&self) -> DesktopExtent {
            EXTENT
        }

        fn acquire_into(
            &mut self,
            region: &CaptureRegion,
            buffer: &mut PresentationBuffer,
            _timeout: Duration,
        ) -> FrameOutcome {
            assert!(region.fits(EXTENT));
            assert_eq!((buffer.width(), buffer.height()), (region.width, region.height));

            self.realloc_log.push(buffer.reallocations());
            self.size_log.push((buffer.width(), buffer.height()));
            self.first_byte_log.push(buffer.as_slice()[0]);

            let outcome = match self.script.pop_front() {
                Some(outcome) => outcome,
                None => {
                    self.controls.request_stop();
                    FrameOutcome::Timeout
                }
            };

            if outcome == FrameOutcome::Delivered {
                self.fill += 1;
                let fill = self.fill;
                buffer.as_mut_slice().fill(fill);
            }

            if let Some(multiplier) = self.multipliers.pop_front() {
                self.controls.set_multiplier(multiplier);
            }

            outcome
        }
    }

    /// Records every presented frame and blank; optionally cancels after
    /// a number of blanks so pause tests terminate.
    struct RecordingPresenter {
        controls: Arc<EngineControls>,
        presents: Vec<Vec<u8>>,
        blanks: usize,
        stop_after_blanks: Option<usize>,
    }

    impl RecordingPresenter {
        fn new(controls: Arc<EngineControls>) -> Self {
            Self {
                controls,
                presents: Vec::new(),
                blanks: 0,
                stop_after_blanks: None,
            }
        }
    }

    impl FramePresenter for RecordingPresenter {
        fn present(&mut self, buffer: &PresentationBuffer) -> Result<(), PresentError> {
            self.presents.push(buffer.as_slice().to_vec());
            Ok(())
        }

        fn present_blank(&mut self) -> Result<(), PresentError> {
            self.blanks += 1;
            if let Some(limit) = self.stop_after_blanks {
                if self.blanks >= limit {
                    self.controls.request_stop();
                }
            }
            Ok(())
        }
    }

    #[test]
    fn static_mode_presents_each_delivered_frame() {
        let controls = Arc::new(EngineControls::new());
        let cfg = config(Behaviour::None, 2.0);
        let mut source = ScriptedSource::new(
            controls.clone(),
            &[FrameOutcome::Delivered, FrameOutcome::Delivered],
        );
        let mut presenter = RecordingPresenter::new(controls.clone());

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, None);

        assert_eq!(status, CaptureStatus::Success);
        assert_eq!(presenter.presents.len(), 2);
        // 1920x1080 at 2.0x -> 960x540 region, allocated exactly once.
        assert!(source.size_log.iter().all(|&s| s == (960, 540)));
        assert!(source.realloc_log.iter().all(|&n| n == 1));
    }

    #[test]
    fn timeout_keeps_previous_frame_and_loop_alive() {
        let controls = Arc::new(EngineControls::new());
        let cfg = config(Behaviour::None, 2.0);
        let mut source = ScriptedSource::new(
            controls.clone(),
            &[
                FrameOutcome::Delivered,
                FrameOutcome::Timeout,
                FrameOutcome::Delivered,
            ],
        );
        let mut presenter = RecordingPresenter::new(controls.clone());

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, None);

        assert_eq!(status, CaptureStatus::Success);
        // The timeout tick presents nothing and leaves pixels untouched:
        // the tick after it still observes the first frame's fill byte.
        assert_eq!(presenter.presents.len(), 2);
        assert_eq!(source.first_byte_log, vec![0, 1, 1, 2]);
        assert!(presenter.presents[0].iter().all(|&b| b == 1));
        assert!(presenter.presents[1].iter().all(|&b| b == 2));
    }

    #[test]
    fn access_lost_terminates_with_its_outcome() {
        let controls = Arc::new(EngineControls::new());
        let cfg = config(Behaviour::None, 2.0);
        let mut source = ScriptedSource::new(
            controls.clone(),
            &[FrameOutcome::Delivered, FrameOutcome::AccessLost],
        );
        let mut presenter = RecordingPresenter::new(controls.clone());

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, None);

        assert_eq!(status, CaptureStatus::AccessLost);
        assert_eq!(presenter.presents.len(), 1);
    }

    #[test]
    fn isolated_soft_errors_are_absorbed() {
        let controls = Arc::new(EngineControls::new());
        let cfg = config(Behaviour::None, 2.0);
        let mut source = ScriptedSource::new(
            controls.clone(),
            &[
                FrameOutcome::Error,
                FrameOutcome::Error,
                FrameOutcome::Delivered,
            ],
        );
        let mut presenter = RecordingPresenter::new(controls.clone());

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, None);

        assert_eq!(status, CaptureStatus::Success);
        assert_eq!(presenter.presents.len(), 1);
    }

    #[test]
    fn persistent_soft_errors_escalate_to_access_lost() {
        let controls = Arc::new(EngineControls::new());
        let cfg = config(Behaviour::None, 2.0);
        let script = vec![FrameOutcome::Error; SOFT_FAILURE_ESCALATION as usize];
        let mut source = ScriptedSource::new(controls.clone(), &script);
        let mut presenter = RecordingPresenter::new(controls.clone());

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, None);

        assert_eq!(status, CaptureStatus::AccessLost);
        assert_eq!(source.realloc_log.len(), SOFT_FAILURE_ESCALATION as usize);
        assert!(presenter.presents.is_empty());
    }

    #[test]
    fn timeouts_reset_the_error_streak() {
        let controls = Arc::new(EngineControls::new());
        let cfg = config(Behaviour::None, 2.0);
        // Errors just short of the threshold, a timeout, then more
        // errors: never a long enough streak to escalate.
        let mut script = vec![FrameOutcome::Error; SOFT_FAILURE_ESCALATION as usize - 1];
        script.push(FrameOutcome::Timeout);
        script.extend(vec![FrameOutcome::Error; 2]);
        let mut source = ScriptedSource::new(controls.clone(), &script);
        let mut presenter = RecordingPresenter::new(controls.clone());

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, None);

        assert_eq!(status, CaptureStatus::Success);
    }

    #[test]
    fn cancellation_before_first_tick_is_clean() {
        let controls = Arc::new(EngineControls::new());
        controls.request_stop();
        let cfg = config(Behaviour::None, 2.0);
        let mut source = ScriptedSource::new(controls.clone(), &[]);
        let mut presenter = RecordingPresenter::new(controls.clone());

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, None);

        assert_eq!(status, CaptureStatus::Success);
        assert!(source.realloc_log.is_empty());
        assert!(presenter.presents.is_empty());
    }

    #[test]
    fn pause_presents_blank_frames_without_acquiring() {
        let controls = Arc::new(EngineControls::new());
        controls.set_paused(true);
        let cfg = config(Behaviour::Flex, 1.0);
        let mut source = ScriptedSource::new(controls.clone(), &[FrameOutcome::Delivered]);
        let mut presenter = RecordingPresenter::new(controls.clone());
        presenter.stop_after_blanks = Some(3);

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, None);

        assert_eq!(status, CaptureStatus::Success);
        assert_eq!(presenter.blanks, 3);
        // Paused the whole run: the source was never touched.
        assert!(source.realloc_log.is_empty());
        assert!(presenter.presents.is_empty());
    }

    #[test]
    fn multiplier_changes_reallocate_exactly_on_transitions() {
        let controls = Arc::new(EngineControls::new());
        let cfg = config(Behaviour::Flex, 1.0);
        let mut source = ScriptedSource::new(
            controls.clone(),
            &[
                FrameOutcome::Delivered,
                FrameOutcome::Delivered,
                FrameOutcome::Delivered,
            ],
        );
        // 1.0 -> 1.25 -> back to 1.0, applied tick by tick.
        source.multipliers = [1.25, 1.0].into_iter().collect();
        let mut presenter = RecordingPresenter::new(controls.clone());

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, None);

        assert_eq!(status, CaptureStatus::Success);
        assert_eq!(
            source.size_log,
            vec![(1920, 1080), (1536, 864), (1920, 1080)]
        );
        // One allocation per size transition, including the return to a
        // previously used size: only one buffer is ever cached.
        assert_eq!(source.realloc_log, vec![1, 2, 3]);
    }

    #[test]
    fn overlay_failure_is_fatal_before_presentation() {
        let controls = Arc::new(EngineControls::new());
        let cfg = config(Behaviour::None, 2.0);
        let mut source = ScriptedSource::new(controls.clone(), &[FrameOutcome::Delivered]);
        let mut presenter = RecordingPresenter::new(controls.clone());
        let overlay: OverlayFn = Box::new(|_| Err(OverlayError("contract violated".into())));

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, Some(overlay));

        assert_eq!(status, CaptureStatus::OverlayError);
        assert!(presenter.presents.is_empty());
    }

    #[test]
    fn overlay_mutations_are_visible_in_presented_frame() {
        let controls = Arc::new(EngineControls::new());
        let cfg = config(Behaviour::None, 2.0);
        let mut source = ScriptedSource::new(controls.clone(), &[FrameOutcome::Delivered]);
        let mut presenter = RecordingPresenter::new(controls.clone());
        let overlay: OverlayFn = Box::new(|ctx| {
            ctx.put_pixel(0, 0, [0xAB, 0xCD, 0xEF, 0xFF]);
            Ok(())
        });

        let status = run_loop(&cfg, &controls, &mut source, &mut presenter, Some(overlay));

        assert_eq!(status, CaptureStatus::Success);
        assert_eq!(&presenter.presents[0][..4], &[0xAB, 0xCD, 0xEF, 0xFF]);
    }
}
