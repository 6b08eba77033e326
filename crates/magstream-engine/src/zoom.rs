//! Zoom-to-region policy: center crop with bounds clamping.

use magstream_capture::{CaptureRegion, DesktopExtent};

/// Derive the capture region for a zoom factor.
///
/// Region dimensions are `floor(display / zoom)`, floored to 1 pixel so an
/// extreme runtime multiplier can never produce a degenerate region. The
/// crop origin centers the region on the desktop and is then clamped so
/// the region never leaves the desktop on either axis. The region is
/// never scaled to fit: for static zoom, validation guarantees it fits at
/// configuration time.
///
/// O(1), allocation-free; safe to call every tick.
pub fn region_for_zoom(
    extent: DesktopExtent,
    display_width: u32,
    display_height: u32,
    zoom: f64,
) -> CaptureRegion {
    let width = ((display_width as f64 / zoom) as u32).max(1);
    let height = ((display_height as f64 / zoom) as u32).max(1);

    CaptureRegion {
        width,
        height,
        crop_x: centered_clamped(extent.width, width),
        crop_y: centered_clamped(extent.height, height),
    }
}

/// Center `region_dim` within `desktop_dim`, clamped to valid offsets.
///
/// A region larger than the desktop pins to offset 0; the far edge is
/// clamped to `desktop_dim - region_dim`.
fn centered_clamped(desktop_dim: u32, region_dim: u32) -> u32 {
    if region_dim >= desktop_dim {
        return 0;
    }
    let origin = (desktop_dim - region_dim) / 2;
    origin.min(desktop_dim - region_dim)
}
