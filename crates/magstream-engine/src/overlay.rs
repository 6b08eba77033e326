//! Overlay hook contract and built-in overlays.
//!
//! An overlay is an injected function invoked after a successful copy and
//! before presentation; it mutates pixels in place. Any failure it reports
//! is fatal to the run — the engine does not present a possibly corrupted
//! frame.

use magstream_core::Behaviour;
use thiserror::Error;

/// Error reported by an overlay callback.
#[derive(Debug, Error)]
#[error("overlay failed: {0}")]
pub struct OverlayError(pub String);

/// Drawing surface handed to an overlay: the presentation buffer's pixels
/// for the current tick.
pub struct OverlayContext<'a> {
    /// Top-down BGRA pixel data, `height` rows of `stride` bytes.
    pub pixels: &'a mut [u8],

    /// Current capture region width in pixels.
    pub width: u32,

    /// Current capture region height in pixels.
    pub height: u32,

    /// Row stride in bytes.
    pub stride: usize,
}

impl OverlayContext<'_> {
    /// Write one BGRA pixel, ignoring out-of-bounds coordinates.
    pub fn put_pixel(&mut self, x: i64, y: i64, bgra: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let offset = y as usize * self.stride + x as usize * 4;
        self.pixels[offset..offset + 4].copy_from_slice(&bgra);
    }
}

/// The overlay callback type. Selected once at startup from the behaviour
/// tag; one signature, many implementations.
///
/// A custom overlay is just a boxed closure, passed to
/// [`run_loop`](crate::run_loop) as the `overlay` argument in place of a
/// built-in. This one draws a short vertical line through the region's
/// center:
///
/// ```
/// use magstream_engine::{OverlayContext, OverlayFn};
///
/// let line: OverlayFn = Box::new(|ctx: &mut OverlayContext<'_>| {
///     let cx = ctx.width as i64 / 2;
///     let cy = ctx.height as i64 / 2;
///     for d in -3..=3 {
///         ctx.put_pixel(cx, cy + d, [0, 0, 255, 255]);
///     }
///     Ok(())
/// });
/// # let mut pixels = vec![0u8; 8 * 8 * 4];
/// # let mut ctx = OverlayContext { pixels: &mut pixels, width: 8, height: 8, stride: 32 };
/// # let mut line = line;
/// # line(&mut ctx).unwrap();
/// ```
pub type OverlayFn = Box<dyn FnMut(&mut OverlayContext<'_>) -> Result<(), OverlayError> + Send>;

/// Red, fully opaque, in BGRA order.
const CROSSHAIR_COLOR: [u8; 4] = [0, 0, 255, 255];

/// Half-length of each crosshair arm in pixels.
const CROSSHAIR_HALF_LEN: i64 = 3;

/// Draw centre crosshairs: short vertical and horizontal strokes through
/// the middle of the region.
pub fn draw_center_crosshairs(ctx: &mut OverlayContext<'_>) -> Result<(), OverlayError> {
    let cx = ctx.width as i64 / 2;
    let cy = ctx.height as i64 / 2;

    for d in -CROSSHAIR_HALF_LEN..=CROSSHAIR_HALF_LEN {
        ctx.put_pixel(cx, cy + d, CROSSHAIR_COLOR);
        ctx.put_pixel(cx + d, cy, CROSSHAIR_COLOR);
    }

    Ok(())
}

/// The overlay for a behaviour tag, or `None` if the behaviour draws
/// nothing.
pub fn overlay_for_behaviour(behaviour: Behaviour) -> Option<OverlayFn> {
    match behaviour {
        Behaviour::Crosshairs => Some(Box::new(draw_center_crosshairs)),
        Behaviour::None | Behaviour::Flex => None,
    }
}
