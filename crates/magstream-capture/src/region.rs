//! Desktop extent and capture region value types.

/// Size of the duplicated output in pixels.
///
/// Discovered once when the duplication is created and immutable for the
/// engine's lifetime; a mode change surfaces as access loss instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesktopExtent {
    pub width: u32,
    pub height: u32,
}

/// A region of the desktop to copy out, derived from the zoom factor.
///
/// Invariant (maintained by the zoom policy): `crop_x + width <=
/// extent.width` and `crop_y + height <= extent.height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    /// Region width in pixels, at least 1.
    pub width: u32,

    /// Region height in pixels, at least 1.
    pub height: u32,

    /// Left edge of the region on the desktop.
    pub crop_x: u32,

    /// Top edge of the region on the desktop.
    pub crop_y: u32,
}

impl CaptureRegion {
    /// Byte offset of the region's first pixel within a source surface
    /// with the given row stride.
    pub fn byte_offset(&self, source_stride: usize) -> usize {
        self.crop_y as usize * source_stride + self.crop_x as usize * 4
    }

    /// Whether the region lies fully inside `extent`.
    pub fn fits(&self, extent: DesktopExtent) -> bool {
        self.crop_x + self.width <= extent.width && self.crop_y + self.height <= extent.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_offset_accounts_for_stride_and_bpp() {
        let region = CaptureRegion {
            width: 10,
            height: 10,
            crop_x: 3,
            crop_y: 2,
        };
        assert_eq!(region.byte_offset(256), 2 * 256 + 3 * 4);
    }

    #[test]
    fn fits_checks_both_axes() {
        let extent = DesktopExtent {
            width: 100,
            height: 50,
        };
        let inside = CaptureRegion {
            width: 40,
            height: 20,
            crop_x: 60,
            crop_y: 30,
        };
        assert!(inside.fits(extent));

        let outside = CaptureRegion {
            width: 41,
            height: 20,
            crop_x: 60,
            crop_y: 30,
        };
        assert!(!outside.fits(extent));
    }
}
