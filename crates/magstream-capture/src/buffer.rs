//! The CPU-side presentation buffer.

use tracing::debug;

/// An owned top-down 32-bit-per-pixel buffer sized to the current capture
/// region.
///
/// The buffer is reused across ticks and reallocated only when the
/// requested dimensions change, so steady-state operation performs no
/// allocation. Rows are tightly packed (stride = `width * 4`).
#[derive(Debug, Default)]
pub struct PresentationBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    reallocations: u64,
}

impl PresentationBuffer {
    /// An empty buffer; sized on first [`ensure_sized`](Self::ensure_sized).
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the buffer exactly `width x height` pixels.
    ///
    /// No-op when the dimensions match the previous call; otherwise the
    /// old storage is dropped and a zeroed buffer takes its place.
    pub fn ensure_sized(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height && !self.data.is_empty() {
            return;
        }

        debug!(width, height, "resizing presentation buffer");
        self.data = vec![0u8; width as usize * height as usize * 4];
        self.width = width;
        self.height = height;
        self.reallocations += 1;
    }

    /// Copy `height` rows of `width * 4` bytes from `src`, advancing the
    /// source by `src_stride` per row and the destination by its own tight
    /// stride.
    ///
    /// This bridges a padded device surface layout to the packed buffer.
    /// `src` must start at the region's first pixel and cover
    /// `(height - 1) * src_stride + width * 4` bytes; a shorter slice is a
    /// caller bug and panics.
    pub fn copy_rows(&mut self, src: &[u8], src_stride: usize) {
        let row_bytes = self.width as usize * 4;
        let dst_stride = self.stride();
        for row in 0..self.height as usize {
            let src_start = row * src_stride;
            let dst_start = row * dst_stride;
            self.data[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }
    }

    /// Buffer width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Destination row stride in bytes. Tight: no padding.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    /// Pixel data, `height` rows of `stride` bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel data, for overlay drawing.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Number of (re)allocations so far. In steady state this stops
    /// moving; tests use it to pin down the reallocation policy.
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }
}
