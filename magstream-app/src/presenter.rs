//! GDI presentation of finished frames into the host window.

use windows::Win32::Foundation::RECT;
use windows::Win32::Foundation::HWND;
use windows::Win32::Graphics::Gdi::{
    FillRect, GetDC, GetStockObject, ReleaseDC, StretchDIBits, BITMAPINFO, BITMAPINFOHEADER,
    BI_RGB, BLACK_BRUSH, DIB_RGB_COLORS, HBRUSH, RGBQUAD, SRCCOPY,
};
use windows::Win32::UI::WindowsAndMessaging::GetClientRect;

use magstream_capture::PresentationBuffer;
use magstream_engine::{FramePresenter, PresentError};

/// Blits BGRA presentation buffers into an HWND with `StretchDIBits`,
/// stretching to the configured display size.
pub struct GdiPresenter {
    hwnd: HWND,
    display_width: i32,
    display_height: i32,
}

impl GdiPresenter {
    pub fn new(hwnd: HWND, display_width: u32, display_height: u32) -> Self {
        Self {
            hwnd,
            display_width: display_width as i32,
            display_height: display_height as i32,
        }
    }
}

impl FramePresenter for GdiPresenter {
    fn present(&mut self, buffer: &PresentationBuffer) -> Result<(), PresentError> {
        unsafe {
            let hdc = GetDC(self.hwnd);
            if hdc.is_invalid() {
                return Err(PresentError("GetDC failed".into()));
            }

            let bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: buffer.width() as i32,
                    // Negative height = top-down DIB (origin at top-left).
                    biHeight: -(buffer.height() as i32),
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    biSizeImage: 0,
                    biXPelsPerMeter: 0,
                    biYPelsPerMeter: 0,
                    biClrUsed: 0,
                    biClrImportant: 0,
                },
                bmiColors: [RGBQUAD::default(); 1],
            };

            let scanlines = StretchDIBits(
                hdc,
                0,
                0,
                self.display_width,
                self.display_height,
                0,
                0,
                buffer.width() as i32,
                buffer.height() as i32,
                Some(buffer.as_slice().as_ptr() as *const _),
                &bmi,
                DIB_RGB_COLORS,
                SRCCOPY,
            );

            ReleaseDC(self.hwnd, hdc);

            if scanlines == 0 {
                return Err(PresentError("StretchDIBits copied no scanlines".into()));
            }
        }
        Ok(())
    }

    fn present_blank(&mut self) -> Result<(), PresentError> {
        unsafe {
            let hdc = GetDC(self.hwnd);
            if hdc.is_invalid() {
                return Err(PresentError("GetDC failed".into()));
            }

            let mut rect = RECT::default();
            let result = GetClientRect(self.hwnd, &mut rect);
            if result.is_ok() {
                FillRect(hdc, &rect, HBRUSH(GetStockObject(BLACK_BRUSH).0));
            }

            ReleaseDC(self.hwnd, hdc);

            result.map_err(|e| PresentError(format!("GetClientRect failed: {e}")))
        }
    }
}
