//! DXGI desktop duplication frame source.
//!
//! Pipeline: D3D11 device → DXGI adapter → output 0 → `DuplicateOutput`,
//! plus one persistent CPU-readable staging texture sized to the full
//! desktop. Per tick: `AcquireNextFrame` → `CopyResource` into staging →
//! `Map` → row-wise copy of the crop region into the presentation buffer →
//! `Unmap` → `ReleaseFrame`. Exactly one frame is held and mapped at a
//! time.

use std::time::Duration;

use tracing::{debug, info, warn};
use windows::core::Interface;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAPPED_SUBRESOURCE,
    D3D11_MAP_READ, D3D11_SDK_VERSION, D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Dxgi::Common::DXGI_SAMPLE_DESC;
use windows::Win32::Graphics::Dxgi::{
    IDXGIDevice, IDXGIOutput1, IDXGIOutputDuplication, IDXGIResource, DXGI_ERROR_ACCESS_LOST,
    DXGI_ERROR_WAIT_TIMEOUT, DXGI_OUTDUPL_FRAME_INFO,
};

use crate::error::CaptureError;
use crate::region::{CaptureRegion, DesktopExtent};
use crate::{CaptureResult, FrameOutcome, FrameSource, PresentationBuffer};

/// The single fixed output this engine duplicates.
const OUTPUT_INDEX: u32 = 0;

/// Frame source backed by `IDXGIOutputDuplication`.
///
/// All setup failures are a single unrecoverable [`CaptureError`]; the
/// caller aborts the engine rather than retrying a partial pipeline.
pub struct DxgiFrameSource {
    // Declaration order is drop order: staging, then duplication, then
    // the device pair — the reverse of acquisition.
    staging_texture: ID3D11Texture2D,
    duplication: IDXGIOutputDuplication,
    context: ID3D11DeviceContext,
    // Held only to pin the device's lifetime alongside its context.
    _device: ID3D11Device,
    extent: DesktopExtent,
}

impl DxgiFrameSource {
    /// Build the duplication pipeline for output 0.
    pub fn new() -> CaptureResult<Self> {
        // Hardware device with BGRA support, matching the duplication
        // surface format. Created here and never shared: the capture
        // thread is its only user.
        let mut device = None;
        let mut context = None;
        unsafe {
            D3D11CreateDevice(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                None,
                D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                None,
                D3D11_SDK_VERSION,
                Some(&mut device),
                None,
                Some(&mut context),
            )?;
        }
        let device = device.ok_or_else(|| CaptureError::WindowsApi {
            message: "D3D11CreateDevice returned no device".to_string(),
            source: None,
        })?;
        let context = context.ok_or_else(|| CaptureError::WindowsApi {
            message: "D3D11CreateDevice returned no immediate context".to_string(),
            source: None,
        })?;
        debug!("created D3D11 device for desktop duplication");

        let dxgi_device: IDXGIDevice = device.cast()?;
        let adapter = unsafe { dxgi_device.GetAdapter()? };
        let output = unsafe { adapter.EnumOutputs(OUTPUT_INDEX)? };
        let output1: IDXGIOutput1 = output.cast()?;

        let duplication = unsafe { output1.DuplicateOutput(&device) }.map_err(|e| {
            CaptureError::Unavailable(format!(
                "DuplicateOutput failed (duplication may be blocked in this session): {e}"
            ))
        })?;

        let dup_desc = unsafe { duplication.GetDesc() };
        let extent = DesktopExtent {
            width: dup_desc.ModeDesc.Width,
            height: dup_desc.ModeDesc.Height,
        };

        // One persistent staging surface sized to the full desktop; the
        // per-tick crop happens on the CPU side after mapping.
        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: extent.width,
            Height: extent.height,
            MipLevels: 1,
            ArraySize: 1,
            Format: dup_desc.ModeDesc.Format,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_STAGING,
            BindFlags: 0,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: 0,
        };

        let mut staging_texture = None;
        unsafe {
            device.CreateTexture2D(&staging_desc, None, Some(&mut staging_texture))?;
        }
        let staging_texture = staging_texture.ok_or_else(|| CaptureError::WindowsApi {
            message: "CreateTexture2D returned no staging texture".to_string(),
            source: None,
        })?;

        info!(
            width = extent.width,
            height = extent.height,
            "desktop duplication ready"
        );

        Ok(Self {
            staging_texture,
            duplication,
            context,
            _device: device,
            extent,
        })
    }

    /// Copy the acquired frame's crop region into `buffer`.
    ///
    /// Runs with the frame held; the caller releases it afterwards on
    /// every path.
    fn copy_out(
        &self,
        region: &CaptureRegion,
        buffer: &mut PresentationBuffer,
        resource: Option<IDXGIResource>,
    ) -> FrameOutcome {
        let Some(resource) = resource else {
            warn!("AcquireNextFrame succeeded without a resource");
            return FrameOutcome::Error;
        };

        let texture: ID3D11Texture2D = match resource.cast() {
            Ok(texture) => texture,
            Err(e) => {
                warn!("desktop resource cast failed: {e}");
                return FrameOutcome::Error;
            }
        };

        unsafe {
            self.context.CopyResource(&self.staging_texture, &texture);
        }

        let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
        if let Err(e) = unsafe {
            self.context
                .Map(&self.staging_texture, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
        } {
            warn!("staging texture map failed: {e}");
            return FrameOutcome::Error;
        }

        let stride = mapped.RowPitch as usize;
        let total_bytes = stride * self.extent.height as usize;
        // SAFETY: the staging texture is extent.height rows of RowPitch
        // bytes, mapped for read until the Unmap below.
        let src = unsafe { std::slice::from_raw_parts(mapped.pData as *const u8, total_bytes) };

        buffer.copy_rows(&src[region.byte_offset(stride)..], stride);

        unsafe { self.context.Unmap(&self.staging_texture, 0) };

        FrameOutcome::Delivered
    }
}

impl FrameSource for DxgiFrameSource {
    fn desktop_extent(&self) -> DesktopExtent {
        self.extent
    }

    fn acquire_into(
        &mut self,
        region: &CaptureRegion,
        buffer: &mut PresentationBuffer,
        timeout: Duration,
    ) -> FrameOutcome {
        debug_assert!(region.fits(self.extent));
        debug_assert_eq!(buffer.width(), region.width);
        debug_assert_eq!(buffer.height(), region.height);

        let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
        let mut resource: Option<IDXGIResource> = None;

        match unsafe {
            self.duplication
                .AcquireNextFrame(timeout.as_millis() as u32, &mut frame_info, &mut resource)
        } {
            Ok(()) => {}
            Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => {
                return FrameOutcome::Timeout;
            }
            Err(e) if e.code() == DXGI_ERROR_ACCESS_LOST => {
                warn!("duplication access lost: {e}");
                return FrameOutcome::AccessLost;
            }
            Err(e) => {
                debug!("AcquireNextFrame soft failure: {e}");
                return FrameOutcome::Error;
            }
        }

        let outcome = self.copy_out(region, buffer, resource);

        // Release on every path so the next acquire never sees a held frame.
        if let Err(e) = unsafe { self.duplication.ReleaseFrame() } {
            debug!("ReleaseFrame failed: {e}");
        }

        outcome
    }
}
