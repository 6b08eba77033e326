//! Win32 host window and capture thread lifecycle.
//!
//! The window thread owns the message pump and the shared
//! [`EngineControls`]; the capture thread owns every device resource and
//! runs the loop. Closing the window requests cancellation, a fatal loop
//! outcome closes the window, and either way the status of the joined
//! capture thread decides the process exit code.

use std::cell::Cell;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use tracing::{error, info, warn};

use windows::core::PCWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    VIRTUAL_KEY, VK_F1, VK_F2, VK_NUMPAD0, VK_NUMPAD1, VK_NUMPAD9,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRect, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
    GetWindowLongPtrW, LoadCursorW, MessageBoxW, PostMessageW, PostQuitMessage, RegisterClassW,
    SetWindowLongPtrW, TranslateMessage, CW_USEDEFAULT, GWLP_USERDATA, HTCAPTION, HTCLIENT,
    IDC_ARROW, MB_ICONERROR, MB_OK, MSG, WINDOW_EX_STYLE, WM_CLOSE, WM_DESTROY, WM_KEYDOWN,
    WM_NCHITTEST, WNDCLASSW, WS_CAPTION, WS_MINIMIZEBOX, WS_OVERLAPPED, WS_SYSMENU, WS_VISIBLE,
};

use magstream_capture::DxgiFrameSource;
use magstream_core::{
    multiplier_for_level, Behaviour, CaptureConfig, CaptureStatus, EngineControls,
};
use magstream_engine::{overlay_for_behaviour, run_loop};

use crate::presenter::GdiPresenter;

const WINDOW_CLASS: &str = "MagstreamHostClass";
const WINDOW_TITLE: &str = "magstream";

/// Per-window state reachable from the window procedure.
struct HostState {
    controls: Arc<EngineControls>,
    /// Whether runtime key handling is active at all.
    flex: bool,
    /// Armed by F2: while set, numpad digits select a zoom level.
    zoom_input: Cell<bool>,
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn handle_key(state: &HostState, vk: VIRTUAL_KEY) {
    if vk == VK_F1 {
        let paused = state.controls.toggle_paused();
        info!(paused, "pause toggled");
    } else if vk == VK_F2 {
        let armed = !state.zoom_input.get();
        state.zoom_input.set(armed);
        info!(armed, "zoom input mode toggled");
    } else if state.zoom_input.get() && (VK_NUMPAD1.0..=VK_NUMPAD9.0).contains(&vk.0) {
        let level = (vk.0 - VK_NUMPAD0.0) as u8;
        if let Some(multiplier) = multiplier_for_level(level) {
            state.controls.set_multiplier(multiplier);
            info!(level, multiplier, "zoom multiplier selected");
        }
    }
}

unsafe extern "system" fn wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let state_ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const HostState;

    match msg {
        WM_DESTROY => {
            if let Some(state) = unsafe { state_ptr.as_ref() } {
                state.controls.request_stop();
            }
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }
        // The whole client area drags the window; there is no other
        // mouse interaction.
        WM_NCHITTEST => {
            let hit = unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
            if hit == LRESULT(HTCLIENT as isize) {
                LRESULT(HTCAPTION as isize)
            } else {
                hit
            }
        }
        WM_KEYDOWN => {
            if let Some(state) = unsafe { state_ptr.as_ref() } {
                if state.flex {
                    handle_key(state, VIRTUAL_KEY(wparam.0 as u16));
                    return LRESULT(0);
                }
            }
            unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

fn create_host_window(config: &CaptureConfig, state_ptr: *mut HostState) -> anyhow::Result<HWND> {
    let hinstance = unsafe { GetModuleHandleW(None) }.context("GetModuleHandleW")?;

    let class_name = wide(WINDOW_CLASS);
    let wc = WNDCLASSW {
        lpfnWndProc: Some(wndproc),
        hInstance: hinstance.into(),
        lpszClassName: PCWSTR(class_name.as_ptr()),
        hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
        ..Default::default()
    };
    if unsafe { RegisterClassW(&wc) } == 0 {
        return Err(anyhow!("RegisterClassW failed"));
    }

    // Size the client area to the configured display dimensions.
    let style = WS_OVERLAPPED | WS_CAPTION | WS_SYSMENU | WS_MINIMIZEBOX;
    let mut rect = RECT {
        left: 0,
        top: 0,
        right: config.display_width as i32,
        bottom: config.display_height as i32,
    };
    unsafe { AdjustWindowRect(&mut rect, style, false) }.context("AdjustWindowRect")?;

    let title = wide(WINDOW_TITLE);
    let hwnd = unsafe {
        CreateWindowExW(
            WINDOW_EX_STYLE(0),
            PCWSTR(class_name.as_ptr()),
            PCWSTR(title.as_ptr()),
            style | WS_VISIBLE,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            rect.right - rect.left,
            rect.bottom - rect.top,
            None,
            None,
            hinstance,
            None,
        )
    }
    .context("CreateWindowExW")?;

    // Install the state pointer only once the window exists, so the
    // window procedure never sees a half-built state.
    unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, state_ptr as isize) };

    Ok(hwnd)
}

fn capture_thread(config: CaptureConfig, controls: Arc<EngineControls>, hwnd_raw: isize) -> CaptureStatus {
    let hwnd = HWND(hwnd_raw as *mut core::ffi::c_void);

    let status = match DxgiFrameSource::new() {
        Ok(mut source) => {
            let mut presenter =
                GdiPresenter::new(hwnd, config.display_width, config.display_height);
            let overlay = overlay_for_behaviour(config.behaviour);
            run_loop(&config, &controls, &mut source, &mut presenter, overlay)
        }
        Err(e) => {
            error!("capture initialization failed: {e}");
            CaptureStatus::InitFailure
        }
    };

    // Tear the window down if the loop stopped on its own; the post is a
    // no-op error when the user already closed the window.
    if let Err(e) = unsafe { PostMessageW(hwnd, WM_CLOSE, WPARAM(0), LPARAM(0)) } {
        warn!("posting close to host window failed: {e}");
    }

    status
}

/// Open the host window, run the capture loop on its own thread, and pump
/// messages until the window closes. Returns the loop's final status.
pub fn run(config: &CaptureConfig) -> anyhow::Result<CaptureStatus> {
    let controls = Arc::new(EngineControls::new());

    let state_ptr = Box::into_raw(Box::new(HostState {
        controls: controls.clone(),
        flex: config.behaviour == Behaviour::Flex,
        zoom_input: Cell::new(false),
    }));

    let hwnd = match create_host_window(config, state_ptr) {
        Ok(hwnd) => hwnd,
        Err(e) => {
            drop(unsafe { Box::from_raw(state_ptr) });
            return Err(e);
        }
    };
    info!(
        width = config.display_width,
        height = config.display_height,
        "host window created"
    );

    let hwnd_raw = hwnd.0 as isize;
    let thread_config = config.clone();
    let thread_controls = controls.clone();
    let worker = match thread::Builder::new()
        .name("capture".into())
        .spawn(move || capture_thread(thread_config, thread_controls, hwnd_raw))
    {
        Ok(worker) => worker,
        Err(e) => {
            // Detach the state before destroying the window so the
            // destroy-path window procedure never sees a dangling pointer.
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                let _ = DestroyWindow(hwnd);
            }
            drop(unsafe { Box::from_raw(state_ptr) });
            return Err(e).context("spawning capture thread");
        }
    };

    unsafe {
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    // WM_DESTROY already requested a stop; repeating it here is harmless
    // and covers any other way out of the pump.
    controls.request_stop();
    let status = worker
        .join()
        .map_err(|_| anyhow!("capture thread panicked"))?;

    // The window procedure cannot run anymore; reclaim its state.
    drop(unsafe { Box::from_raw(state_ptr) });

    if status.is_success() {
        info!("capture finished cleanly");
    } else {
        error!("capture failed: {}", status.message());
        let text = wide(status.message());
        let caption = wide(WINDOW_TITLE);
        unsafe {
            MessageBoxW(
                None,
                PCWSTR(text.as_ptr()),
                PCWSTR(caption.as_ptr()),
                MB_OK | MB_ICONERROR,
            );
        }
    }

    Ok(status)
}
