//! Win32 monitor, window and focus queries

use core::ffi::c_void;
use std::mem;
use std::ptr;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{BOOL, HWND, LPARAM, POINT, RECT};
use windows_sys::Win32::Graphics::Gdi::{
    ClientToScreen, EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO,
    MONITORINFOEXW,
};
use windows_sys::Win32::System::Threading::{AttachThreadInput, GetCurrentThreadId};
use windows_sys::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, EnumWindows, GetClassNameW, GetClientRect, GetForegroundWindow, GetWindow,
    GetWindowLongW, GetWindowRect, GetWindowTextW, GetWindowThreadProcessId, IsIconic, IsWindowVisible,
    SetForegroundWindow, ShowWindow, GWL_EXSTYLE, GW_OWNER, SW_RESTORE, WS_EX_TOOLWINDOW,
};

use super::SinkError;
use crate::geometry::{Desktop, MonitorInfo, Rect, WindowHandle, WindowInfo};

const MONITORINFOF_PRIMARY: u32 = 1;

/// Declares per-monitor DPI awareness so all coordinates are physical pixels
pub fn enable_dpi_awareness() {
    // SAFETY: plain call with a predefined context constant
    let ok = unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) };
    if ok == 0 {
        warn!("Could not declare per-monitor DPI awareness (already set by manifest?)");
    } else {
        debug!("Per-monitor DPI awareness enabled");
    }
}

fn hwnd(handle: WindowHandle) -> HWND {
    handle.0 as HWND
}

pub(super) fn restore_if_minimized(window: WindowHandle) -> Result<(), SinkError> {
    // SAFETY: the handle may be stale; both calls tolerate invalid windows
    unsafe {
        if IsIconic(hwnd(window)) != 0 {
            ShowWindow(hwnd(window), SW_RESTORE);
        }
    }
    Ok(())
}

pub(super) fn focus_window(window: WindowHandle, force: bool) -> Result<(), SinkError> {
    let target = hwnd(window);
    // SAFETY: all calls take plain handles and thread ids
    unsafe {
        if SetForegroundWindow(target) != 0 {
            return Ok(());
        }
        if !force {
            return Err(SinkError::Window("SetForegroundWindow was refused".into()));
        }

        let foreground = GetForegroundWindow();
        let foreground_thread = GetWindowThreadProcessId(foreground, ptr::null_mut());
        let own_thread = GetCurrentThreadId();
        let attached = foreground_thread != 0
            && foreground_thread != own_thread
            && AttachThreadInput(own_thread, foreground_thread, 1) != 0;

        BringWindowToTop(target);
        let ok = SetForegroundWindow(target);

        if attached {
            AttachThreadInput(own_thread, foreground_thread, 0);
        }
        if ok == 0 {
            return Err(SinkError::Window(
                "SetForegroundWindow was refused after input attach".into(),
            ));
        }
    }
    Ok(())
}

pub(super) fn foreground_window() -> Option<WindowHandle> {
    // SAFETY: no arguments
    let handle = unsafe { GetForegroundWindow() };
    (!handle.is_null()).then_some(WindowHandle(handle as isize))
}

fn to_rect(r: &RECT) -> Rect {
    Rect::new(r.left, r.top, r.right - r.left, r.bottom - r.top)
}

fn wide_to_string(buf: &[u16]) -> String {
    let end = buf.iter().position(|c| *c == 0).unwrap_or(buf.len());
    String::from_utf16_lossy(&buf[..end])
}

unsafe extern "system" fn collect_monitor(
    monitor: HMONITOR,
    _hdc: HDC,
    _clip: *mut RECT,
    data: LPARAM,
) -> BOOL {
    let out = &mut *(data as *mut Vec<MonitorInfo>);
    let mut info: MONITORINFOEXW = mem::zeroed();
    info.monitorInfo.cbSize = mem::size_of::<MONITORINFOEXW>() as u32;
    if GetMonitorInfoW(monitor, &mut info as *mut MONITORINFOEXW as *mut MONITORINFO) != 0 {
        out.push(MonitorInfo {
            index: out.len(),
            bounds: to_rect(&info.monitorInfo.rcMonitor),
            primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
            name: wide_to_string(&info.szDevice),
        });
    }
    1
}

unsafe extern "system" fn collect_window(window: HWND, data: LPARAM) -> BOOL {
    let out = &mut *(data as *mut Vec<WindowInfo>);

    if IsWindowVisible(window) == 0 || !GetWindow(window, GW_OWNER).is_null() {
        return 1;
    }
    if GetWindowLongW(window, GWL_EXSTYLE) as u32 & WS_EX_TOOLWINDOW != 0 {
        return 1;
    }

    let mut class = [0u16; 256];
    let mut title = [0u16; 512];
    GetClassNameW(window, class.as_mut_ptr(), class.len() as i32);
    GetWindowTextW(window, title.as_mut_ptr(), title.len() as i32);

    if let Some(client) = client_rect(window) {
        out.push(WindowInfo {
            handle: WindowHandle(window as isize),
            title: wide_to_string(&title),
            class: wide_to_string(&class),
            client,
        });
    }
    1
}

/// Client area in screen coordinates, falling back to the window rect.
///
/// Minimized windows and empty areas yield `None`.
fn client_rect(window: HWND) -> Option<Rect> {
    // SAFETY: out-pointers refer to live stack values
    unsafe {
        if IsIconic(window) != 0 {
            return None;
        }

        let mut rect: RECT = mem::zeroed();
        let mut origin = POINT { x: 0, y: 0 };
        let client = (GetClientRect(window, &mut rect) != 0
            && ClientToScreen(window, &mut origin) != 0)
            .then(|| {
                Rect::new(
                    origin.x,
                    origin.y,
                    rect.right - rect.left,
                    rect.bottom - rect.top,
                )
            })
            .filter(|r| !r.is_empty());
        if client.is_some() {
            return client;
        }

        let mut outer: RECT = mem::zeroed();
        if GetWindowRect(window, &mut outer) == 0 {
            return None;
        }
        debug!("Using window rect, client area unavailable");
        Some(to_rect(&outer)).filter(|r| !r.is_empty())
    }
}

/// [`Desktop`] backed by the Win32 API
#[derive(Debug, Clone, Default)]
pub struct SystemDesktop;

impl SystemDesktop {
    pub fn create() -> Result<Self, SinkError> {
        Ok(Self)
    }
}

impl Desktop for SystemDesktop {
    fn monitors(&self) -> Vec<MonitorInfo> {
        let mut monitors: Vec<MonitorInfo> = Vec::new();
        // SAFETY: the callback only runs during this call and the vector outlives it
        unsafe {
            EnumDisplayMonitors(
                ptr::null_mut(),
                ptr::null(),
                Some(collect_monitor),
                &mut monitors as *mut Vec<MonitorInfo> as *mut c_void as LPARAM,
            );
        }
        monitors
    }

    fn windows(&self) -> Vec<WindowInfo> {
        let mut windows: Vec<WindowInfo> = Vec::new();
        // SAFETY: as above
        unsafe {
            EnumWindows(
                Some(collect_window),
                &mut windows as *mut Vec<WindowInfo> as *mut c_void as LPARAM,
            );
        }
        windows
    }

    fn client_bounds(&self, handle: WindowHandle) -> Option<Rect> {
        client_rect(hwnd(handle))
    }
}
