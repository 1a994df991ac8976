//! Desktop queries without a native window API.
//!
//! Only the main display is known and there are no windows to target.

use enigo::{Enigo, Mouse, Settings};
use tracing::{debug, warn};

use super::SinkError;
use crate::geometry::{Desktop, MonitorInfo, Rect, WindowHandle, WindowInfo};

pub fn enable_dpi_awareness() {
    debug!("DPI awareness is handled by the display server on this platform");
}

pub(super) fn restore_if_minimized(_window: WindowHandle) -> Result<(), SinkError> {
    Err(SinkError::Unsupported("window restore"))
}

pub(super) fn focus_window(_window: WindowHandle, _force: bool) -> Result<(), SinkError> {
    Err(SinkError::Unsupported("window focus"))
}

pub(super) fn foreground_window() -> Option<WindowHandle> {
    None
}

#[derive(Debug, Clone)]
pub struct SystemDesktop {
    display: Rect,
}

impl SystemDesktop {
    pub fn create() -> Result<Self, SinkError> {
        let enigo =
            Enigo::new(&Settings::default()).map_err(|e| SinkError::Connection(e.to_string()))?;
        let (width, height) = enigo
            .main_display()
            .map_err(|e| SinkError::Injection(e.to_string()))?;
        warn!("Window targeting is only available on Windows; using the main display");
        Ok(Self {
            display: Rect::new(0, 0, width, height),
        })
    }
}

impl Desktop for SystemDesktop {
    fn monitors(&self) -> Vec<MonitorInfo> {
        vec![MonitorInfo {
            index: 0,
            bounds: self.display,
            primary: true,
            name: "main".to_string(),
        }]
    }

    fn windows(&self) -> Vec<WindowInfo> {
        Vec::new()
    }

    fn client_bounds(&self, _handle: WindowHandle) -> Option<Rect> {
        None
    }
}
