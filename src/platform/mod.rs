//! OS side effects: pointer injection and desktop queries
//!
//! The engine only talks to [`InjectionSink`] and
//! [`Desktop`](crate::geometry::Desktop). Pointer
//! injection goes through enigo on every platform; monitor and window
//! queries use the Win32 API on Windows and a single-display fallback
//! elsewhere.

mod enigo_sink;
#[cfg(not(windows))]
mod fallback;
#[cfg(windows)]
mod win32;

#[cfg(not(windows))]
use fallback as os;
#[cfg(windows)]
use win32 as os;

pub use enigo_sink::EnigoSink;
pub use os::{enable_dpi_awareness, SystemDesktop};

use thiserror::Error;

use crate::geometry::WindowHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to connect to the input system: {0}")]
    Connection(String),

    #[error("Pointer injection failed: {0}")]
    Injection(String),

    #[error("Window operation failed: {0}")]
    Window(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

/// Sink for synthesized pointer input and window focus requests
pub trait InjectionSink {
    fn move_cursor(&mut self, x: i32, y: i32) -> Result<(), SinkError>;

    fn cursor_position(&self) -> Result<(i32, i32), SinkError>;

    fn set_button(&mut self, button: MouseButton, pressed: bool) -> Result<(), SinkError>;

    /// Positive ticks scroll up
    fn scroll(&mut self, ticks: i32) -> Result<(), SinkError>;

    fn restore_if_minimized(&mut self, window: WindowHandle) -> Result<(), SinkError>;

    /// Brings the window to the foreground; `force` retries with input
    /// attachment tricks when the plain request is refused
    fn focus_window(&mut self, window: WindowHandle, force: bool) -> Result<(), SinkError>;

    fn is_foreground(&self, window: WindowHandle) -> bool;
}
