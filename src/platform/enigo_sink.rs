use enigo::{Axis, Button, Coordinate, Direction, Enigo, Mouse, Settings};
use tracing::{error, info};

use super::{os, InjectionSink, MouseButton, SinkError};
use crate::geometry::WindowHandle;

/// [`InjectionSink`] that injects through enigo and focuses windows through
/// the native window API
pub struct EnigoSink {
    enigo: Enigo,
}

impl EnigoSink {
    pub fn create() -> Result<Self, SinkError> {
        info!("Connecting pointer injection backend");
        match Enigo::new(&Settings::default()) {
            Ok(enigo) => Ok(Self { enigo }),
            Err(e) => {
                error!("Failed to create enigo backend: {}", e);
                Err(SinkError::Connection(e.to_string()))
            }
        }
    }
}

impl InjectionSink for EnigoSink {
    fn move_cursor(&mut self, x: i32, y: i32) -> Result<(), SinkError> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| SinkError::Injection(e.to_string()))
    }

    fn cursor_position(&self) -> Result<(i32, i32), SinkError> {
        self.enigo
            .location()
            .map_err(|e| SinkError::Injection(e.to_string()))
    }

    fn set_button(&mut self, button: MouseButton, pressed: bool) -> Result<(), SinkError> {
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
        };
        let direction = if pressed {
            Direction::Press
        } else {
            Direction::Release
        };
        self.enigo
            .button(button, direction)
            .map_err(|e| SinkError::Injection(e.to_string()))
    }

    fn scroll(&mut self, ticks: i32) -> Result<(), SinkError> {
        // enigo scrolls down for positive lengths
        self.enigo
            .scroll(-ticks, Axis::Vertical)
            .map_err(|e| SinkError::Injection(e.to_string()))
    }

    fn restore_if_minimized(&mut self, window: WindowHandle) -> Result<(), SinkError> {
        os::restore_if_minimized(window)
    }

    fn focus_window(&mut self, window: WindowHandle, force: bool) -> Result<(), SinkError> {
        os::focus_window(window, force)
    }

    fn is_foreground(&self, window: WindowHandle) -> bool {
        os::foreground_window() == Some(window)
    }
}
