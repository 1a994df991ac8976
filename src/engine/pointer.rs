//! Mouse button and wheel dispatch
//!
//! Both run every tick independent of the pin state.

use tracing::{info, warn};

use crate::mapping::{Action, InputFrame};
use crate::platform::{InjectionSink, MouseButton};

/// Keeps injected mouse buttons in line with their bindings.
///
/// A button is pressed when its binding rises and released when it falls. The
/// injected state is reconciled against the held level, so a release is never
/// sent for a button that was not pressed.
#[derive(Debug, Clone, Default)]
pub struct ClickDispatcher {
    left: bool,
    right: bool,
    debug: bool,
}

impl ClickDispatcher {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            ..Self::default()
        }
    }

    pub fn dispatch(&mut self, frame: &InputFrame, sink: &mut dyn InjectionSink) {
        let debug = self.debug;
        reconcile(
            MouseButton::Left,
            frame.held(Action::MouseLeft),
            &mut self.left,
            sink,
            debug,
        );
        reconcile(
            MouseButton::Right,
            frame.held(Action::MouseRight),
            &mut self.right,
            sink,
            debug,
        );
    }
}

fn reconcile(
    button: MouseButton,
    wanted: bool,
    injected: &mut bool,
    sink: &mut dyn InjectionSink,
    debug: bool,
) {
    if wanted == *injected {
        return;
    }
    match sink.set_button(button, wanted) {
        Ok(()) => {
            *injected = wanted;
            if debug {
                info!(
                    "{:?} mouse button {}",
                    button,
                    if wanted { "down" } else { "up" }
                );
            }
        }
        Err(e) => warn!("Mouse button {:?} injection failed: {}", button, e),
    }
}

/// Converts held wheel bindings into whole wheel ticks at a fixed rate
#[derive(Debug, Clone)]
pub struct WheelAccumulator {
    ticks_per_second: f64,
    pending: f64,
}

impl WheelAccumulator {
    pub fn new(ticks_per_second: f64) -> Self {
        Self {
            ticks_per_second,
            pending: 0.0,
        }
    }

    /// Whole ticks due this tick; positive scrolls up
    pub fn advance(&mut self, up: bool, down: bool, dt: f64) -> i32 {
        let direction = f64::from(i8::from(up) - i8::from(down));
        if direction == 0.0 {
            self.pending = 0.0;
            return 0;
        }
        // a direction change drops the remainder of the other direction
        if self.pending * direction < 0.0 {
            self.pending = 0.0;
        }
        self.pending += direction * self.ticks_per_second * dt;
        let whole = self.pending.trunc();
        self.pending -= whole;
        whole as i32
    }

    pub fn dispatch(&mut self, frame: &InputFrame, dt: f64, sink: &mut dyn InjectionSink) {
        let ticks = self.advance(frame.held(Action::WheelUp), frame.held(Action::WheelDown), dt);
        if ticks != 0 {
            if let Err(e) = sink.scroll(ticks) {
                warn!("Wheel injection failed: {}", e);
            }
        }
    }
}
