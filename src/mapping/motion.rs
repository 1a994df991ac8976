//! Per-tick motion integration
//!
//! Nudge buttons move at a fixed velocity (optionally accelerated while
//! held), analog axes move proportionally to their deflection past the
//! deadzone. Both sources are added per axis. The deadzone itself is applied
//! per binding by the input mapper, so the frame already carries the
//! rescaled deflection.

use crate::config::InputConfig;
use crate::mapping::actions::{Action, InputFrame};

/// Velocity multiplier for nudge directions held for a long time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldAccel {
    pub after_s: f64,
    pub ramp_s: f64,
    pub max: f64,
}

impl HoldAccel {
    /// 1 until `after_s`, then a linear ramp to `max` over `ramp_s`
    pub fn factor(&self, held_s: f64) -> f64 {
        if held_s <= self.after_s {
            return 1.0;
        }
        let progress = if self.ramp_s > 0.0 {
            ((held_s - self.after_s) / self.ramp_s).min(1.0)
        } else {
            1.0
        };
        1.0 + (self.max - 1.0) * progress
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionSettings {
    pub nudge_velocity: f64,
    pub axis_velocity: f64,
    pub invert_x: bool,
    pub invert_y: bool,
    pub hold_accel: Option<HoldAccel>,
}

impl MotionSettings {
    pub fn from_config(input: &InputConfig) -> Self {
        Self {
            nudge_velocity: input.nudge_velocity_px_s,
            axis_velocity: input.axis_velocity_px_s,
            invert_x: input.axis_invert_x,
            invert_y: input.axis_invert_y,
            hold_accel: input.hold_accel_enable.then(|| HoldAccel {
                after_s: input.hold_accel_after_ms as f64 / 1000.0,
                ramp_s: input.hold_accel_ramp_ms as f64 / 1000.0,
                max: input.hold_accel_max,
            }),
        }
    }
}

/// Deadzone-rescaled deflection in [-1, 1]; 0 inside the deadzone
pub fn analog_response(raw: f32, deadzone: f32) -> f64 {
    let raw = f64::from(raw.clamp(-1.0, 1.0));
    let deadzone = f64::from(deadzone);
    let magnitude = raw.abs();
    if magnitude < deadzone {
        return 0.0;
    }
    raw.signum() * (magnitude - deadzone) / (1.0 - deadzone)
}

const NUDGES: [Action; 4] = [Action::IncX, Action::DecX, Action::IncY, Action::DecY];

/// Signed direction of an inc/dec pair and the index of the winning timer
fn net_direction(inc: bool, dec: bool, inc_slot: usize) -> Option<(f64, usize)> {
    match (inc, dec) {
        (true, false) => Some((1.0, inc_slot)),
        (false, true) => Some((-1.0, inc_slot + 1)),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct MotionIntegrator {
    settings: MotionSettings,
    /// Seconds each nudge direction has been held, in `NUDGES` order
    held_for: [f64; 4],
}

impl MotionIntegrator {
    pub fn new(settings: MotionSettings) -> Self {
        Self {
            settings,
            held_for: [0.0; 4],
        }
    }

    /// Displacement in pixels for one tick of length `dt` seconds.
    ///
    /// Must run every tick so the hold timers see releases.
    pub fn step(&mut self, frame: &InputFrame, dt: f64) -> (f64, f64) {
        let mut held = [false; 4];
        for (i, action) in NUDGES.iter().enumerate() {
            held[i] = frame.held(*action);
            if held[i] {
                self.held_for[i] += dt;
            } else {
                self.held_for[i] = 0.0;
            }
        }

        let nudge_x = self.nudge(net_direction(held[0], held[1], 0)) * dt;
        let nudge_y = self.nudge(net_direction(held[2], held[3], 2)) * dt;

        let mut analog_x = f64::from(frame.axis_x) * self.settings.axis_velocity * dt;
        let mut analog_y = f64::from(frame.axis_y) * self.settings.axis_velocity * dt;
        if self.settings.invert_x {
            analog_x = -analog_x;
        }
        if self.settings.invert_y {
            analog_y = -analog_y;
        }

        (nudge_x + analog_x, nudge_y + analog_y)
    }

    /// Signed nudge velocity, accelerated by the winning direction's timer
    fn nudge(&self, direction: Option<(f64, usize)>) -> f64 {
        let Some((sign, slot)) = direction else {
            return 0.0;
        };
        let factor = self
            .settings
            .hold_accel
            .map(|a| a.factor(self.held_for[slot]))
            .unwrap_or(1.0);
        sign * self.settings.nudge_velocity * factor
    }
}
