//! Edge and threshold detection
//!
//! One [`EdgeDetector`] exists per bound input. Each tick it receives the raw
//! sample (a button state or an axis value) plus the modifier gate and
//! produces a [`Signal`]: the held level and the one-tick rising and falling
//! edges.
//!
//! ```text
//! raw ──► [Schmitt trigger] ──► pressed ──► AND gate ──► level ──► edges
//!          (axis-as-button only)             (modifier)
//! ```
//!
//! Axis-as-button inputs press at `threshold` and release only below
//! `threshold - hysteresis` (clamped at zero), so a stick resting close to the
//! threshold does not chatter.

use crate::mapping::binding::Polarity;

/// Raw sample handed to a detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInput {
    Button(bool),
    Axis(f32),
}

/// Per-input detector state, mutated once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectorState {
    /// Effective (gated) value of the previous tick
    pub previous: bool,
    /// Post-hysteresis value, before gating
    pub pressed: bool,
}

/// Output of one detector for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signal {
    pub held: bool,
    pub rising: bool,
    pub falling: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DetectorKind {
    Button,
    AxisButton {
        polarity: Polarity,
        threshold: f32,
        hysteresis: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDetector {
    kind: DetectorKind,
    state: DetectorState,
}

impl EdgeDetector {
    pub fn button() -> Self {
        Self {
            kind: DetectorKind::Button,
            state: DetectorState::default(),
        }
    }

    pub fn axis_button(polarity: Polarity, threshold: f32, hysteresis: f32) -> Self {
        Self {
            kind: DetectorKind::AxisButton {
                polarity,
                threshold,
                hysteresis: hysteresis.max(0.0),
            },
            state: DetectorState::default(),
        }
    }

    /// Feeds one raw sample; `gate_open` is the modifier gate for this binding.
    pub fn update(&mut self, input: RawInput, gate_open: bool) -> Signal {
        let pressed = match (self.kind, input) {
            (DetectorKind::Button, RawInput::Button(raw)) => raw,
            (
                DetectorKind::AxisButton {
                    polarity,
                    threshold,
                    hysteresis,
                },
                RawInput::Axis(raw),
            ) => schmitt(self.state.pressed, raw, polarity, threshold, hysteresis),
            // mismatched input never presses
            _ => false,
        };

        let current = pressed && gate_open;
        let signal = Signal {
            held: current,
            rising: current && !self.state.previous,
            falling: !current && self.state.previous,
        };

        self.state = DetectorState {
            previous: current,
            pressed,
        };
        signal
    }
}

/// Hysteretic threshold with press at `threshold`, release below `threshold - hysteresis`
pub fn schmitt(was_pressed: bool, raw: f32, polarity: Polarity, threshold: f32, hysteresis: f32) -> bool {
    let value = match polarity {
        Polarity::Pos => raw,
        Polarity::Neg => -raw,
        Polarity::Abs => raw.abs(),
    };
    let release = (threshold - hysteresis).max(0.0);

    if was_pressed {
        value >= release
    } else {
        value >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(detector: &mut EdgeDetector, values: &[f32]) -> Vec<bool> {
        values
            .iter()
            .map(|v| detector.update(RawInput::Axis(*v), true).held)
            .collect()
    }

    #[test]
    fn button_rising_edge_fires_once() {
        let mut d = EdgeDetector::button();
        let a = d.update(RawInput::Button(true), true);
        let b = d.update(RawInput::Button(true), true);
        let c = d.update(RawInput::Button(false), true);
        assert!(a.rising && a.held);
        assert!(!b.rising && b.held);
        assert!(c.falling && !c.held);
    }

    #[test]
    fn hysteresis_does_not_release_early() {
        let cases = [(0.6, 0.1), (0.5, 0.0), (1.0, 0.5), (0.3, 0.29), (0.8, 0.2)];
        for (t, h) in cases {
            let mut d = EdgeDetector::axis_button(Polarity::Pos, t, h);
            let held = feed(&mut d, &[0.0, t, t - h / 2.0, 0.0]);
            assert_eq!(held, vec![false, true, true, false], "t={} h={}", t, h);
        }
    }

    #[test]
    fn near_threshold_does_not_chatter() {
        let mut d = EdgeDetector::axis_button(Polarity::Pos, 0.6, 0.1);
        let held = feed(&mut d, &[0.61, 0.59, 0.61, 0.55, 0.49, 0.59, 0.6]);
        assert_eq!(held, vec![true, true, true, true, false, false, true]);
    }

    #[test]
    fn negative_polarity_mirrors_positive() {
        let mut d = EdgeDetector::axis_button(Polarity::Neg, 0.5, 0.1);
        let held = feed(&mut d, &[0.9, -0.5, -0.45, -0.39, -0.5]);
        assert_eq!(held, vec![false, true, true, false, true]);
    }

    #[test]
    fn abs_polarity_uses_magnitude() {
        let mut d = EdgeDetector::axis_button(Polarity::Abs, 0.5, 0.2);
        let held = feed(&mut d, &[-0.6, 0.35, 0.29, 0.5]);
        assert_eq!(held, vec![true, true, false, true]);
    }

    #[test]
    fn large_hysteresis_clamps_release_bound_to_zero() {
        let mut d = EdgeDetector::axis_button(Polarity::Pos, 0.4, 0.9);
        let held = feed(&mut d, &[0.4, 0.01, 0.0, -0.01]);
        assert_eq!(held, vec![true, true, true, false]);
    }

    #[test]
    fn closed_gate_suppresses_but_keeps_hysteresis_state() {
        let mut d = EdgeDetector::axis_button(Polarity::Pos, 0.6, 0.1);
        let s = d.update(RawInput::Axis(0.7), false);
        assert!(!s.held && !s.rising);

        // gate opens while the axis sits inside the hysteresis band
        let s = d.update(RawInput::Axis(0.55), true);
        assert!(s.held && s.rising);
    }

    #[test]
    fn gate_closing_produces_falling_edge() {
        let mut d = EdgeDetector::button();
        d.update(RawInput::Button(true), true);
        let s = d.update(RawInput::Button(true), false);
        assert!(s.falling && !s.held);
    }
}
