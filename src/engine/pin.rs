//! Pin/toggle state machine
//!
//! Owns the activation state and the target position. While active the
//! target follows the integrated motion and is re-applied to the cursor
//! whenever it moves and at least once per repeat interval.
//!
//! ```text
//!             toggle / on
//!   Inactive ─────────────► Active ──┐ motion, repeat
//!       ▲                     │  ◄───┘
//!       └─────────────────────┘
//!             toggle / off
//! ```

use std::mem;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{Anchor, Config, ConfigError, WindowAnchor};
use crate::geometry::{Desktop, RegionResolver};
use crate::platform::InjectionSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Inactive,
    Active,
}

/// State requested by this tick's activation edges, if any.
///
/// OFF wins over ON, ON wins over toggle. `None` means no change.
pub fn requested_state(
    current: ActivationState,
    toggle: bool,
    on: bool,
    off: bool,
) -> Option<ActivationState> {
    let next = if off {
        ActivationState::Inactive
    } else if on {
        ActivationState::Active
    } else if toggle {
        match current {
            ActivationState::Inactive => ActivationState::Active,
            ActivationState::Active => ActivationState::Inactive,
        }
    } else {
        return None;
    };
    (next != current).then_some(next)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PinSettings {
    pub anchor: Anchor,
    pub window_anchor: WindowAnchor,
    pub center_in_window: bool,
    pub needs_window: bool,
    pub focus_on_toggle: bool,
    pub restore_if_minimized: bool,
    pub force_foreground: bool,
    pub debounce: Duration,
    pub repeat: Duration,
    pub wiggle: bool,
    pub restore_on_off: bool,
    pub toggle_feedback: bool,
    pub log_apply: bool,
}

impl PinSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let input = &config.input;
        Ok(Self {
            anchor: config.anchor()?,
            window_anchor: config.window_anchor()?,
            center_in_window: input.center_in_window_on_toggle,
            needs_window: config.needs_window(),
            focus_on_toggle: input.focus_on_toggle,
            restore_if_minimized: input.window_restore_if_minimized,
            force_foreground: input.window_force_foreground,
            debounce: Duration::from_millis(input.toggle_debounce_ms),
            repeat: Duration::from_millis(input.repeat_ms),
            wiggle: input.wiggle_one_pixel,
            restore_on_off: input.restore_on_off,
            toggle_feedback: input.toggle_feedback,
            log_apply: input.log_apply,
        })
    }
}

/// Collaborators the state machine acts on
pub struct Surroundings<'a> {
    pub sink: &'a mut dyn InjectionSink,
    pub desktop: &'a dyn Desktop,
    pub region: &'a mut RegionResolver,
}

/// Activation edges of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationEdges {
    pub toggle: bool,
    pub on: bool,
    pub off: bool,
}

#[derive(Debug, Clone)]
pub struct PinStateMachine {
    settings: PinSettings,
    state: ActivationState,
    /// Region-relative target
    target: (f64, f64),
    last_change: Option<Instant>,
    last_apply: Option<Instant>,
    wiggle_positive: bool,
    saved_cursor: Option<(i32, i32)>,
}

impl PinStateMachine {
    pub fn new(settings: PinSettings) -> Self {
        Self {
            settings,
            state: ActivationState::Inactive,
            target: (0.0, 0.0),
            last_change: None,
            last_apply: None,
            wiggle_positive: true,
            saved_cursor: None,
        }
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn target(&self) -> (f64, f64) {
        self.target
    }

    /// Runs one tick: activation changes first, then motion and re-assertion.
    pub fn tick(
        &mut self,
        edges: ActivationEdges,
        displacement: (f64, f64),
        now: Instant,
        env: &mut Surroundings<'_>,
    ) {
        if let Some(next) = requested_state(self.state, edges.toggle, edges.on, edges.off) {
            let debounced = self
                .last_change
                .is_some_and(|last| now.saturating_duration_since(last) < self.settings.debounce);
            if debounced {
                debug!("Ignoring activation change to {:?} within debounce", next);
            } else {
                self.last_change = Some(now);
                match next {
                    ActivationState::Active => {
                        self.activate(now, env);
                        // the activation apply already happened
                        return;
                    }
                    ActivationState::Inactive => self.deactivate(env),
                }
            }
        }

        if self.state != ActivationState::Active {
            return;
        }

        let region = env.region.region();
        let previous = self.target;
        self.target =
            region.clamp_relative(previous.0 + displacement.0, previous.1 + displacement.1);
        let moved = self.target != previous;
        let due = self
            .last_apply
            .map_or(true, |last| now.saturating_duration_since(last) >= self.settings.repeat);

        if moved || due {
            self.apply(now, env);
        }
    }

    fn activate(&mut self, now: Instant, env: &mut Surroundings<'_>) {
        self.state = ActivationState::Active;

        if self.settings.restore_on_off {
            match env.sink.cursor_position() {
                Ok(position) => self.saved_cursor = Some(position),
                Err(e) => warn!("Could not read cursor position: {}", e),
            }
        }

        let window = if self.settings.needs_window {
            env.region.lookup_window(env.desktop, now)
        } else {
            None
        };

        if let (true, Some(window)) = (self.settings.focus_on_toggle, window) {
            if self.settings.restore_if_minimized {
                if let Err(e) = env.sink.restore_if_minimized(window) {
                    warn!("Could not restore target window: {}", e);
                }
            }
            if !env.sink.is_foreground(window) {
                if let Err(e) = env.sink.focus_window(window, self.settings.force_foreground) {
                    warn!("Could not focus target window: {}", e);
                }
            }
        }

        self.target = env.region.initial_target(
            self.settings.anchor,
            self.settings.window_anchor,
            self.settings.center_in_window,
        );

        if self.settings.toggle_feedback {
            info!(
                "Pin ON, target ({:.0}, {:.0}) in {:?}",
                self.target.0,
                self.target.1,
                env.region.region()
            );
        }
        self.apply(now, env);
    }

    fn deactivate(&mut self, env: &mut Surroundings<'_>) {
        self.state = ActivationState::Inactive;
        if self.settings.toggle_feedback {
            info!("Pin OFF");
        }
        if let Some((x, y)) = self.saved_cursor.take() {
            if let Err(e) = env.sink.move_cursor(x, y) {
                warn!("Could not restore cursor: {}", e);
            }
        }
    }

    fn apply(&mut self, now: Instant, env: &mut Surroundings<'_>) {
        let before = env.region.region();
        env.region.refresh(env.desktop, now);
        let region = env.region.region();
        if mem::discriminant(&before) != mem::discriminant(&region) {
            // keep the absolute position when the region kind switches
            let (old, new) = (before.bounds(), region.bounds());
            self.target = (
                self.target.0 + f64::from(old.x - new.x),
                self.target.1 + f64::from(old.y - new.y),
            );
            debug!("Clamp region changed to {:?}, target re-based", region);
        }
        self.target = region.clamp_relative(self.target.0, self.target.1);
        let (mut x, y) = region.to_screen(self.target.0, self.target.1);

        if self.settings.wiggle {
            let bounds = region.bounds();
            let delta = if self.wiggle_positive { 1 } else { -1 };
            self.wiggle_positive = !self.wiggle_positive;
            x = (x + delta).clamp(bounds.x, (bounds.right() - 1).max(bounds.x));
        }

        self.last_apply = Some(now);
        match env.sink.move_cursor(x, y) {
            Ok(()) => {
                if self.settings.log_apply {
                    info!(
                        "[{}] cursor -> ({}, {})",
                        chrono::Local::now().format("%H:%M:%S%.3f"),
                        x,
                        y
                    );
                }
            }
            Err(e) => warn!("Cursor move failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::geometry::tests::FakeDesktop;
    use crate::geometry::{ClampRegion, Rect};
    use crate::platform::tests::{RecordingSink, SinkCall};

    struct Rig {
        pin: PinStateMachine,
        sink: RecordingSink,
        desktop: FakeDesktop,
        region: RegionResolver,
        start: Instant,
    }

    impl Rig {
        fn new(extra: &str) -> Self {
            let config = Config::from_toml_str(&format!(
                "[input]\nbutton_toggle = \"1\"\nx_frac = 0.5\ny_frac = 0.5\nmonitor_index = 1\n{}",
                extra
            ))
            .unwrap();
            let desktop = FakeDesktop::with_monitors(&[
                Rect::new(0, 0, 2560, 1440),
                Rect::new(2560, 0, 1920, 1080),
            ]);
            desktop.add_window(9, "Sim", "Simulator", Rect::new(2660, 100, 1000, 600));
            let region = RegionResolver::new(&config.input, &desktop).unwrap();
            Self {
                pin: PinStateMachine::new(PinSettings::from_config(&config).unwrap()),
                sink: RecordingSink::default(),
                desktop,
                region,
                start: Instant::now(),
            }
        }

        fn tick(&mut self, ms: u64, edges: ActivationEdges, displacement: (f64, f64)) {
            let mut env = Surroundings {
                sink: &mut self.sink,
                desktop: &self.desktop,
                region: &mut self.region,
            };
            self.pin.tick(
                edges,
                displacement,
                self.start + Duration::from_millis(ms),
                &mut env,
            );
        }
    }

    const NONE: ActivationEdges = ActivationEdges {
        toggle: false,
        on: false,
        off: false,
    };
    const TOGGLE: ActivationEdges = ActivationEdges {
        toggle: true,
        on: false,
        off: false,
    };

    #[test]
    fn off_wins_within_a_tick() {
        use ActivationState::*;
        assert_eq!(requested_state(Inactive, true, true, true), None);
        assert_eq!(requested_state(Active, true, true, true), Some(Inactive));
        assert_eq!(requested_state(Inactive, true, true, false), Some(Active));
        assert_eq!(requested_state(Active, true, true, false), None);
        assert_eq!(requested_state(Active, true, false, false), Some(Inactive));
        assert_eq!(requested_state(Active, false, false, false), None);
    }

    #[test]
    fn activation_targets_anchor_before_motion() {
        let mut rig = Rig::new("");
        rig.tick(0, TOGGLE, (50.0, 50.0));
        assert_eq!(rig.pin.state(), ActivationState::Active);
        assert_eq!(rig.pin.target(), (960.0, 540.0));
        assert_eq!(rig.sink.moves(), vec![(3520, 540)]);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut rig = Rig::new("");
        rig.tick(0, TOGGLE, (0.0, 0.0));
        rig.tick(500, TOGGLE, (0.0, 0.0));
        assert_eq!(rig.pin.state(), ActivationState::Inactive);
    }

    #[test]
    fn debounce_ignores_fast_second_toggle() {
        let mut rig = Rig::new("toggle_debounce_ms = 150\n");
        rig.tick(0, TOGGLE, (0.0, 0.0));
        rig.tick(100, TOGGLE, (0.0, 0.0));
        assert_eq!(rig.pin.state(), ActivationState::Active);
        rig.tick(300, TOGGLE, (0.0, 0.0));
        assert_eq!(rig.pin.state(), ActivationState::Inactive);
    }

    #[test]
    fn motion_only_while_active() {
        let mut rig = Rig::new("");
        rig.tick(0, NONE, (100.0, 0.0));
        assert!(rig.sink.moves().is_empty());
        assert_eq!(rig.pin.target(), (0.0, 0.0));

        rig.tick(10, TOGGLE, (0.0, 0.0));
        rig.tick(20, NONE, (10.0, -5.0));
        assert_eq!(rig.pin.target(), (970.0, 535.0));
        assert_eq!(rig.sink.moves().last(), Some(&(3530, 535)));
    }

    #[test]
    fn repeat_interval_reasserts_stationary_target() {
        let mut rig = Rig::new("repeat_ms = 100\n");
        rig.tick(0, TOGGLE, (0.0, 0.0));
        rig.tick(50, NONE, (0.0, 0.0));
        assert_eq!(rig.sink.moves().len(), 1);
        rig.tick(100, NONE, (0.0, 0.0));
        assert_eq!(rig.sink.moves().len(), 2);
        rig.tick(150, NONE, (0.0, 0.0));
        assert_eq!(rig.sink.moves().len(), 2);
        rig.tick(200, NONE, (0.0, 0.0));
        assert_eq!(rig.sink.moves().len(), 3);
    }

    #[test]
    fn target_is_clamped_to_region() {
        let mut rig = Rig::new("");
        rig.tick(0, TOGGLE, (0.0, 0.0));
        rig.tick(10, NONE, (5000.0, -5000.0));
        assert_eq!(rig.pin.target(), (1919.0, 0.0));
        assert_eq!(rig.sink.moves().last(), Some(&(4479, 0)));

        // pushing further against the edge is not a move
        let applied = rig.sink.moves().len();
        rig.tick(20, NONE, (10.0, 0.0));
        assert_eq!(rig.sink.moves().len(), applied);
    }

    #[test]
    fn wiggle_alternates() {
        let mut rig = Rig::new("wiggle_one_pixel = true\nrepeat_ms = 10\n");
        rig.tick(0, TOGGLE, (0.0, 0.0));
        rig.tick(10, NONE, (0.0, 0.0));
        rig.tick(20, NONE, (0.0, 0.0));
        assert_eq!(rig.sink.moves(), vec![(3521, 540), (3519, 540), (3521, 540)]);
    }

    #[test]
    fn restore_on_off_puts_cursor_back() {
        let mut rig = Rig::new("restore_on_off = true\n");
        rig.sink.cursor = (12, 34);
        rig.tick(0, TOGGLE, (0.0, 0.0));
        assert_eq!(rig.sink.cursor, (3520, 540));
        rig.tick(500, ActivationEdges { off: true, ..NONE }, (0.0, 0.0));
        assert_eq!(rig.sink.cursor, (12, 34));
    }

    #[test]
    fn off_leaves_cursor_without_restore() {
        let mut rig = Rig::new("");
        rig.tick(0, TOGGLE, (0.0, 0.0));
        rig.tick(500, ActivationEdges { off: true, ..NONE }, (0.0, 0.0));
        assert_eq!(rig.sink.moves().len(), 1);
    }

    #[test]
    fn focus_side_effects_precede_first_apply() {
        let mut rig = Rig::new(
            "focus_on_toggle = true\nfocus_window_class = \"Sim\"\nwindow_force_foreground = true\n",
        );
        rig.tick(0, TOGGLE, (0.0, 0.0));
        let window = crate::geometry::WindowHandle(9);
        assert_eq!(
            rig.sink.calls,
            vec![
                SinkCall::Restore(window),
                SinkCall::Focus(window, true),
                SinkCall::Move(3520, 540),
            ]
        );
    }

    #[test]
    fn window_clamp_centres_in_client_area() {
        let mut rig = Rig::new("clamp_space = \"window\"\nfocus_window_title = \"simulator\"\n");
        rig.tick(0, TOGGLE, (0.0, 0.0));
        assert_eq!(rig.pin.target(), (500.0, 300.0));
        assert_eq!(rig.sink.moves(), vec![(3160, 400)]);

        rig.tick(10, NONE, (1000.0, 0.0));
        assert_eq!(rig.sink.moves().last(), Some(&(3659, 400)));
    }

    #[test]
    fn late_window_keeps_cursor_in_place() {
        let mut rig = Rig::new("clamp_space = \"window\"\nfocus_window_class = \"Sim\"\n");
        rig.desktop.close_windows();
        rig.tick(0, TOGGLE, (0.0, 0.0));
        // no window yet: the monitor stands in
        assert_eq!(rig.sink.moves(), vec![(3520, 540)]);

        rig.desktop.add_window(9, "Sim", "Simulator", Rect::new(2660, 100, 1000, 600));
        rig.tick(1000, NONE, (0.0, 0.0));
        assert!(matches!(rig.region.region(), ClampRegion::WindowClient(..)));
        assert_eq!(rig.pin.target(), (860.0, 440.0));
        assert_eq!(rig.sink.moves().last(), Some(&(3520, 540)));

        rig.tick(1010, NONE, (10.0, 0.0));
        assert_eq!(rig.sink.moves().last(), Some(&(3530, 540)));
    }

    #[test]
    fn failed_move_is_not_fatal() {
        let mut rig = Rig::new("");
        rig.sink.fail_moves = true;
        rig.tick(0, TOGGLE, (0.0, 0.0));
        assert_eq!(rig.pin.state(), ActivationState::Active);
        rig.sink.fail_moves = false;
        rig.tick(10, NONE, (1.0, 0.0));
        assert_eq!(rig.sink.moves(), vec![(3521, 540)]);
    }
}
