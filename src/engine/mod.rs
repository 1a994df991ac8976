//! Engine lifecycle with statum typestate
//!
//! The engine owns every component and all per-tick state. It is created in
//! `Initializing`, where nothing has touched the devices or the desktop yet,
//! and becomes `Running` once all bindings and geometry are resolved.
//!
//! ```text
//! Initializing ──start()──► Running ──tick(now)──┐
//!                              ▲                  │
//!                              └──────────────────┘
//! ```
//!
//! # Tick
//!
//! ```text
//! Sampler ──► SnapshotCache ──► InputMapper ──► InputFrame
//!                                                  │
//!                   ┌──────────────────┬───────────┴──────────┐
//!                   ▼                  ▼                      ▼
//!          MotionIntegrator     ClickDispatcher       WheelAccumulator
//!                   │                  │                      │
//!                   ▼                  │                      │
//!          PinStateMachine ──► RegionResolver                 │
//!                   │                  │                      │
//!                   └──────────► InjectionSink ◄──────────────┘
//! ```

pub mod pin;
pub mod pointer;
pub mod scheduler;

use std::time::{Duration, Instant};

use statum::{machine, state};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::controller::device::{DeviceSampler, SnapshotCache};
use crate::diagnostics;
use crate::geometry::region::GeometryError;
use crate::geometry::{Desktop, RegionResolver};
use crate::mapping::{Action, ActionTable, BindingError, InputMapper, MotionIntegrator, MotionSettings};
use crate::platform::InjectionSink;

use pin::{ActivationEdges, ActivationState, PinSettings, PinStateMachine, Surroundings};
use pointer::{ClickDispatcher, WheelAccumulator};

/// Largest time step fed to the integrators after a stall
pub const MAX_DT: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Binding(BindingError),

    #[error("Required controller is not connected")]
    DeviceUnavailable(#[source] BindingError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("Engine is not started")]
    NotStarted,
}

impl From<BindingError> for EngineError {
    fn from(e: BindingError) -> Self {
        match e {
            BindingError::UnknownDevice { .. } => EngineError::DeviceUnavailable(e),
            other => EngineError::Binding(other),
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum EngineState {
    Initializing,
    Running,
}

/// Everything built by `start` and mutated by `tick`
pub struct Runtime {
    cache: SnapshotCache,
    wanted: Vec<usize>,
    mapper: InputMapper,
    motion: MotionIntegrator,
    pin: PinStateMachine,
    region: RegionResolver,
    clicks: ClickDispatcher,
    wheel: WheelAccumulator,
    grace_until: Instant,
    in_grace: bool,
    last_tick: Instant,
    debug_io: bool,
}

#[machine]
pub struct Engine<S: EngineState> {
    config: Config,
    sampler: Box<dyn DeviceSampler>,
    sink: Box<dyn InjectionSink>,
    desktop: Box<dyn Desktop>,
    runtime: Option<Runtime>,
}

impl Engine<Initializing> {
    pub fn create(
        config: Config,
        sampler: Box<dyn DeviceSampler>,
        sink: Box<dyn InjectionSink>,
        desktop: Box<dyn Desktop>,
    ) -> Self {
        info!("Initializing engine");
        Self::new(config, sampler, sink, desktop, None)
    }

    /// Resolves bindings and geometry and transitions to `Running`.
    ///
    /// `now` starts the startup grace period.
    pub fn start(mut self, now: Instant) -> Result<Engine<Running>, EngineError> {
        self.config.validate()?;
        let input = &self.config.input;

        let devices = self.sampler.devices().to_vec();
        let table = ActionTable::resolve(input, &devices)?;
        let wanted = table.devices_in_use();
        debug!("Sampling device slots {:?}", wanted);

        let region = RegionResolver::new(input, self.desktop.as_ref())?;
        let pin_settings = PinSettings::from_config(&self.config)?;

        diagnostics::log_startup(
            &devices,
            &self.desktop.monitors(),
            &table,
            &region,
            &self.config,
        );

        let runtime = Runtime {
            cache: SnapshotCache::new(devices.len()),
            wanted,
            mapper: InputMapper::new(&table, input),
            motion: MotionIntegrator::new(MotionSettings::from_config(input)),
            pin: PinStateMachine::new(pin_settings),
            region,
            clicks: ClickDispatcher::new(input.debug_buttons),
            wheel: WheelAccumulator::new(input.wheel_ticks_per_second),
            grace_until: now + Duration::from_millis(input.startup_grace_ms),
            in_grace: input.startup_grace_ms > 0,
            last_tick: now,
            debug_io: input.debug_io,
        };

        self.runtime = Some(runtime);
        info!("Engine running");
        Ok(self.transition())
    }
}

impl Engine<Running> {
    /// One poll cycle: sample, detect, integrate, dispatch
    pub fn tick(&mut self, now: Instant) -> Result<(), EngineError> {
        let runtime = match &mut self.runtime {
            Some(r) => r,
            None => return Err(EngineError::NotStarted),
        };

        let dt = now
            .saturating_duration_since(runtime.last_tick)
            .min(MAX_DT)
            .as_secs_f64();
        runtime.last_tick = now;

        runtime
            .cache
            .update(self.sampler.as_mut(), &runtime.wanted, runtime.debug_io);
        let frame = runtime.mapper.sample(&runtime.cache);
        let displacement = runtime.motion.step(&frame, dt);

        if runtime.in_grace {
            if now < runtime.grace_until {
                return Ok(());
            }
            runtime.in_grace = false;
            debug!("Startup grace over");
        }

        let edges = ActivationEdges {
            toggle: frame.rising(Action::Toggle),
            on: frame.rising(Action::On),
            off: frame.rising(Action::Off),
        };
        let mut env = Surroundings {
            sink: self.sink.as_mut(),
            desktop: self.desktop.as_ref(),
            region: &mut runtime.region,
        };
        runtime.pin.tick(edges, displacement, now, &mut env);

        runtime.clicks.dispatch(&frame, self.sink.as_mut());
        runtime.wheel.dispatch(&frame, dt, self.sink.as_mut());
        Ok(())
    }

    pub fn activation(&self) -> ActivationState {
        self.runtime
            .as_ref()
            .map(|r| r.pin.state())
            .unwrap_or(ActivationState::Inactive)
    }

    /// Region-relative target position
    pub fn target(&self) -> (f64, f64) {
        self.runtime
            .as_ref()
            .map(|r| r.pin.target())
            .unwrap_or((0.0, 0.0))
    }

    #[cfg(test)]
    pub(crate) fn last_tick(&self) -> Option<Instant> {
        self.runtime.as_ref().map(|r| r.last_tick)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.config.input.poll_hz.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::device::tests::FakeSampler;
    use crate::controller::device::SampleError;
    use crate::geometry::tests::FakeDesktop;
    use crate::geometry::Rect;
    use crate::platform::tests::RecordingSink;
    use crate::platform::SinkError;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Sink handle shared between the engine and the test
    #[derive(Clone, Default)]
    struct SharedSink(Rc<RefCell<RecordingSink>>);

    impl InjectionSink for SharedSink {
        fn move_cursor(&mut self, x: i32, y: i32) -> Result<(), SinkError> {
            self.0.borrow_mut().move_cursor(x, y)
        }
        fn cursor_position(&self) -> Result<(i32, i32), SinkError> {
            self.0.borrow().cursor_position()
        }
        fn set_button(&mut self, button: crate::platform::MouseButton, pressed: bool) -> Result<(), SinkError> {
            self.0.borrow_mut().set_button(button, pressed)
        }
        fn scroll(&mut self, ticks: i32) -> Result<(), SinkError> {
            self.0.borrow_mut().scroll(ticks)
        }
        fn restore_if_minimized(&mut self, window: crate::geometry::WindowHandle) -> Result<(), SinkError> {
            self.0.borrow_mut().restore_if_minimized(window)
        }
        fn focus_window(&mut self, window: crate::geometry::WindowHandle, force: bool) -> Result<(), SinkError> {
            self.0.borrow_mut().focus_window(window, force)
        }
        fn is_foreground(&self, window: crate::geometry::WindowHandle) -> bool {
            self.0.borrow().is_foreground(window)
        }
    }

    /// Sampler handle shared between the engine and the test
    #[derive(Clone)]
    struct SharedSampler(Rc<RefCell<FakeSampler>>, Vec<crate::controller::device::DeviceInfo>);

    impl DeviceSampler for SharedSampler {
        fn devices(&self) -> &[crate::controller::device::DeviceInfo] {
            &self.1
        }
        fn refresh(&mut self) -> Vec<crate::controller::device::DeviceChange> {
            self.0.borrow_mut().refresh()
        }
        fn sample(&mut self, device: usize) -> Result<crate::controller::device::DeviceSample, SampleError> {
            self.0.borrow_mut().sample(device)
        }
    }

    const BASE: &str = r#"
[input]
button_toggle = "devIdx:0:button:1"
button_off = "devIdx:0:button:2"
button_mouse_left = "devIdx:0:button:3"
button_wheel_up = "devIdx:0:axis:1:neg:0.5"
button_inc_x = "devIdx:0:button:4"
axis_x = "devIdx:0:axis:0"
axis_deadzone = 0.0
nudge_velocity_px_s = 400
axis_velocity_px_s = 800
wheel_ticks_per_second = 10
x_frac = 0.5
y_frac = 0.5
monitor_index = 1
startup_grace_ms = 100
toggle_debounce_ms = 0
"#;

    struct Rig {
        engine: Engine<Running>,
        pad: Rc<RefCell<FakeSampler>>,
        sink: Rc<RefCell<RecordingSink>>,
        start: Instant,
    }

    impl Rig {
        fn new(extra: &str) -> Self {
            let config = Config::from_toml_str(&format!("{}{}", BASE, extra)).unwrap();
            let fake = FakeSampler::with_devices(&[("pad", 12, 4)]);
            let devices = fake.devices.clone();
            let pad = Rc::new(RefCell::new(fake));
            let sink = SharedSink::default();
            let desktop = FakeDesktop::with_monitors(&[
                Rect::new(0, 0, 2560, 1440),
                Rect::new(2560, 0, 1920, 1080),
            ]);
            let start = Instant::now();
            let engine = Engine::create(
                config,
                Box::new(SharedSampler(pad.clone(), devices)),
                Box::new(sink.clone()),
                Box::new(desktop),
            )
            .start(start)
            .unwrap();
            Self {
                engine,
                pad,
                sink: sink.0,
                start,
            }
        }

        fn at(&mut self, ms: u64) {
            self.engine
                .tick(self.start + Duration::from_millis(ms))
                .unwrap();
        }

        fn press(&mut self, button: usize, pressed: bool) {
            self.pad.borrow_mut().set_button(0, button, pressed);
        }

        fn moves(&self) -> Vec<(i32, i32)> {
            self.sink.borrow().moves()
        }
    }

    #[test]
    fn toggle_on_second_monitor_targets_centre() {
        let mut rig = Rig::new("");
        rig.at(100);
        rig.press(0, true);
        rig.at(110);
        assert_eq!(rig.engine.activation(), ActivationState::Active);
        assert_eq!(rig.engine.target(), (960.0, 540.0));
        assert_eq!(rig.moves(), vec![(3520, 540)]);
    }

    #[test]
    fn grace_period_suppresses_dispatch() {
        let mut rig = Rig::new("");
        rig.press(0, true);
        rig.press(2, true);
        rig.at(10);
        rig.at(50);
        assert_eq!(rig.engine.activation(), ActivationState::Inactive);
        assert!(rig.sink.borrow().calls.is_empty());

        // held through the grace period: no rising edge afterwards
        rig.at(120);
        assert_eq!(rig.engine.activation(), ActivationState::Inactive);
        // but the held click is reconciled
        assert_eq!(
            rig.sink.borrow().buttons(),
            vec![(crate::platform::MouseButton::Left, true)]
        );
    }

    #[test]
    fn off_beats_toggle_in_same_tick() {
        let mut rig = Rig::new("");
        rig.at(100);
        rig.press(0, true);
        rig.at(110);
        rig.press(0, false);
        rig.at(120);

        rig.press(0, true);
        rig.press(1, true);
        rig.at(130);
        assert_eq!(rig.engine.activation(), ActivationState::Inactive);
    }

    #[test]
    fn nudge_and_axis_move_target() {
        let mut rig = Rig::new("");
        rig.at(100);
        rig.press(0, true);
        rig.at(200);
        rig.press(3, true);
        rig.pad.borrow_mut().set_axis(0, 0, 0.5);
        rig.at(300);
        // 400 * 0.1 + 0.5 * 800 * 0.1
        assert_eq!(rig.engine.target(), (1040.0, 540.0));
        assert_eq!(rig.moves().last(), Some(&(3600, 540)));
    }

    #[test]
    fn dt_is_capped_after_stall() {
        let mut rig = Rig::new("");
        rig.at(100);
        rig.press(0, true);
        rig.at(110);
        rig.press(3, true);
        rig.at(5110);
        // 400 px/s for at most 250 ms
        assert_eq!(rig.engine.target(), (1060.0, 540.0));
    }

    #[test]
    fn clicks_and_wheel_work_while_inactive() {
        let mut rig = Rig::new("");
        rig.at(100);
        rig.press(2, true);
        rig.pad.borrow_mut().set_axis(0, 1, -0.8);
        rig.at(200);
        rig.at(400);
        rig.press(2, false);
        rig.at(500);
        assert_eq!(rig.engine.activation(), ActivationState::Inactive);
        let sink = rig.sink.borrow();
        assert_eq!(
            sink.buttons(),
            vec![
                (crate::platform::MouseButton::Left, true),
                (crate::platform::MouseButton::Left, false)
            ]
        );
        // 10 ticks/s held for 0.1 + 0.2 + 0.1 s
        assert_eq!(sink.scrolled(), 4);
        assert!(sink.moves().is_empty());
    }

    #[test]
    fn disconnected_device_releases_bindings() {
        let mut rig = Rig::new("");
        rig.at(100);
        rig.press(2, true);
        rig.at(110);
        rig.pad.borrow_mut().current[0] = Err(SampleError::Disconnected(0));
        rig.at(120);
        assert_eq!(
            rig.sink.borrow().buttons(),
            vec![
                (crate::platform::MouseButton::Left, true),
                (crate::platform::MouseButton::Left, false)
            ]
        );
    }

    #[test]
    fn unknown_device_fails_start() {
        let config = Config::from_toml_str(&BASE.replace(
            "button_off = \"devIdx:0:button:2\"",
            "button_off = \"dev:missing:button:2\"",
        ))
        .unwrap();
        let fake = FakeSampler::with_devices(&[("pad", 12, 4)]);
        let err = Engine::create(
            config,
            Box::new(fake),
            Box::new(RecordingSink::default()),
            Box::new(FakeDesktop::with_monitors(&[Rect::new(0, 0, 800, 600)])),
        )
        .start(Instant::now())
        .err()
        .unwrap();
        assert!(matches!(err, EngineError::DeviceUnavailable(_)));
    }

    #[test]
    fn bad_index_fails_start() {
        let config = Config::from_toml_str(&BASE.replace("devIdx:0:button:3", "devIdx:0:button:0")).unwrap();
        let fake = FakeSampler::with_devices(&[("pad", 12, 4)]);
        let err = Engine::create(
            config,
            Box::new(fake),
            Box::new(RecordingSink::default()),
            Box::new(FakeDesktop::with_monitors(&[Rect::new(0, 0, 800, 600)])),
        )
        .start(Instant::now())
        .err()
        .unwrap();
        assert!(matches!(
            err,
            EngineError::Binding(BindingError::IndexOutOfRange { .. })
        ));
    }
}
