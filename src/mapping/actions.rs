//! Action table and per-tick input mapping
//!
//! [`ActionTable`] is the startup product: every configured action resolved
//! into a list of [`ResolvedBinding`]s plus the shared modifier. [`InputMapper`]
//! owns one [`EdgeDetector`] per bound input and turns a snapshot of all
//! devices into an [`InputFrame`] every tick.
//!
//! Several bindings of one action are OR-ed into a single level, and the
//! action's edges are taken from that combined level. Analog bindings of one
//! axis pass the deadzone individually and their responses are summed.

use std::fmt;

use tracing::{info, warn};

use crate::config::{BindingList, InputConfig};
use crate::controller::detector::{EdgeDetector, RawInput, Signal};
use crate::controller::device::{DeviceInfo, SnapshotCache};
use crate::mapping::binding::{parse_binding, Accepts, BindingKind, ResolvedBinding};
use crate::mapping::error::BindingError;
use crate::mapping::motion::analog_response;

/// Button-like actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Toggle,
    On,
    Off,
    IncX,
    DecX,
    IncY,
    DecY,
    MouseLeft,
    MouseRight,
    WheelUp,
    WheelDown,
}

impl Action {
    pub const ALL: [Action; 11] = [
        Action::Toggle,
        Action::On,
        Action::Off,
        Action::IncX,
        Action::DecX,
        Action::IncY,
        Action::DecY,
        Action::MouseLeft,
        Action::MouseRight,
        Action::WheelUp,
        Action::WheelDown,
    ];

    /// Config key the action is read from
    pub fn key(self) -> &'static str {
        match self {
            Action::Toggle => "button_toggle",
            Action::On => "button_on",
            Action::Off => "button_off",
            Action::IncX => "button_inc_x",
            Action::DecX => "button_dec_x",
            Action::IncY => "button_inc_y",
            Action::DecY => "button_dec_y",
            Action::MouseLeft => "button_mouse_left",
            Action::MouseRight => "button_mouse_right",
            Action::WheelUp => "button_wheel_up",
            Action::WheelDown => "button_wheel_down",
        }
    }

    fn bindings(self, input: &InputConfig) -> &BindingList {
        match self {
            Action::Toggle => &input.button_toggle,
            Action::On => &input.button_on,
            Action::Off => &input.button_off,
            Action::IncX => &input.button_inc_x,
            Action::DecX => &input.button_dec_x,
            Action::IncY => &input.button_inc_y,
            Action::DecY => &input.button_dec_y,
            Action::MouseLeft => &input.button_mouse_left,
            Action::MouseRight => &input.button_mouse_right,
            Action::WheelUp => &input.button_wheel_up,
            Action::WheelDown => &input.button_wheel_down,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// All resolved bindings of the configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionTable {
    buttons: Vec<Vec<ResolvedBinding>>,
    pub axis_x: Vec<ResolvedBinding>,
    pub axis_y: Vec<ResolvedBinding>,
    pub modifier: Option<ResolvedBinding>,
}

impl ActionTable {
    /// Resolves every configured binding against the enumerated devices.
    ///
    /// A modifier on a missing device is dropped with a warning; any other
    /// unresolved binding is an error.
    pub fn resolve(input: &InputConfig, devices: &[DeviceInfo]) -> Result<Self, BindingError> {
        let mut buttons = Vec::with_capacity(Action::ALL.len());
        for action in Action::ALL {
            buttons.push(resolve_list(action.bindings(input), Accepts::Buttons, devices)?);
        }

        let modifier = match parse_binding(&input.modifier, Accepts::ButtonOnly)? {
            Some(binding) => match binding.resolve(devices) {
                Ok(resolved) => Some(resolved),
                Err(BindingError::UnknownDevice { selector, .. }) => {
                    warn!(
                        "Modifier device '{}' not present, modifier is never held",
                        selector
                    );
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok(Self {
            buttons,
            axis_x: resolve_list(&input.axis_x, Accepts::Analog, devices)?,
            axis_y: resolve_list(&input.axis_y, Accepts::Analog, devices)?,
            modifier,
        })
    }

    pub fn bindings(&self, action: Action) -> &[ResolvedBinding] {
        self.buttons
            .get(action.slot())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Device slots referenced by at least one binding, sorted
    pub fn devices_in_use(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self
            .buttons
            .iter()
            .flatten()
            .chain(&self.axis_x)
            .chain(&self.axis_y)
            .chain(self.modifier.iter())
            .map(|b| b.device)
            .collect();
        slots.sort_unstable();
        slots.dedup();
        slots
    }
}

fn resolve_list(
    list: &BindingList,
    accepts: Accepts,
    devices: &[DeviceInfo],
) -> Result<Vec<ResolvedBinding>, BindingError> {
    let mut resolved = Vec::new();
    for expr in list.iter() {
        if let Some(binding) = parse_binding(expr, accepts)? {
            resolved.push(binding.resolve(devices)?);
        }
    }
    Ok(resolved)
}

/// Modifier gate for one binding.
///
/// A marked binding needs the modifier held. In layer mode an unmarked binding
/// additionally needs it released.
pub fn gate_open(requires_modifier: bool, modifier_held: bool, layer: bool) -> bool {
    if requires_modifier {
        modifier_held
    } else {
        !(layer && modifier_held)
    }
}

/// Mapped input of one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFrame {
    signals: [Signal; 11],
    /// Sum of the deadzone-rescaled x bindings, clamped to [-1, 1]
    pub axis_x: f32,
    pub axis_y: f32,
    pub modifier_held: bool,
}

impl InputFrame {
    pub fn signal(&self, action: Action) -> Signal {
        self.signals[action.slot()]
    }

    pub fn held(&self, action: Action) -> bool {
        self.signal(action).held
    }

    pub fn rising(&self, action: Action) -> bool {
        self.signal(action).rising
    }
}

#[cfg(test)]
impl InputFrame {
    pub(crate) fn with_axes(axis_x: f32, axis_y: f32) -> Self {
        Self {
            axis_x,
            axis_y,
            ..Self::default()
        }
    }

    pub(crate) fn set(&mut self, action: Action, signal: Signal) {
        self.signals[action.slot()] = signal;
    }
}

#[derive(Debug, Clone)]
struct BoundInput {
    binding: ResolvedBinding,
    detector: EdgeDetector,
}

#[derive(Debug, Clone, Default)]
struct Channel {
    inputs: Vec<BoundInput>,
    previous: bool,
}

/// Runtime half of the action table
#[derive(Debug, Clone)]
pub struct InputMapper {
    channels: Vec<Channel>,
    axis_x: Vec<ResolvedBinding>,
    axis_y: Vec<ResolvedBinding>,
    modifier: Option<ResolvedBinding>,
    deadzone_x: f32,
    deadzone_y: f32,
    layer: bool,
    debug_buttons: bool,
}

impl InputMapper {
    pub fn new(table: &ActionTable, input: &InputConfig) -> Self {
        let hysteresis = input.axis_button_hysteresis;
        let channels = Action::ALL
            .iter()
            .map(|action| Channel {
                inputs: table
                    .bindings(*action)
                    .iter()
                    .map(|binding| BoundInput {
                        detector: match binding.kind {
                            BindingKind::AxisButton {
                                polarity,
                                threshold,
                            } => EdgeDetector::axis_button(polarity, threshold, hysteresis),
                            _ => EdgeDetector::button(),
                        },
                        binding: binding.clone(),
                    })
                    .collect(),
                previous: false,
            })
            .collect();

        Self {
            channels,
            axis_x: table.axis_x.clone(),
            axis_y: table.axis_y.clone(),
            modifier: table.modifier.clone(),
            deadzone_x: input.deadzone_x(),
            deadzone_y: input.deadzone_y(),
            layer: input.modifier_layer,
            debug_buttons: input.debug_buttons,
        }
    }

    /// Runs every detector once against the snapshot
    pub fn sample(&mut self, cache: &SnapshotCache) -> InputFrame {
        // held level only, never edge-detected
        let modifier_held = self
            .modifier
            .as_ref()
            .map(|m| cache.button(m.device, m.index))
            .unwrap_or(false);

        let mut frame = InputFrame {
            modifier_held,
            ..InputFrame::default()
        };

        for (action, channel) in Action::ALL.iter().zip(self.channels.iter_mut()) {
            let mut level = false;
            for input in channel.inputs.iter_mut() {
                let raw = read_raw(cache, &input.binding);
                let gate = gate_open(input.binding.requires_modifier, modifier_held, self.layer);
                let signal = input.detector.update(raw, gate);
                if self.debug_buttons && (signal.rising || signal.falling) {
                    info!(
                        "{} {} via {}",
                        action,
                        if signal.rising { "pressed" } else { "released" },
                        input.binding
                    );
                }
                level |= signal.held;
            }

            frame.signals[action.slot()] = Signal {
                held: level,
                rising: level && !channel.previous,
                falling: !level && channel.previous,
            };
            channel.previous = level;
        }

        frame.axis_x = self.sum_axis(&self.axis_x, self.deadzone_x, cache, modifier_held);
        frame.axis_y = self.sum_axis(&self.axis_y, self.deadzone_y, cache, modifier_held);
        frame
    }

    fn sum_axis(
        &self,
        bindings: &[ResolvedBinding],
        deadzone: f32,
        cache: &SnapshotCache,
        modifier_held: bool,
    ) -> f32 {
        let total: f64 = bindings
            .iter()
            .filter(|b| gate_open(b.requires_modifier, modifier_held, self.layer))
            .map(|b| analog_response(cache.axis(b.device, b.index), deadzone))
            .sum();
        total.clamp(-1.0, 1.0) as f32
    }
}

fn read_raw(cache: &SnapshotCache, binding: &ResolvedBinding) -> RawInput {
    match binding.kind {
        BindingKind::Button => RawInput::Button(cache.button(binding.device, binding.index)),
        BindingKind::AxisAnalog | BindingKind::AxisButton { .. } => {
            RawInput::Axis(cache.axis(binding.device, binding.index))
        }
    }
}
