use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use tracing::{debug, error, info, warn};

use crate::controller::device::{
    DeviceChange, DeviceInfo, DeviceSample, DeviceSampler, SampleError, SamplerError,
};

/// Button order exposed to bindings; external index N is `BUTTONS[N - 1]`
pub const BUTTONS: [Button; 19] = [
    Button::South,
    Button::East,
    Button::North,
    Button::West,
    Button::C,
    Button::Z,
    Button::LeftTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::Mode,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

/// Axis order exposed to bindings (0-based)
pub const AXES: [Axis; 8] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::LeftZ,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::RightZ,
    Axis::DPadX,
    Axis::DPadY,
];

/// [`DeviceSampler`] backed by gilrs
///
/// Slots are assigned in gilrs enumeration order at startup. A gamepad that
/// disconnects keeps its slot; when a gamepad with the same UUID connects
/// again it takes the slot back.
pub struct GilrsSampler {
    gilrs: Gilrs,
    devices: Vec<DeviceInfo>,
    slots: Vec<Option<GamepadId>>,
}

impl GilrsSampler {
    pub fn create() -> Result<Self, SamplerError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(SamplerError::InitializationError(e.to_string()));
            }
        };

        let mut devices = Vec::new();
        let mut slots = Vec::new();
        for (index, (id, gamepad)) in gilrs.gamepads().enumerate() {
            devices.push(DeviceInfo {
                index,
                identifier: format_uuid(gamepad.uuid()),
                name: gamepad.name().to_string(),
                button_count: BUTTONS.len(),
                axis_count: AXES.len(),
            });
            slots.push(Some(id));
        }

        if devices.is_empty() {
            warn!("No gamepad connected");
        }

        Ok(Self {
            gilrs,
            devices,
            slots,
        })
    }

    fn slot_of(&self, id: GamepadId) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(id))
    }
}

impl DeviceSampler for GilrsSampler {
    fn devices(&self) -> &[DeviceInfo] {
        &self.devices
    }

    fn refresh(&mut self) -> Vec<DeviceChange> {
        let mut changes = Vec::new();

        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Disconnected => {
                    if let Some(slot) = self.slot_of(id) {
                        self.slots[slot] = None;
                        changes.push(DeviceChange::Disconnected(slot));
                    }
                }
                EventType::Connected => {
                    if self.slot_of(id).is_some() {
                        continue;
                    }
                    let identifier = format_uuid(self.gilrs.gamepad(id).uuid());
                    let free = self.devices.iter().position(|d| {
                        d.identifier == identifier && self.slots[d.index].is_none()
                    });
                    match free {
                        Some(slot) => {
                            self.slots[slot] = Some(id);
                            changes.push(DeviceChange::Reconnected(slot));
                        }
                        None => {
                            info!(
                                "Ignoring gamepad {} connected after startup ({})",
                                identifier,
                                self.gilrs.gamepad(id).name()
                            );
                        }
                    }
                }
                other => debug!("gilrs event {:?} from {}", other, id),
            }
        }

        changes
    }

    fn sample(&mut self, device: usize) -> Result<DeviceSample, SampleError> {
        let id = self
            .slots
            .get(device)
            .copied()
            .flatten()
            .ok_or(SampleError::Disconnected(device))?;
        let gamepad = self
            .gilrs
            .connected_gamepad(id)
            .ok_or(SampleError::Disconnected(device))?;

        Ok(DeviceSample {
            buttons: BUTTONS.iter().map(|b| gamepad.is_pressed(*b)).collect(),
            axes: AXES.iter().map(|a| gamepad.value(*a)).collect(),
        })
    }
}

/// Renders a gilrs UUID as 32 lowercase hex digits
pub fn format_uuid(uuid: [u8; 16]) -> String {
    uuid.iter().map(|b| format!("{:02x}", b)).collect()
}
