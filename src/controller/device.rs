//! Device sampler seam
//!
//! The engine never talks to a gamepad library directly. It sees enumerated
//! [`DeviceInfo`] records and asks a [`DeviceSampler`] for one
//! [`DeviceSample`] per device and tick. [`SnapshotCache`] keeps the last good
//! sample of every device so transient read failures can be bridged.

use tracing::{debug, info, warn};

/// Enumerated controller, addressed by its slot index
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub index: usize,
    /// Stable identifier (GUID-like hex string)
    pub identifier: String,
    pub name: String,
    pub button_count: usize,
    pub axis_count: usize,
}

/// Raw state of one device at one poll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSample {
    /// Indexed 0-based
    pub buttons: Vec<bool>,
    /// Indexed 0-based, each value in [-1, 1]
    pub axes: Vec<f32>,
}

impl DeviceSample {
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    pub fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }
}

/// Connection changes reported by [`DeviceSampler::refresh`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceChange {
    Disconnected(usize),
    Reconnected(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("Failed to initialize device sampler: {0}")]
    InitializationError(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SampleError {
    /// The device is gone; its bindings read as inactive until it returns
    #[error("device {0} is disconnected")]
    Disconnected(usize),

    /// A single poll failed; the previous sample stays valid
    #[error("transient read failure on device {device}: {reason}")]
    Transient { device: usize, reason: String },
}

/// Polled source of controller state
pub trait DeviceSampler {
    /// Devices enumerated at startup, in slot order
    fn devices(&self) -> &[DeviceInfo];

    /// Pumps pending backend events and reports connection changes
    fn refresh(&mut self) -> Vec<DeviceChange>;

    /// Reads the current state of one device without blocking
    fn sample(&mut self, device: usize) -> Result<DeviceSample, SampleError>;
}

/// Last known sample per device slot
#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    samples: Vec<Option<DeviceSample>>,
}

impl SnapshotCache {
    pub fn new(device_count: usize) -> Self {
        Self {
            samples: vec![None; device_count],
        }
    }

    /// Refreshes every slot from the sampler.
    ///
    /// `wanted` restricts sampling to the slots some binding refers to.
    pub fn update(&mut self, sampler: &mut dyn DeviceSampler, wanted: &[usize], debug_io: bool) {
        for change in sampler.refresh() {
            match change {
                DeviceChange::Disconnected(slot) => {
                    warn!("Device {} disconnected, its bindings are inactive", slot);
                    if let Some(sample) = self.samples.get_mut(slot) {
                        *sample = None;
                    }
                }
                DeviceChange::Reconnected(slot) => {
                    info!("Device {} reconnected", slot);
                }
            }
        }

        for &slot in wanted {
            if slot >= self.samples.len() {
                self.samples.resize(slot + 1, None);
            }
            match sampler.sample(slot) {
                Ok(sample) => self.samples[slot] = Some(sample),
                Err(SampleError::Disconnected(_)) => self.samples[slot] = None,
                Err(e @ SampleError::Transient { .. }) => {
                    if debug_io {
                        info!("{}; reusing last sample", e);
                    } else {
                        debug!("{}; reusing last sample", e);
                    }
                }
            }
        }
    }

    pub fn button(&self, device: usize, index: usize) -> bool {
        self.get(device).map(|s| s.button(index)).unwrap_or(false)
    }

    pub fn axis(&self, device: usize, index: usize) -> f32 {
        self.get(device).map(|s| s.axis(index)).unwrap_or(0.0)
    }

    fn get(&self, device: usize) -> Option<&DeviceSample> {
        self.samples.get(device).and_then(Option::as_ref)
    }
}
