//! Controller subsystem for gamepad input handling
//!
//! Implements a two-stage pipeline:
//!
//! 1. [`device`] - Device enumeration and per-tick raw snapshots
//! 2. [`detector`] - Edge and threshold detection per bound input
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► GilrsSampler ──► SnapshotCache ──► EdgeDetector ──► Signal
//!             (Raw state)      (Last good)      (Hysteresis)
//! ```
//!
//! Sampling is polled from the engine tick; nothing here runs on its own
//! thread.

pub mod detector;
pub mod device;
pub mod gilrs_sampler;

pub use device::{DeviceInfo, DeviceSampler, SnapshotCache};
pub use gilrs_sampler::GilrsSampler;
