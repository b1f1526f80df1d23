//! Bandy - measurement and device-state core of the resistance-band sensor.
//!
//! Everything here is platform-independent and runs on the host:
//!
//! - [`quantize`] / [`gate`]: float readings to fixed-point, hysteresis
//! - [`input`]: button gesture recognition
//! - [`tilt`]: debounced tilt-switch edges
//! - [`tasks`]: measurement pipeline, power sequencing, connection lifecycle
//! - [`controller`]: the per-tick composition root
//!
//! The ESP32 drivers live in the firmware binary (`--features esp-idf`) and
//! plug in through the traits in [`hal`].

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod gate;
pub mod hal;
pub mod input;
pub mod protocol;
pub mod quantize;
pub mod tasks;
pub mod tilt;

pub use controller::{DeviceController, Diagnostics};
pub use error::PublishError;
pub use events::{DeviceAction, Flow, Gesture, Sample, WakeCause, WakeSource};
pub use hal::{Platform, Sensor, Transport};

/// Milliseconds since boot.  Wraps after ~49 days; always compare with
/// `wrapping_sub`.
pub type Millis = u32;
