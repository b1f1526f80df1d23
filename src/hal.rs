//! Capability traits for the hardware the core drives.
//!
//! The firmware binary implements these on top of ESP-IDF; the tests
//! implement them in memory with a controllable clock.

use crate::events::{Sample, WakeCause, WakeSource};
use crate::protocol::Channel;
use crate::Millis;

/// Load-cell front-end with its calibration applied.
pub trait Sensor {
    /// Next calibrated conversion, or `None` if none is ready yet.
    fn sample(&mut self) -> Option<Sample>;

    /// Re-zero the scale at the current load.
    fn tare(&mut self) -> anyhow::Result<()>;

    fn power_down(&mut self) -> anyhow::Result<()>;

    fn power_up(&mut self) -> anyhow::Result<()>;

    /// Raised while the latest conversion did not complete in time.
    fn has_timeout_fault(&self) -> bool;
}

/// Single-connection BLE peripheral.
pub trait Transport {
    fn is_connected(&self) -> bool;

    /// Notify `payload` on `channel`. Only called while connected.
    fn publish(&mut self, channel: Channel, payload: &[u8]) -> anyhow::Result<()>;

    fn start_advertising(&mut self) -> anyhow::Result<()>;

    /// Bring the radio down before deep sleep.
    fn shutdown(&mut self) -> anyhow::Result<()>;
}

/// Clock, GPIO and sleep primitives.
pub trait Platform {
    /// Milliseconds since boot, wrapping.
    fn now_millis(&self) -> Millis;

    fn digital_read(&self, pin: i32) -> bool;

    fn digital_write(&mut self, pin: i32, high: bool);

    /// Play a tone; blocks for `duration_ms`.
    fn tone(&mut self, pin: i32, frequency_hz: u32, duration_ms: u32);

    fn delay_ms(&mut self, ms: u32);

    /// Timed light sleep. Returns after the chip wakes; BLE stays connected.
    fn sleep_light(&mut self, duration_us: u64);

    /// Arm `wake` and enter deep sleep. Execution resumes at boot.
    fn sleep_deep_forever(&mut self, wake: WakeSource) -> !;

    fn wakeup_cause(&self) -> WakeCause;

    /// Battery voltage at the cell (divider already compensated).
    fn battery_millivolts(&mut self) -> Option<u32>;
}
