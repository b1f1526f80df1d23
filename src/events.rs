// Bandy - Device Events & Data Types

use std::fmt;

// ---------------------------------------------------------------------------
// Sensor Data (one calibrated load-cell conversion)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
    /// Calibrated force/mass reading in kilograms.
    pub value: f32,
    /// The front-end timed out waiting for this conversion.
    pub timeout: bool,
}

impl Sample {
    pub fn new(value: f32) -> Self {
        Self { value, timeout: false }
    }

    pub fn faulted(value: f32) -> Self {
        Self { value, timeout: true }
    }
}

// ---------------------------------------------------------------------------
// Button Gestures
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Single short press, no follow-up within the click window.
    Click,
    /// Two (or more) short presses within the click window.
    DoubleClick,
    /// Button held past the long-press threshold.
    LongPressStart,
    /// Button released after a long press.
    LongPressStop,
}

/// What the device does in response to a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    /// Toggle the mode flag and notify it on the button-state channel.
    ToggleMode,
    /// Re-zero the load cell.
    Tare,
    /// Power down the sensor and feedback ahead of deep sleep.
    PrepareDeepSleep,
    /// Tear down the radio and halt until the button wakes us.
    EnterDeepSleep,
}

impl DeviceAction {
    /// Default binding used by the band's single button.
    pub fn for_gesture(gesture: Gesture) -> Self {
        match gesture {
            Gesture::Click => Self::ToggleMode,
            Gesture::DoubleClick => Self::Tare,
            Gesture::LongPressStart => Self::PrepareDeepSleep,
            Gesture::LongPressStop => Self::EnterDeepSleep,
        }
    }
}

// ---------------------------------------------------------------------------
// Sleep / Wake
// ---------------------------------------------------------------------------

/// External pin that brings the chip out of deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeSource {
    pub pin: i32,
    pub active_level: bool,
}

/// Why the chip started executing from the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    /// Cold boot or reset, not a wake from sleep.
    PowerOn,
    /// External pin (the button) woke us from deep sleep.
    ExternalPin,
    Timer,
    Other(u32),
}

impl fmt::Display for WakeCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerOn => f.write_str("power-on"),
            Self::ExternalPin => f.write_str("button"),
            Self::Timer => f.write_str("timer"),
            Self::Other(code) => write!(f, "other({code})"),
        }
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The radio is down; the entry point must halt until `WakeSource` fires.
    DeepSleep(WakeSource),
}
