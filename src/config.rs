// Bandy - Hardware & System Configuration
// Target: ESP32-WROOM dev board + HX711 load-cell amplifier

use crate::Millis;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
pub const PIN_BUTTON: i32 = 0;        // BOOT button (INPUT_PULLUP, active LOW)
pub const PIN_TILT: i32 = 27;         // Ball tilt switch (INPUT_PULLUP)
pub const PIN_LED_WAITING: i32 = 22;  // Red: advertising, no client
pub const PIN_LED_CONNECTED: i32 = 21; // Green: client connected
pub const PIN_BUZZER: i32 = 13;       // Piezo buzzer (LEDC channel 0)
pub const PIN_HX711_DOUT: i32 = 16;
pub const PIN_HX711_SCK: i32 = 4;
pub const PIN_BATTERY_ADC: i32 = 35;  // ADC1_CH7 behind a 1:2 divider

/// The band's button pulls the line low when pressed.
pub const BUTTON_ACTIVE_LEVEL: bool = false;

// ---------------------------------------------------------------------------
// Load Cell
// ---------------------------------------------------------------------------
pub const LOADCELL_CALIBRATION_FACTOR: f32 = 26983.9;
pub const LOADCELL_STABILIZING_MS: Millis = 2000;
pub const LOADCELL_TARE_SAMPLES: usize = 16;
/// HX711 holds DOUT high while converting; 10 SPS worst case plus margin.
pub const LOADCELL_CONVERSION_TIMEOUT_MS: Millis = 500;

// ---------------------------------------------------------------------------
// Measurement Pipeline
// ---------------------------------------------------------------------------
/// Fixed-point scale: one decimal digit of precision (exponent -1 on air).
pub const SCALE_FACTOR: i32 = 10;
pub const SCALE_EXPONENT: i8 = -1;
/// One tenth of one scale unit, rounded.
pub const CHANGE_EPSILON: i32 = (SCALE_FACTOR + 5) / 10;
/// Minimum interval between notifications (0 = unthrottled).
pub const PUBLISH_MIN_INTERVAL_MS: Millis = 0;
/// Link layer congests on back-to-back notifies; 3 ms held over 6 h soak.
pub const PUBLISH_SETTLE_MS: u32 = 3;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const TICK_INTERVAL_MS: u32 = 10;                 // 100 Hz cooperative loop
pub const DEBOUNCE_MS: Millis = 50;
pub const LONG_PRESS_MS: Millis = 1000;
pub const DOUBLE_CLICK_WINDOW_MS: Millis = 400;
pub const TILT_DEBOUNCE_MS: Millis = 100;
pub const IDLE_TIMEOUT_MS: Millis = 10_000;           // 10 s without tilt, then nap
pub const LIGHT_SLEEP_US: u64 = 1_000_000;            // 1 s timed nap
pub const DEEP_SLEEP_SETTLE_MS: u32 = 250;
pub const DISCONNECT_SETTLE_MS: u32 = 500;            // let the BLE stack get ready
pub const BATTERY_CHECK_INTERVAL_MS: Millis = 10_000;

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------
pub const TONE_CONNECTED_HZ: u32 = 440;
pub const TONE_WAITING_HZ: u32 = 220;
pub const TONE_SLEEP_HZ: u32 = 880;
pub const TONE_DURATION_MS: u32 = 250;

// ---------------------------------------------------------------------------
// Battery (LiPo through a 1:2 resistor divider)
// ---------------------------------------------------------------------------
pub const BATTERY_EMPTY_MV: u32 = 3300;
pub const BATTERY_FULL_MV: u32 = 4200;
pub const BATTERY_DIVIDER_RATIO: u32 = 2;

// ---------------------------------------------------------------------------
// BLE
// ---------------------------------------------------------------------------
pub const DEVICE_NAME: &str = "Bandy";
pub const FITNESS_SERVICE_UUID: u16 = 0x1826;
pub const TENSION_CHAR_UUID: u16 = 0x2AEB;
pub const BUTTON_STATE_CHAR_UUID: &str = "a6351a0c-f7e0-11ec-b939-0242ac120002";
pub const BATTERY_SERVICE_UUID: u16 = 0x180F;
pub const BATTERY_LEVEL_CHAR_UUID: u16 = 0x2A19;
pub const PRESENTATION_FORMAT_DESC_UUID: u16 = 0x2904;
pub const USER_DESCRIPTION_DESC_UUID: u16 = 0x2901;

// ---------------------------------------------------------------------------
// Runtime tuning (defaults come from the constants above)
// ---------------------------------------------------------------------------

/// Gesture recognition thresholds for one button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureConfig {
    pub debounce_ms: Millis,
    pub long_press_ms: Millis,
    pub click_window_ms: Millis,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEBOUNCE_MS,
            long_press_ms: LONG_PRESS_MS,
            click_window_ms: DOUBLE_CLICK_WINDOW_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    pub epsilon: i32,
    pub min_interval_ms: Millis,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            epsilon: CHANGE_EPSILON,
            min_interval_ms: PUBLISH_MIN_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiltConfig {
    pub pin: i32,
    pub debounce_ms: Millis,
}

impl Default for TiltConfig {
    fn default() -> Self {
        Self {
            pin: PIN_TILT,
            debounce_ms: TILT_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerConfig {
    pub idle_timeout_ms: Millis,
    pub light_sleep_us: u64,
    pub deep_sleep_settle_ms: u32,
    pub battery_check_interval_ms: Millis,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: IDLE_TIMEOUT_MS,
            light_sleep_us: LIGHT_SLEEP_US,
            deep_sleep_settle_ms: DEEP_SLEEP_SETTLE_MS,
            battery_check_interval_ms: BATTERY_CHECK_INTERVAL_MS,
        }
    }
}

/// A physical button and the level it reads while held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonConfig {
    pub pin: i32,
    pub active_level: bool,
    pub gestures: GestureConfig,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            pin: PIN_BUTTON,
            active_level: BUTTON_ACTIVE_LEVEL,
            gestures: GestureConfig::default(),
        }
    }
}

/// Everything the controller needs to know about the board.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub buttons: Vec<ButtonConfig>,
    pub tilt: TiltConfig,
    pub gate: GateConfig,
    pub power: PowerConfig,
    pub led_waiting_pin: i32,
    pub led_connected_pin: i32,
    pub buzzer_pin: i32,
    pub publish_settle_ms: u32,
    pub disconnect_settle_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            buttons: vec![ButtonConfig::default()],
            tilt: TiltConfig::default(),
            gate: GateConfig::default(),
            power: PowerConfig::default(),
            led_waiting_pin: PIN_LED_WAITING,
            led_connected_pin: PIN_LED_CONNECTED,
            buzzer_pin: PIN_BUZZER,
            publish_settle_ms: PUBLISH_SETTLE_MS,
            disconnect_settle_ms: DISCONNECT_SETTLE_MS,
        }
    }
}
