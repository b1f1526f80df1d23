//! BLE channel map and payload encoding.
//!
//! | Channel      | Service | Characteristic | Payload              |
//! |--------------|---------|----------------|----------------------|
//! | Tension      | 0x1826  | 0x2AEB         | `i16` LE, exponent -1 |
//! | ButtonState  | 0x1826  | a6351a0c-...   | `u8` 0/1             |
//! | BatteryLevel | 0x180F  | 0x2A19         | `u8` percent         |

use core::fmt;

use crate::config::SCALE_EXPONENT;
use crate::quantize::Quantized;

/// GATT presentation format: signed 16-bit integer.
const FORMAT_SINT16: u8 = 0x0E;
/// GATT unit: mass (kilogram).
const UNIT_KILOGRAM: u16 = 0x2702;
/// Bluetooth SIG namespace.
const NAMESPACE_SIG: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Tension,
    ButtonState,
    BatteryLevel,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tension => "tension",
            Self::ButtonState => "button",
            Self::BatteryLevel => "battery",
        })
    }
}

pub fn encode_tension(value: Quantized) -> [u8; 2] {
    value.to_i16().to_le_bytes()
}

pub fn encode_flag(flag: bool) -> [u8; 1] {
    [flag as u8]
}

pub fn encode_battery(percent: u8) -> [u8; 1] {
    [percent.min(100)]
}

/// Characteristic Presentation Format (0x2904) for the tension channel.
pub fn tension_presentation_format() -> [u8; 7] {
    let unit = UNIT_KILOGRAM.to_le_bytes();
    [
        FORMAT_SINT16,
        SCALE_EXPONENT as u8,
        unit[0],
        unit[1],
        NAMESPACE_SIG,
        0x00, // description
        0x00,
    ]
}
