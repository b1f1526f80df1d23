// Bandy - Fixed-point quantizer
//
// Readings travel and are compared as integers scaled by `SCALE_FACTOR`
// (one decimal digit), so 12.34 kg becomes 123.

use crate::config::SCALE_FACTOR;

/// A reading scaled to a fixed-point integer at `SCALE_FACTOR`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quantized(pub i32);

impl Quantized {
    pub const ZERO: Self = Self(0);

    /// Absolute distance in counts.
    pub fn abs_diff(self, other: Self) -> u32 {
        self.0.abs_diff(other.0)
    }

    /// Wire value, saturated to the `i16` range of the tension channel.
    pub fn to_i16(self) -> i16 {
        self.0.clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }
}

/// round(value × SCALE_FACTOR), halves rounded away from zero.
///
/// NaN maps to zero; infinities saturate.
pub fn quantize(value: f32) -> Quantized {
    if value.is_nan() {
        return Quantized::ZERO;
    }
    // `f32::round` already rounds half away from zero; `as` saturates.
    Quantized((value * SCALE_FACTOR as f32).round() as i32)
}

pub fn dequantize(q: Quantized) -> f32 {
    q.0 as f32 / SCALE_FACTOR as f32
}
