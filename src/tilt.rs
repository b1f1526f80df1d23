// Bandy - Tilt Detector
//
// Debounced edge detector on the ball tilt switch.  A level change is only
// accepted once `debounce_ms` has passed since the previous accepted one, so
// a ball rattling in its can reports a single transition.

use crate::config::TiltConfig;
use crate::Millis;

pub struct TiltDetector {
    debounce_ms: Millis,
    level: bool,
    last_transition: Millis,
}

impl TiltDetector {
    pub fn new(config: TiltConfig, initial_level: bool, now: Millis) -> Self {
        Self {
            debounce_ms: config.debounce_ms,
            level: initial_level,
            last_transition: now,
        }
    }

    /// Last accepted level.
    pub fn level(&self) -> bool {
        self.level
    }

    /// Returns `true` exactly when a debounced transition is accepted.
    pub fn update(&mut self, raw: bool, now: Millis) -> bool {
        if raw == self.level || now.wrapping_sub(self.last_transition) <= self.debounce_ms {
            return false;
        }
        self.level = raw;
        self.last_transition = now;
        true
    }
}
