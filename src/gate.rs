// Bandy - Change Gate
//
// Hysteresis + minimum-interval throttle in front of the tension channel.
// The gate only decides; the publisher records what actually went out.

use crate::config::GateConfig;
use crate::quantize::Quantized;
use crate::Millis;

#[derive(Debug, Clone)]
pub struct ChangeGate {
    config: GateConfig,
    /// `None` until something has been published on this connection.
    last_published: Option<Quantized>,
    last_publish_ms: Millis,
}

impl ChangeGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last_published: None,
            last_publish_ms: 0,
        }
    }

    pub fn last_published(&self) -> Option<Quantized> {
        self.last_published
    }

    /// Should `candidate` be notified at `now`?
    pub fn should_publish(&self, candidate: Quantized, now: Millis, force: bool) -> bool {
        if !self.interval_elapsed(now) {
            return false;
        }
        if force {
            return true;
        }
        let Some(last) = self.last_published else {
            return true;
        };

        let delta = candidate.abs_diff(last);
        // An unloaded band reads exactly zero; always surface the return to it.
        delta > self.config.epsilon.unsigned_abs() || (delta > 0 && candidate == Quantized::ZERO)
    }

    /// Same value as the last notify: the wire write would be redundant.
    pub fn is_duplicate(&self, candidate: Quantized) -> bool {
        self.last_published == Some(candidate)
    }

    pub fn record_publish(&mut self, value: Quantized, now: Millis) {
        self.last_published = Some(value);
        self.last_publish_ms = now;
    }

    /// Forget the last published value (new connection).
    pub fn reset(&mut self) {
        self.last_published = None;
        self.last_publish_ms = 0;
    }

    fn interval_elapsed(&self, now: Millis) -> bool {
        self.config.min_interval_ms == 0
            || now.wrapping_sub(self.last_publish_ms) > self.config.min_interval_ms
    }
}
