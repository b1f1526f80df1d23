// Bandy - Measurement Pipeline
//
// One load-cell conversion per tick at most: fault tracking, quantization,
// and the change gate.  A timed-out conversion is reported and skipped; the
// host keeps the last value it was sent.

use crate::config::GateConfig;
use crate::events::Sample;
use crate::gate::ChangeGate;
use crate::quantize::{quantize, Quantized};
use crate::Millis;

pub struct MeasurementPipeline {
    gate: ChangeGate,
    /// Publish the next sample regardless of hysteresis (set on connect).
    force_next: bool,
    fault_active: bool,
    faults: u32,
    last_value: Option<Quantized>,
}

impl MeasurementPipeline {
    pub fn new(config: GateConfig) -> Self {
        Self {
            gate: ChangeGate::new(config),
            force_next: false,
            fault_active: false,
            faults: 0,
            last_value: None,
        }
    }

    /// Most recent good reading, published or not.
    pub fn last_value(&self) -> Option<Quantized> {
        self.last_value
    }

    pub fn last_published(&self) -> Option<Quantized> {
        self.gate.last_published()
    }

    /// Sensor timeouts seen since boot (counted on onset).
    pub fn faults(&self) -> u32 {
        self.faults
    }

    /// New client: forget what the previous one was sent.
    pub fn on_connect(&mut self) {
        self.gate.reset();
        self.force_next = true;
    }

    /// Send the next reading even if it is within hysteresis (after a tare).
    /// The last published value is kept, so an unchanged reading is still
    /// caught by the duplicate check.
    pub fn request_refresh(&mut self) {
        self.force_next = true;
    }

    /// Run one tick's sample through the pipeline.  Returns the value to
    /// notify when the gate lets it through.
    pub fn step(&mut self, sample: Option<Sample>, sensor_fault: bool, now: Millis) -> Option<Quantized> {
        let faulted = sensor_fault || sample.is_some_and(|s| s.timeout);
        if faulted {
            if !self.fault_active {
                self.fault_active = true;
                self.faults += 1;
                log::warn!("Load cell timeout, check HX711 wiring (holding last value)");
            }
            return None;
        }
        if self.fault_active && sample.is_some() {
            self.fault_active = false;
            log::info!("Load cell recovered");
        }

        let candidate = quantize(sample?.value);
        self.last_value = Some(candidate);

        self.gate
            .should_publish(candidate, now, self.force_next)
            .then_some(candidate)
    }

    /// Same as the last notify: skip the radio write.
    pub fn is_duplicate(&self, candidate: Quantized) -> bool {
        self.gate.is_duplicate(candidate)
    }

    /// A forced candidate matched the last notify: the refresh is satisfied.
    pub fn skip_duplicate(&mut self) {
        self.force_next = false;
    }

    pub fn record_publish(&mut self, value: Quantized, now: Millis) {
        self.gate.record_publish(value, now);
        self.force_next = false;
    }
}
