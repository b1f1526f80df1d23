// Bandy - Power Sequencer
//
// Awake until the band sits still for `idle_timeout_ms`, then a short timed
// light sleep that keeps the BLE link up.  A long press walks the device into
// deep sleep: prepare on press, commit on release.  Deep sleep is terminal;
// the chip restarts from `main` when the button wakes it.
//
// Also converts battery ADC readings to a charge percentage.

use crate::config::*;
use crate::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Awake,
    /// A timed nap has been requested and not yet returned from.
    LightSleepPending,
    /// Long press held: sensor is down, waiting for release.
    DeepSleepPending,
    /// Terminal for this boot.
    DeepSleep,
}

pub struct PowerSequencer {
    config: PowerConfig,
    state: PowerState,
    last_activity: Millis,
    light_sleeps: u32,
}

impl PowerSequencer {
    pub fn new(config: PowerConfig, now: Millis) -> Self {
        Self {
            config,
            state: PowerState::Awake,
            last_activity: now,
            light_sleeps: 0,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Completed light-sleep naps since boot.
    pub fn light_sleeps(&self) -> u32 {
        self.light_sleeps
    }

    /// Record movement or user input.
    pub fn note_activity(&mut self, now: Millis) {
        if self.state == PowerState::Awake {
            self.last_activity = now;
        }
    }

    /// Returns the nap length in microseconds when the idle timeout expired.
    pub fn poll(&mut self, now: Millis) -> Option<u64> {
        if self.state != PowerState::Awake {
            return None;
        }
        let idle = now.wrapping_sub(self.last_activity);
        if idle <= self.config.idle_timeout_ms {
            return None;
        }
        log::info!("Power: idle {} ms -> light sleep", idle);
        self.state = PowerState::LightSleepPending;
        Some(self.config.light_sleep_us)
    }

    /// Back from a nap; restart the idle clock.
    pub fn woke(&mut self, now: Millis) {
        if self.state == PowerState::LightSleepPending {
            self.state = PowerState::Awake;
            self.last_activity = now;
            self.light_sleeps += 1;
            log::debug!("Power: awake after light sleep #{}", self.light_sleeps);
        }
    }

    /// Long press started.  Returns `false` if already past `Awake`.
    pub fn begin_deep_sleep(&mut self) -> bool {
        if self.state != PowerState::Awake {
            return false;
        }
        log::info!("Power: deep sleep pending");
        self.state = PowerState::DeepSleepPending;
        true
    }

    /// Long press released.  After this the process must halt.
    pub fn commit_deep_sleep(&mut self) {
        log::info!("Power: {:?} -> DeepSleep", self.state);
        self.state = PowerState::DeepSleep;
    }

    #[cfg(test)]
    fn is_terminal(&self) -> bool {
        self.state == PowerState::DeepSleep
    }

    pub fn settle_ms(&self) -> u32 {
        self.config.deep_sleep_settle_ms
    }
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

/// Cell voltage from a 12-bit ADC reading (3.3 V full scale) behind the
/// 1:2 divider.
pub fn cell_millivolts(raw: u16) -> u32 {
    let raw = u32::from(raw.min(4095));
    raw * 3300 * BATTERY_DIVIDER_RATIO / 4095
}

/// Map the LiPo range linearly: 3.3 V = 0 %, 4.2 V = 100 %.
pub fn battery_percent(cell_mv: u32) -> u8 {
    let clamped = cell_mv.clamp(BATTERY_EMPTY_MV, BATTERY_FULL_MV);
    ((clamped - BATTERY_EMPTY_MV) * 100 / (BATTERY_FULL_MV - BATTERY_EMPTY_MV)) as u8
}

/// Samples the battery every `interval_ms` and remembers the last level.
pub struct BatteryMonitor {
    interval_ms: Millis,
    last_check: Option<Millis>,
    level: Option<u8>,
}

impl BatteryMonitor {
    pub fn new(interval_ms: Millis) -> Self {
        Self {
            interval_ms,
            last_check: None,
            level: None,
        }
    }

    pub fn level(&self) -> Option<u8> {
        self.level
    }

    pub fn due(&self, now: Millis) -> bool {
        self.last_check
            .map_or(true, |t| now.wrapping_sub(t) >= self.interval_ms)
    }

    /// Store a new reading; returns `true` when the percentage changed.
    pub fn record(&mut self, now: Millis, cell_mv: u32) -> bool {
        self.last_check = Some(now);
        let level = battery_percent(cell_mv);
        let changed = self.level != Some(level);
        self.level = Some(level);
        changed
    }

    /// Reading failed; try again next interval.
    pub fn skip(&mut self, now: Millis) {
        self.last_check = Some(now);
    }
}
