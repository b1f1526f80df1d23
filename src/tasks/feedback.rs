// Bandy - LED & Buzzer Feedback
//
// Red LED while advertising, green while a client is connected.  Each change
// is confirmed with a short tone: high for connect, low for disconnect.

use crate::config::*;
use crate::hal::Platform;

pub struct Feedback {
    led_waiting: i32,
    led_connected: i32,
    buzzer: i32,
}

impl Feedback {
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            led_waiting: config.led_waiting_pin,
            led_connected: config.led_connected_pin,
            buzzer: config.buzzer_pin,
        }
    }

    pub fn show_connection(&self, platform: &mut impl Platform, connected: bool) {
        platform.digital_write(self.led_waiting, !connected);
        platform.digital_write(self.led_connected, connected);
        let hz = if connected {
            TONE_CONNECTED_HZ
        } else {
            TONE_WAITING_HZ
        };
        platform.tone(self.buzzer, hz, TONE_DURATION_MS);
    }

    /// Both LEDs dark, then a final chirp before deep sleep.
    pub fn power_off(&self, platform: &mut impl Platform) {
        platform.digital_write(self.led_waiting, false);
        platform.digital_write(self.led_connected, false);
        platform.tone(self.buzzer, TONE_SLEEP_HZ, TONE_DURATION_MS);
    }
}
