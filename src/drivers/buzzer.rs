// Bandy - Piezo Buzzer Driver
//
// LEDC PWM at 50% duty; the timer frequency is retuned per tone.

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::ledc::LedcDriver;
use esp_idf_sys::{esp, ledc_mode_t_LEDC_LOW_SPEED_MODE, ledc_set_freq, ledc_timer_t_LEDC_TIMER_0};

pub struct Buzzer<'d> {
    channel: LedcDriver<'d>,
}

impl<'d> Buzzer<'d> {
    /// `channel` must be bound to LEDC timer 0 in low-speed mode.
    pub fn new(mut channel: LedcDriver<'d>) -> anyhow::Result<Self> {
        channel.set_duty(0)?;
        Ok(Self { channel })
    }

    /// Sound `frequency_hz` for `duration_ms` (blocks the calling thread).
    pub fn tone(&mut self, frequency_hz: u32, duration_ms: u32) -> anyhow::Result<()> {
        unsafe {
            esp!(ledc_set_freq(
                ledc_mode_t_LEDC_LOW_SPEED_MODE,
                ledc_timer_t_LEDC_TIMER_0,
                frequency_hz,
            ))?;
        }
        let half = self.channel.get_max_duty() / 2;
        self.channel.set_duty(half)?;
        FreeRtos::delay_ms(duration_ms);
        self.channel.set_duty(0)?;
        Ok(())
    }
}
