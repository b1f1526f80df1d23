// Bandy - ESP32 Platform
//
// Clock, GPIO, buzzer, battery ADC and sleep control behind the `Platform`
// trait.  Pins are addressed by number; only the ones wired on the band are
// known here.

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver};
use esp_idf_sys::{self as sys, esp};

use bandy::config::*;
use bandy::tasks::power::cell_millivolts;
use bandy::{Millis, Platform, WakeCause, WakeSource};

use super::buzzer::Buzzer;

/// GPIO35 on the classic ESP32.
const BATTERY_ADC_CHANNEL: sys::adc_channel_t = sys::adc_channel_t_ADC_CHANNEL_7;

pub struct EspPlatform<'d> {
    button: PinDriver<'d, AnyInputPin, Input>,
    tilt: PinDriver<'d, AnyInputPin, Input>,
    led_waiting: PinDriver<'d, AnyOutputPin, Output>,
    led_connected: PinDriver<'d, AnyOutputPin, Output>,
    buzzer: Buzzer<'d>,
    adc: Option<sys::adc_oneshot_unit_handle_t>,
}

impl<'d> EspPlatform<'d> {
    pub fn new(
        button: PinDriver<'d, AnyInputPin, Input>,
        tilt: PinDriver<'d, AnyInputPin, Input>,
        led_waiting: PinDriver<'d, AnyOutputPin, Output>,
        led_connected: PinDriver<'d, AnyOutputPin, Output>,
        buzzer: Buzzer<'d>,
    ) -> Self {
        configure_pullup(PIN_BUTTON);
        configure_pullup(PIN_TILT);

        let adc = match init_battery_adc() {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Battery ADC init failed ({}), level will not be reported", e);
                None
            }
        };

        Self {
            button,
            tilt,
            led_waiting,
            led_connected,
            buzzer,
            adc,
        }
    }
}

impl Platform for EspPlatform<'_> {
    fn now_millis(&self) -> Millis {
        // Wraps at ~49 days; all comparisons use wrapping_sub.
        unsafe { (sys::esp_timer_get_time() / 1000) as Millis }
    }

    fn digital_read(&self, pin: i32) -> bool {
        match pin {
            PIN_BUTTON => self.button.is_high(),
            PIN_TILT => self.tilt.is_high(),
            _ => {
                log::warn!("Read from unmapped GPIO{}", pin);
                false
            }
        }
    }

    fn digital_write(&mut self, pin: i32, high: bool) {
        let driver = match pin {
            PIN_LED_WAITING => &mut self.led_waiting,
            PIN_LED_CONNECTED => &mut self.led_connected,
            _ => {
                log::warn!("Write to unmapped GPIO{}", pin);
                return;
            }
        };
        let result = if high { driver.set_high() } else { driver.set_low() };
        if let Err(e) = result {
            log::warn!("GPIO{} write failed: {}", pin, e);
        }
    }

    fn tone(&mut self, pin: i32, frequency_hz: u32, duration_ms: u32) {
        if pin != PIN_BUZZER {
            log::warn!("No buzzer on GPIO{}", pin);
            return;
        }
        if let Err(e) = self.buzzer.tone(frequency_hz, duration_ms) {
            log::warn!("Tone {} Hz failed: {:#}", frequency_hz, e);
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        FreeRtos::delay_ms(ms);
    }

    fn sleep_light(&mut self, duration_us: u64) {
        unsafe {
            if let Err(e) = esp!(sys::esp_sleep_enable_timer_wakeup(duration_us)) {
                log::warn!("Timer wakeup arm failed: {}", e);
                return;
            }
            if let Err(e) = esp!(sys::esp_light_sleep_start()) {
                log::warn!("Light sleep rejected: {}", e);
            }
        }
    }

    fn sleep_deep_forever(&mut self, wake: WakeSource) -> ! {
        unsafe {
            if let Err(e) = esp!(sys::esp_sleep_enable_ext0_wakeup(
                wake.pin,
                wake.active_level as i32,
            )) {
                log::error!("ext0 wakeup arm failed: {}", e);
            }
            sys::esp_deep_sleep_start();
        }
    }

    fn wakeup_cause(&self) -> WakeCause {
        let cause = unsafe { sys::esp_sleep_get_wakeup_cause() };
        match cause {
            sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED => WakeCause::PowerOn,
            sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT0 => WakeCause::ExternalPin,
            sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => WakeCause::Timer,
            other => WakeCause::Other(other),
        }
    }

    fn battery_millivolts(&mut self) -> Option<u32> {
        let handle = self.adc?;
        let mut raw: i32 = 0;
        let ret = unsafe { sys::adc_oneshot_read(handle, BATTERY_ADC_CHANNEL, &mut raw) };
        if ret != sys::ESP_OK {
            log::warn!("Battery ADC read failed ({})", ret);
            return None;
        }
        Some(cell_millivolts(raw.clamp(0, u16::MAX as i32) as u16))
    }
}

/// PinDriver::input on a downgraded pin cannot set pulls, so use the raw API.
fn configure_pullup(pin: i32) {
    unsafe {
        sys::gpio_set_pull_mode(pin, sys::gpio_pull_mode_t_GPIO_PULLUP_ONLY);
    }
}

/// ADC1 one-shot unit for the battery divider, 11 dB attenuation.
fn init_battery_adc() -> Result<sys::adc_oneshot_unit_handle_t, sys::EspError> {
    unsafe {
        let mut handle: sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        let unit_cfg = sys::adc_oneshot_unit_init_cfg_t {
            unit_id: sys::adc_unit_t_ADC_UNIT_1,
            ulp_mode: sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..core::mem::zeroed()
        };
        esp!(sys::adc_oneshot_new_unit(&unit_cfg, &mut handle))?;

        let chan_cfg = sys::adc_oneshot_chan_cfg_t {
            atten: sys::adc_atten_t_ADC_ATTEN_DB_11,
            bitwidth: sys::adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        esp!(sys::adc_oneshot_config_channel(handle, BATTERY_ADC_CHANNEL, &chan_cfg))?;
        log::info!("Battery ADC ready on GPIO{}", PIN_BATTERY_ADC);
        Ok(handle)
    }
}
