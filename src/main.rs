// Bandy - Firmware Entry Point
//
// Boot sequence (runs after power-on and after every deep-sleep wake):
//   1. Logging and peripherals.
//   2. HX711 start-up: stabilise, tare.
//   3. BLE GATT table, start advertising.
//   4. GPIO, buzzer and battery ADC.
//   5. Cooperative loop at TICK_INTERVAL_MS until a long press halts it.

mod drivers;

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{InputPin, OutputPin, PinDriver};
use esp_idf_hal::ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver};
use esp_idf_hal::prelude::*;

use bandy::config::*;
use bandy::{DeviceController, Flow};

use crate::drivers::ble::BleTransport;
use crate::drivers::buzzer::Buzzer;
use crate::drivers::loadcell::LoadCellSensor;
use crate::drivers::platform::EspPlatform;

fn main() -> anyhow::Result<()> {
    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("Bandy firmware starting...");

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // ---- Load cell --------------------------------------------------------
    let sck = PinDriver::output(pins.gpio4.downgrade_output())?;
    let dout = PinDriver::input(pins.gpio16.downgrade_input())?;
    let loadcell = LoadCellSensor::new(sck, dout)?;

    // ---- BLE --------------------------------------------------------------
    let transport = BleTransport::new()?;

    // ---- GPIO, buzzer, ADC ------------------------------------------------
    let button = PinDriver::input(pins.gpio0.downgrade_input())?;
    let tilt = PinDriver::input(pins.gpio27.downgrade_input())?;
    let led_waiting = PinDriver::output(pins.gpio22.downgrade_output())?;
    let led_connected = PinDriver::output(pins.gpio21.downgrade_output())?;

    let ledc_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::new().frequency(TONE_CONNECTED_HZ.Hz().into()),
    )?;
    let ledc_channel = LedcDriver::new(peripherals.ledc.channel0, ledc_timer, pins.gpio13)?;
    let buzzer = Buzzer::new(ledc_channel)?;

    let platform = EspPlatform::new(button, tilt, led_waiting, led_connected, buzzer);

    // ---- Main loop --------------------------------------------------------
    let mut controller = DeviceController::new(loadcell, transport, platform, DeviceConfig::default());
    log::info!("Boot complete, wake cause {}", controller.wake_cause());

    loop {
        match controller.tick() {
            Flow::Continue => FreeRtos::delay_ms(TICK_INTERVAL_MS),
            Flow::DeepSleep(wake) => {
                log::info!("Session diagnostics: {:?}", controller.diagnostics());
                controller.enter_deep_sleep(wake);
            }
        }
    }
}
