// Bandy - HX711 Load Cell
//
// Conversion, tare averaging and scaling come from the `loadcell` crate.
// This adapter adds the pieces the band needs on top: a non-blocking sample
// (DOUT polled before each read), the conversion timeout flag, and the SCK
// power-down pulse.  kg = (raw - offset) / LOADCELL_CALIBRATION_FACTOR.

use std::time::{Duration, Instant};

use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver};
use esp_idf_sys as sys;
use loadcell::hx711::HX711;
use loadcell::LoadCell as _;

use bandy::config::*;
use bandy::{Sample, Sensor};

type Hx711Driver<'d> = HX711<PinDriver<'d, AnyOutputPin, Output>, PinDriver<'d, AnyInputPin, Input>, Ets>;

const CONVERSION_TIMEOUT: Duration = Duration::from_millis(LOADCELL_CONVERSION_TIMEOUT_MS as u64);

pub struct LoadCellSensor<'d> {
    cell: Hx711Driver<'d>,
    powered: bool,
    last_conversion: Instant,
    timeout: bool,
}

impl<'d> LoadCellSensor<'d> {
    pub fn new(
        sck: PinDriver<'d, AnyOutputPin, Output>,
        dout: PinDriver<'d, AnyInputPin, Input>,
    ) -> anyhow::Result<Self> {
        let mut cell = HX711::new(sck, dout, Ets);
        cell.set_scale(1.0 / LOADCELL_CALIBRATION_FACTOR);

        let mut sensor = Self {
            cell,
            powered: false,
            last_conversion: Instant::now(),
            timeout: false,
        };
        sensor.power_up()?;

        // Tare precision improves with a couple of seconds of settling.
        FreeRtos::delay_ms(LOADCELL_STABILIZING_MS);
        match sensor.tare() {
            Ok(()) => log::info!(
                "HX711 on DOUT GPIO{} / SCK GPIO{} ready (cal factor {})",
                PIN_HX711_DOUT,
                PIN_HX711_SCK,
                LOADCELL_CALIBRATION_FACTOR
            ),
            Err(e) => log::error!("{:#}, check MCU>HX711 wiring and pin designations", e),
        }
        Ok(sensor)
    }

    /// DOUT goes low when a conversion is ready.
    fn is_ready(&self) -> bool {
        unsafe { sys::gpio_get_level(PIN_HX711_DOUT) == 0 }
    }

    /// The crate's read blocks on DOUT; refuse to start one on a dead chip.
    fn wait_ready(&self) -> anyhow::Result<()> {
        let start = Instant::now();
        while !self.is_ready() {
            if start.elapsed() > CONVERSION_TIMEOUT {
                anyhow::bail!("HX711 conversion timeout");
            }
            FreeRtos::delay_ms(1);
        }
        Ok(())
    }

    fn set_sck(level: bool) -> anyhow::Result<()> {
        unsafe { sys::esp!(sys::gpio_set_level(PIN_HX711_SCK, level as u32))? };
        Ok(())
    }
}

impl Sensor for LoadCellSensor<'_> {
    fn sample(&mut self) -> Option<Sample> {
        if !self.powered {
            return None;
        }
        if !self.is_ready() {
            self.timeout = self.last_conversion.elapsed() > CONVERSION_TIMEOUT;
            return None;
        }

        let kg = self.cell.read_scaled();
        self.last_conversion = Instant::now();
        self.timeout = false;
        Some(Sample::new(kg))
    }

    fn tare(&mut self) -> anyhow::Result<()> {
        log::info!("Tare called");
        self.wait_ready()?;
        self.cell.tare(LOADCELL_TARE_SAMPLES);
        self.last_conversion = Instant::now();
        log::info!("Tare offset = {}", self.cell.get_offset());
        Ok(())
    }

    fn power_down(&mut self) -> anyhow::Result<()> {
        // SCK low-to-high, held for more than 60 µs.
        Self::set_sck(false)?;
        Self::set_sck(true)?;
        Ets::delay_us(80);
        self.powered = false;
        log::info!("HX711 powered down");
        Ok(())
    }

    fn power_up(&mut self) -> anyhow::Result<()> {
        Self::set_sck(false)?;
        self.powered = true;
        self.last_conversion = Instant::now();
        self.timeout = false;
        Ok(())
    }

    fn has_timeout_fault(&self) -> bool {
        self.timeout
    }
}
