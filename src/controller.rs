// Bandy - Device Controller
//
// Composition root.  Owns the three hardware capabilities and every piece of
// device state; `tick()` runs one cooperative pass with a single `now`:
//
//   1. connection edges (so a new client gets this tick's sample)
//   2. load cell -> quantizer -> change gate -> tension notify
//   3. buttons -> gestures -> actions
//   4. tilt switch -> activity
//   5. battery level
//   6. idle timeout -> light sleep
//
// Deep sleep is returned as `Flow::DeepSleep`; the entry point halts.

use crate::config::{ButtonConfig, DeviceConfig};
use crate::error::PublishError;
use crate::events::{DeviceAction, Flow, Gesture, WakeCause, WakeSource};
use crate::hal::{Platform, Sensor, Transport};
use crate::input::GestureDispatcher;
use crate::protocol::{encode_battery, encode_flag, encode_tension, Channel};
use crate::tasks::connection::ConnectionLifecycle;
use crate::tasks::feedback::Feedback;
use crate::tasks::power::{BatteryMonitor, PowerSequencer, PowerState};
use crate::tasks::sensor::MeasurementPipeline;
use crate::tilt::TiltDetector;
use crate::Millis;

struct Button {
    config: ButtonConfig,
    gestures: GestureDispatcher,
}

/// Counters for the serial log / tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub sensor_faults: u32,
    pub publish_failures: u32,
    pub dropped_disconnected: u32,
    pub duplicates_skipped: u32,
    pub light_sleeps: u32,
}

pub struct DeviceController<S, T, P> {
    sensor: S,
    transport: T,
    platform: P,
    config: DeviceConfig,
    wake_cause: WakeCause,

    pipeline: MeasurementPipeline,
    buttons: Vec<Button>,
    tilt: TiltDetector,
    power: PowerSequencer,
    connection: ConnectionLifecycle,
    battery: BatteryMonitor,
    feedback: Feedback,

    mode: bool,
    /// Set once deep sleep is committed; every later tick returns it.
    halted: Option<WakeSource>,
    diagnostics: Diagnostics,
}

impl<S, T, P> DeviceController<S, T, P>
where
    S: Sensor,
    T: Transport,
    P: Platform,
{
    /// Boot-time initialisation.  Runs after every power-on and every wake
    /// from deep sleep; nothing survives from the previous run.
    pub fn new(mut sensor: S, transport: T, mut platform: P, config: DeviceConfig) -> Self {
        let now = platform.now_millis();
        let wake_cause = platform.wakeup_cause();
        log::info!("Boot: wake cause = {}", wake_cause);

        if wake_cause == WakeCause::ExternalPin {
            // Powered down on the way into deep sleep.
            if let Err(e) = sensor.power_up() {
                log::error!("Load cell power-up failed: {:#}", e);
            }
        }

        let buttons = config
            .buttons
            .iter()
            .map(|&config| {
                let mut gestures = GestureDispatcher::new(config.gestures);
                // The wake press is usually still down; it is not a gesture.
                if platform.digital_read(config.pin) == config.active_level {
                    log::info!("Button GPIO{} held at boot, ignored until released", config.pin);
                    gestures.latch_held(now);
                }
                Button { config, gestures }
            })
            .collect();
        let tilt_level = platform.digital_read(config.tilt.pin);
        let feedback = Feedback::new(&config);
        feedback.show_connection(&mut platform, false);

        Self {
            pipeline: MeasurementPipeline::new(config.gate),
            buttons,
            tilt: TiltDetector::new(config.tilt, tilt_level, now),
            power: PowerSequencer::new(config.power, now),
            connection: ConnectionLifecycle::new(),
            battery: BatteryMonitor::new(config.power.battery_check_interval_ms),
            feedback,
            sensor,
            transport,
            platform,
            config,
            wake_cause,
            mode: false,
            halted: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn wake_cause(&self) -> WakeCause {
        self.wake_cause
    }

    pub fn mode(&self) -> bool {
        self.mode
    }

    pub fn power_state(&self) -> PowerState {
        self.power.state()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            sensor_faults: self.pipeline.faults(),
            light_sleeps: self.power.light_sleeps(),
            ..self.diagnostics
        }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// One scheduler pass.
    pub fn tick(&mut self) -> Flow {
        if let Some(wake) = self.halted {
            return Flow::DeepSleep(wake);
        }

        let now = self.platform.now_millis();

        self.update_connection(now);
        self.update_measurement(now);
        if let Some(flow) = self.update_buttons(now) {
            return flow;
        }
        self.update_tilt(now);
        self.update_battery(now);
        self.update_power(now);

        Flow::Continue
    }

    /// Hand control to the platform for good.  Call with the wake source
    /// returned by `tick()`.
    pub fn enter_deep_sleep(&mut self, wake: WakeSource) -> ! {
        log::info!(
            "Entering deep sleep, wake on GPIO{} {}",
            wake.pin,
            if wake.active_level { "HIGH" } else { "LOW" }
        );
        self.platform.sleep_deep_forever(wake)
    }

    // -----------------------------------------------------------------------
    // Tick steps
    // -----------------------------------------------------------------------

    fn update_connection(&mut self, now: Millis) {
        let edges = self.connection.on_tick(self.transport.is_connected());

        if edges.entered {
            self.pipeline.on_connect();
            self.feedback.show_connection(&mut self.platform, true);
            self.power.note_activity(now);

            let flag = encode_flag(self.mode);
            let result = self.publish(Channel::ButtonState, &flag);
            self.report(result);
            if let Some(level) = self.battery.level() {
                let result = self.publish(Channel::BatteryLevel, &encode_battery(level));
                self.report(result);
            }
        }

        if edges.left {
            self.feedback.show_connection(&mut self.platform, false);
            self.platform.delay_ms(self.config.disconnect_settle_ms);
            if self.connection.take_readvertise() {
                match self.transport.start_advertising() {
                    Ok(()) => log::info!("Restart advertising"),
                    Err(e) => log::error!("Advertising restart failed: {:#}", e),
                }
            }
        }
    }

    fn update_measurement(&mut self, now: Millis) {
        // Sensor is powered down once a long press starts.
        if self.power.state() != PowerState::Awake {
            return;
        }

        let fault = self.sensor.has_timeout_fault();
        let sample = self.sensor.sample();
        let Some(candidate) = self.pipeline.step(sample, fault, now) else {
            return;
        };
        // Nobody listening; nothing is buffered for later.
        if !self.connection.is_connected() {
            return;
        }

        if self.pipeline.is_duplicate(candidate) {
            log::debug!("Tension {} unchanged, write skipped", candidate.0);
            self.pipeline.skip_duplicate();
            self.diagnostics.duplicates_skipped += 1;
            return;
        }

        match self.publish(Channel::Tension, &encode_tension(candidate)) {
            Ok(()) => {
                log::debug!("Tension {} notified", candidate.0);
                self.pipeline.record_publish(candidate, now);
            }
            Err(e) => self.report(Err(e)),
        }
    }

    fn update_buttons(&mut self, now: Millis) -> Option<Flow> {
        for i in 0..self.buttons.len() {
            let pin = self.buttons[i].config.pin;
            let pressed = self.platform.digital_read(pin) == self.buttons[i].config.active_level;
            let Some(gesture) = self.buttons[i].gestures.update(pressed, now) else {
                continue;
            };

            log::info!("Button GPIO{}: {:?}", pin, gesture);
            self.power.note_activity(now);

            let wake = WakeSource {
                pin,
                active_level: self.buttons[i].config.active_level,
            };
            if let Some(flow) = self.dispatch(gesture, wake) {
                return Some(flow);
            }
        }
        None
    }

    fn update_tilt(&mut self, now: Millis) {
        let raw = self.platform.digital_read(self.config.tilt.pin);
        if self.tilt.update(raw, now) {
            log::debug!("Tilt -> {}", raw);
            self.power.note_activity(now);
        }
    }

    fn update_battery(&mut self, now: Millis) {
        if !self.battery.due(now) {
            return;
        }
        let Some(mv) = self.platform.battery_millivolts() else {
            self.battery.skip(now);
            return;
        };
        if self.battery.record(now, mv) {
            if let Some(level) = self.battery.level() {
                log::info!("Battery {}% ({} mV)", level, mv);
                if self.connection.is_connected() {
                    let result = self.publish(Channel::BatteryLevel, &encode_battery(level));
                    self.report(result);
                }
            }
        }
    }

    fn update_power(&mut self, now: Millis) {
        let Some(duration_us) = self.power.poll(now) else {
            return;
        };
        // Timed nap; the BLE link stays up through it.
        self.platform.sleep_light(duration_us);
        let woke = self.platform.now_millis();
        self.power.woke(woke);
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    fn dispatch(&mut self, gesture: Gesture, wake: WakeSource) -> Option<Flow> {
        match DeviceAction::for_gesture(gesture) {
            DeviceAction::ToggleMode => {
                self.mode = !self.mode;
                log::info!("Mode -> {}", self.mode);
                let result = self.publish(Channel::ButtonState, &encode_flag(self.mode));
                self.report(result);
                None
            }
            DeviceAction::Tare => {
                match self.sensor.tare() {
                    // Show the client the new zero right away.
                    Ok(()) => self.pipeline.request_refresh(),
                    Err(e) => log::error!("Tare failed: {:#}", e),
                }
                None
            }
            DeviceAction::PrepareDeepSleep => {
                if self.power.begin_deep_sleep() {
                    if let Err(e) = self.sensor.power_down() {
                        log::error!("Load cell power-down failed: {:#}", e);
                    }
                    self.feedback.power_off(&mut self.platform);
                    self.platform.delay_ms(self.power.settle_ms());
                }
                None
            }
            DeviceAction::EnterDeepSleep => {
                self.power.commit_deep_sleep();
                if let Err(e) = self.transport.shutdown() {
                    log::error!("BLE shutdown failed: {:#}", e);
                }
                self.halted = Some(wake);
                Some(Flow::DeepSleep(wake))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    /// Notify on `channel` if a client is connected, then give the link a
    /// moment to drain.
    fn publish(&mut self, channel: Channel, payload: &[u8]) -> Result<(), PublishError> {
        // Use this tick's connection snapshot, not a fresh read.
        if !self.connection.is_connected() {
            return Err(PublishError::NotConnected(channel));
        }
        self.transport
            .publish(channel, payload)
            .map_err(|source| PublishError::Transport { channel, source })?;
        self.connection.count_notification();
        self.platform.delay_ms(self.config.publish_settle_ms);
        Ok(())
    }

    fn report(&mut self, result: Result<(), PublishError>) {
        match result {
            Ok(()) => {}
            Err(PublishError::NotConnected(_)) => {
                self.diagnostics.dropped_disconnected += 1;
            }
            Err(e @ PublishError::Transport { .. }) => {
                self.diagnostics.publish_failures += 1;
                log::warn!("{:#}", anyhow::Error::from(e));
            }
        }
    }
}
