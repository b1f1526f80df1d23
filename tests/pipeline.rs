//! Integration tests: the device controller driven with in-memory hardware
//! and a clock the test advances by hand.

use std::collections::{HashMap, VecDeque};

use bandy::config::*;
use bandy::protocol::Channel;
use bandy::tasks::power::PowerState;
use bandy::{DeviceController, Flow, Millis, Platform, Sample, Sensor, Transport, WakeCause, WakeSource};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeSensor {
    queue: VecDeque<Sample>,
    /// Returned every tick once the queue is empty.
    steady: Option<f32>,
    fault: bool,
    tares: u32,
    powered_down: bool,
    power_ups: u32,
}

impl Sensor for FakeSensor {
    fn sample(&mut self) -> Option<Sample> {
        if self.powered_down {
            return None;
        }
        self.queue
            .pop_front()
            .or_else(|| self.steady.map(Sample::new))
    }

    fn tare(&mut self) -> anyhow::Result<()> {
        self.tares += 1;
        Ok(())
    }

    fn power_down(&mut self) -> anyhow::Result<()> {
        self.powered_down = true;
        Ok(())
    }

    fn power_up(&mut self) -> anyhow::Result<()> {
        self.powered_down = false;
        self.power_ups += 1;
        Ok(())
    }

    fn has_timeout_fault(&self) -> bool {
        self.fault
    }
}

#[derive(Default)]
struct FakeTransport {
    connected: bool,
    fail: bool,
    writes: Vec<(Channel, Vec<u8>)>,
    advertising_starts: u32,
    shut_down: bool,
}

impl FakeTransport {
    fn on(&self, channel: Channel) -> Vec<Vec<u8>> {
        self.writes
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl Transport for FakeTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, channel: Channel, payload: &[u8]) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("congested");
        }
        self.writes.push((channel, payload.to_vec()));
        Ok(())
    }

    fn start_advertising(&mut self) -> anyhow::Result<()> {
        self.advertising_starts += 1;
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        self.shut_down = true;
        self.connected = false;
        Ok(())
    }
}

struct FakePlatform {
    now: Millis,
    pins: HashMap<i32, bool>,
    tones: Vec<u32>,
    delays: Vec<u32>,
    light_sleeps: Vec<u64>,
    battery_mv: Option<u32>,
    wake: WakeCause,
}

impl Default for FakePlatform {
    fn default() -> Self {
        let mut pins = HashMap::new();
        pins.insert(PIN_BUTTON, true); // pull-up, released
        pins.insert(PIN_TILT, false);
        Self {
            now: 0,
            pins,
            tones: Vec::new(),
            delays: Vec::new(),
            light_sleeps: Vec::new(),
            battery_mv: None,
            wake: WakeCause::PowerOn,
        }
    }
}

impl Platform for FakePlatform {
    fn now_millis(&self) -> Millis {
        self.now
    }

    fn digital_read(&self, pin: i32) -> bool {
        self.pins.get(&pin).copied().unwrap_or(false)
    }

    fn digital_write(&mut self, pin: i32, high: bool) {
        self.pins.insert(pin, high);
    }

    fn tone(&mut self, _pin: i32, frequency_hz: u32, _duration_ms: u32) {
        self.tones.push(frequency_hz);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
        self.now = self.now.wrapping_add(ms);
    }

    fn sleep_light(&mut self, duration_us: u64) {
        self.light_sleeps.push(duration_us);
        self.now = self.now.wrapping_add((duration_us / 1000) as Millis);
    }

    fn sleep_deep_forever(&mut self, _wake: WakeSource) -> ! {
        panic!("deep sleep is never entered from tests");
    }

    fn wakeup_cause(&self) -> WakeCause {
        self.wake
    }

    fn battery_millivolts(&mut self) -> Option<u32> {
        self.battery_mv
    }
}

type Device = DeviceController<FakeSensor, FakeTransport, FakePlatform>;

fn device() -> Device {
    device_with(FakeSensor::default(), FakePlatform::default())
}

fn device_with(sensor: FakeSensor, platform: FakePlatform) -> Device {
    DeviceController::new(sensor, FakeTransport::default(), platform, DeviceConfig::default())
}

/// Advance the clock by `ms` and run one tick.
fn step(dev: &mut Device, ms: Millis) -> Flow {
    let p = dev.platform_mut();
    p.now = p.now.wrapping_add(ms);
    dev.tick()
}

/// Tick every 10 ms for `duration` ms.
fn run_for(dev: &mut Device, duration: Millis) -> Flow {
    let end = dev.platform().now.wrapping_add(duration);
    let mut flow = Flow::Continue;
    while dev.platform().now < end {
        flow = step(dev, 10);
        if flow != Flow::Continue {
            break;
        }
    }
    flow
}

fn set_button(dev: &mut Device, pressed: bool) {
    // Active low.
    dev.platform_mut().pins.insert(PIN_BUTTON, !pressed);
}

/// Two 80 ms presses 120 ms apart, then wait out the click window.
fn double_click(dev: &mut Device) {
    for _ in 0..2 {
        set_button(dev, true);
        run_for(dev, 80);
        set_button(dev, false);
        run_for(dev, 120);
    }
    run_for(dev, 500);
}

fn connect(dev: &mut Device) {
    dev.transport_mut().connected = true;
    step(dev, 10);
}

fn feed(dev: &mut Device, value: f32) {
    dev.sensor_mut().queue.push_back(Sample::new(value));
    step(dev, 10);
}

// ---------------------------------------------------------------------------
// Measurement
// ---------------------------------------------------------------------------

#[test]
fn tension_is_notified_as_scaled_le_i16() {
    let mut dev = device();
    connect(&mut dev);
    feed(&mut dev, 12.34);
    assert_eq!(dev.transport().on(Channel::Tension), vec![vec![123, 0]]);
}

#[test]
fn hysteresis_and_return_to_zero() {
    let mut dev = device();
    connect(&mut dev);
    for v in [1.0, 1.1, 1.3, 1.2, 0.0] {
        feed(&mut dev, v);
    }
    assert_eq!(
        dev.transport().on(Channel::Tension),
        vec![vec![10, 0], vec![13, 0], vec![0, 0]]
    );
}

#[test]
fn repeated_value_is_written_once() {
    let mut dev = device();
    connect(&mut dev);
    feed(&mut dev, 2.0);
    feed(&mut dev, 2.0);
    feed(&mut dev, 2.01);
    assert_eq!(dev.transport().on(Channel::Tension).len(), 1);
}

#[test]
fn reconnect_republishes_stale_value() {
    let mut dev = device();
    dev.sensor_mut().steady = Some(5.0);
    connect(&mut dev);
    run_for(&mut dev, 100);
    assert_eq!(dev.transport().on(Channel::Tension).len(), 1);

    dev.transport_mut().connected = false;
    step(&mut dev, 10);
    connect(&mut dev);
    // Same reading as before the disconnect, sent again for the new client.
    assert_eq!(
        dev.transport().on(Channel::Tension),
        vec![vec![50, 0], vec![50, 0]]
    );
}

#[test]
fn nothing_is_sent_while_disconnected() {
    let mut dev = device();
    dev.sensor_mut().steady = Some(3.0);
    run_for(&mut dev, 200);
    assert!(dev.transport().writes.is_empty());

    connect(&mut dev);
    assert_eq!(dev.transport().on(Channel::Tension), vec![vec![30, 0]]);
}

#[test]
fn sensor_timeout_is_not_fatal() {
    let mut dev = device();
    connect(&mut dev);
    feed(&mut dev, 4.0);

    dev.sensor_mut().fault = true;
    feed(&mut dev, 9.0);
    feed(&mut dev, 9.0);
    assert_eq!(dev.diagnostics().sensor_faults, 1);
    assert_eq!(dev.power_state(), PowerState::Awake);
    assert_eq!(dev.transport().on(Channel::Tension), vec![vec![40, 0]]);

    dev.sensor_mut().fault = false;
    feed(&mut dev, 9.0);
    assert_eq!(
        dev.transport().on(Channel::Tension),
        vec![vec![40, 0], vec![90, 0]]
    );
}

#[test]
fn transport_failure_is_counted_and_next_tick_tries_again() {
    let mut dev = device();
    connect(&mut dev);
    dev.transport_mut().fail = true;
    feed(&mut dev, 1.0);
    assert_eq!(dev.diagnostics().publish_failures, 1);

    dev.transport_mut().fail = false;
    feed(&mut dev, 1.0);
    assert_eq!(dev.transport().on(Channel::Tension), vec![vec![10, 0]]);
}

#[test]
fn every_notify_is_followed_by_a_settle_delay() {
    let mut dev = device();
    connect(&mut dev);
    let before = dev.platform().delays.len();
    feed(&mut dev, 7.0);
    assert_eq!(&dev.platform().delays[before..], &[PUBLISH_SETTLE_MS]);
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

#[test]
fn connect_updates_leds_and_sends_mode() {
    let mut dev = device();
    assert!(dev.platform().pins[&PIN_LED_WAITING]);
    connect(&mut dev);
    assert!(dev.is_connected());
    assert!(dev.platform().pins[&PIN_LED_CONNECTED]);
    assert!(!dev.platform().pins[&PIN_LED_WAITING]);
    assert_eq!(dev.platform().tones.last(), Some(&TONE_CONNECTED_HZ));
    assert_eq!(dev.transport().on(Channel::ButtonState), vec![vec![0]]);
}

#[test]
fn disconnect_settles_then_readvertises() {
    let mut dev = device();
    connect(&mut dev);
    dev.transport_mut().connected = false;
    step(&mut dev, 10);

    assert!(!dev.is_connected());
    assert!(dev.platform().pins[&PIN_LED_WAITING]);
    assert_eq!(dev.platform().tones.last(), Some(&TONE_WAITING_HZ));
    assert!(dev.platform().delays.contains(&DISCONNECT_SETTLE_MS));
    assert_eq!(dev.transport().advertising_starts, 1);

    // Edge fires once.
    step(&mut dev, 10);
    assert_eq!(dev.transport().advertising_starts, 1);
}

#[test]
fn battery_level_is_reported() {
    let mut platform = FakePlatform::default();
    platform.battery_mv = Some(3750);
    let mut dev = device_with(FakeSensor::default(), platform);
    step(&mut dev, 10);
    connect(&mut dev);
    assert_eq!(dev.transport().on(Channel::BatteryLevel), vec![vec![50]]);

    dev.platform_mut().battery_mv = Some(4200);
    run_for(&mut dev, BATTERY_CHECK_INTERVAL_MS);
    assert_eq!(
        dev.transport().on(Channel::BatteryLevel),
        vec![vec![50], vec![100]]
    );
}

// ---------------------------------------------------------------------------
// Buttons
// ---------------------------------------------------------------------------

#[test]
fn click_toggles_mode_and_notifies() {
    let mut dev = device();
    connect(&mut dev);
    set_button(&mut dev, true);
    run_for(&mut dev, 100);
    set_button(&mut dev, false);
    run_for(&mut dev, 600);

    assert!(dev.mode());
    assert_eq!(dev.transport().on(Channel::ButtonState), vec![vec![0], vec![1]]);
    assert_eq!(dev.sensor().tares, 0);
}

#[test]
fn double_click_tares() {
    let mut dev = device();
    double_click(&mut dev);

    assert_eq!(dev.sensor().tares, 1);
    assert!(!dev.mode());
}

#[test]
fn bouncy_click_is_still_a_single_click() {
    let mut dev = device();
    set_button(&mut dev, true);
    run_for(&mut dev, 60);
    // One open-contact sample mid-press.
    set_button(&mut dev, false);
    step(&mut dev, 10);
    set_button(&mut dev, true);
    run_for(&mut dev, 200);
    set_button(&mut dev, false);
    run_for(&mut dev, 600);

    assert!(dev.mode());
    assert_eq!(dev.sensor().tares, 0);
}

#[test]
fn tare_refresh_with_unchanged_reading_is_not_rewritten() {
    let mut dev = device();
    dev.sensor_mut().steady = Some(0.0);
    connect(&mut dev);
    run_for(&mut dev, 50);
    assert_eq!(dev.transport().on(Channel::Tension), vec![vec![0, 0]]);

    double_click(&mut dev);
    assert_eq!(dev.sensor().tares, 1);
    run_for(&mut dev, 100);

    assert_eq!(dev.diagnostics().duplicates_skipped, 1);
    assert_eq!(dev.transport().on(Channel::Tension), vec![vec![0, 0]]);
}

#[test]
fn tare_refresh_sends_new_zero_within_hysteresis() {
    let mut dev = device();
    dev.sensor_mut().steady = Some(0.5);
    connect(&mut dev);
    run_for(&mut dev, 50);

    // Re-zeroed reading sits one count away: below hysteresis but forced.
    dev.sensor_mut().steady = Some(0.4);
    double_click(&mut dev);
    run_for(&mut dev, 100);

    assert_eq!(
        dev.transport().on(Channel::Tension),
        vec![vec![5, 0], vec![4, 0]]
    );
    assert_eq!(dev.diagnostics().duplicates_skipped, 0);
}

#[test]
fn button_held_through_wake_is_not_a_click() {
    let mut platform = FakePlatform::default();
    platform.wake = WakeCause::ExternalPin;
    platform.pins.insert(PIN_BUTTON, BUTTON_ACTIVE_LEVEL);
    let mut dev = device_with(FakeSensor::default(), platform);
    run_for(&mut dev, 100);
    set_button(&mut dev, false);
    run_for(&mut dev, 1_000);

    assert!(!dev.mode());
    assert_eq!(dev.power_state(), PowerState::Awake);

    set_button(&mut dev, true);
    run_for(&mut dev, 100);
    set_button(&mut dev, false);
    run_for(&mut dev, 600);
    assert!(dev.mode());
}

#[test]
fn long_press_enters_deep_sleep() {
    let mut dev = device();
    connect(&mut dev);
    set_button(&mut dev, true);
    assert_eq!(run_for(&mut dev, 1200), Flow::Continue);

    assert_eq!(dev.power_state(), PowerState::DeepSleepPending);
    assert!(dev.sensor().powered_down);
    assert!(!dev.platform().pins[&PIN_LED_CONNECTED]);
    assert!(!dev.platform().pins[&PIN_LED_WAITING]);
    assert_eq!(dev.platform().tones.last(), Some(&TONE_SLEEP_HZ));
    assert!(dev.platform().delays.contains(&DEEP_SLEEP_SETTLE_MS));
    assert!(!dev.transport().shut_down);

    set_button(&mut dev, false);
    let wake = WakeSource {
        pin: PIN_BUTTON,
        active_level: BUTTON_ACTIVE_LEVEL,
    };
    // Release is accepted once debounced.
    assert_eq!(step(&mut dev, 10), Flow::Continue);
    assert_eq!(run_for(&mut dev, 100), Flow::DeepSleep(wake));
    assert!(dev.transport().shut_down);
    assert_eq!(dev.power_state(), PowerState::DeepSleep);

    // Terminal: nothing else runs.
    let writes = dev.transport().writes.len();
    assert_eq!(step(&mut dev, 10), Flow::DeepSleep(wake));
    assert_eq!(dev.transport().writes.len(), writes);
}

#[test]
fn boot_from_button_wake_powers_sensor_up() {
    let mut platform = FakePlatform::default();
    platform.wake = WakeCause::ExternalPin;
    let dev = device_with(FakeSensor::default(), platform);
    assert_eq!(dev.wake_cause(), WakeCause::ExternalPin);
    assert_eq!(dev.sensor().power_ups, 1);

    let cold = device();
    assert_eq!(cold.sensor().power_ups, 0);
}

// ---------------------------------------------------------------------------
// Power
// ---------------------------------------------------------------------------

#[test]
fn idle_timeout_naps_without_dropping_the_link() {
    let mut dev = device();
    connect(&mut dev);
    run_for(&mut dev, 25_000);

    assert_eq!(dev.platform().light_sleeps, vec![LIGHT_SLEEP_US; 2]);
    assert_eq!(dev.diagnostics().light_sleeps, 2);
    assert!(dev.is_connected());
    assert_eq!(dev.transport().advertising_starts, 0);
    assert_eq!(dev.power_state(), PowerState::Awake);
}

#[test]
fn tilt_keeps_the_device_awake() {
    let mut dev = device();
    let mut level = false;
    for _ in 0..5 {
        run_for(&mut dev, 5_000);
        level = !level;
        dev.platform_mut().pins.insert(PIN_TILT, level);
    }
    run_for(&mut dev, 1_000);
    assert!(dev.platform().light_sleeps.is_empty());
}
