// Bandy - BLE Peripheral (NimBLE)
//
// GATT layout:
//   Fitness Machine (0x1826)
//     Tension        0x2AEB          READ | NOTIFY, sint16 LE, 0x2904 format
//     Button state   a6351a0c-...    READ | NOTIFY, uint8
//   Battery (0x180F)
//     Battery level  0x2A19          READ | NOTIFY, uint8 percent
//
// Advertising is not restarted automatically on disconnect; the controller
// restarts it after the disconnect settle delay.

use std::fmt::Debug;
use std::sync::Arc;

use esp32_nimble::utilities::mutex::Mutex;
use esp32_nimble::utilities::BleUuid;
use esp32_nimble::{
    BLEAdvertisementData, BLEAdvertising, BLECharacteristic, BLEDevice, BLEServer,
    DescriptorProperties, NimbleProperties,
};

use bandy::config::*;
use bandy::protocol::{tension_presentation_format, Channel};
use bandy::Transport;

pub struct BleTransport {
    server: &'static mut BLEServer,
    advertising: &'static Mutex<BLEAdvertising>,
    tension: Arc<Mutex<BLECharacteristic>>,
    button_state: Arc<Mutex<BLECharacteristic>>,
    battery_level: Arc<Mutex<BLECharacteristic>>,
}

/// NimBLE errors carry no `std::error::Error` impl; keep the debug text.
fn ble_err(e: impl Debug) -> anyhow::Error {
    anyhow::anyhow!("BLE: {:?}", e)
}

impl BleTransport {
    /// Bring up the stack, register the GATT table and start advertising.
    pub fn new() -> anyhow::Result<Self> {
        let device = BLEDevice::take();

        let server = device.get_server();
        server.advertise_on_disconnect(false);
        server.on_connect(|_server, desc| {
            log::info!("Client {:?} connected", desc.address());
        });
        server.on_disconnect(|desc, reason| {
            log::info!("Client {:?} disconnected ({:?})", desc.address(), reason);
        });

        let fitness = server.create_service(BleUuid::from_uuid16(FITNESS_SERVICE_UUID));
        let tension = fitness.lock().create_characteristic(
            BleUuid::from_uuid16(TENSION_CHAR_UUID),
            NimbleProperties::READ | NimbleProperties::NOTIFY,
        );
        tension.lock().set_value(&[0, 0]);
        let format = tension.lock().create_descriptor(
            BleUuid::from_uuid16(PRESENTATION_FORMAT_DESC_UUID),
            DescriptorProperties::READ,
        );
        format.lock().set_value(&tension_presentation_format());
        let description = tension.lock().create_descriptor(
            BleUuid::from_uuid16(USER_DESCRIPTION_DESC_UUID),
            DescriptorProperties::READ,
        );
        description.lock().set_value(b"Tension");

        let button_state = fitness.lock().create_characteristic(
            BleUuid::from_uuid128_string(BUTTON_STATE_CHAR_UUID).map_err(ble_err)?,
            NimbleProperties::READ | NimbleProperties::NOTIFY,
        );
        button_state.lock().set_value(&[0]);

        let battery = server.create_service(BleUuid::from_uuid16(BATTERY_SERVICE_UUID));
        let battery_level = battery.lock().create_characteristic(
            BleUuid::from_uuid16(BATTERY_LEVEL_CHAR_UUID),
            NimbleProperties::READ | NimbleProperties::NOTIFY,
        );
        battery_level.lock().set_value(&[100]);

        let advertising = device.get_advertising();
        advertising
            .lock()
            .set_data(
                BLEAdvertisementData::new()
                    .name(DEVICE_NAME)
                    .add_service_uuid(BleUuid::from_uuid16(FITNESS_SERVICE_UUID)),
            )
            .map_err(ble_err)?;

        let mut transport = Self {
            server,
            advertising,
            tension,
            button_state,
            battery_level,
        };
        transport.start_advertising()?;
        log::info!("Waiting for a client connection to notify...");
        Ok(transport)
    }

    fn characteristic(&self, channel: Channel) -> &Arc<Mutex<BLECharacteristic>> {
        match channel {
            Channel::Tension => &self.tension,
            Channel::ButtonState => &self.button_state,
            Channel::BatteryLevel => &self.battery_level,
        }
    }
}

impl Transport for BleTransport {
    fn is_connected(&self) -> bool {
        self.server.connected_count() > 0
    }

    fn publish(&mut self, channel: Channel, payload: &[u8]) -> anyhow::Result<()> {
        self.characteristic(channel).lock().set_value(payload).notify();
        Ok(())
    }

    fn start_advertising(&mut self) -> anyhow::Result<()> {
        self.advertising.lock().start().map_err(ble_err)?;
        Ok(())
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        BLEDevice::deinit().map_err(ble_err)?;
        log::info!("BLE stack deinitialised");
        Ok(())
    }
}
