pub mod ble;
pub mod buzzer;
pub mod loadcell;
pub mod platform;
