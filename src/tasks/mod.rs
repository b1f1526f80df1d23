// Per-tick steps driven by the device controller, in tick order.

pub mod connection;
pub mod sensor;
pub mod feedback;
pub mod power;
