//! Driver for the Silicon Labs Si7021 humidity and temperature sensor.
//!
//! [`si7021_i2c`] is the transport: it talks to the sensor over a [`si7021_i2c::Bus`]
//! and retries while the sensor NACKs. [`si7021`] builds the sensor protocol on
//! top of it: measurements, registers, electronic ID and diagnostics.

pub mod helpers;
pub mod si7021;
pub mod si7021_i2c;

pub use si7021::Si7021;
pub use si7021_i2c::{Bus, BusConfig, BusMode, Error, HalBus};
