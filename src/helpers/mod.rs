#[cfg(target_os = "espidf")]
pub mod esp_bus;
pub mod shared_bus;

#[cfg(target_os = "espidf")]
pub use esp_bus::EspI2cBus;
pub use shared_bus::{SharedBus, SharedBusInstance};
