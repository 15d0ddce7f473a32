use std::time::Duration;

use si7021_rs::si7021_i2c::I2cPort;

pub const I2C_PORT: I2cPort = 0;
pub const SDA_GPIO: i32 = 18;
pub const SCL_GPIO: i32 = 19;
pub const CLOCK_SPEED_HZ: u32 = 200_000;

/// Upper bound for one bus transaction, the transport retries on top of it.
pub const TRANSACTION_TIMEOUT: Duration = Duration::from_millis(100);
pub const RETRY_TIMEOUT: Duration = Duration::from_millis(2000);

pub const SAMPLE_PERIOD_MS: u32 = 5000;
