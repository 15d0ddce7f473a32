//! I2C transport for the Si7021.
//!
//! Wraps a [`Bus`] with retry-until-timeout semantics, because the sensor NACKs
//! every transaction while it is busy converting, and implements the command set
//! on top of a write, wait, read pattern.

pub mod bus;
pub mod crc;

use core::fmt;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, ErrorKind};
use log::{debug, error, info, warn};

pub use bus::{Bus, BusConfig, BusMode, HalBus, I2cPort};
pub use crc::CrcMismatch;

/// 7-bit bus address of every Si70xx part.
pub const DEVICE_ADDRESS: u8 = 0x40;

/// Highest clock speed the sensor is specified for.
pub const MAX_CLOCK_SPEED_HZ: u32 = 400_000;

pub const HANDLE_NAME_LENGTH: usize = 16;

pub type HandleName = heapless::String<HANDLE_NAME_LENGTH>;

/// All possible errors in this crate
#[derive(Debug, Clone, PartialEq)]
pub enum Error<E> {
    /// I²C bus error, returned once the retry timeout ran out
    I2C(E),
    /// Received data failed its checksum
    Crc { calculated: u8, received: u8 },
    /// Rejected caller input
    InvalidArgument(&'static str),
}

impl<E> From<CrcMismatch> for Error<E> {
    fn from(other: CrcMismatch) -> Self {
        Error::Crc {
            calculated: other.calculated,
            received: other.received,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2C(e) => write!(f, "I2C bus error: {e:?}"),
            Error::Crc {
                calculated,
                received,
            } => write!(
                f,
                "CRC mismatch (calculated 0x{calculated:02X}, received 0x{received:02X})"
            ),
            Error::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for Error<E> {}

/// Command bytes, see the Si7021-A20 datasheet, table 11.
pub struct Command;
impl Command {
    pub const MEASURE_RH_HOLD_MASTER: u8 = 0xE5;
    pub const MEASURE_RH_NOHOLD_MASTER: u8 = 0xF5;
    pub const MEASURE_TEMP_HOLD_MASTER: u8 = 0xE3;
    pub const MEASURE_TEMP_NOHOLD_MASTER: u8 = 0xF3;
    pub const READ_TEMP_FROM_PREV_RH: u8 = 0xE0;
    pub const RESET: u8 = 0xFE;
    pub const WRITE_USER_REG_1: u8 = 0xE6;
    pub const READ_USER_REG_1: u8 = 0xE7;
    pub const WRITE_HEATER_CONTROL_REG: u8 = 0x51;
    pub const READ_HEATER_CONTROL_REG: u8 = 0x11;
    pub const READ_EID_FIRST_BYTES: [u8; 2] = [0xFA, 0x0F];
    pub const READ_EID_LAST_BYTES: [u8; 2] = [0xFC, 0xC9];
    pub const READ_FIRMWARE_REVISION: [u8; 2] = [0x84, 0xB8];
}

/// What the transport does with the bus driver when created and deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverArgs {
    pub install: bool,
    /// Only applied when `install` is set.
    pub set_config: bool,
    /// Only honoured when this handle performed the install.
    pub uninstall_at_delete: bool,
    pub config: BusConfig,
}

impl Default for DriverArgs {
    fn default() -> Self {
        Self {
            install: true,
            set_config: true,
            uninstall_at_delete: true,
            config: BusConfig::default(),
        }
    }
}

impl DriverArgs {
    /// The bus driver is installed and torn down by somebody else.
    pub fn external() -> Self {
        Self {
            install: false,
            set_config: false,
            uninstall_at_delete: false,
            config: BusConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateArgs {
    pub name: &'static str,
    pub port: I2cPort,
    /// How long a single write or read keeps retrying while the sensor NACKs.
    pub retry_timeout: Duration,
    pub driver: DriverArgs,
}

impl Default for CreateArgs {
    fn default() -> Self {
        Self {
            name: "si7021_i2c",
            port: 0,
            retry_timeout: Duration::from_millis(2000),
            driver: DriverArgs::default(),
        }
    }
}

impl CreateArgs {
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_port(mut self, port: I2cPort) -> Self {
        self.port = port;
        self
    }

    pub fn with_retry_timeout(mut self, retry_timeout: Duration) -> Self {
        self.retry_timeout = retry_timeout;
        self
    }

    pub fn with_driver(mut self, driver: DriverArgs) -> Self {
        self.driver = driver;
        self
    }
}

/// Truncates to the handle name capacity on a character boundary.
pub(crate) fn handle_name(name: &str) -> HandleName {
    let mut out = HandleName::new();
    for c in name.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// One configured Si7021 bus endpoint.
#[derive(Debug)]
pub struct Si7021I2c<B, D> {
    name: HandleName,
    bus: B,
    delay: D,
    port: I2cPort,
    retry_timeout: Duration,
    uninstall_at_delete: bool,
}

impl<B, D> Si7021I2c<B, D>
where
    B: Bus,
    D: DelayNs,
{
    /// Creates the handle, configuring and installing the bus driver first if
    /// requested. On failure the bus is handed back with the error.
    pub fn create(
        args: &CreateArgs,
        mut bus: B,
        delay: D,
    ) -> Result<Self, (Error<B::Error>, B)> {
        if let Err(e) = Self::prepare_driver(args, &mut bus) {
            return Err((e, bus));
        }

        Ok(Self {
            name: handle_name(args.name),
            bus,
            delay,
            port: args.port,
            retry_timeout: args.retry_timeout,
            uninstall_at_delete: args.driver.install && args.driver.uninstall_at_delete,
        })
    }

    fn prepare_driver(args: &CreateArgs, bus: &mut B) -> Result<(), Error<B::Error>> {
        let driver = &args.driver;
        if !driver.install {
            return Ok(());
        }
        if driver.config.mode != BusMode::Master {
            error!("I2C driver mode is not master");
            return Err(Error::InvalidArgument("I2C driver mode must be master"));
        }
        if driver.set_config {
            let config = &driver.config;
            info!(
                "I2C driver configuration: SDA GPIO {} (pull-up: {}), SCL GPIO {} (pull-up: {}), clock {} Hz",
                config.sda_io,
                config.sda_pullup,
                config.scl_io,
                config.scl_pullup,
                config.clock_speed_hz
            );
            if config.clock_speed_hz > MAX_CLOCK_SPEED_HZ {
                warn!(
                    "I2C clock speed is greater than maximum recommended value of {MAX_CLOCK_SPEED_HZ} Hz"
                );
            }
            bus.configure(args.port, config).map_err(|e| {
                error!("Could not set I2C driver configuration: {e:?}");
                Error::I2C(e)
            })?;
        }
        info!("Installing I2C driver on port {}", args.port);
        bus.install(args.port, driver.config.mode).map_err(|e| {
            error!("Could not install I2C driver: {e:?}");
            Error::I2C(e)
        })
    }

    /// Releases the handle, uninstalling the bus driver if this handle owns it.
    /// The bus is handed back even when the uninstall fails.
    pub fn delete(mut self) -> (B, Result<(), Error<B::Error>>) {
        let mut result = Ok(());
        if self.uninstall_at_delete {
            info!("Uninstalling I2C driver on port {}", self.port);
            if let Err(e) = self.bus.uninstall(self.port) {
                warn!("Could not uninstall I2C driver: {e:?}");
                result = Err(Error::I2C(e));
            }
        }
        (self.bus, result)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> I2cPort {
        self.port
    }

    pub fn retry_timeout(&self) -> Duration {
        self.retry_timeout
    }

    /// Writes `bytes`, retrying until the sensor ACKs or the retry timeout elapses.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), Error<B::Error>> {
        let (port, timeout) = (self.port, self.retry_timeout);
        self.bus
            .exclusive(|bus| write_with_retry(bus, port, timeout, bytes))
    }

    /// Fills `buffer` from the sensor's read pointer, with the same retry rules as [`Self::write`].
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<(), Error<B::Error>> {
        let (port, timeout) = (self.port, self.retry_timeout);
        self.bus
            .exclusive(|bus| read_with_retry(bus, port, timeout, buffer))
    }

    /// Writes a command, optionally sleeps for `settle` and then reads the answer.
    ///
    /// The bus stays held from the write until the read completes. The settle
    /// delay is independent of the bus retry timeout: with no delay the read
    /// simply retries while the sensor is still converting.
    pub fn write_then_read(
        &mut self,
        command: &[u8],
        buffer: &mut [u8],
        settle: Duration,
    ) -> Result<(), Error<B::Error>> {
        let (port, timeout) = (self.port, self.retry_timeout);
        let delay = &mut self.delay;
        self.bus.exclusive(|bus| {
            write_with_retry(bus, port, timeout, command)?;
            if !settle.is_zero() {
                delay.delay_us(u32::try_from(settle.as_micros()).unwrap_or(u32::MAX));
            }
            read_with_retry(bus, port, timeout, buffer)
        })
    }

    fn measure_command(
        &mut self,
        command: u8,
        crc_check: bool,
        settle: Duration,
    ) -> Result<u16, Error<B::Error>> {
        let mut data = [0u8; 3];
        let len = if crc_check { 3 } else { 2 };
        self.write_then_read(&[command], &mut data[..len], settle)?;
        if crc_check {
            crc::check(&data)?;
        }
        Ok(u16::from_be_bytes([data[0], data[1]]))
    }

    fn read_register(&mut self, command: u8, settle: Duration) -> Result<u8, Error<B::Error>> {
        let mut value = [0u8; 1];
        self.write_then_read(&[command], &mut value, settle)?;
        Ok(value[0])
    }

    pub fn measure_rh_hold_master(
        &mut self,
        crc_check: bool,
        settle: Duration,
    ) -> Result<u16, Error<B::Error>> {
        self.measure_command(Command::MEASURE_RH_HOLD_MASTER, crc_check, settle)
    }

    pub fn measure_rh_nohold_master(
        &mut self,
        crc_check: bool,
        settle: Duration,
    ) -> Result<u16, Error<B::Error>> {
        self.measure_command(Command::MEASURE_RH_NOHOLD_MASTER, crc_check, settle)
    }

    pub fn measure_temp_hold_master(
        &mut self,
        crc_check: bool,
        settle: Duration,
    ) -> Result<u16, Error<B::Error>> {
        self.measure_command(Command::MEASURE_TEMP_HOLD_MASTER, crc_check, settle)
    }

    pub fn measure_temp_nohold_master(
        &mut self,
        crc_check: bool,
        settle: Duration,
    ) -> Result<u16, Error<B::Error>> {
        self.measure_command(Command::MEASURE_TEMP_NOHOLD_MASTER, crc_check, settle)
    }

    /// The sensor sends no checksum for this command.
    pub fn read_temp_from_prev_rh_measurement(
        &mut self,
        settle: Duration,
    ) -> Result<u16, Error<B::Error>> {
        self.measure_command(Command::READ_TEMP_FROM_PREV_RH, false, settle)
    }

    pub fn reset(&mut self) -> Result<(), Error<B::Error>> {
        self.write(&[Command::RESET])
    }

    pub fn write_user_reg_1(&mut self, value: u8) -> Result<(), Error<B::Error>> {
        self.write(&[Command::WRITE_USER_REG_1, value])
    }

    pub fn read_user_reg_1(&mut self, settle: Duration) -> Result<u8, Error<B::Error>> {
        self.read_register(Command::READ_USER_REG_1, settle)
    }

    pub fn write_heater_control_reg(&mut self, value: u8) -> Result<(), Error<B::Error>> {
        self.write(&[Command::WRITE_HEATER_CONTROL_REG, value])
    }

    pub fn read_heater_control_reg(&mut self, settle: Duration) -> Result<u8, Error<B::Error>> {
        self.read_register(Command::READ_HEATER_CONTROL_REG, settle)
    }

    /// Serial number bits [63:32]. The answer is `SNA_3 CRC SNA_2 CRC SNA_1 CRC SNA_0 CRC`.
    pub fn read_electronic_id_first_bytes(
        &mut self,
        crc_check: bool,
        settle: Duration,
    ) -> Result<u32, Error<B::Error>> {
        let mut data = [0u8; 8];
        self.write_then_read(&Command::READ_EID_FIRST_BYTES, &mut data, settle)?;
        if crc_check {
            crc::check_chained(&data, 2)?;
        }
        Ok(u32::from_be_bytes([data[0], data[2], data[4], data[6]]))
    }

    /// Serial number bits [31:0]. The answer is `SNB_3 SNB_2 CRC SNB_1 SNB_0 CRC`.
    pub fn read_electronic_id_last_bytes(
        &mut self,
        crc_check: bool,
        settle: Duration,
    ) -> Result<u32, Error<B::Error>> {
        let mut data = [0u8; 6];
        self.write_then_read(&Command::READ_EID_LAST_BYTES, &mut data, settle)?;
        if crc_check {
            crc::check_chained(&data, 3)?;
        }
        Ok(u32::from_be_bytes([data[0], data[1], data[3], data[4]]))
    }

    pub fn read_firmware_revision(&mut self, settle: Duration) -> Result<u8, Error<B::Error>> {
        let mut revision = [0u8; 1];
        self.write_then_read(&Command::READ_FIRMWARE_REVISION, &mut revision, settle)?;
        Ok(revision[0])
    }
}

fn write_with_retry<B: Bus + ?Sized>(
    bus: &mut B,
    port: I2cPort,
    timeout: Duration,
    bytes: &[u8],
) -> Result<(), Error<B::Error>> {
    retry(timeout, "write", || bus.write(port, DEVICE_ADDRESS, bytes)).map_err(|e| {
        error!("Could not write to Si7021: {e:?}");
        Error::I2C(e)
    })
}

fn read_with_retry<B: Bus + ?Sized>(
    bus: &mut B,
    port: I2cPort,
    timeout: Duration,
    buffer: &mut [u8],
) -> Result<(), Error<B::Error>> {
    retry(timeout, "read", || bus.read(port, DEVICE_ADDRESS, &mut *buffer)).map_err(|e| {
        error!("Could not read from Si7021: {e:?}");
        Error::I2C(e)
    })
}

/// Runs `attempt` until it succeeds or `timeout` has elapsed since the first try.
/// A zero timeout means a single attempt.
fn retry<E, F>(timeout: Duration, what: &str, mut attempt: F) -> Result<(), E>
where
    E: embedded_hal::i2c::Error,
    F: FnMut() -> Result<(), E>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match attempt() {
            Ok(()) => {
                if attempts > 1 {
                    debug!("I2C {what} succeeded after {attempts} attempts");
                }
                return Ok(());
            }
            Err(e) => {
                if start.elapsed() >= timeout {
                    debug!("I2C {what} gave up after {attempts} attempts: {e:?}");
                    return Err(e);
                }
                if !matches!(e.kind(), ErrorKind::NoAcknowledge(_)) {
                    debug!("I2C {what} attempt {attempts} failed: {e:?}");
                }
                std::thread::yield_now();
            }
        }
    }
}
