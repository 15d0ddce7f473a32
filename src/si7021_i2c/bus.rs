use embedded_hal::i2c::{I2c, SevenBitAddress};

/// Index of an I2C controller on the host chip.
pub type I2cPort = u8;

/// Role the controller plays on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    Master,
    /// Not usable with the Si7021, rejected at transport creation.
    Slave,
}

/// Electrical and timing configuration applied to a controller before its
/// driver is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub mode: BusMode,
    pub sda_io: i32,
    pub scl_io: i32,
    pub sda_pullup: bool,
    pub scl_pullup: bool,
    pub clock_speed_hz: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            mode: BusMode::Master,
            sda_io: 18,
            scl_io: 19,
            sda_pullup: true,
            scl_pullup: true,
            clock_speed_hz: 200_000,
        }
    }
}

impl BusConfig {
    pub fn mode(mut self, mode: BusMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn pins(mut self, sda_io: i32, scl_io: i32) -> Self {
        self.sda_io = sda_io;
        self.scl_io = scl_io;
        self
    }

    pub fn pullups(mut self, sda: bool, scl: bool) -> Self {
        self.sda_pullup = sda;
        self.scl_pullup = scl;
        self
    }

    pub fn clock_speed(mut self, hz: u32) -> Self {
        self.clock_speed_hz = hz;
        self
    }
}

/// Raw access to an I2C controller.
///
/// `write` and `read` perform exactly one bus transaction each; retrying is the
/// transport's job. The lifecycle hooks default to no-ops for buses whose driver
/// is owned by someone else.
pub trait Bus {
    type Error: embedded_hal::i2c::Error;

    fn configure(&mut self, _port: I2cPort, _config: &BusConfig) -> Result<(), Self::Error> {
        Ok(())
    }

    fn install(&mut self, _port: I2cPort, _mode: BusMode) -> Result<(), Self::Error> {
        Ok(())
    }

    fn uninstall(&mut self, _port: I2cPort) -> Result<(), Self::Error> {
        Ok(())
    }

    fn write(&mut self, port: I2cPort, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    fn read(&mut self, port: I2cPort, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Runs `f` with the bus held for its whole duration.
    ///
    /// The transport issues a command, its settle delay and the read of the
    /// answer inside one call, so a bus shared between handles must not let
    /// another handle's transactions in until `f` returns.
    fn exclusive<R, F>(&mut self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(&mut dyn Bus<Error = Self::Error>) -> R,
    {
        f(self)
    }
}

/// Adapter for an already configured `embedded-hal` I2C peripheral, e.g. an
/// `I2cDriver` the application created itself. The port argument is ignored.
#[derive(Debug)]
pub struct HalBus<I2C> {
    i2c: I2C,
}

impl<I2C> HalBus<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub fn destroy(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Bus for HalBus<I2C>
where
    I2C: I2c<SevenBitAddress>,
{
    type Error = I2C::Error;

    fn write(&mut self, _port: I2cPort, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, bytes)
    }

    fn read(&mut self, _port: I2cPort, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.read(address, buffer)
    }
}
