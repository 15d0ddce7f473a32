use std::time::Duration;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use esp_idf_svc::hal::i2c::I2cError;
use esp_idf_svc::sys::{self, esp, EspError, TickType_t};
use log::debug;

use crate::si7021_i2c::{Bus, BusConfig, BusMode, I2cPort};

/// ESP-IDF legacy I2C master driver, addressed by port number.
///
/// Unlike an `I2cDriver` this does not own the port peripheral, which lets the
/// transport install and delete the driver itself.
#[derive(Debug, Clone, Copy)]
pub struct EspI2cBus {
    ticks_to_wait: TickType_t,
}

impl EspI2cBus {
    /// `timeout` bounds every single bus transaction.
    pub fn new(timeout: Duration) -> Self {
        let ticks = timeout.as_millis() * u128::from(sys::configTICK_RATE_HZ) / 1000;
        Self {
            ticks_to_wait: TickType_t::try_from(ticks).unwrap_or(TickType_t::MAX).max(1),
        }
    }
}

fn to_i2c_error(err: EspError) -> I2cError {
    if err.code() == sys::ESP_FAIL {
        I2cError::new(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown), err)
    } else {
        I2cError::other(err)
    }
}

fn i2c_mode(mode: BusMode) -> sys::i2c_mode_t {
    match mode {
        BusMode::Master => sys::i2c_mode_t_I2C_MODE_MASTER,
        BusMode::Slave => sys::i2c_mode_t_I2C_MODE_SLAVE,
    }
}

impl Bus for EspI2cBus {
    type Error = I2cError;

    fn configure(&mut self, port: I2cPort, config: &BusConfig) -> Result<(), I2cError> {
        let sys_config = sys::i2c_config_t {
            mode: i2c_mode(config.mode),
            sda_io_num: config.sda_io,
            sda_pullup_en: config.sda_pullup,
            scl_io_num: config.scl_io,
            scl_pullup_en: config.scl_pullup,
            __bindgen_anon_1: sys::i2c_config_t__bindgen_ty_1 {
                master: sys::i2c_config_t__bindgen_ty_1__bindgen_ty_1 {
                    clk_speed: config.clock_speed_hz,
                },
            },
            ..Default::default()
        };
        esp!(unsafe { sys::i2c_param_config(sys::i2c_port_t::from(port), &sys_config) })
            .map_err(I2cError::other)
    }

    fn install(&mut self, port: I2cPort, mode: BusMode) -> Result<(), I2cError> {
        debug!("i2c_driver_install on port {port}");
        esp!(unsafe { sys::i2c_driver_install(sys::i2c_port_t::from(port), i2c_mode(mode), 0, 0, 0) })
            .map_err(I2cError::other)
    }

    fn uninstall(&mut self, port: I2cPort) -> Result<(), I2cError> {
        debug!("i2c_driver_delete on port {port}");
        esp!(unsafe { sys::i2c_driver_delete(sys::i2c_port_t::from(port)) }).map_err(I2cError::other)
    }

    fn write(&mut self, port: I2cPort, address: u8, bytes: &[u8]) -> Result<(), I2cError> {
        esp!(unsafe {
            sys::i2c_master_write_to_device(
                sys::i2c_port_t::from(port),
                address,
                bytes.as_ptr(),
                bytes.len(),
                self.ticks_to_wait,
            )
        })
        .map_err(to_i2c_error)
    }

    fn read(&mut self, port: I2cPort, address: u8, buffer: &mut [u8]) -> Result<(), I2cError> {
        esp!(unsafe {
            sys::i2c_master_read_from_device(
                sys::i2c_port_t::from(port),
                address,
                buffer.as_mut_ptr(),
                buffer.len(),
                self.ticks_to_wait,
            )
        })
        .map_err(to_i2c_error)
    }
}
