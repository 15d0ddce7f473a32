use core::time::Duration;

use embedded_hal::delay::DelayNs;
use log::info;

use super::{CrcTarget, Error, ReadTarget, Si7021};
use crate::si7021_i2c::Bus;

fn wait_ms(wait: Option<Duration>) -> String {
    match wait {
        Some(wait) => format!("{} ms", wait.as_millis()),
        None => "global".to_string(),
    }
}

fn crc_flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "on",
        Some(false) => "off",
        None => "global",
    }
}

impl<B, D> Si7021<B, D>
where
    B: Bus,
    D: DelayNs,
{
    /// Reads back and logs registers, heater level, serial number and firmware.
    pub fn dump_device_info(&mut self) -> Result<(), Error<B::Error>> {
        let register = self.get_user_register()?;
        let user = super::UserRegisterInfo::from_register(register);
        let heater_level = self.get_heater_level()?;
        let serial = self.get_serial_number_info()?;
        let firmware = self.get_firmware_revision_info()?;

        info!("Si7021 {} device info:", self.name());
        info!("  User register: 0b{register:08b}");
        info!("    Resolution:   {}", user.resolution);
        info!("    Heater state: {}", user.heater_state);
        info!("    VDD status:   {}", user.vdd_status);
        info!(
            "  Heater level: 0x{:X} ({heater_level})",
            heater_level.bits()
        );
        info!(
            "  Serial number: 0x{:016X} ({}, ID 0x{:02X})",
            serial.serial_number,
            serial.id,
            serial.id.byte()
        );
        info!(
            "  Firmware revision: {} (0x{:02X})",
            firmware,
            firmware.byte()
        );
        Ok(())
    }

    pub fn dump_crc_config(&self) {
        let config = self.crc_config();
        info!("Si7021 {} CRC config:", self.name());
        info!("  Global: {}", if config.global { "on" } else { "off" });
        info!(
            "  RH: {} | Temp: {} | SNA: {} | SNB: {}",
            crc_flag(config.rh),
            crc_flag(config.temp),
            crc_flag(config.sna),
            crc_flag(config.snb)
        );
        info!(
            "  Effective RH: {} | Temp: {} | SNA: {} | SNB: {}",
            config.effective(CrcTarget::Rh),
            config.effective(CrcTarget::Temp),
            config.effective(CrcTarget::Sna),
            config.effective(CrcTarget::Snb)
        );
    }

    pub fn dump_read_wait(&self) {
        let wait = self.read_wait();
        info!("Si7021 {} read wait:", self.name());
        info!("  Global: {} ms", wait.global.as_millis());
        info!(
            "  RH: {} | Temp: {} | User reg: {} | Heater reg: {}",
            wait_ms(wait.rh),
            wait_ms(wait.temp),
            wait_ms(wait.user_reg),
            wait_ms(wait.heater_reg)
        );
        info!(
            "  SNA: {} | SNB: {} | FW: {}",
            wait_ms(wait.sna),
            wait_ms(wait.snb),
            wait_ms(wait.fw)
        );
        info!(
            "  Effective RH: {} ms | Temp: {} ms",
            wait.effective(ReadTarget::Rh).as_millis(),
            wait.effective(ReadTarget::Temp).as_millis()
        );
    }
}
