use embedded_hal::delay::DelayNs;
use log::{error, warn};

use super::{
    convert_rh, convert_temp, AtInit, CrcConfig, CrcTarget, CreateArgs, Error, FirmwareVersion,
    HeaterLevel, HeaterState, MeasureMode, Measurement, ReadTarget, ReadWait, Resolution,
    SerialNumberInfo, UserRegisterInfo, VddStatus, HEATER_REGISTER_DEFAULT,
    HEATER_REGISTER_MASK_HEATER_LEVEL,
};
use crate::si7021_i2c::{handle_name, Bus, HandleName, Si7021I2c};

/// Si7021 device driver.
///
/// Owns its I2C transport. Every operation is blocking and issues its bus
/// transactions in sequence; calls on one handle must not interleave.
#[derive(Debug)]
pub struct Si7021<B, D> {
    name: HandleName,
    i2c: Si7021I2c<B, D>,
    crc_config: CrcConfig,
    read_wait: ReadWait,
    measure_mode: MeasureMode,
}

fn log_failure<E: core::fmt::Debug>(what: &'static str) -> impl FnOnce(Error<E>) -> Error<E> {
    move |e| {
        error!("Si7021 I2C {what} command failed: {e}");
        e
    }
}

impl<B, D> Si7021<B, D>
where
    B: Bus,
    D: DelayNs,
{
    /// Creates the transport, then runs the requested [`AtInit`] actions.
    ///
    /// If an action fails the transport is deleted again (uninstalling the bus
    /// driver if it was installed here). Any failure hands the bus back together
    /// with the error.
    pub fn create(args: &CreateArgs, bus: B, delay: D) -> Result<Self, (Error<B::Error>, B)> {
        let i2c = Si7021I2c::create(&args.i2c, bus, delay).map_err(|(e, bus)| {
            error!("Could not create Si7021 I2C handle: {e}");
            (e, bus)
        })?;

        let mut si7021 = Si7021 {
            name: handle_name(args.name),
            i2c,
            crc_config: args.crc_config,
            read_wait: args.read_wait,
            measure_mode: args.measure_mode,
        };

        if let Err(e) = si7021.at_init(&args.at_init) {
            let (bus, _) = si7021.delete();
            return Err((e, bus));
        }
        Ok(si7021)
    }

    fn at_init(&mut self, at_init: &AtInit) -> Result<(), Error<B::Error>> {
        fn phase<E: core::fmt::Debug>(phase: &'static str) -> impl FnOnce(Error<E>) -> Error<E> {
            move |e| {
                error!("Could not {phase} Si7021 at init: {e}");
                e
            }
        }

        if at_init.reset {
            self.reset().map_err(phase("reset"))?;
        }
        if let Some(level) = at_init.heater_level {
            self.set_heater_level(level)
                .map_err(phase("set heater level"))?;
        }
        if let Some(info) = at_init.user_register_info {
            self.set_user_register_info(&info)
                .map_err(phase("set user register info"))?;
        }
        if at_init.dump.device_info {
            self.dump_device_info()
                .map_err(phase("dump device info"))?;
        }
        if at_init.dump.crc_config {
            self.dump_crc_config();
        }
        if at_init.dump.read_wait {
            self.dump_read_wait();
        }
        Ok(())
    }

    /// Deletes the transport and hands the bus back.
    pub fn delete(self) -> (B, Result<(), Error<B::Error>>) {
        let (bus, result) = self.i2c.delete();
        if let Err(e) = &result {
            warn!("Could not delete Si7021 I2C handle: {e}");
        }
        (bus, result)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn crc_config(&self) -> CrcConfig {
        self.crc_config
    }

    pub fn set_crc_config(&mut self, crc_config: CrcConfig) {
        self.crc_config = crc_config;
    }

    pub fn read_wait(&self) -> ReadWait {
        self.read_wait
    }

    pub fn set_read_wait(&mut self, read_wait: ReadWait) {
        self.read_wait = read_wait;
    }

    pub fn measure_mode(&self) -> MeasureMode {
        self.measure_mode
    }

    pub fn set_measure_mode(&mut self, measure_mode: MeasureMode) {
        self.measure_mode = measure_mode;
    }

    /// Raw 16-bit RH code, see [`convert_rh`].
    pub fn measure_rh_code(&mut self) -> Result<u16, Error<B::Error>> {
        let crc_check = self.crc_config.effective(CrcTarget::Rh);
        let wait = self.read_wait.effective(ReadTarget::Rh);
        let result = match self.measure_mode {
            MeasureMode::Hold => self.i2c.measure_rh_hold_master(crc_check, wait),
            MeasureMode::NoHold => self.i2c.measure_rh_nohold_master(crc_check, wait),
        };
        result.map_err(log_failure("measure RH"))
    }

    /// Raw 16-bit temperature code, see [`convert_temp`].
    pub fn measure_temp_code(&mut self) -> Result<u16, Error<B::Error>> {
        let crc_check = self.crc_config.effective(CrcTarget::Temp);
        let wait = self.read_wait.effective(ReadTarget::Temp);
        let result = match self.measure_mode {
            MeasureMode::Hold => self.i2c.measure_temp_hold_master(crc_check, wait),
            MeasureMode::NoHold => self.i2c.measure_temp_nohold_master(crc_check, wait),
        };
        result.map_err(log_failure("measure temp"))
    }

    pub fn measure_rh(&mut self) -> Result<f32, Error<B::Error>> {
        self.measure_rh_code().map(convert_rh)
    }

    pub fn measure_temp(&mut self) -> Result<f32, Error<B::Error>> {
        self.measure_temp_code().map(convert_temp)
    }

    /// Measures RH and then fetches the temperature the sensor took during
    /// that conversion, without starting a second one.
    pub fn measure_rh_and_temp(&mut self) -> Result<Measurement, Error<B::Error>> {
        let rh_percent = self.measure_rh()?;
        let wait = self.read_wait.effective(ReadTarget::Temp);
        let temp_code = self
            .i2c
            .read_temp_from_prev_rh_measurement(wait)
            .map_err(log_failure("read temp from previous RH measurement"))?;
        Ok(Measurement {
            rh_percent,
            temp_celsius: convert_temp(temp_code),
        })
    }

    pub fn reset(&mut self) -> Result<(), Error<B::Error>> {
        self.i2c.reset().map_err(log_failure("reset"))
    }

    /// Raw user register 1.
    pub fn get_user_register(&mut self) -> Result<u8, Error<B::Error>> {
        let wait = self.read_wait.effective(ReadTarget::UserReg);
        self.i2c
            .read_user_reg_1(wait)
            .map_err(log_failure("read user register"))
    }

    pub fn get_user_register_info(&mut self) -> Result<UserRegisterInfo, Error<B::Error>> {
        self.get_user_register().map(UserRegisterInfo::from_register)
    }

    /// Writes resolution and heater state on top of the register's reset
    /// default. Bits changed by other means are lost.
    pub fn set_user_register_info(
        &mut self,
        info: &UserRegisterInfo,
    ) -> Result<(), Error<B::Error>> {
        self.i2c
            .write_user_reg_1(info.to_register())
            .map_err(log_failure("write user register"))
    }

    // The single field accessors below each cost a full register read (and a
    // write for setters). Use the info functions to change several fields.

    pub fn get_resolution(&mut self) -> Result<Resolution, Error<B::Error>> {
        Ok(self.get_user_register_info()?.resolution)
    }

    pub fn get_heater_state(&mut self) -> Result<HeaterState, Error<B::Error>> {
        Ok(self.get_user_register_info()?.heater_state)
    }

    pub fn get_vdd_status(&mut self) -> Result<VddStatus, Error<B::Error>> {
        Ok(self.get_user_register_info()?.vdd_status)
    }

    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<(), Error<B::Error>> {
        let mut info = self.get_user_register_info()?;
        info.resolution = resolution;
        self.set_user_register_info(&info)
    }

    pub fn set_heater_state(&mut self, heater_state: HeaterState) -> Result<(), Error<B::Error>> {
        let mut info = self.get_user_register_info()?;
        info.heater_state = heater_state;
        self.set_user_register_info(&info)
    }

    pub fn get_heater_level(&mut self) -> Result<HeaterLevel, Error<B::Error>> {
        let wait = self.read_wait.effective(ReadTarget::HeaterReg);
        let register = self
            .i2c
            .read_heater_control_reg(wait)
            .map_err(log_failure("read heater control register"))?;
        Ok(HeaterLevel::new(register))
    }

    pub fn set_heater_level(&mut self, level: HeaterLevel) -> Result<(), Error<B::Error>> {
        let register = HEATER_REGISTER_DEFAULT | (level.bits() & HEATER_REGISTER_MASK_HEATER_LEVEL);
        self.i2c
            .write_heater_control_reg(register)
            .map_err(log_failure("write heater control register"))
    }

    /// Reads both halves of the electronic ID, each with its own CRC setting.
    pub fn get_serial_number_info(&mut self) -> Result<SerialNumberInfo, Error<B::Error>> {
        let crc_check = self.crc_config.effective(CrcTarget::Sna);
        let wait = self.read_wait.effective(ReadTarget::Sna);
        let first = self
            .i2c
            .read_electronic_id_first_bytes(crc_check, wait)
            .map_err(log_failure("read EID first bytes"))?;

        let crc_check = self.crc_config.effective(CrcTarget::Snb);
        let wait = self.read_wait.effective(ReadTarget::Snb);
        let last = self
            .i2c
            .read_electronic_id_last_bytes(crc_check, wait)
            .map_err(log_failure("read EID last bytes"))?;

        Ok(SerialNumberInfo::from_halves(first, last))
    }

    pub fn get_firmware_revision_info(&mut self) -> Result<FirmwareVersion, Error<B::Error>> {
        let wait = self.read_wait.effective(ReadTarget::Fw);
        let revision = self
            .i2c
            .read_firmware_revision(wait)
            .map_err(log_failure("read firmware revision"))?;
        Ok(FirmwareVersion::from_byte(revision))
    }
}
