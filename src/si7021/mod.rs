mod conversion;
mod device_impl;
mod dump;

use core::fmt;
use core::time::Duration;

use crate::si7021_i2c;

pub use conversion::{convert_rh, convert_temp, heater_level_to_ma};
pub use device_impl::Si7021;
pub use si7021_i2c::Error;

/// User register 1 after power-on or reset.
pub const USER_REGISTER_DEFAULT: u8 = 0b0011_1010;
pub const USER_REGISTER_MASK_RESOLUTION: u8 = 0b1000_0001;
pub const USER_REGISTER_MASK_VDD_STATUS: u8 = 0b0100_0000;
pub const USER_REGISTER_MASK_HEATER_STATE: u8 = 0b0000_0100;

pub const HEATER_REGISTER_DEFAULT: u8 = 0b0000_0000;
pub const HEATER_REGISTER_MASK_HEATER_LEVEL: u8 = 0b0000_1111;

/// Measurement resolution, bits 7 and 0 of the user register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// RH 12 bit, temperature 14 bit (default)
    Rh12Temp14,
    /// RH 8 bit, temperature 12 bit
    Rh8Temp12,
    /// RH 10 bit, temperature 13 bit
    Rh10Temp13,
    /// RH 11 bit, temperature 11 bit
    Rh11Temp11,
}

impl Resolution {
    pub fn bits(&self) -> u8 {
        match self {
            Resolution::Rh12Temp14 => 0b0000_0000,
            Resolution::Rh8Temp12 => 0b0000_0001,
            Resolution::Rh10Temp13 => 0b1000_0000,
            Resolution::Rh11Temp11 => 0b1000_0001,
        }
    }

    pub fn from_register(register: u8) -> Self {
        match register & USER_REGISTER_MASK_RESOLUTION {
            0b0000_0001 => Resolution::Rh8Temp12,
            0b1000_0000 => Resolution::Rh10Temp13,
            0b1000_0001 => Resolution::Rh11Temp11,
            _ => Resolution::Rh12Temp14,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resolution::Rh12Temp14 => "RH: 12 bit | Temp: 14 bit",
            Resolution::Rh8Temp12 => "RH:  8 bit | Temp: 12 bit",
            Resolution::Rh10Temp13 => "RH: 10 bit | Temp: 13 bit",
            Resolution::Rh11Temp11 => "RH: 11 bit | Temp: 11 bit",
        })
    }
}

/// On-chip heater switch, bit 2 of the user register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaterState {
    Enabled,
    Disabled,
}

impl HeaterState {
    pub fn bits(&self) -> u8 {
        match self {
            HeaterState::Enabled => USER_REGISTER_MASK_HEATER_STATE,
            HeaterState::Disabled => 0,
        }
    }

    pub fn from_register(register: u8) -> Self {
        if register & USER_REGISTER_MASK_HEATER_STATE != 0 {
            HeaterState::Enabled
        } else {
            HeaterState::Disabled
        }
    }
}

impl fmt::Display for HeaterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HeaterState::Enabled => "Enabled",
            HeaterState::Disabled => "Disabled",
        })
    }
}

/// Supply voltage status, bit 6 of the user register. Read only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VddStatus {
    Ok,
    /// VDD dropped below 1.9 V
    Low,
}

impl VddStatus {
    pub fn from_register(register: u8) -> Self {
        if register & USER_REGISTER_MASK_VDD_STATUS != 0 {
            VddStatus::Low
        } else {
            VddStatus::Ok
        }
    }
}

impl fmt::Display for VddStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VddStatus::Ok => "OK",
            VddStatus::Low => "Low",
        })
    }
}

/// Decoded user register 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserRegisterInfo {
    pub resolution: Resolution,
    pub heater_state: HeaterState,
    /// Ignored when writing.
    pub vdd_status: VddStatus,
}

impl Default for UserRegisterInfo {
    fn default() -> Self {
        Self {
            resolution: Resolution::Rh12Temp14,
            heater_state: HeaterState::Disabled,
            vdd_status: VddStatus::Ok,
        }
    }
}

impl UserRegisterInfo {
    pub fn from_register(register: u8) -> Self {
        Self {
            resolution: Resolution::from_register(register),
            heater_state: HeaterState::from_register(register),
            vdd_status: VddStatus::from_register(register),
        }
    }

    /// Register value to write: the reset default with resolution and heater
    /// bits applied. Reserved bits are never taken from a previous read.
    pub fn to_register(&self) -> u8 {
        USER_REGISTER_DEFAULT
            | (self.resolution.bits() & USER_REGISTER_MASK_RESOLUTION)
            | (self.heater_state.bits() & USER_REGISTER_MASK_HEATER_STATE)
    }
}

/// 4-bit heater current setting.
///
/// The datasheet only specifies the current for six codes, which get named
/// constants here. Any other code is valid and approximated by
/// [`heater_level_to_ma`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeaterLevel(u8);

impl HeaterLevel {
    pub const MA_3_09: HeaterLevel = HeaterLevel(0x00);
    pub const MA_9_18: HeaterLevel = HeaterLevel(0x01);
    pub const MA_15_24: HeaterLevel = HeaterLevel(0x02);
    pub const MA_27_39: HeaterLevel = HeaterLevel(0x04);
    pub const MA_51_69: HeaterLevel = HeaterLevel(0x08);
    pub const MA_94_20: HeaterLevel = HeaterLevel(0x0F);

    /// Keeps only the low nibble.
    pub const fn new(level: u8) -> Self {
        HeaterLevel(level & HEATER_REGISTER_MASK_HEATER_LEVEL)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub fn current_ma(&self) -> f32 {
        heater_level_to_ma(self.0)
    }

    pub fn is_specified(&self) -> bool {
        matches!(self.0, 0x00 | 0x01 | 0x02 | 0x04 | 0x08 | 0x0F)
    }
}

impl From<u8> for HeaterLevel {
    fn from(level: u8) -> Self {
        HeaterLevel::new(level)
    }
}

impl fmt::Display for HeaterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_specified() {
            write!(f, "{:.2} mA", self.current_ma())
        } else {
            write!(f, "~{:.2} mA (not specified)", self.current_ma())
        }
    }
}

/// Part identifier, the top byte of the serial number's last half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialNumberId {
    /// 0x00 or 0xFF
    EngineeringSample(u8),
    Si7013,
    Si7020,
    Si7021,
    Unknown(u8),
}

impl SerialNumberId {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 | 0xFF => SerialNumberId::EngineeringSample(byte),
            0x0D => SerialNumberId::Si7013,
            0x14 => SerialNumberId::Si7020,
            0x15 => SerialNumberId::Si7021,
            other => SerialNumberId::Unknown(other),
        }
    }

    pub fn byte(&self) -> u8 {
        match self {
            SerialNumberId::EngineeringSample(b) | SerialNumberId::Unknown(b) => *b,
            SerialNumberId::Si7013 => 0x0D,
            SerialNumberId::Si7020 => 0x14,
            SerialNumberId::Si7021 => 0x15,
        }
    }
}

impl fmt::Display for SerialNumberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SerialNumberId::EngineeringSample(_) => "Engineering Sample",
            SerialNumberId::Si7013 => "Si7013",
            SerialNumberId::Si7020 => "Si7020",
            SerialNumberId::Si7021 => "Si7021",
            SerialNumberId::Unknown(_) => "Unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialNumberInfo {
    pub serial_number: u64,
    pub id: SerialNumberId,
}

impl SerialNumberInfo {
    pub fn from_halves(first: u32, last: u32) -> Self {
        Self {
            serial_number: (u64::from(first) << 32) | u64::from(last),
            id: SerialNumberId::from_byte((last >> 24) as u8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareVersion {
    V1_0,
    V2_0,
    Unknown(u8),
}

impl FirmwareVersion {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0xFF => FirmwareVersion::V1_0,
            0x20 => FirmwareVersion::V2_0,
            other => FirmwareVersion::Unknown(other),
        }
    }

    pub fn byte(&self) -> u8 {
        match self {
            FirmwareVersion::V1_0 => 0xFF,
            FirmwareVersion::V2_0 => 0x20,
            FirmwareVersion::Unknown(b) => *b,
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FirmwareVersion::V1_0 => "1.0",
            FirmwareVersion::V2_0 => "2.0",
            FirmwareVersion::Unknown(_) => "Unknown",
        })
    }
}

/// A humidity reading together with the temperature the sensor took alongside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub rh_percent: f32,
    pub temp_celsius: f32,
}

/// Selects the hold master (clock stretching) or no hold master command pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasureMode {
    Hold,
    #[default]
    NoHold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcTarget {
    Rh,
    Temp,
    /// Serial number [63:32]
    Sna,
    /// Serial number [31:0]
    Snb,
}

/// Which reads verify their checksum. A per-command value overrides `global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcConfig {
    pub global: bool,
    pub rh: Option<bool>,
    pub temp: Option<bool>,
    pub sna: Option<bool>,
    pub snb: Option<bool>,
}

impl Default for CrcConfig {
    fn default() -> Self {
        Self {
            global: true,
            rh: None,
            temp: None,
            sna: None,
            snb: None,
        }
    }
}

impl CrcConfig {
    pub fn all(value: bool) -> Self {
        Self {
            global: value,
            rh: Some(value),
            temp: Some(value),
            sna: Some(value),
            snb: Some(value),
        }
    }

    pub fn effective(&self, target: CrcTarget) -> bool {
        let value = match target {
            CrcTarget::Rh => self.rh,
            CrcTarget::Temp => self.temp,
            CrcTarget::Sna => self.sna,
            CrcTarget::Snb => self.snb,
        };
        value.unwrap_or(self.global)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadTarget {
    Rh,
    Temp,
    UserReg,
    HeaterReg,
    Sna,
    Snb,
    Fw,
}

/// Pause between sending a command and reading its answer.
///
/// A per-command value overrides `global` unless it is `None` or zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWait {
    pub global: Duration,
    pub rh: Option<Duration>,
    pub temp: Option<Duration>,
    pub user_reg: Option<Duration>,
    pub heater_reg: Option<Duration>,
    pub sna: Option<Duration>,
    pub snb: Option<Duration>,
    pub fw: Option<Duration>,
}

impl Default for ReadWait {
    fn default() -> Self {
        Self {
            global: Duration::ZERO,
            rh: Some(Duration::from_millis(30)),
            temp: Some(Duration::from_millis(20)),
            user_reg: Some(Duration::from_millis(10)),
            heater_reg: Some(Duration::from_millis(10)),
            sna: Some(Duration::from_millis(10)),
            snb: Some(Duration::from_millis(10)),
            fw: Some(Duration::from_millis(10)),
        }
    }
}

impl ReadWait {
    pub fn all(value: Duration) -> Self {
        Self {
            global: value,
            rh: Some(value),
            temp: Some(value),
            user_reg: Some(value),
            heater_reg: Some(value),
            sna: Some(value),
            snb: Some(value),
            fw: Some(value),
        }
    }

    pub fn effective(&self, target: ReadTarget) -> Duration {
        let value = match target {
            ReadTarget::Rh => self.rh,
            ReadTarget::Temp => self.temp,
            ReadTarget::UserReg => self.user_reg,
            ReadTarget::HeaterReg => self.heater_reg,
            ReadTarget::Sna => self.sna,
            ReadTarget::Snb => self.snb,
            ReadTarget::Fw => self.fw,
        };
        value.filter(|wait| !wait.is_zero()).unwrap_or(self.global)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpArgs {
    pub device_info: bool,
    pub crc_config: bool,
    pub read_wait: bool,
}

impl Default for DumpArgs {
    fn default() -> Self {
        Self {
            device_info: true,
            crc_config: false,
            read_wait: false,
        }
    }
}

/// Actions run by [`Si7021::create`], in field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtInit {
    pub reset: bool,
    pub heater_level: Option<HeaterLevel>,
    pub user_register_info: Option<UserRegisterInfo>,
    pub dump: DumpArgs,
}

impl Default for AtInit {
    fn default() -> Self {
        Self {
            reset: true,
            heater_level: None,
            user_register_info: None,
            dump: DumpArgs::default(),
        }
    }
}

impl AtInit {
    /// Touches nothing on the device.
    pub fn none() -> Self {
        Self {
            reset: false,
            heater_level: None,
            user_register_info: None,
            dump: DumpArgs {
                device_info: false,
                crc_config: false,
                read_wait: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateArgs {
    pub name: &'static str,
    pub i2c: si7021_i2c::CreateArgs,
    pub crc_config: CrcConfig,
    pub read_wait: ReadWait,
    pub measure_mode: MeasureMode,
    pub at_init: AtInit,
}

impl Default for CreateArgs {
    fn default() -> Self {
        Self {
            name: "si7021",
            i2c: si7021_i2c::CreateArgs::default(),
            crc_config: CrcConfig::default(),
            read_wait: ReadWait::default(),
            measure_mode: MeasureMode::default(),
            at_init: AtInit::default(),
        }
    }
}

impl CreateArgs {
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_i2c(mut self, i2c: si7021_i2c::CreateArgs) -> Self {
        self.i2c = i2c;
        self
    }

    pub fn with_crc_config(mut self, crc_config: CrcConfig) -> Self {
        self.crc_config = crc_config;
        self
    }

    pub fn with_read_wait(mut self, read_wait: ReadWait) -> Self {
        self.read_wait = read_wait;
        self
    }

    pub fn with_measure_mode(mut self, measure_mode: MeasureMode) -> Self {
        self.measure_mode = measure_mode;
        self
    }

    pub fn with_at_init(mut self, at_init: AtInit) -> Self {
        self.at_init = at_init;
        self
    }
}
