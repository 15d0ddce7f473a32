use super::HEATER_REGISTER_MASK_HEATER_LEVEL;

/// Relative humidity in percent from a 16-bit RH code, clamped to 0..=100.
pub fn convert_rh(rh_code: u16) -> f32 {
    let rh = (125.0 * f32::from(rh_code)) / 65536.0 - 6.0;
    rh.clamp(0.0, 100.0)
}

/// Temperature in degrees Celsius from a 16-bit temperature code.
pub fn convert_temp(temp_code: u16) -> f32 {
    (175.72 * f32::from(temp_code)) / 65536.0 - 46.85
}

const MA_0000: f32 = 3.09;
const MA_0001: f32 = 9.18;
const MA_0010: f32 = 15.24;
const MA_0100: f32 = 27.39;
const MA_1000: f32 = 51.69;
const MA_1111: f32 = 94.20;

/// Heater current in mA for a heater level code (upper nibble ignored).
///
/// Only 0000, 0001, 0010, 0100, 1000 and 1111 have datasheet values. Codes
/// above 1000 interpolate between 1000 and 1111, codes between 0100 and 1000
/// interpolate between those two, and 0011 is the mean of 0010 and 0100.
pub fn heater_level_to_ma(heater_level: u8) -> f32 {
    let level = heater_level & HEATER_REGISTER_MASK_HEATER_LEVEL;
    match level {
        0b0000 => MA_0000,
        0b0001 => MA_0001,
        0b0010 => MA_0010,
        0b0100 => MA_0100,
        0b1000 => MA_1000,
        0b1111 => MA_1111,
        _ if level & 0b1000 != 0 => {
            let step = (MA_1111 - MA_1000) / f32::from(0b1111u8 - 0b1000);
            MA_1000 + step * f32::from(level - 0b1000)
        }
        _ if level & 0b0100 != 0 => {
            let step = (MA_1000 - MA_0100) / f32::from(0b1000u8 - 0b0100);
            MA_0100 + step * f32::from(level - 0b0100)
        }
        _ => (MA_0100 + MA_0010) / 2.0,
    }
}
