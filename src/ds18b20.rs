//! DS18B20 command set and scratchpad decoding.
//!
//! The bus transfer itself lives in the platform layer; everything here is
//! plain byte handling so it can be checked on the host.

use std::fmt;

pub const SKIP_ROM: u8 = 0xCC;
pub const CONVERT_T: u8 = 0x44;
pub const READ_SCRATCHPAD: u8 = 0xBE;

/// Worst-case conversion time at 12 bit resolution.
pub const CONVERSION_TIME_MS: u64 = 750;

pub const SCRATCHPAD_LEN: usize = 9;

/// Register value after power-up, read back when no conversion has run.
const POWER_ON_RAW: i16 = 0x0550;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ds18b20Error {
    /// Every byte read as 0xFF: nothing pulled the line low.
    NoResponse,
    CrcMismatch { expected: u8, computed: u8 },
    /// The sensor still holds its 85 °C power-on value.
    ConversionNotDone,
    OutOfRange(i16),
}

impl fmt::Display for Ds18b20Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ds18b20Error::NoResponse => write!(f, "no response on the one-wire bus"),
            Ds18b20Error::CrcMismatch { expected, computed } => write!(
                f,
                "scratchpad CRC mismatch (expected {expected:#04x}, computed {computed:#04x})"
            ),
            Ds18b20Error::ConversionNotDone => write!(f, "sensor returned its power-on value"),
            Ds18b20Error::OutOfRange(raw) => write!(f, "raw value {raw:#06x} outside sensor range"),
        }
    }
}

impl std::error::Error for Ds18b20Error {}

/// Dallas/Maxim CRC-8 (poly x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |mut crc, &byte| {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
        crc
    })
}

/// Resolution in bits (9..=12) from the configuration register.
pub fn resolution_bits(config: u8) -> u8 {
    9 + ((config >> 5) & 0b11)
}

/// Decodes a scratchpad into degrees Celsius.
pub fn decode_scratchpad(pad: &[u8; SCRATCHPAD_LEN]) -> Result<f32, Ds18b20Error> {
    if pad.iter().all(|&b| b == 0xFF) {
        return Err(Ds18b20Error::NoResponse);
    }

    let computed = crc8(&pad[..8]);
    if computed != pad[8] {
        return Err(Ds18b20Error::CrcMismatch {
            expected: pad[8],
            computed,
        });
    }

    let raw = i16::from_le_bytes([pad[0], pad[1]]);
    if raw == POWER_ON_RAW {
        return Err(Ds18b20Error::ConversionNotDone);
    }

    // undefined low bits at reduced resolution
    let unused = 12 - resolution_bits(pad[4]);
    let raw = raw & !((1i16 << unused) - 1);

    let celsius = f32::from(raw) / 16.0;
    if !(-55.0..=125.0).contains(&celsius) {
        return Err(Ds18b20Error::OutOfRange(raw));
    }
    Ok(celsius)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(lsb: u8, msb: u8, config: u8) -> [u8; SCRATCHPAD_LEN] {
        let mut pad = [lsb, msb, 0x4B, 0x46, config, 0xFF, 0x0C, 0x10, 0];
        pad[8] = crc8(&pad[..8]);
        pad
    }

    #[test]
    fn crc_check_value() {
        assert_eq!(crc8(b"123456789"), 0xA1);
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn crc_over_data_and_crc_is_zero() {
        let pad = pad(0x91, 0x01, 0x7F);
        assert_eq!(crc8(&pad), 0);
    }

    #[test]
    fn decodes_datasheet_values() {
        assert_eq!(decode_scratchpad(&pad(0xD0, 0x07, 0x7F)), Ok(125.0));
        assert_eq!(decode_scratchpad(&pad(0x91, 0x01, 0x7F)), Ok(25.0625));
        assert_eq!(decode_scratchpad(&pad(0x08, 0x00, 0x7F)), Ok(0.5));
        assert_eq!(decode_scratchpad(&pad(0x5E, 0xFF, 0x7F)), Ok(-10.125));
        assert_eq!(decode_scratchpad(&pad(0x90, 0xFC, 0x7F)), Ok(-55.0));
    }

    #[test]
    fn masks_undefined_bits_at_low_resolution() {
        // 9 bit: 0.5 °C steps
        assert_eq!(resolution_bits(0x1F), 9);
        assert_eq!(decode_scratchpad(&pad(0x97, 0x01, 0x1F)), Ok(25.0));
        assert_eq!(resolution_bits(0x5F), 11);
        assert_eq!(decode_scratchpad(&pad(0x97, 0x01, 0x5F)), Ok(25.375));
    }

    #[test]
    fn rejects_bad_scratchpads() {
        assert_eq!(
            decode_scratchpad(&[0xFF; SCRATCHPAD_LEN]),
            Err(Ds18b20Error::NoResponse)
        );

        let mut corrupted = pad(0x91, 0x01, 0x7F);
        corrupted[0] ^= 0x04;
        assert!(matches!(
            decode_scratchpad(&corrupted),
            Err(Ds18b20Error::CrcMismatch { .. })
        ));

        assert_eq!(
            decode_scratchpad(&pad(0x50, 0x05, 0x7F)),
            Err(Ds18b20Error::ConversionNotDone)
        );
        assert_eq!(
            decode_scratchpad(&pad(0x00, 0x08, 0x7F)),
            Err(Ds18b20Error::OutOfRange(0x0800))
        );
    }
}
