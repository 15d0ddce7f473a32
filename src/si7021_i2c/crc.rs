//! CRC-8 as computed by the Si7021: polynomial x^8 + x^5 + x^4 + 1, init 0x00,
//! no final XOR.
//!
//! Multi-byte reads (the electronic ID) are checked progressively: each block's
//! CRC seeds the next one, because the sensor runs a single CRC over the whole
//! transfer and emits its intermediate value after every block.

use log::error;

pub const CRC_POLY: u8 = 0x31;
pub const CRC_INIT: u8 = 0x00;

/// A received checksum that does not match the computed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrcMismatch {
    /// Index of the failing block within the transfer.
    pub block: usize,
    pub calculated: u8,
    pub received: u8,
}

pub fn crc8_with_init(bytes: &[u8], init: u8) -> u8 {
    let mut crc = init;
    for &byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

pub fn crc8(bytes: &[u8]) -> u8 {
    crc8_with_init(bytes, CRC_INIT)
}

/// Checks a `[data.., crc]` frame where the last byte covers everything before it.
pub fn check(frame: &[u8]) -> Result<(), CrcMismatch> {
    check_chained(frame, frame.len())
}

/// Checks a transfer made of `block_len`-sized blocks, each ending in a CRC byte
/// that covers the block's data bytes seeded with the previous block's CRC.
///
/// Validation stops at the first bad block.
pub fn check_chained(frame: &[u8], block_len: usize) -> Result<(), CrcMismatch> {
    let mut init = CRC_INIT;
    for (block, chunk) in frame.chunks_exact(block_len).enumerate() {
        let (data, received) = chunk.split_at(block_len - 1);
        let calculated = crc8_with_init(data, init);
        if calculated != received[0] {
            error!(
                "CRC check failed at block {block}: init 0x{init:02x}, from {data:02x?}, calc 0x{calculated:02x}, recv 0x{:02x}",
                received[0]
            );
            return Err(CrcMismatch {
                block,
                calculated,
                received: received[0],
            });
        }
        init = calculated;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasheet_humidity_example() {
        // Si7021 datasheet: RH code 0x683A is followed by CRC 0x7C.
        assert_eq!(crc8(&[0x68, 0x3A]), 0x7C);
        assert!(check(&[0x68, 0x3A, 0x7C]).is_ok());
    }

    #[test]
    fn empty_input_keeps_init() {
        assert_eq!(crc8(&[]), CRC_INIT);
        assert_eq!(crc8_with_init(&[], 0xA5), 0xA5);
    }

    #[test]
    fn single_bit_is_polynomial() {
        assert_eq!(crc8(&[0x01]), CRC_POLY);
    }

    #[test]
    fn chaining_equals_running_crc() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let first = crc8(&data[..2]);
        assert_eq!(crc8_with_init(&data[2..], first), crc8(&data));
    }

    #[test]
    fn mismatch_reports_values() {
        let err = check(&[0x68, 0x3A, 0x7D]).unwrap_err();
        assert_eq!(
            err,
            CrcMismatch {
                block: 0,
                calculated: 0x7C,
                received: 0x7D
            }
        );
    }

    fn eid_first(data: [u8; 4]) -> [u8; 8] {
        let mut frame = [0; 8];
        let mut init = CRC_INIT;
        for (i, byte) in data.iter().enumerate() {
            init = crc8_with_init(&[*byte], init);
            frame[2 * i] = *byte;
            frame[2 * i + 1] = init;
        }
        frame
    }

    #[test]
    fn chained_frame_passes() {
        let frame = eid_first([0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(check_chained(&frame, 2).is_ok());
    }

    #[test]
    fn corruption_fails_at_its_own_block() {
        let frame = eid_first([0xDE, 0xAD, 0xBE, 0xEF]);
        for index in 0..frame.len() {
            let mut corrupted = frame;
            corrupted[index] ^= 0x10;
            let err = check_chained(&corrupted, 2).unwrap_err();
            assert_eq!(err.block, index / 2, "corrupted byte {index}");
        }
    }

    fn eid_last(data: [u8; 4]) -> [u8; 6] {
        let first = crc8(&data[..2]);
        let second = crc8_with_init(&data[2..], first);
        [data[0], data[1], first, data[2], data[3], second]
    }

    #[test]
    fn three_byte_blocks_fail_at_their_own_block() {
        let frame = eid_last([0x15, 0xFF, 0xB6, 0x42]);
        assert!(check_chained(&frame, 3).is_ok());
        for index in 0..frame.len() {
            let mut corrupted = frame;
            corrupted[index] ^= 0x01;
            let err = check_chained(&corrupted, 3).unwrap_err();
            assert_eq!(err.block, index / 3, "corrupted byte {index}");
        }
    }

    #[test]
    fn unchained_crcs_are_rejected() {
        // Per-pair CRCs without chaining only match for the first block.
        let mut frame = [0u8; 8];
        for (i, byte) in [0x11u8, 0x22, 0x33, 0x44].iter().enumerate() {
            frame[2 * i] = *byte;
            frame[2 * i + 1] = crc8(&[*byte]);
        }
        assert_eq!(check_chained(&frame, 2).unwrap_err().block, 1);
    }
}
