//! CRC-16/CCITT-FALSE checksum used as the payload integrity trailer.
//!
//! Parameters: polynomial 0x1021, initial value 0xFFFF, no input or output
//! reflection, no final XOR. Verifiers reject codes computed with any other
//! CRC-16 variant.

/// CRC-16/CCITT polynomial.
pub const CRC16_POLYNOMIAL: u16 = 0x1021;

/// Initial register value.
pub const CRC16_INIT: u16 = 0xFFFF;

/// Checksum width in hex characters.
pub const CHECKSUM_SIZE: usize = 4;

/// Computes CRC-16/CCITT-FALSE over `data`.
#[must_use]
pub fn crc16_ccitt_false(data: &[u8]) -> u16 {
    let mut crc = CRC16_INIT;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Computes the checksum of a payload prefix as 4 uppercase hex characters.
///
/// The prefix must already end with the checksum field header ("6304").
///
/// ```
/// use qris_dynamic::crc::checksum16;
/// assert_eq!(checksum16("123456789"), "29B1");
/// ```
#[must_use]
pub fn checksum16(payload: &str) -> String {
    format!("{:04X}", crc16_ccitt_false(payload.as_bytes()))
}

/// Returns true if the last 4 characters of `payload` are the checksum of
/// everything before them. Hex digits compare case-insensitively.
#[must_use]
pub fn verify(payload: &str) -> bool {
    if payload.len() < CHECKSUM_SIZE {
        return false;
    }
    match (
        payload.get(..payload.len() - CHECKSUM_SIZE),
        payload.get(payload.len() - CHECKSUM_SIZE..),
    ) {
        (Some(prefix), Some(expected)) => checksum16(prefix).eq_ignore_ascii_case(expected),
        _ => false,
    }
}
