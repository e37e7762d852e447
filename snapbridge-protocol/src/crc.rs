//! CRC-16/CCITT-FALSE checksum
//!
//! Parameters: initial value 0xFFFF, polynomial 0x1021, MSB-first,
//! no input/output reflection, no final XOR. The camera host computes
//! the header and payload checksums with exactly this variant.

/// Initial register value
pub const CRC16_INIT: u16 = 0xFFFF;

/// Generator polynomial (x^16 + x^12 + x^5 + 1)
pub const CRC16_POLY: u16 = 0x1021;

/// Incremental CRC16 calculator
///
/// Useful when the checksummed data arrives in pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    crc: u16,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc16 {
    /// Create a calculator in its initial state
    pub const fn new() -> Self {
        Self { crc: CRC16_INIT }
    }

    /// Feed a single byte
    pub fn update_byte(&mut self, byte: u8) {
        self.crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if self.crc & 0x8000 != 0 {
                self.crc = (self.crc << 1) ^ CRC16_POLY;
            } else {
                self.crc <<= 1;
            }
        }
    }

    /// Feed a slice of bytes
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.update_byte(byte);
        }
    }

    /// Current checksum value
    pub fn finish(&self) -> u16 {
        self.crc
    }
}

/// Calculate the CRC16-CCITT of a complete buffer
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Standard check value for CRC-16/CCITT-FALSE
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_is_init() {
        assert_eq!(crc16_ccitt(&[]), CRC16_INIT);
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let data = b"POST /image HTTP/1.1";
        let mut crc = Crc16::new();
        crc.update(&data[..7]);
        crc.update(&data[7..]);
        assert_eq!(crc.finish(), crc16_ccitt(data));
    }

    #[test]
    fn test_header_crc_known_frame() {
        // Magic + size 1 (little-endian)
        let header = [0xAA, 0x55, 0x01, 0x00, 0x00, 0x00];
        let crc = crc16_ccitt(&header);
        // Changing any byte must change the checksum
        let mut corrupted = header;
        corrupted[2] = 0x02;
        assert_ne!(crc16_ccitt(&corrupted), crc);
    }

    proptest::proptest! {
        #[test]
        fn prop_single_bit_flip_detected(
            data in proptest::collection::vec(proptest::num::u8::ANY, 1..512),
            bit in 0usize..4096,
        ) {
            let bit = bit % (data.len() * 8);
            let mut flipped = data.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            proptest::prop_assert_ne!(crc16_ccitt(&data), crc16_ccitt(&flipped));
        }
    }
}
