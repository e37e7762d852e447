//! Frame encoding and header decoding for the camera serial link.
//!
//! Frame format:
//! - MAGIC (2 bytes): 0xAA 0x55 synchronization pattern
//! - SIZE (4 bytes): payload length, little-endian
//! - HEADER_CRC (2 bytes): CRC16-CCITT over MAGIC + SIZE, little-endian
//! - PAYLOAD (SIZE bytes): JPEG snapshot data
//! - PAYLOAD_CRC (2 bytes): CRC16-CCITT over PAYLOAD, little-endian

use crate::crc::crc16_ccitt;

/// First synchronization byte
pub const FRAME_START_MAGIC_0: u8 = 0xAA;

/// Second synchronization byte
pub const FRAME_START_MAGIC_1: u8 = 0x55;

/// Header length (MAGIC + SIZE + HEADER_CRC)
pub const FRAME_HEADER_SIZE: usize = 8;

/// Number of header bytes covered by the header CRC
pub const FRAME_HEADER_CRC_SPAN: usize = 6;

/// Trailer length (PAYLOAD_CRC)
pub const FRAME_CRC_SIZE: usize = 2;

/// Smallest possible frame on the wire (header + trailer)
pub const FRAME_MIN_SIZE: usize = FRAME_HEADER_SIZE + FRAME_CRC_SIZE;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Header does not start with 0xAA 0x55
    InvalidMagic,
    /// Header checksum mismatch
    HeaderCrc { received: u16, calculated: u16 },
    /// Declared payload size is zero
    EmptyPayload,
    /// Declared payload size exceeds the receiver's limit
    PayloadTooLarge { size: u32, max: u32 },
    /// Payload checksum mismatch
    PayloadCrc { received: u16, calculated: u16 },
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Parsed frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameHeader {
    /// Payload length in bytes
    pub size: u32,
}

impl FrameHeader {
    /// Create a header announcing `size` payload bytes
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    /// Encode the header, including its checksum
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[0] = FRAME_START_MAGIC_0;
        bytes[1] = FRAME_START_MAGIC_1;
        bytes[2..6].copy_from_slice(&self.size.to_le_bytes());
        let crc = crc16_ccitt(&bytes[..FRAME_HEADER_CRC_SPAN]);
        bytes[6..8].copy_from_slice(&crc.to_le_bytes());
        bytes
    }

    /// Parse and validate a complete header
    ///
    /// Checks are made in wire order: magic, header CRC, then size bounds
    /// (`0 < size <= max_size`).
    pub fn parse(bytes: &[u8; FRAME_HEADER_SIZE], max_size: u32) -> Result<Self, FrameError> {
        if bytes[0] != FRAME_START_MAGIC_0 || bytes[1] != FRAME_START_MAGIC_1 {
            return Err(FrameError::InvalidMagic);
        }

        let size = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        let received = u16::from_le_bytes([bytes[6], bytes[7]]);

        let calculated = crc16_ccitt(&bytes[..FRAME_HEADER_CRC_SPAN]);
        if received != calculated {
            return Err(FrameError::HeaderCrc {
                received,
                calculated,
            });
        }

        if size == 0 {
            return Err(FrameError::EmptyPayload);
        }
        if size > max_size {
            return Err(FrameError::PayloadTooLarge {
                size,
                max: max_size,
            });
        }

        Ok(Self { size })
    }
}

/// Verify a payload against its little-endian trailer
pub fn verify_payload(payload: &[u8], trailer: &[u8; FRAME_CRC_SIZE]) -> Result<(), FrameError> {
    let received = u16::from_le_bytes(*trailer);
    let calculated = crc16_ccitt(payload);
    if received != calculated {
        return Err(FrameError::PayloadCrc {
            received,
            calculated,
        });
    }
    Ok(())
}

/// Total encoded size of a frame carrying `payload_len` bytes
pub const fn encoded_len(payload_len: usize) -> usize {
    FRAME_HEADER_SIZE + payload_len + FRAME_CRC_SIZE
}

/// Encode a complete frame into a byte buffer
///
/// This is what the camera host sends. Returns the number of bytes written.
pub fn encode_frame(payload: &[u8], buffer: &mut [u8]) -> Result<usize, FrameError> {
    let frame_len = encoded_len(payload.len());
    if buffer.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }
    let size = u32::try_from(payload.len()).map_err(|_| FrameError::BufferTooSmall)?;

    let header = FrameHeader::new(size).encode();
    buffer[..FRAME_HEADER_SIZE].copy_from_slice(&header);

    let data_end = FRAME_HEADER_SIZE + payload.len();
    buffer[FRAME_HEADER_SIZE..data_end].copy_from_slice(payload);
    buffer[data_end..frame_len].copy_from_slice(&crc16_ccitt(payload).to_le_bytes());

    Ok(frame_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = FrameHeader::new(0x0001_0203).encode();

        assert_eq!(header[0], FRAME_START_MAGIC_0);
        assert_eq!(header[1], FRAME_START_MAGIC_1);
        assert_eq!(&header[2..6], &[0x03, 0x02, 0x01, 0x00]); // size LE
        let crc = crc16_ccitt(&header[..6]);
        assert_eq!(header[6], (crc & 0xFF) as u8);
        assert_eq!(header[7], (crc >> 8) as u8);
    }

    #[test]
    fn test_header_parse() {
        let header = FrameHeader::new(12345).encode();
        let parsed = FrameHeader::parse(&header, 100 * 1024).unwrap();
        assert_eq!(parsed.size, 12345);
    }

    #[test]
    fn test_header_bad_magic() {
        let mut header = FrameHeader::new(10).encode();
        header[1] = 0x56;
        assert_eq!(
            FrameHeader::parse(&header, 1024),
            Err(FrameError::InvalidMagic)
        );
    }

    #[test]
    fn test_header_bad_crc() {
        let mut header = FrameHeader::new(10).encode();
        header[7] ^= 0x01;
        assert!(matches!(
            FrameHeader::parse(&header, 1024),
            Err(FrameError::HeaderCrc { .. })
        ));
    }

    #[test]
    fn test_header_size_bounds() {
        let empty = FrameHeader::new(0).encode();
        assert_eq!(
            FrameHeader::parse(&empty, 1024),
            Err(FrameError::EmptyPayload)
        );

        let exact = FrameHeader::new(1024).encode();
        assert!(FrameHeader::parse(&exact, 1024).is_ok());

        let over = FrameHeader::new(1025).encode();
        assert_eq!(
            FrameHeader::parse(&over, 1024),
            Err(FrameError::PayloadTooLarge {
                size: 1025,
                max: 1024
            })
        );
    }

    #[test]
    fn test_encode_frame() {
        let payload = [0xFF, 0xD8, 0xFF, 0xE0, 0x00];
        let mut buffer = [0u8; 32];
        let len = encode_frame(&payload, &mut buffer).unwrap();

        assert_eq!(len, FRAME_MIN_SIZE + payload.len());
        assert_eq!(&buffer[..2], &[0xAA, 0x55]);
        assert_eq!(&buffer[8..13], &payload);

        let trailer = [buffer[13], buffer[14]];
        assert!(verify_payload(&payload, &trailer).is_ok());
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let payload = [0u8; 8];
        let mut buffer = [0u8; 17];
        assert_eq!(
            encode_frame(&payload, &mut buffer),
            Err(FrameError::BufferTooSmall)
        );
    }

    #[test]
    fn test_payload_crc_mismatch() {
        let payload = [1u8, 2, 3];
        let crc = crc16_ccitt(&payload) ^ 0x0100;
        assert!(matches!(
            verify_payload(&payload, &crc.to_le_bytes()),
            Err(FrameError::PayloadCrc { .. })
        ));
    }
}
