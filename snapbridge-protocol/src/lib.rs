//! Camera link and upload protocols
//!
//! This crate defines the two wire formats the bridge speaks:
//!
//! - the UART framing used by the camera host to deliver JPEG snapshots
//! - the HTTP request used to post a snapshot to the PC server, and the
//!   markers recognised in the server's reply
//!
//! # Serial frame
//!
//! ```text
//! ┌──────────┬────────┬────────────┬─────────────┬─────────────┐
//! │ MAGIC    │ SIZE   │ HEADER_CRC │ PAYLOAD     │ PAYLOAD_CRC │
//! │ AA 55    │ 4B LE  │ 2B LE      │ SIZE bytes  │ 2B LE       │
//! └──────────┴────────┴────────────┴─────────────┴─────────────┘
//! ```
//!
//! Both checksums are CRC16-CCITT (init 0xFFFF, poly 0x1021, no reflection).

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod crc;
pub mod frame;
pub mod http;

pub use crc::{crc16_ccitt, Crc16};
pub use frame::{
    encode_frame, encoded_len, verify_payload, FrameError, FrameHeader, FRAME_CRC_SIZE,
    FRAME_HEADER_SIZE, FRAME_MIN_SIZE, FRAME_START_MAGIC_0, FRAME_START_MAGIC_1,
};
pub use http::{render_request_header, Endpoint, HttpError, ReplyScan, RequestHeader};
