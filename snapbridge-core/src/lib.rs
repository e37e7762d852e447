//! Board-agnostic core logic for the snapshot bridge firmware
//!
//! This crate contains all bridge logic that does not depend on specific
//! hardware:
//!
//! - Lock-free receive queue shared with the UART producer
//! - Frame receiver (deframing state machine with CRC validation)
//! - Snapshot forwarder (HTTP upload state machine over a TCP transport)
//! - Wi-Fi link recovery policy
//! - Collaborator traits (serial port, transport, alarm, clock)
//! - Build-time configuration

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod config;
pub mod forwarder;
pub mod link;
pub mod receiver;
pub mod ring;
pub mod traits;

pub use forwarder::{ForwardError, SnapshotForwarder};
pub use link::{Backoff, LinkError};
pub use receiver::{FrameReceiver, ReceiverError, ReceiverState};
pub use ring::{RingBuffer, SerialInbox};
