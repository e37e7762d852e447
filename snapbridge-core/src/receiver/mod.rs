//! Serial frame receiver
//!
//! Recovers CRC-validated snapshot frames from the raw camera UART stream.
//! The UART producer pushes bytes into a [`SerialInbox`]; the main loop
//! calls [`FrameReceiver::process_tick`], which drains the inbox through
//! the deframing state machine.
//!
//! A completed frame stays in the receiver's payload buffer until
//! [`FrameReceiver::reset`] is called. While a frame is complete no further
//! bytes are consumed.

mod state;

pub use state::ReceiverState;

use snapbridge_protocol::{
    verify_payload, FrameHeader, FRAME_CRC_SIZE, FRAME_HEADER_SIZE, FRAME_START_MAGIC_0,
    FRAME_START_MAGIC_1,
};

use crate::config::{SerialConfig, FRAME_MAX_DATA_SIZE, FRAME_TIMEOUT_MS};
use crate::ring::SerialInbox;
use crate::traits::{elapsed_ms, SerialError, SerialPort};

/// Receiver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiverError {
    /// The serial line could not be opened
    Serial(SerialError),
}

impl From<SerialError> for ReceiverError {
    fn from(e: SerialError) -> Self {
        ReceiverError::Serial(e)
    }
}

/// Deframing state machine fed from a [`SerialInbox`]
pub struct FrameReceiver<'a, S: SerialPort, const N: usize> {
    serial: S,
    serial_config: SerialConfig,
    inbox: &'a SerialInbox<N>,
    /// Payload storage; its length bounds the accepted frame size
    payload: &'a mut [u8],
    header: [u8; FRAME_HEADER_SIZE],
    trailer: [u8; FRAME_CRC_SIZE],
    state: ReceiverState,
    /// Position within the header, or within payload + trailer
    frame_index: usize,
    expected_size: usize,
    received_bytes: usize,
    frame_ready: bool,
    timeout_ms: u32,
}

impl<'a, S: SerialPort, const N: usize> FrameReceiver<'a, S, N> {
    /// Create a receiver over `inbox`, storing payloads in `payload`
    ///
    /// Frames announcing more than `payload.len()` (or
    /// [`FRAME_MAX_DATA_SIZE`]) bytes are rejected.
    pub fn new(
        serial: S,
        serial_config: SerialConfig,
        inbox: &'a SerialInbox<N>,
        payload: &'a mut [u8],
    ) -> Self {
        Self {
            serial,
            serial_config,
            inbox,
            payload,
            header: [0; FRAME_HEADER_SIZE],
            trailer: [0; FRAME_CRC_SIZE],
            state: ReceiverState::Idle,
            frame_index: 0,
            expected_size: 0,
            received_bytes: 0,
            frame_ready: false,
            timeout_ms: FRAME_TIMEOUT_MS,
        }
    }

    /// Override the stalled-frame timeout
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Clear all state and open the serial line
    ///
    /// Bytes start flowing into the inbox once this returns.
    pub fn init(&mut self) -> Result<(), ReceiverError> {
        self.reset();
        self.serial.open(&self.serial_config)?;
        debug!("frame receiver: serial open at {} baud", self.serial_config.baudrate);
        Ok(())
    }

    /// Close the serial line and clear all state
    pub fn deinit(&mut self) {
        self.serial.close();
        self.reset();
    }

    /// Current state
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Largest payload this receiver accepts
    pub fn max_data_size(&self) -> usize {
        self.payload.len().min(FRAME_MAX_DATA_SIZE)
    }

    /// Drain pending bytes through the state machine
    ///
    /// Returns true when a frame has just completed. Never blocks.
    pub fn process_tick(&mut self, now_ms: u32) -> bool {
        if self.state.in_flight() {
            if let Some(last) = self.inbox.last_activity() {
                if elapsed_ms(now_ms, last) > self.timeout_ms {
                    self.reset();
                    debug!("frame receiver: timeout");
                    return false;
                }
            }
        }

        while self.state.accepts_bytes() {
            let Some(byte) = self.inbox.ring().pop() else {
                break;
            };
            self.feed(byte);
        }

        if self.state == ReceiverState::Processing {
            let data = &self.payload[..self.expected_size];
            match verify_payload(data, &self.trailer) {
                Ok(()) => {
                    self.received_bytes = self.expected_size;
                    self.frame_ready = true;
                    self.state = ReceiverState::Complete;
                    debug!("frame receiver: {} bytes received", self.received_bytes);
                    return true;
                }
                Err(e) => {
                    debug!("frame receiver: {}", e);
                    self.state = ReceiverState::Error;
                }
            }
        }

        if self.state == ReceiverState::Error {
            self.reset();
        }

        false
    }

    /// Borrow the completed payload
    pub fn take_frame(&self) -> Option<&[u8]> {
        if self.state == ReceiverState::Complete && self.frame_ready && self.received_bytes > 0 {
            Some(&self.payload[..self.received_bytes])
        } else {
            None
        }
    }

    /// Return to `Idle`, discarding any partial or completed frame
    ///
    /// Also empties the inbox, so call it only between frames.
    pub fn reset(&mut self) {
        self.state = ReceiverState::Idle;
        self.frame_index = 0;
        self.expected_size = 0;
        self.received_bytes = 0;
        self.frame_ready = false;
        self.header = [0; FRAME_HEADER_SIZE];
        self.trailer = [0; FRAME_CRC_SIZE];
        self.inbox.reset();
    }

    fn start_header(&mut self, byte: u8) {
        self.header[0] = byte;
        self.frame_index = 1;
        self.state = ReceiverState::ReceivingHeader;
    }

    fn feed(&mut self, byte: u8) {
        match self.state {
            ReceiverState::Idle => {
                if byte == FRAME_START_MAGIC_0 {
                    self.start_header(byte);
                }
            }
            ReceiverState::ReceivingHeader => {
                self.header[self.frame_index] = byte;
                self.frame_index += 1;

                if self.frame_index == 2 && byte != FRAME_START_MAGIC_1 {
                    self.state = ReceiverState::Idle;
                    self.frame_index = 0;
                    // AA AA 55: the second AA may be the real start
                    if byte == FRAME_START_MAGIC_0 {
                        self.start_header(byte);
                    }
                } else if self.frame_index == FRAME_HEADER_SIZE {
                    let max = self.max_data_size() as u32;
                    match FrameHeader::parse(&self.header, max) {
                        Ok(header) => {
                            self.expected_size = header.size as usize;
                            self.frame_index = 0;
                            self.state = ReceiverState::ReceivingData;
                        }
                        Err(e) => {
                            debug!("frame receiver: bad header: {}", e);
                            self.state = ReceiverState::Error;
                        }
                    }
                }
            }
            ReceiverState::ReceivingData => {
                if self.frame_index < self.expected_size {
                    self.payload[self.frame_index] = byte;
                } else {
                    self.trailer[self.frame_index - self.expected_size] = byte;
                }
                self.frame_index += 1;

                if self.frame_index == self.expected_size + FRAME_CRC_SIZE {
                    self.state = ReceiverState::Processing;
                }
            }
            _ => {}
        }
    }
}
