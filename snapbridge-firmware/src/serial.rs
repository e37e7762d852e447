//! Camera serial line as seen by the frame receiver
//!
//! The UART itself is configured once at boot. Opening the line only
//! lets the UART task start feeding the inbox; closing it stops delivery.

use snapbridge_core::config::SerialConfig;
use snapbridge_core::traits::{SerialError, SerialPort};

use crate::channels;

/// Gate over the buffered UART receive task
pub struct UartGate {
    /// Settings the UART was brought up with
    configured: SerialConfig,
}

impl UartGate {
    pub fn new(configured: SerialConfig) -> Self {
        Self { configured }
    }
}

impl SerialPort for UartGate {
    fn open(&mut self, config: &SerialConfig) -> Result<(), SerialError> {
        if *config != self.configured {
            return Err(SerialError::Configuration);
        }
        channels::enable_uart();
        Ok(())
    }

    fn close(&mut self) {
        channels::disable_uart();
    }
}
