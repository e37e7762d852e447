//! Serial line trait for the camera link

use crate::config::SerialConfig;

/// Errors that can occur bringing up the serial line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// Peripheral could not be configured
    Configuration,
    /// Byte producer (interrupt or task) could not be installed
    Producer,
    /// Line is already owned by another receiver
    Busy,
}

/// Trait for the camera UART
///
/// Implementations configure the peripheral and install the producer that
/// feeds received bytes into the receiver's [`SerialInbox`]. The producer
/// must do nothing but [`SerialInbox::deliver`].
///
/// [`SerialInbox`]: crate::ring::SerialInbox
/// [`SerialInbox::deliver`]: crate::ring::SerialInbox::deliver
pub trait SerialPort {
    /// Configure the line and start delivering bytes
    fn open(&mut self, config: &SerialConfig) -> Result<(), SerialError>;

    /// Stop delivering bytes
    fn close(&mut self);
}
