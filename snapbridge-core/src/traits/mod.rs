//! Collaborator traits
//!
//! These traits define the interface between the bridge logic and the
//! board: the camera UART, the TCP stack, the alarm actuators and time.

pub mod alarm;
pub mod clock;
pub mod serial;
pub mod transport;

pub use alarm::Alarm;
pub use clock::{elapsed_ms, Clock};
pub use serial::{SerialError, SerialPort};
pub use transport::{Transport, TransportError, TransportEvent};
