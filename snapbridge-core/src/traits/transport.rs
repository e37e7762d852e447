//! Non-blocking TCP transport trait
//!
//! The network stack is serviced from the main loop. Instead of invoking
//! callbacks, the transport reports what happened since the last poll as
//! [`TransportEvent`]s, which the forwarder feeds into its upload state
//! machine.

use snapbridge_protocol::Endpoint;

/// Errors reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// No connection object could be allocated
    Alloc,
    /// Destination unreachable
    NoRoute,
    /// Peer refused or reset the connection
    Reset,
    /// Handshake or retransmission timed out
    TimedOut,
    /// Operation not valid in the connection's current state
    InvalidState,
}

/// Something that happened on the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportEvent<'a> {
    /// Handshake completed
    Connected,
    /// Peer acknowledged this many bytes; send space was freed
    SendAck(usize),
    /// Reply bytes arrived
    Received(&'a [u8]),
    /// Peer closed its side (zero-length receive)
    Closed,
    /// Connection failed; the transport has already released it
    Errored(TransportError),
}

/// Trait for a single outgoing TCP connection
pub trait Transport {
    /// Start connecting to `endpoint`
    ///
    /// Returns immediately; completion is reported as
    /// [`TransportEvent::Connected`] or [`TransportEvent::Errored`].
    fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError>;

    /// Service the stack and return the next pending event
    ///
    /// Received bytes are copied into `rx` and the event borrows them.
    /// Returns `None` once nothing more is pending.
    fn poll_event<'b>(&mut self, rx: &'b mut [u8]) -> Option<TransportEvent<'b>>;

    /// Bytes that can be written right now without blocking
    fn writable(&self) -> usize;

    /// Queue bytes for sending
    ///
    /// Never blocks; returns how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Tear down the connection, whatever its state
    fn close(&mut self);
}
