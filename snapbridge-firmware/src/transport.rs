//! Upload transport over an embassy-net TCP socket
//!
//! The forwarder drives the connection from the main loop without
//! awaiting socket operations. Each call polls the socket future once and
//! turns the outcome into a [`TransportEvent`]; the network runner task
//! moves the data while the main loop sleeps between ticks.

use core::task::Poll;

use embassy_futures::poll_once;
use embassy_net::tcp::{ConnectError, State, TcpSocket};
use embassy_net::Stack;
use embassy_time::Duration;

use snapbridge_core::config::IMAGE_TIMEOUT_MS;
use snapbridge_core::traits::{Transport, TransportError, TransportEvent};
use snapbridge_protocol::Endpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Connecting,
    Open,
    /// Closed by the peer or failed; waiting for `close`
    Finished,
}

/// One reusable TCP connection
pub struct NetTransport {
    socket: TcpSocket<'static>,
    phase: Phase,
    /// Send queue length after the last write or acknowledgement
    queued: usize,
}

impl NetTransport {
    pub fn new(
        stack: Stack<'static>,
        rx_buffer: &'static mut [u8],
        tx_buffer: &'static mut [u8],
    ) -> Self {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(Duration::from_millis(u64::from(IMAGE_TIMEOUT_MS))));
        Self {
            socket,
            phase: Phase::Idle,
            queued: 0,
        }
    }
}

fn connect_error(e: ConnectError) -> TransportError {
    match e {
        ConnectError::InvalidState => TransportError::InvalidState,
        ConnectError::NoRoute => TransportError::NoRoute,
        ConnectError::TimedOut => TransportError::TimedOut,
        _ => TransportError::Reset,
    }
}

impl Transport for NetTransport {
    fn connect(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        if self.phase != Phase::Idle {
            self.socket.abort();
        }
        self.queued = 0;

        // The first poll issues the SYN; completion shows up in poll_event
        match poll_once(self.socket.connect((endpoint.addr, endpoint.port))) {
            Poll::Ready(Err(e)) => {
                self.phase = Phase::Idle;
                Err(connect_error(e))
            }
            _ => {
                self.phase = Phase::Connecting;
                Ok(())
            }
        }
    }

    fn poll_event<'b>(&mut self, rx: &'b mut [u8]) -> Option<TransportEvent<'b>> {
        match self.phase {
            Phase::Idle | Phase::Finished => None,
            Phase::Connecting => match self.socket.state() {
                State::Established => {
                    self.phase = Phase::Open;
                    self.queued = self.socket.send_queue();
                    Some(TransportEvent::Connected)
                }
                State::Closed | State::TimeWait => {
                    self.phase = Phase::Finished;
                    Some(TransportEvent::Errored(TransportError::Reset))
                }
                _ => None,
            },
            Phase::Open => {
                let queued = self.socket.send_queue();
                if queued < self.queued {
                    let acked = self.queued - queued;
                    self.queued = queued;
                    return Some(TransportEvent::SendAck(acked));
                }

                match poll_once(self.socket.read(rx)) {
                    Poll::Ready(Ok(0)) => {
                        self.phase = Phase::Finished;
                        Some(TransportEvent::Closed)
                    }
                    Poll::Ready(Ok(n)) => Some(TransportEvent::Received(&rx[..n])),
                    Poll::Ready(Err(_)) => {
                        self.phase = Phase::Finished;
                        Some(TransportEvent::Errored(TransportError::Reset))
                    }
                    Poll::Pending => None,
                }
            }
        }
    }

    fn writable(&self) -> usize {
        if self.phase != Phase::Open {
            return 0;
        }
        self.socket
            .send_capacity()
            .saturating_sub(self.socket.send_queue())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if self.phase != Phase::Open {
            return Err(TransportError::InvalidState);
        }

        match poll_once(self.socket.write(data)) {
            Poll::Ready(Ok(n)) => {
                self.queued = self.socket.send_queue();
                Ok(n)
            }
            Poll::Ready(Err(_)) => {
                self.phase = Phase::Finished;
                Err(TransportError::Reset)
            }
            Poll::Pending => Ok(0),
        }
    }

    fn close(&mut self) {
        self.socket.abort();
        self.phase = Phase::Idle;
        self.queued = 0;
    }
}
