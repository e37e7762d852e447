//! Snapshot forwarder
//!
//! Uploads one snapshot per call as an HTTP POST to the PC server and
//! watches the reply for the alarm command. The forwarder owns the
//! transport and keeps its own copy of the payload, so the receiver's
//! buffer can be reused as soon as [`SnapshotForwarder::begin`] returns.
//!
//! [`SnapshotForwarder::send`] blocks until the upload is over;
//! [`SnapshotForwarder::send_async`] does the same but yields between
//! polls, so an async network stack keeps running. Both are built from
//! [`begin`](SnapshotForwarder::begin), [`tick`](SnapshotForwarder::tick)
//! and [`finish`](SnapshotForwarder::finish), which tests drive directly
//! with simulated time.

mod upload;

pub use upload::{Actions, Upload, UploadStatus, Write};

use core::task::Poll;

use embedded_hal::delay::DelayNs;
use embedded_hal_async::delay::DelayNs as AsyncDelayNs;
use snapbridge_protocol::http::REPLY_SCRATCH_LEN;
use snapbridge_protocol::{render_request_header, Endpoint, HttpError, RequestHeader};

use crate::config::{BridgeConfig, MAX_IMAGE_SIZE};
use crate::traits::{elapsed_ms, Alarm, Clock, Transport, TransportError};

/// Upload failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ForwardError {
    /// Payload empty or larger than the upload buffer
    InvalidPayload { size: usize },
    /// Request header could not be rendered
    Header(HttpError),
    /// Connection could not be started
    Connect(TransportError),
    /// Connection failed mid-upload
    Transport(TransportError),
    /// No acknowledgement within the upload timeout
    Timeout,
}

impl From<HttpError> for ForwardError {
    fn from(e: HttpError) -> Self {
        ForwardError::Header(e)
    }
}

/// HTTP snapshot uploader over a [`Transport`]
pub struct SnapshotForwarder<'a, T: Transport> {
    transport: T,
    server: Endpoint,
    /// Upload copy of the payload
    buffer: &'a mut [u8],
    payload_len: usize,
    header: RequestHeader,
    upload: Option<Upload>,
    started_ms: u32,
    timeout_ms: u32,
    poll_interval_ms: u32,
}

impl<'a, T: Transport> SnapshotForwarder<'a, T> {
    /// Create a forwarder using `buffer` for its payload copy
    pub fn new(transport: T, config: &BridgeConfig, buffer: &'a mut [u8]) -> Self {
        Self {
            transport,
            server: config.server,
            buffer,
            payload_len: 0,
            header: RequestHeader::new(),
            upload: None,
            started_ms: 0,
            timeout_ms: config.image_timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    /// Clear all upload state
    ///
    /// Does not touch the transport.
    pub fn init(&mut self) {
        self.payload_len = 0;
        self.header.clear();
        self.upload = None;
        self.started_ms = 0;
    }

    /// Close any live connection and clear all state
    pub fn deinit(&mut self) {
        if self.upload.is_some() {
            self.transport.close();
        }
        self.buffer.fill(0);
        self.init();
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Largest payload accepted
    pub fn max_payload(&self) -> usize {
        self.buffer.len().min(MAX_IMAGE_SIZE)
    }

    /// Current upload, if one is in flight
    pub fn upload(&self) -> Option<&Upload> {
        self.upload.as_ref()
    }

    /// Copy `payload` and start connecting
    ///
    /// A previous upload still in flight is torn down first.
    pub fn begin(&mut self, payload: &[u8], now_ms: u32) -> Result<(), ForwardError> {
        if payload.is_empty() || payload.len() > self.max_payload() {
            warn!("forwarder: invalid payload size {}", payload.len());
            return Err(ForwardError::InvalidPayload {
                size: payload.len(),
            });
        }

        if self.upload.is_some() {
            self.finish();
        }

        self.header = render_request_header(&self.server, payload.len())?;
        self.buffer[..payload.len()].copy_from_slice(payload);
        self.payload_len = payload.len();
        self.started_ms = now_ms;

        if let Err(e) = self.transport.connect(&self.server) {
            warn!("forwarder: connect failed: {}", e);
            self.transport.close();
            return Err(ForwardError::Connect(e));
        }

        self.upload = Some(Upload::new(self.header.len(), self.payload_len));
        debug!("forwarder: uploading {} bytes", self.payload_len);
        Ok(())
    }

    /// Service the connection once
    ///
    /// Handles every pending transport event, then checks the timeout.
    /// Returns `Ready` once the upload succeeded, failed or timed out; the
    /// connection stays open until [`finish`](Self::finish).
    pub fn tick<A: Alarm>(&mut self, alarm: &mut A, now_ms: u32) -> Poll<Result<(), ForwardError>> {
        let Some(upload) = self.upload.as_mut() else {
            return Poll::Ready(Err(ForwardError::Transport(TransportError::InvalidState)));
        };

        let mut rx = [0u8; REPLY_SCRATCH_LEN];
        while !upload.status().is_finished() {
            let Some(event) = self.transport.poll_event(&mut rx) else {
                break;
            };
            let writable = self.transport.writable();
            let actions = upload.on_event(event, writable);

            if actions.trigger_alarm {
                info!("forwarder: server requested alarm");
                alarm.activate();
            }

            if let Some(write) = actions.write {
                let bytes = match write {
                    Write::Header => self.header.as_bytes(),
                    Write::Payload { offset, len } => &self.buffer[offset..offset + len],
                };
                match self.transport.write(bytes) {
                    Ok(accepted) => upload.record_write(write, accepted),
                    Err(e) => upload.fail(e),
                }
            }
        }

        match upload.status() {
            UploadStatus::Complete => Poll::Ready(Ok(())),
            UploadStatus::Failed(e) => Poll::Ready(Err(ForwardError::Transport(e))),
            UploadStatus::InProgress => {
                if elapsed_ms(now_ms, self.started_ms) >= self.timeout_ms {
                    Poll::Ready(Err(ForwardError::Timeout))
                } else {
                    Poll::Pending
                }
            }
        }
    }

    /// Tear down the connection
    pub fn finish(&mut self) {
        self.transport.close();
        self.upload = None;
    }

    /// Upload `payload`, blocking until it is acknowledged, fails or times out
    ///
    /// `timer` supplies both the clock and the sleep between polls. The
    /// connection is always closed before returning.
    pub fn send<A, D>(&mut self, payload: &[u8], alarm: &mut A, timer: &mut D) -> Result<(), ForwardError>
    where
        A: Alarm,
        D: Clock + DelayNs,
    {
        self.begin(payload, timer.now_ms())?;

        let result = loop {
            if let Poll::Ready(result) = self.tick(alarm, timer.now_ms()) {
                break result;
            }
            timer.delay_ms(self.poll_interval_ms);
        };

        self.conclude(result)
    }

    /// Upload `payload`, sleeping asynchronously between polls
    ///
    /// Same contract as [`send`](Self::send).
    pub async fn send_async<A, D>(
        &mut self,
        payload: &[u8],
        alarm: &mut A,
        timer: &mut D,
    ) -> Result<(), ForwardError>
    where
        A: Alarm,
        D: Clock + AsyncDelayNs,
    {
        self.begin(payload, timer.now_ms())?;

        let result = loop {
            if let Poll::Ready(result) = self.tick(alarm, timer.now_ms()) {
                break result;
            }
            timer.delay_ms(self.poll_interval_ms).await;
        };

        self.conclude(result)
    }

    fn conclude(&mut self, result: Result<(), ForwardError>) -> Result<(), ForwardError> {
        self.finish();

        match &result {
            Ok(()) => info!("forwarder: {} bytes delivered", self.payload_len),
            Err(e) => warn!("forwarder: upload failed: {}", e),
        }
        result
    }
}
