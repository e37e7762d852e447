//! Upload state machine
//!
//! Pure transition logic for one snapshot upload. Each transport event
//! produces [`Actions`] for the caller to carry out; the caller reports
//! back how many bytes each write actually queued.

use snapbridge_protocol::http::REPLY_SCRATCH_LEN;
use snapbridge_protocol::ReplyScan;

use crate::traits::{TransportError, TransportEvent};

/// A write the caller should issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Write {
    /// The whole request header, in one write
    Header,
    /// `len` payload bytes starting at `offset`
    Payload { offset: usize, len: usize },
}

/// Side effects requested by one event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Actions {
    pub write: Option<Write>,
    /// Server asked for the alarm in this chunk
    pub trigger_alarm: bool,
}

/// Where the upload stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UploadStatus {
    InProgress,
    /// Server acknowledged or closed the connection
    Complete,
    Failed(TransportError),
}

impl UploadStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, UploadStatus::InProgress)
    }
}

/// Progress of one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Upload {
    header_len: usize,
    payload_len: usize,
    header_sent: bool,
    bytes_sent: usize,
    status: UploadStatus,
}

impl Upload {
    /// Start tracking an upload of a `header_len` header and `payload_len` payload
    pub fn new(header_len: usize, payload_len: usize) -> Self {
        Self {
            header_len,
            payload_len,
            header_sent: false,
            bytes_sent: 0,
            status: UploadStatus::InProgress,
        }
    }

    pub fn status(&self) -> UploadStatus {
        self.status
    }

    pub fn header_sent(&self) -> bool {
        self.header_sent
    }

    /// Payload bytes queued so far
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// Check whether every byte has been queued
    pub fn all_sent(&self) -> bool {
        self.header_sent && self.bytes_sent >= self.payload_len
    }

    /// Apply one transport event
    ///
    /// `writable` is the send space available right now. Events arriving
    /// after the upload finished are ignored.
    pub fn on_event(&mut self, event: TransportEvent<'_>, writable: usize) -> Actions {
        let mut actions = Actions::default();
        if self.status.is_finished() {
            return actions;
        }

        match event {
            TransportEvent::Connected | TransportEvent::SendAck(_) => {
                actions.write = self.next_write(writable);
            }
            TransportEvent::Received(data) => {
                let chunk = &data[..data.len().min(REPLY_SCRATCH_LEN)];
                let scan = ReplyScan::scan(chunk);
                actions.trigger_alarm = scan.alarm;
                if scan.success {
                    self.status = UploadStatus::Complete;
                }
            }
            TransportEvent::Closed => {
                // A close counts as success even without a reply
                self.status = UploadStatus::Complete;
            }
            TransportEvent::Errored(e) => {
                self.status = UploadStatus::Failed(e);
            }
        }

        actions
    }

    /// Record how many bytes of `write` the transport accepted
    pub fn record_write(&mut self, write: Write, accepted: usize) {
        match write {
            Write::Header => {
                if accepted == self.header_len {
                    self.header_sent = true;
                } else if accepted != 0 {
                    // A split header cannot be resumed
                    self.status = UploadStatus::Failed(TransportError::InvalidState);
                }
            }
            Write::Payload { len, .. } => {
                self.bytes_sent += accepted.min(len);
            }
        }
    }

    /// Record a failed write
    pub fn fail(&mut self, error: TransportError) {
        self.status = UploadStatus::Failed(error);
    }

    fn next_write(&self, writable: usize) -> Option<Write> {
        if !self.header_sent {
            return (self.header_len <= writable).then_some(Write::Header);
        }

        let remaining = self.payload_len - self.bytes_sent;
        if remaining == 0 || writable == 0 {
            return None;
        }

        Some(Write::Payload {
            offset: self.bytes_sent,
            len: remaining.min(writable),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: usize = 120;

    #[test]
    fn test_connected_writes_header() {
        let mut upload = Upload::new(HEADER, 1000);
        let actions = upload.on_event(TransportEvent::Connected, 4096);
        assert_eq!(actions.write, Some(Write::Header));
        upload.record_write(Write::Header, HEADER);
        assert!(upload.header_sent());
    }

    #[test]
    fn test_header_deferred_until_it_fits() {
        let mut upload = Upload::new(HEADER, 1000);
        assert_eq!(upload.on_event(TransportEvent::Connected, 100).write, None);
        assert_eq!(upload.on_event(TransportEvent::SendAck(0), 119).write, None);
        assert_eq!(
            upload.on_event(TransportEvent::SendAck(0), 120).write,
            Some(Write::Header)
        );
    }

    #[test]
    fn test_payload_chunks_follow_send_space() {
        let mut upload = Upload::new(HEADER, 1000);
        upload.on_event(TransportEvent::Connected, 4096);
        upload.record_write(Write::Header, HEADER);

        let mut offsets = [0usize; 3];
        for (i, offset) in offsets.iter_mut().enumerate() {
            let actions = upload.on_event(TransportEvent::SendAck(HEADER), 400);
            let Some(Write::Payload { offset: o, len }) = actions.write else {
                panic!("expected payload write on round {i}");
            };
            *offset = o;
            upload.record_write(Write::Payload { offset: o, len }, len);
        }

        assert_eq!(offsets, [0, 400, 800]);
        assert_eq!(upload.bytes_sent(), 1000);
        assert!(upload.all_sent());
        assert_eq!(upload.on_event(TransportEvent::SendAck(200), 4096).write, None);
    }

    #[test]
    fn test_partial_payload_write_resumes() {
        let mut upload = Upload::new(HEADER, 500);
        upload.on_event(TransportEvent::Connected, 4096);
        upload.record_write(Write::Header, HEADER);

        let write = upload.on_event(TransportEvent::SendAck(HEADER), 500).write;
        assert_eq!(write, Some(Write::Payload { offset: 0, len: 500 }));
        upload.record_write(Write::Payload { offset: 0, len: 500 }, 300);

        let write = upload.on_event(TransportEvent::SendAck(300), 4096).write;
        assert_eq!(write, Some(Write::Payload { offset: 300, len: 200 }));
    }

    #[test]
    fn test_split_header_fails() {
        let mut upload = Upload::new(HEADER, 10);
        upload.on_event(TransportEvent::Connected, 4096);
        upload.record_write(Write::Header, 60);
        assert_eq!(
            upload.status(),
            UploadStatus::Failed(TransportError::InvalidState)
        );
    }

    #[test]
    fn test_reply_success() {
        let mut upload = Upload::new(HEADER, 10);
        let actions = upload.on_event(TransportEvent::Received(b"HTTP/1.1 200 OK\r\n\r\n"), 0);
        assert!(!actions.trigger_alarm);
        assert_eq!(upload.status(), UploadStatus::Complete);
    }

    #[test]
    fn test_reply_alarm_without_success() {
        let mut upload = Upload::new(HEADER, 10);
        let actions = upload.on_event(TransportEvent::Received(b"HTTP/1.0 503\r\n\r\nALARM"), 0);
        assert!(actions.trigger_alarm);
        assert_eq!(upload.status(), UploadStatus::InProgress);
    }

    #[test]
    fn test_reply_scan_limited_to_scratch() {
        let mut reply = [b' '; 300];
        reply[280..285].copy_from_slice(b"ALARM");
        let mut upload = Upload::new(HEADER, 10);
        let actions = upload.on_event(TransportEvent::Received(&reply), 0);
        assert!(!actions.trigger_alarm);
    }

    #[test]
    fn test_close_completes() {
        let mut upload = Upload::new(HEADER, 10);
        upload.on_event(TransportEvent::Closed, 0);
        assert_eq!(upload.status(), UploadStatus::Complete);
    }

    #[test]
    fn test_error_fails_and_sticks() {
        let mut upload = Upload::new(HEADER, 10);
        upload.on_event(TransportEvent::Errored(TransportError::Reset), 0);
        assert_eq!(upload.status(), UploadStatus::Failed(TransportError::Reset));

        let actions = upload.on_event(TransportEvent::Received(b"200 OK ALARM"), 0);
        assert_eq!(actions, Actions::default());
        assert_eq!(upload.status(), UploadStatus::Failed(TransportError::Reset));
    }
}
