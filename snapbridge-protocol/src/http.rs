//! Snapshot upload request and server reply handling
//!
//! The upload is a single HTTP/1.1 POST. The reply is not parsed as HTTP:
//! it is scanned for two markers, one acknowledging the upload and one
//! asking for the alarm.

use core::fmt::{self, Write};
use core::net::Ipv4Addr;

use heapless::String;

/// Capacity reserved for a rendered request header
pub const REQUEST_HEADER_CAPACITY: usize = 256;

/// Largest reply chunk inspected per receive event
pub const REPLY_SCRATCH_LEN: usize = 255;

/// Reply marker asking for the alarm
pub const ALARM_MARKER: &[u8] = b"ALARM";

/// Reply markers acknowledging the upload
pub const SUCCESS_MARKERS: [&[u8]; 2] = [b"200 OK", b"HTTP/1.1 200"];

/// Rendered request header
pub type RequestHeader = String<REQUEST_HEADER_CAPACITY>;

/// Errors from request rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// Header did not fit in [`REQUEST_HEADER_CAPACITY`]
    HeaderOverflow,
}

/// Server address and port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: Ipv4Addr,
    pub port: u16,
}

impl Endpoint {
    pub const fn new(addr: Ipv4Addr, port: u16) -> Self {
        Self { addr, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Endpoint {
    fn format(&self, f: defmt::Formatter) {
        let [a, b, c, d] = self.addr.octets();
        defmt::write!(f, "{}.{}.{}.{}:{}", a, b, c, d, self.port);
    }
}

/// Render the request header for an upload of `content_length` bytes
///
/// The payload follows the blank line directly; nothing else is sent.
pub fn render_request_header(
    server: &Endpoint,
    content_length: usize,
) -> Result<RequestHeader, HttpError> {
    let mut header = RequestHeader::new();
    write!(
        header,
        "POST /image HTTP/1.1\r\n\
         Host: {}\r\n\
         Content-Type: image/jpeg\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n",
        server, content_length
    )
    .map_err(|_| HttpError::HeaderOverflow)?;
    Ok(header)
}

/// Markers found in one reply chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReplyScan {
    /// Server asked for the alarm
    pub alarm: bool,
    /// Server acknowledged the upload
    pub success: bool,
}

impl ReplyScan {
    /// Scan one received chunk
    ///
    /// Markers split across two chunks are not detected.
    pub fn scan(chunk: &[u8]) -> Self {
        Self {
            alarm: contains(chunk, ALARM_MARKER),
            success: SUCCESS_MARKERS.iter().any(|m| contains(chunk, m)),
        }
    }
}

/// Byte substring search
pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
