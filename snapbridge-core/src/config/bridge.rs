//! Bridge configuration constants and static structure

use core::net::Ipv4Addr;

use snapbridge_protocol::Endpoint;

/// Largest accepted snapshot (100 kB JPEG)
pub const MAX_IMAGE_SIZE: usize = 100 * 1024;

/// Largest payload a frame header may announce
pub const FRAME_MAX_DATA_SIZE: usize = MAX_IMAGE_SIZE;

/// Capacity of the UART receive ring (holds at most one byte less)
pub const RX_RING_CAPACITY: usize = 512;

/// A partial frame is dropped after this long without new bytes
pub const FRAME_TIMEOUT_MS: u32 = 5000;

/// Upper bound on one snapshot upload, connect included
pub const IMAGE_TIMEOUT_MS: u32 = 15000;

/// Sleep between network polls while an upload is in flight
pub const POLL_INTERVAL_MS: u32 = 10;

/// Main loop period
pub const MAIN_LOOP_INTERVAL_MS: u32 = 10;

/// Camera UART baud rate
pub const BBB_UART_BAUD: u32 = 115_200;

/// Default PC server address
pub const SERVER_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 2, 107);

/// Default PC server port
pub const SERVER_PORT: u16 = 7654;

/// First delay before re-initializing a lost Wi-Fi link
pub const INITIAL_RETRY_DELAY_MS: u32 = 1000;

/// Backoff ceiling for link re-initialization
pub const MAX_RETRY_DELAY_MS: u32 = 10_000;

/// Failed link re-initializations before the device restarts
pub const MAX_LINK_REINIT_TRIES: u32 = 100;

/// Serial line configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Data bits per character
    pub data_bits: u8,
    /// Stop bits per character
    pub stop_bits: u8,
    /// Hardware FIFO enabled
    pub fifo: bool,
}

impl SerialConfig {
    /// 8N1 with the FIFO enabled
    pub const fn new(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: 8,
            stop_bits: 1,
            fifo: true,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::new(BBB_UART_BAUD)
    }
}

/// Link recovery bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryConfig {
    /// First backoff delay (ms)
    pub initial_delay_ms: u32,
    /// Backoff ceiling (ms)
    pub max_delay_ms: u32,
    /// Attempts before giving up
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: INITIAL_RETRY_DELAY_MS,
            max_delay_ms: MAX_RETRY_DELAY_MS,
            max_attempts: MAX_LINK_REINIT_TRIES,
        }
    }
}

/// Complete bridge configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Upload destination
    pub server: Endpoint,
    /// Camera UART settings
    pub serial: SerialConfig,
    /// Largest accepted snapshot
    pub max_image_size: usize,
    /// Stalled frame timeout (ms)
    pub frame_timeout_ms: u32,
    /// Upload timeout (ms)
    pub image_timeout_ms: u32,
    /// Poll interval during uploads (ms)
    pub poll_interval_ms: u32,
    /// Wi-Fi recovery bounds
    pub retry: RetryConfig,
}

impl BridgeConfig {
    /// Configuration built from the constants in this module
    pub const fn new() -> Self {
        Self {
            server: Endpoint::new(SERVER_ADDR, SERVER_PORT),
            serial: SerialConfig::new(BBB_UART_BAUD),
            max_image_size: MAX_IMAGE_SIZE,
            frame_timeout_ms: FRAME_TIMEOUT_MS,
            image_timeout_ms: IMAGE_TIMEOUT_MS,
            poll_interval_ms: POLL_INTERVAL_MS,
            retry: RetryConfig {
                initial_delay_ms: INITIAL_RETRY_DELAY_MS,
                max_delay_ms: MAX_RETRY_DELAY_MS,
                max_attempts: MAX_LINK_REINIT_TRIES,
            },
        }
    }

    /// Same configuration with a different server
    pub const fn with_server(self, server: Endpoint) -> Self {
        Self { server, ..self }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BridgeConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "server={} baud={} max_image={} frame_timeout={}ms image_timeout={}ms",
            self.server,
            self.serial.baudrate,
            self.max_image_size,
            self.frame_timeout_ms,
            self.image_timeout_ms
        );
    }
}
