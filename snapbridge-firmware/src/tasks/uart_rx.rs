//! Camera UART receive task
//!
//! Producer side of the serial inbox: copies every received byte into the
//! ring and stamps the arrival time. Runs only while the line is open.

use defmt::*;
use embassy_rp::uart::BufferedUartRx;
use embedded_io_async::Read;

use snapbridge_core::config::RX_RING_CAPACITY;
use snapbridge_core::traits::Clock;
use snapbridge_core::SerialInbox;

use crate::channels;
use crate::clock::Uptime;

/// Bytes pulled from the UART driver per read
const RX_CHUNK_SIZE: usize = 64;

/// UART RX task - feeds the frame receiver's inbox
#[embassy_executor::task]
pub async fn uart_rx_task(mut rx: BufferedUartRx, inbox: &'static SerialInbox<RX_RING_CAPACITY>) {
    info!("UART RX task started");

    let clock = Uptime;
    let mut buf = [0u8; RX_CHUNK_SIZE];

    loop {
        if !channels::uart_enabled() {
            channels::UART_OPENED.wait().await;
            continue;
        }

        match rx.read(&mut buf).await {
            Ok(n) if n > 0 => {
                // Discard anything read while the line was being closed
                if !channels::uart_enabled() {
                    continue;
                }

                let now = clock.now_ms();
                let mut dropped = 0usize;
                for &byte in &buf[..n] {
                    if !inbox.deliver(byte, now) {
                        dropped += 1;
                    }
                }

                // Expected while an upload holds the main loop
                if dropped > 0 {
                    trace!("RX ring full, {} bytes dropped", dropped);
                }
            }
            Ok(_) => {
                // No bytes read, continue
            }
            Err(e) => {
                warn!("UART read error: {:?}", e);
            }
        }
    }
}
