//! Uptime clock backed by embassy-time

use embassy_time::{Instant, Timer};
use embedded_hal_async::delay::DelayNs;
use snapbridge_core::traits::Clock;

/// Milliseconds since boot, wrapping after ~49 days
#[derive(Debug, Clone, Copy, Default)]
pub struct Uptime;

impl Clock for Uptime {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

impl DelayNs for Uptime {
    async fn delay_ns(&mut self, ns: u32) {
        Timer::after_nanos(u64::from(ns)).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after_millis(u64::from(ms)).await;
    }
}
