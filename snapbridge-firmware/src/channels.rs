//! State shared between the UART task and the main loop
//!
//! The received bytes themselves travel through the lock-free
//! `SerialInbox`; these statics only gate the producer.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, Ordering};

/// Set while the frame receiver has the camera line open
static UART_ENABLED: AtomicBool = AtomicBool::new(false);

/// Wakes the UART task when the line is (re)opened
pub static UART_OPENED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Allow the UART task to deliver bytes
pub fn enable_uart() {
    UART_ENABLED.store(true, Ordering::Release);
    UART_OPENED.signal(());
}

/// Stop the UART task from delivering bytes
pub fn disable_uart() {
    UART_ENABLED.store(false, Ordering::Release);
}

pub fn uart_enabled() -> bool {
    UART_ENABLED.load(Ordering::Acquire)
}
