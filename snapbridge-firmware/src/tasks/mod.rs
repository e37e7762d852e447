//! Embassy async tasks
//!
//! The main loop owns the bridge logic; these tasks only move bytes.

pub mod net;
pub mod uart_rx;

pub use net::{cyw43_task, net_task};
pub use uart_rx::uart_rx_task;
