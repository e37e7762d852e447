//! Build-time configuration
//!
//! Everything here is fixed when the firmware is compiled. There is no
//! runtime configuration file and no command line.

pub mod bridge;

pub use bridge::*;
