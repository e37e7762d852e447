//! Wi-Fi link on the Pico W's CYW43 radio

use defmt::*;
use embassy_net::Stack;
use embassy_time::{with_timeout, Duration, Timer};

use cyw43::JoinOptions;
use snapbridge_core::config::RetryConfig;
use snapbridge_core::{Backoff, LinkError};

use crate::net_config::{WIFI_PASSWORD, WIFI_SSID};

/// Time allowed for DHCP after joining
const DHCP_TIMEOUT_MS: u64 = 10_000;

/// Wi-Fi bring-up errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum WifiError {
    /// Association failed with this firmware status
    Join(u32),
    /// No address lease in time
    Dhcp,
}

/// Station-mode link to the access point
pub struct WifiLink {
    control: cyw43::Control<'static>,
    stack: Stack<'static>,
}

impl WifiLink {
    pub fn new(control: cyw43::Control<'static>, stack: Stack<'static>) -> Self {
        Self { control, stack }
    }

    /// Join the configured network and wait for an address
    pub async fn init(&mut self) -> Result<(), WifiError> {
        info!("Joining Wi-Fi network '{}'", WIFI_SSID);

        let options = if WIFI_PASSWORD.is_empty() {
            JoinOptions::new_open()
        } else {
            JoinOptions::new(WIFI_PASSWORD.as_bytes())
        };
        self.control
            .join(WIFI_SSID, options)
            .await
            .map_err(|e| WifiError::Join(e.status))?;

        with_timeout(
            Duration::from_millis(DHCP_TIMEOUT_MS),
            self.stack.wait_config_up(),
        )
        .await
        .map_err(|_| WifiError::Dhcp)?;

        if let Some(config) = self.stack.config_v4() {
            info!("Wi-Fi connected, address {}", config.address);
        }
        Ok(())
    }

    /// Associated and holding an address
    pub fn is_connected(&self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }

    /// Leave the network
    pub async fn deinit(&mut self) {
        self.control.leave().await;
    }

    /// Re-run bring-up with exponential backoff
    ///
    /// Returns the number of attempts it took.
    pub async fn recover(&mut self, retry: RetryConfig) -> Result<u32, LinkError> {
        let mut backoff = Backoff::new(retry);

        while let Some(delay_ms) = backoff.next() {
            Timer::after_millis(u64::from(delay_ms)).await;

            match self.init().await {
                Ok(()) => return Ok(backoff.attempts()),
                Err(e) => {
                    warn!(
                        "Wi-Fi reinit attempt {} failed: {:?}",
                        backoff.attempts(),
                        e
                    );
                }
            }
        }

        Err(backoff.exhausted())
    }
}
