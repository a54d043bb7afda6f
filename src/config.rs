//! Controller configuration parameters
//!
//! Static firmware identity plus the bring-up timing used by the
//! [`Controller`](crate::app::controller::Controller). Runtime MQTT settings
//! live in [`topics::MqttSettings`](crate::topics::MqttSettings) because the
//! management API may override them after bring-up.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Minimum reset-line hold times for the W5500 (ms).
pub const MIN_RESET_ASSERT_MS: u32 = 250;
pub const MIN_RESET_RELEASE_MS: u32 = 50;
pub const MIN_RESET_SETTLE_MS: u32 = 350;

/// Static identity strings reported in the display header and adoption info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmwareIdentity {
    pub name: String,
    pub short_name: String,
    pub maker: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

impl Default for FirmwareIdentity {
    fn default() -> Self {
        Self {
            name: "Rack Controller".into(),
            short_name: env!("CARGO_PKG_NAME").into(),
            maker: "Rack Controller Engineering".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            github_url: None,
        }
    }
}

/// Ethernet bring-up timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkTiming {
    /// Overall DHCP lease request timeout (ms).
    pub lease_timeout_ms: u32,
    /// Per-response DHCP timeout (ms).
    pub lease_response_timeout_ms: u32,
    /// Reset line held high before the low pulse (ms).
    pub reset_assert_ms: u32,
    /// Width of the low reset pulse (ms).
    pub reset_release_ms: u32,
    /// Settle time after re-asserting the line (ms).
    pub reset_settle_ms: u32,
}

impl Default for NetworkTiming {
    fn default() -> Self {
        Self {
            lease_timeout_ms: 15_000,
            lease_response_timeout_ms: 4_000,
            reset_assert_ms: MIN_RESET_ASSERT_MS,
            reset_release_ms: MIN_RESET_RELEASE_MS,
            reset_settle_ms: MIN_RESET_SETTLE_MS,
        }
    }
}

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub firmware: FirmwareIdentity,
    /// Platform tag drawn in the display header.
    pub platform: String,
    /// TCP port the management API listens on.
    pub api_port: u16,
    /// Added to the last byte of the base MAC to get the Ethernet MAC.
    /// ESP32 convention: base + 3.
    pub mac_offset: u8,
    pub network: NetworkTiming,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            firmware: FirmwareIdentity::default(),
            platform: "ESP32".into(),
            api_port: 80,
            mac_offset: 3,
            network: NetworkTiming::default(),
        }
    }
}

impl ControllerConfig {
    /// Range-check every field. Shortened reset pulses are rejected rather
    /// than clamped; the W5500 does not come out of reset reliably below them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_port == 0 {
            return Err(ConfigError::ValidationFailed("api_port must be non-zero"));
        }
        if self.firmware.short_name.is_empty() {
            return Err(ConfigError::ValidationFailed("firmware short_name is empty"));
        }
        let net = &self.network;
        if net.lease_timeout_ms == 0 || net.lease_response_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("lease timeouts must be non-zero"));
        }
        if net.lease_response_timeout_ms > net.lease_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "lease response timeout exceeds lease timeout",
            ));
        }
        if net.reset_assert_ms < MIN_RESET_ASSERT_MS
            || net.reset_release_ms < MIN_RESET_RELEASE_MS
            || net.reset_settle_ms < MIN_RESET_SETTLE_MS
        {
            return Err(ConfigError::ValidationFailed("reset pulse shorter than minimum"));
        }
        Ok(())
    }
}
