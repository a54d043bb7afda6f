//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements          | Connects to                   |
//! |------------------|---------------------|-------------------------------|
//! | `ethernet`       | NetworkPort         | W5500 over SPI, DHCP netif    |
//! | `host`           | HostPort            | eFuse MAC, heap/flash, reset  |
//! | `lcd`            | DisplayPort         | Panel state + serial log      |
//! | `log_sink`       | EventSink           | Serial log output             |
//! | `mqtt`           | MessagingPort       | ESP-IDF MQTT client           |
//! | `rest_api`       | ManagementApiPort   | ESP-IDF HTTP server           |
//! | `settings_store` | (used by rest_api)  | NVS / in-memory store         |
//!
//! Every adapter compiles on the host with a simulation backend, so
//! [`FirmwareBoard`] also drives host-side runs of the full controller.

pub mod ethernet;
pub mod host;
pub mod lcd;
pub mod log_sink;
pub mod mqtt;
pub mod rest_api;
pub mod settings_store;

use crate::app::ports::Board;
use crate::drivers::delay::BlockingDelay;
use crate::drivers::reset_line::ResetLine;

/// The production adapter set.
pub struct FirmwareBoard;

impl Board for FirmwareBoard {
    type Display = lcd::LcdAdapter;
    type Network = ethernet::EthernetAdapter;
    type Messaging = mqtt::MqttAdapter;
    type Api = rest_api::RestApiAdapter;
    type Host = host::EspHost;
    type ResetPin = ResetLine;
    type Delay = BlockingDelay;
    type Sink = log_sink::LogEventSink;
}
