//! Port traits: the hexagonal boundary between the controller core and the
//! collaborators it drives.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! The display driver, Ethernet stack, MQTT client, REST server and chip
//! services all live behind these traits. The
//! [`Controller`](super::controller::Controller) owns one instance of each,
//! grouped by a [`Board`], so the core never touches hardware directly and
//! runs unchanged against the mocks in `tests/integration`.

use core::net::Ipv4Addr;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use serde::Serialize;
use serde_json::Value;

use crate::error::MessagingError;
use crate::topics::MqttSettings;

use super::events::ControllerEvent;
use super::identity::MacAddress;

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

/// Identity drawn in the display header during bring-up.
#[derive(Debug, Clone, Copy)]
pub struct HeaderInfo<'a> {
    pub name: &'a str,
    pub maker: &'a str,
    pub version: &'a str,
    pub platform: &'a str,
    /// Firmware-supplied logo image, if any.
    pub logo: Option<&'static [u8]>,
}

/// Where the header logo came from. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    LogoFromFilesystem,
    LogoFromEmbedded,
    DefaultLogo,
    NoLogo,
}

/// Link and broker state shown in the display footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBar {
    pub link_up: bool,
    pub ip: Ipv4Addr,
    pub mqtt_connected: bool,
}

pub trait DisplayPort {
    fn begin(&mut self);

    fn draw_header(&mut self, header: &HeaderInfo<'_>) -> HeaderStatus;

    /// Backlight level (0–100) while active.
    fn set_brightness_on(&mut self, percent: u8);

    /// Backlight level (0–100) once the active timeout lapses.
    fn set_brightness_dim(&mut self, percent: u8);

    /// Seconds the display stays active after an event (0 = forever).
    fn set_on_time_display(&mut self, seconds: u16);

    /// Seconds the last event stays on screen (0 = forever).
    fn set_on_time_event(&mut self, seconds: u16);

    fn show_event(&mut self, line: &str);

    fn trigger_rx_led(&mut self);

    fn trigger_tx_led(&mut self);

    /// Periodic refresh. Runs every servicing cycle, link up or not.
    fn service(&mut self, status: &StatusBar);
}

// ───────────────────────────────────────────────────────────────
// Network port
// ───────────────────────────────────────────────────────────────

pub trait NetworkPort {
    /// Prepare the interface with the derived MAC (before reset/lease).
    fn init(&mut self, mac: &MacAddress);

    /// Request a DHCP lease. Both timeouts are in milliseconds.
    /// Returns `None` when no lease was obtained.
    fn request_lease(
        &mut self,
        mac: &MacAddress,
        timeout_ms: u32,
        response_timeout_ms: u32,
    ) -> Option<Ipv4Addr>;

    /// Current address (`0.0.0.0` without a lease).
    fn local_ip(&self) -> Ipv4Addr;

    /// Live physical link status. Must not be cached by implementations.
    fn link_up(&self) -> bool;

    /// Renew/rebind the lease when due.
    fn maintain(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Messaging port
// ───────────────────────────────────────────────────────────────

/// Something the MQTT client observed since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagingEvent {
    Connected,
    /// Client state code at the time of the disconnect or failed attempt.
    Disconnected(i32),
    Received { topic: String, payload: Vec<u8> },
}

pub trait MessagingPort {
    fn settings(&self) -> &MqttSettings;

    fn settings_mut(&mut self) -> &mut MqttSettings;

    /// Keep the session alive and (re)connect when due.
    fn service(&mut self);

    /// Next buffered event, oldest first.
    fn poll_event(&mut self) -> Option<MessagingEvent>;

    fn subscribe(&mut self, topic: &str) -> Result<(), MessagingError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MessagingError>;

    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Management API port
// ───────────────────────────────────────────────────────────────

/// Answers adoption queries synchronously with the full document.
pub trait AdoptionSource {
    fn adoption(&self) -> Value;
}

pub trait ManagementApiPort {
    /// Load persisted settings. Anything stored takes precedence over the
    /// defaults already present in `mqtt`.
    fn begin(&mut self, mqtt: &mut MqttSettings);

    fn listen(&mut self, port: u16);

    /// Handle pending requests, querying `adoption` on demand.
    fn service(&mut self, adoption: &dyn AdoptionSource);
}

// ───────────────────────────────────────────────────────────────
// Host port (chip services)
// ───────────────────────────────────────────────────────────────

/// Live resource counters, all in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub heap_used_bytes: u32,
    pub heap_free_bytes: u32,
    pub heap_max_alloc_bytes: u32,
    pub flash_chip_size_bytes: u32,
    pub sketch_space_used_bytes: u32,
    pub sketch_space_total_bytes: u32,
    pub file_system_used_bytes: u32,
    pub file_system_total_bytes: u32,
}

pub trait HostPort {
    /// Factory base MAC (the WiFi station MAC on ESP32).
    fn base_mac(&self) -> MacAddress;

    fn system_stats(&self) -> SystemStats;

    /// Reboot immediately. Never returns.
    fn restart(&mut self) -> !;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core reports every lifecycle and dispatch outcome through this port.
pub trait EventSink {
    fn emit(&mut self, event: &ControllerEvent);
}

// ───────────────────────────────────────────────────────────────
// Board: groups the concrete adapters for one target
// ───────────────────────────────────────────────────────────────

pub trait Board {
    type Display: DisplayPort;
    type Network: NetworkPort;
    type Messaging: MessagingPort;
    type Api: ManagementApiPort;
    type Host: HostPort;
    /// Ethernet controller reset line (active low).
    type ResetPin: OutputPin;
    type Delay: DelayNs;
    type Sink: EventSink;
}

/// Owned adapter instances handed to
/// [`Controller::new`](super::controller::Controller::new).
pub struct Peripherals<B: Board> {
    pub display: B::Display,
    pub network: B::Network,
    pub messaging: B::Messaging,
    pub api: B::Api,
    pub host: B::Host,
    pub reset_pin: B::ResetPin,
    pub delay: B::Delay,
    pub sink: B::Sink,
}
