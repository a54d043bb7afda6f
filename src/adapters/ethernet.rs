//! W5500 Ethernet adapter.
//!
//! Implements [`NetworkPort`]: the hexagonal boundary for link status and
//! DHCP addressing.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF SPI Ethernet driver via `esp_idf_svc::eth`.
//!   The driver is built lazily in [`NetworkPort::init`] because the MAC is
//!   only known once the core has derived it. The reset line is driven by
//!   the core, so the driver is created without one.
//! - **all other targets**: simulation with a controllable link and lease.

use core::net::Ipv4Addr;

use log::{info, warn};

use crate::app::identity::{MacAddress, mac_display};
use crate::app::ports::NetworkPort;

#[cfg(target_os = "espidf")]
use esp_idf_svc::eth::{EspEth, SpiEth};
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::spi::SpiDriver;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::EspError;

/// Concrete ESP-IDF Ethernet netif type used on the board.
#[cfg(target_os = "espidf")]
pub type BoardEth = EspEth<'static, SpiEth<SpiDriver<'static>>>;

/// Builds the driver for a given MAC. Supplied by `main` with the SPI bus,
/// interrupt and chip-select pins captured.
#[cfg(target_os = "espidf")]
pub type EthFactory = Box<dyn FnOnce(&MacAddress) -> Result<BoardEth, EspError>>;

/// Poll interval while waiting for a lease.
#[cfg(target_os = "espidf")]
const LEASE_POLL_MS: u32 = 100;

// ───────────────────────────────────────────────────────────────
// Ethernet adapter
// ───────────────────────────────────────────────────────────────

pub struct EthernetAdapter {
    mac: Option<MacAddress>,
    ip: Ipv4Addr,
    last_link: bool,

    #[cfg(target_os = "espidf")]
    factory: Option<EthFactory>,
    #[cfg(target_os = "espidf")]
    eth: Option<BoardEth>,

    /// Simulation: physical link state.
    #[cfg(not(target_os = "espidf"))]
    sim_link: bool,
    /// Simulation: address the "DHCP server" hands out, if any.
    #[cfg(not(target_os = "espidf"))]
    sim_lease: Option<Ipv4Addr>,
}

impl EthernetAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(factory: EthFactory) -> Self {
        Self {
            mac: None,
            ip: Ipv4Addr::UNSPECIFIED,
            last_link: false,
            factory: Some(factory),
            eth: None,
        }
    }

    /// Simulation with the link up and a lease of `192.168.1.50`.
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            mac: None,
            ip: Ipv4Addr::UNSPECIFIED,
            last_link: false,
            sim_link: true,
            sim_lease: Some(Ipv4Addr::new(192, 168, 1, 50)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn set_link(&mut self, up: bool) {
        self.sim_link = up;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn set_lease(&mut self, lease: Option<Ipv4Addr>) {
        self.sim_lease = lease;
    }

    pub fn mac(&self) -> Option<MacAddress> {
        self.mac
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self, mac: &MacAddress) {
        let Some(factory) = self.factory.take() else {
            warn!("Ethernet: driver already initialised");
            return;
        };
        match factory(mac).and_then(|mut eth| eth.start().map(|()| eth)) {
            Ok(eth) => {
                info!("Ethernet: W5500 driver started");
                self.eth = Some(eth);
            }
            Err(e) => warn!("Ethernet: driver init failed: {}", e),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self, _mac: &MacAddress) {
        info!("Ethernet(sim): driver started");
    }

    #[cfg(target_os = "espidf")]
    fn platform_lease(&mut self, timeout_ms: u32, response_timeout_ms: u32) -> Option<Ipv4Addr> {
        use esp_idf_svc::hal::delay::FreeRtos;

        let eth = self.eth.as_ref()?;
        // The ESP-IDF DHCP client retries internally; the response timeout
        // only bounds how long a started link may sit without an answer.
        let mut waited = 0;
        let mut link_waited = 0;
        while waited < timeout_ms {
            if eth.netif().is_up().unwrap_or(false) {
                if let Ok(info) = eth.netif().get_ip_info() {
                    if !info.ip.is_unspecified() {
                        return Some(info.ip);
                    }
                }
            }
            if eth.is_connected().unwrap_or(false) {
                link_waited += LEASE_POLL_MS;
                if link_waited >= response_timeout_ms.max(LEASE_POLL_MS) * 4 {
                    break;
                }
            }
            FreeRtos::delay_ms(LEASE_POLL_MS);
            waited += LEASE_POLL_MS;
        }
        None
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_lease(&mut self, _timeout_ms: u32, _response_timeout_ms: u32) -> Option<Ipv4Addr> {
        if self.sim_link { self.sim_lease } else { None }
    }

    #[cfg(target_os = "espidf")]
    fn platform_link_up(&self) -> bool {
        self.eth
            .as_ref()
            .is_some_and(|eth| eth.is_connected().unwrap_or(false))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_link_up(&self) -> bool {
        self.sim_link
    }

    #[cfg(target_os = "espidf")]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        let info = self.eth.as_ref()?.netif().get_ip_info().ok()?;
        Some(info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ip(&self) -> Option<Ipv4Addr> {
        Some(self.ip)
    }
}

impl NetworkPort for EthernetAdapter {
    fn init(&mut self, mac: &MacAddress) {
        info!("Ethernet: init mac={}", mac_display(mac));
        self.mac = Some(*mac);
        self.platform_init(mac);
    }

    fn request_lease(
        &mut self,
        mac: &MacAddress,
        timeout_ms: u32,
        response_timeout_ms: u32,
    ) -> Option<Ipv4Addr> {
        if self.mac != Some(*mac) {
            warn!("Ethernet: lease requested for a MAC the driver was not started with");
        }
        let lease = self.platform_lease(timeout_ms, response_timeout_ms);
        self.ip = lease.unwrap_or(Ipv4Addr::UNSPECIFIED);
        lease
    }

    fn local_ip(&self) -> Ipv4Addr {
        self.platform_ip().unwrap_or(self.ip)
    }

    fn link_up(&self) -> bool {
        self.platform_link_up()
    }

    fn maintain(&mut self) {
        // DHCP renew/rebind runs inside the netif; only track changes here.
        let link = self.platform_link_up();
        if link != self.last_link {
            info!("Ethernet: link {}", if link { "up" } else { "down" });
            self.last_link = link;
        }
        if let Some(ip) = self.platform_ip() {
            if ip != self.ip {
                info!("Ethernet: address {} -> {}", self.ip, ip);
                self.ip = ip;
            }
        }
    }
}
