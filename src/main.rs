//! Rack controller firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LcdAdapter      EthernetAdapter   MqttAdapter   RestApiAdapter│
//! │  (Display)       (Network)         (Messaging)   (Management)  │
//! │  EspHost         ResetLine         BlockingDelay LogEventSink  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  bring-up · gate · dispatch · publish · adoption       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::fmt::Write as _;

use anyhow::Result;
use esp_idf_svc::eth::{EspEth, EthDriver, SpiEthChipset};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin};
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::hal::spi::{Dma, SpiDriver, SpiDriverConfig};
use log::{info, warn};
use serde_json::json;

use rackctl::adapters::FirmwareBoard;
use rackctl::adapters::ethernet::{EthFactory, EthernetAdapter};
use rackctl::adapters::host::EspHost;
use rackctl::adapters::lcd::LcdAdapter;
use rackctl::adapters::log_sink::LogEventSink;
use rackctl::adapters::mqtt::MqttAdapter;
use rackctl::adapters::rest_api::RestApiAdapter;
use rackctl::adapters::settings_store::SettingsStore;
use rackctl::app::controller::Controller;
use rackctl::config::ControllerConfig;
use rackctl::drivers::delay::BlockingDelay;
use rackctl::drivers::reset_line::ResetLine;
use rackctl::pins;

/// Main loop pacing. `service()` never blocks, so this only yields.
const LOOP_DELAY_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  rackctl v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Configuration ──────────────────────────────────────
    let config = ControllerConfig::default();

    let store = SettingsStore::new().unwrap_or_else(|e| {
        warn!("NVS init failed ({}), stored settings unavailable this session", e);
        SettingsStore::default()
    });

    // ── 3. Adapters ───────────────────────────────────────────
    let spi = peripherals.spi2;
    // SAFETY: these GPIOs are claimed only here; `peripherals.pins` is
    // never used for them.
    let (sclk, mosi, miso, cs, int) = unsafe {
        (
            AnyIOPin::new(pins::SPI_SCLK_GPIO),
            AnyIOPin::new(pins::SPI_MOSI_GPIO),
            AnyIOPin::new(pins::SPI_MISO_GPIO),
            AnyIOPin::new(pins::ETHERNET_CS_GPIO),
            AnyIOPin::new(pins::ETHERNET_INT_GPIO),
        )
    };
    let eth_factory: EthFactory = Box::new(move |mac| {
        let bus = SpiDriver::new(
            spi,
            sclk,
            mosi,
            Some(miso),
            &SpiDriverConfig::new().dma(Dma::Auto(4096)),
        )?;
        let driver = EthDriver::new_spi(
            bus,
            int,
            Some(cs),
            None::<AnyOutputPin>,
            SpiEthChipset::W5500,
            pins::ETHERNET_SPI_HZ.Hz(),
            Some(mac),
            None,
            sysloop,
        )?;
        EspEth::wrap(driver)
    });

    let ports = rackctl::app::ports::Peripherals::<FirmwareBoard> {
        display: LcdAdapter::new(),
        network: EthernetAdapter::new(eth_factory),
        messaging: MqttAdapter::new(),
        api: RestApiAdapter::new(store),
        host: EspHost::new(),
        reset_pin: ResetLine::new(pins::WIZNET_RESET_GPIO)
            .map_err(|e| anyhow::anyhow!("reset line: {}", e))?,
        delay: BlockingDelay::new(),
        sink: LogEventSink::new(),
    };

    // ── 4. Controller bring-up ────────────────────────────────
    let mut controller = Controller::new(config, ports, None);

    controller.set_config_schema(json!({
        "telemetryIntervalSeconds": {
            "title": "Telemetry Interval (seconds)",
            "type": "integer",
            "minimum": 0,
            "maximum": 3600,
        }
    }));
    controller.set_command_schema(json!({
        "identify": {
            "title": "Flash the display to identify this rack",
            "type": "boolean",
        }
    }));

    let identity = controller.begin(
        Some(Box::new(|doc| info!("config received: {}", doc))),
        Some(Box::new(|doc| info!("command received: {}", doc))),
    )?;
    info!("client id {}", identity.client_id);

    let _ = writeln!(controller, "rackctl v{} ready", env!("CARGO_PKG_VERSION"));

    // ── 5. Servicing cycle ────────────────────────────────────
    loop {
        controller.service();
        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
