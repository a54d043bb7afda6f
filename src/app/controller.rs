//! Controller: the hexagonal core.
//!
//! [`Controller`] owns every collaborator (display, Ethernet, MQTT client,
//! REST API, chip services) through the port traits grouped by a [`Board`].
//! It runs the one-shot bring-up sequence, then a cooperative servicing
//! cycle that the firmware loop calls forever.
//!
//! ```text
//!  HostPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  NetworkPort ─│        Controller        │ ──▶ DisplayPort
//!  Messaging ◀─▶│ bring-up · gate · route  │ ◀─▶ ManagementApiPort
//!               └──────────────────────────┘
//! ```

use core::fmt::{self, Write as _};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{error, info, warn};
use serde_json::Value;

use crate::config::ControllerConfig;
use crate::error::{Error, PublishError};
use crate::topics::{MqttSettings, TopicKind};

use super::adoption::{AdoptionBuilder, NetworkInfo, SchemaContributions, firmware_json};
use super::dispatch::{self, Handlers, JsonHandler};
use super::events::ControllerEvent;
use super::identity::DeviceIdentity;
use super::lifecycle::{DispatchOutcome, report_connection, report_dispatch};
use super::ports::{
    AdoptionSource, Board, DisplayPort, EventSink, HeaderInfo, HostPort, ManagementApiPort,
    MessagingEvent, MessagingPort, NetworkPort, Peripherals, StatusBar, SystemStats,
};
use super::publish::event_line;

/// Capacity of the line buffer behind the `fmt::Write` log mirror.
const LOG_LINE_MAX: usize = 128;

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller<B: Board> {
    config: ControllerConfig,
    logo: Option<&'static [u8]>,

    display: B::Display,
    network: B::Network,
    messaging: B::Messaging,
    api: B::Api,
    host: B::Host,
    reset_pin: B::ResetPin,
    delay: B::Delay,
    sink: B::Sink,

    schemas: SchemaContributions,
    handlers: Handlers,
    identity: Option<DeviceIdentity>,
    log_line: heapless::String<LOG_LINE_MAX>,
}

impl<B: Board> Controller<B> {
    /// Construct the controller. Nothing touches hardware until [`begin`].
    ///
    /// [`begin`]: Self::begin
    pub fn new(
        config: ControllerConfig,
        peripherals: Peripherals<B>,
        logo: Option<&'static [u8]>,
    ) -> Self {
        let Peripherals {
            display,
            network,
            messaging,
            api,
            host,
            reset_pin,
            delay,
            sink,
        } = peripherals;

        Self {
            config,
            logo,
            display,
            network,
            messaging,
            api,
            host,
            reset_pin,
            delay,
            sink,
            schemas: SchemaContributions::default(),
            handlers: Handlers::default(),
            identity: None,
            log_line: heapless::String::new(),
        }
    }

    // ── Bring-up ──────────────────────────────────────────────

    /// One-shot ordered initialisation.
    ///
    /// Display → identity → Ethernet → MQTT defaults → REST API. MQTT must be
    /// configured before the API starts because the API loads persisted
    /// MQTT settings that override the derived client id.
    ///
    /// An invalid configuration fails before any hardware is touched. A
    /// failed DHCP lease is not fatal: the device comes up with `0.0.0.0`
    /// and connectivity is picked up later by the servicing cycle.
    pub fn begin(
        &mut self,
        config_handler: Option<JsonHandler>,
        command_handler: Option<JsonHandler>,
    ) -> Result<&DeviceIdentity, Error> {
        self.config.validate()?;
        info!("firmware {}", firmware_json(&self.config.firmware));
        self.emit(ControllerEvent::Started(self.config.firmware.clone()));

        self.handlers = Handlers::new(config_handler, command_handler);

        self.initialise_display();
        let identity = DeviceIdentity::derive(self.host.base_mac(), self.config.mac_offset);
        self.initialise_network(&identity)?;
        self.initialise_messaging(&identity);
        self.initialise_api(&identity);

        Ok(self.identity.insert(identity))
    }

    fn initialise_display(&mut self) {
        self.display.begin();

        let fw = &self.config.firmware;
        let header = HeaderInfo {
            name: &fw.short_name,
            maker: &fw.maker,
            version: &fw.version,
            platform: &self.config.platform,
            logo: self.logo,
        };
        let status = self.display.draw_header(&header);
        self.emit(ControllerEvent::HeaderDrawn(status));
    }

    fn initialise_network(&mut self, identity: &DeviceIdentity) -> Result<(), Error> {
        self.emit(ControllerEvent::MacDerived(identity.mac));

        self.network.init(&identity.mac);
        self.reset_ethernet()?;

        let timing = self.config.network;
        let lease = self.network.request_lease(
            &identity.mac,
            timing.lease_timeout_ms,
            timing.lease_response_timeout_ms,
        );
        match lease {
            Some(ip) => self.emit(ControllerEvent::LeaseAcquired(ip)),
            None => self.emit(ControllerEvent::LeaseFailed),
        }
        Ok(())
    }

    /// Pulse the Ethernet controller's reset line: high, low, high, holding
    /// each level for the configured time.
    fn reset_ethernet(&mut self) -> Result<(), Error> {
        let timing = self.config.network;
        self.set_reset_line(true)?;
        self.delay.delay_ms(timing.reset_assert_ms);
        self.set_reset_line(false)?;
        self.delay.delay_ms(timing.reset_release_ms);
        self.set_reset_line(true)?;
        self.delay.delay_ms(timing.reset_settle_ms);
        Ok(())
    }

    fn set_reset_line(&mut self, high: bool) -> Result<(), Error> {
        let result = if high {
            self.reset_pin.set_high()
        } else {
            self.reset_pin.set_low()
        };
        result.map_err(|e| {
            error!(
                "ethernet reset line: {:?}",
                embedded_hal::digital::Error::kind(&e)
            );
            Error::Init("ethernet reset line")
        })
    }

    fn initialise_messaging(&mut self, identity: &DeviceIdentity) {
        // Default only; persisted settings applied by the API win.
        self.messaging.settings_mut().client_id = identity.client_id.as_str().into();
        info!("mqtt default client id: {}", identity.client_id);
    }

    fn initialise_api(&mut self, identity: &DeviceIdentity) {
        self.api.begin(self.messaging.settings_mut());
        if self.messaging.settings().client_id != identity.client_id.as_str() {
            info!(
                "mqtt client id overridden by stored settings: {}",
                self.messaging.settings().client_id
            );
        }

        let port = self.config.api_port;
        self.api.listen(port);
        self.emit(ControllerEvent::ApiListening(port));
    }

    // ── Servicing cycle ───────────────────────────────────────

    /// One iteration of the firmware loop.
    ///
    /// The link is observed once; every gated step uses that observation.
    /// The display is serviced regardless.
    pub fn service(&mut self) {
        let link_up = self.is_connected();

        if link_up {
            self.network.maintain();

            self.messaging.service();
            while let Some(event) = self.messaging.poll_event() {
                self.handle_messaging_event(event);
            }

            let adoption = AdoptionView {
                config: &self.config,
                host: &self.host,
                network: &self.network,
                identity: self.identity.as_ref(),
                schemas: &self.schemas,
            };
            self.api.service(&adoption);
        }

        let status = StatusBar {
            link_up,
            ip: self.network.local_ip(),
            mqtt_connected: link_up && self.messaging.is_connected(),
        };
        self.display.service(&status);
    }

    /// Connectivity gate: live link status, never cached.
    pub fn is_connected(&self) -> bool {
        self.network.link_up()
    }

    fn handle_messaging_event(&mut self, event: MessagingEvent) {
        match event {
            MessagingEvent::Connected => self.on_mqtt_connected(),
            MessagingEvent::Disconnected(code) => {
                report_connection(code, &mut self.reporter());
            }
            MessagingEvent::Received { topic, payload } => {
                self.receive(&topic, &payload);
            }
        }
    }

    fn on_mqtt_connected(&mut self) {
        for kind in [TopicKind::Config, TopicKind::Command] {
            let topic = self.messaging.settings().topic(kind);
            if let Err(e) = self.messaging.subscribe(&topic) {
                warn!("mqtt subscribe {} failed: {}", topic, e);
            }
        }

        let adoption = self.adoption();
        if let Err(e) = self.publish_to(TopicKind::Adopt, &adoption) {
            warn!("adoption publish failed: {}", e);
        }

        self.emit(ControllerEvent::MessagingConnected);
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Handle one inbound MQTT message.
    ///
    /// A `restart: true` command does not return.
    pub fn receive(&mut self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        self.display.trigger_rx_led();

        let outcome = self.dispatch(topic, payload);
        report_dispatch(outcome, &mut self.reporter());
        outcome
    }

    fn dispatch(&mut self, topic: &str, payload: &[u8]) -> DispatchOutcome {
        let doc = match dispatch::parse_payload(payload) {
            Ok(doc) => doc,
            Err(outcome) => return outcome,
        };

        match self.messaging.settings().classify(topic) {
            Some(TopicKind::Config) => {
                dispatch::apply_config_builtins(&doc, &mut self.display);
                self.handlers.forward_config(&doc)
            }
            Some(TopicKind::Command) => {
                if dispatch::wants_restart(&doc) {
                    info!("restart command received");
                    self.emit(ControllerEvent::Restarting);
                    self.host.restart();
                }
                self.handlers.forward_command(&doc)
            }
            _ => DispatchOutcome::UnknownTopic,
        }
    }

    // ── Outbound ──────────────────────────────────────────────

    /// Publish a status document on the `stat` topic.
    ///
    /// Documents with an `index` are summarised on the display first, even
    /// when the link is down.
    pub fn publish_status(&mut self, doc: &Value) -> Result<(), PublishError> {
        if let Some(line) = event_line(doc) {
            self.display.show_event(&line);
        }
        self.publish_to(TopicKind::Status, doc)
    }

    /// Publish a telemetry document on the `tele` topic.
    pub fn publish_telemetry(&mut self, doc: &Value) -> Result<(), PublishError> {
        self.publish_to(TopicKind::Telemetry, doc)
    }

    fn publish_to(&mut self, kind: TopicKind, doc: &Value) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(doc).map_err(|_| PublishError::Encode)?;
        self.publish_raw(kind, &payload)
    }

    fn publish_raw(&mut self, kind: TopicKind, payload: &[u8]) -> Result<(), PublishError> {
        if !self.is_connected() {
            return Err(PublishError::Offline);
        }
        let topic = self.messaging.settings().topic(kind);
        self.messaging.publish(&topic, payload)?;
        self.display.trigger_tx_led();
        Ok(())
    }

    // ── Schemas & adoption ────────────────────────────────────

    /// Replace the firmware's configuration schema contribution.
    pub fn set_config_schema(&mut self, schema: Value) {
        self.schemas.set_config(schema);
    }

    /// Replace the firmware's command schema contribution.
    pub fn set_command_schema(&mut self, schema: Value) {
        self.schemas.set_command(schema);
    }

    /// Build the full adoption document now.
    pub fn adoption(&self) -> Value {
        AdoptionView {
            config: &self.config,
            host: &self.host,
            network: &self.network,
            identity: self.identity.as_ref(),
            schemas: &self.schemas,
        }
        .adoption()
    }

    // ── Accessors ─────────────────────────────────────────────

    /// `None` until [`begin`](Self::begin) has run.
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    pub fn mqtt_settings(&self) -> &MqttSettings {
        self.messaging.settings()
    }

    pub fn display_mut(&mut self) -> &mut B::Display {
        &mut self.display
    }

    pub fn messaging_mut(&mut self) -> &mut B::Messaging {
        &mut self.messaging
    }

    pub fn api_mut(&mut self) -> &mut B::Api {
        &mut self.api
    }

    // ── Log mirroring ─────────────────────────────────────────

    fn emit(&mut self, event: ControllerEvent) {
        self.reporter().emit(&event);
    }

    fn reporter(&mut self) -> Reporter<'_, B> {
        Reporter {
            sink: &mut self.sink,
            messaging: &mut self.messaging,
            network: &self.network,
        }
    }

    fn flush_log_line(&mut self) {
        if self.log_line.is_empty() {
            return;
        }
        let line = core::mem::take(&mut self.log_line);
        info!("{}", line);
        mirror_line(&mut self.messaging, &self.network, &line);
    }
}

/// Publish one line on the `log` topic while the link and the broker
/// session are up. Lost lines are not reported and the TX indicator is
/// left alone.
fn mirror_line<M: MessagingPort, N: NetworkPort>(messaging: &mut M, network: &N, line: &str) {
    if !network.link_up() || !messaging.is_connected() {
        return;
    }
    let topic = messaging.settings().topic(TopicKind::Log);
    let _ = messaging.publish(&topic, line.as_bytes());
}

/// Event sink seen by the core: forwards to the board's sink and mirrors
/// the event text to the `log` topic.
struct Reporter<'a, B: Board> {
    sink: &'a mut B::Sink,
    messaging: &'a mut B::Messaging,
    network: &'a B::Network,
}

impl<B: Board> EventSink for Reporter<'_, B> {
    fn emit(&mut self, event: &ControllerEvent) {
        self.sink.emit(event);
        if event.is_mirrored() {
            let mut line = heapless::String::<LOG_LINE_MAX>::new();
            let _ = write!(line, "{}", event);
            mirror_line(&mut *self.messaging, self.network, &line);
        }
    }
}

/// Lines written here go to the serial log and, while the broker session is
/// up, to the `log` topic.
impl<B: Board> fmt::Write for Controller<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            match c {
                '\n' => self.flush_log_line(),
                '\r' => {}
                c => {
                    if self.log_line.push(c).is_err() {
                        self.flush_log_line();
                        let _ = self.log_line.push(c);
                    }
                }
            }
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Adoption view
// ───────────────────────────────────────────────────────────────

/// Borrowed snapshot of what an adoption document needs, so the API can
/// query it while the controller's other fields are borrowed mutably.
struct AdoptionView<'a, H, N> {
    config: &'a ControllerConfig,
    host: &'a H,
    network: &'a N,
    identity: Option<&'a DeviceIdentity>,
    schemas: &'a SchemaContributions,
}

impl<H: HostPort, N: NetworkPort> AdoptionSource for AdoptionView<'_, H, N> {
    fn adoption(&self) -> Value {
        let stats: SystemStats = self.host.system_stats();
        let mac = self.identity.map(|id| id.mac).unwrap_or_default();
        AdoptionBuilder {
            firmware: &self.config.firmware,
            stats,
            network: NetworkInfo {
                ip: self.network.local_ip(),
                mac,
            },
            schemas: self.schemas,
        }
        .build()
    }
}
