//! Mock board for integration tests.
//!
//! Every collaborator appends to one shared call trace so tests can assert
//! on cross-collaborator ordering (reset pulse before lease, messaging
//! defaults before the API, ...). Knobs shared through `Rc<Cell<_>>` let a
//! test flip the link or broker state while the controller owns the mocks.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use serde_json::Value;

use rackctl::app::controller::Controller;
use rackctl::app::dispatch::JsonHandler;
use rackctl::app::events::ControllerEvent;
use rackctl::app::identity::MacAddress;
use rackctl::app::ports::{
    AdoptionSource, Board, DisplayPort, EventSink, HeaderInfo, HeaderStatus, HostPort,
    ManagementApiPort, MessagingEvent, MessagingPort, NetworkPort, Peripherals, StatusBar,
    SystemStats,
};
use rackctl::config::ControllerConfig;
use rackctl::error::MessagingError;
use rackctl::topics::MqttSettings;

/// Base MAC of the mock chip. Ethernet MAC is `..:AA:BB:CC`.
pub const BASE_MAC: MacAddress = [0x24, 0x0A, 0xC4, 0xAA, 0xBB, 0xC9];
pub const CLIENT_ID: &str = "aabbcc";
pub const LEASE_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 50);

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    DisplayBegin,
    DrawHeader,
    BrightnessOn(u8),
    BrightnessDim(u8),
    OnTimeDisplay(u16),
    OnTimeEvent(u16),
    ShowEvent(String),
    RxLed,
    TxLed,
    DisplayService(StatusBar),

    NetInit(MacAddress),
    Lease { timeout_ms: u32, response_timeout_ms: u32 },
    Maintain,

    Reset(bool),
    DelayMs(u32),

    MqttService,
    Subscribe(String),
    Publish(String, Vec<u8>),

    ApiBegin,
    ApiListen(u16),
    ApiService,

    Event(ControllerEvent),
}

pub type Trace = Rc<RefCell<Vec<Call>>>;

fn record(trace: &Trace, call: Call) {
    trace.borrow_mut().push(call);
}

// ── Display ───────────────────────────────────────────────────

pub struct MockDisplay {
    trace: Trace,
}

impl DisplayPort for MockDisplay {
    fn begin(&mut self) {
        record(&self.trace, Call::DisplayBegin);
    }

    fn draw_header(&mut self, _header: &HeaderInfo<'_>) -> HeaderStatus {
        record(&self.trace, Call::DrawHeader);
        HeaderStatus::DefaultLogo
    }

    fn set_brightness_on(&mut self, percent: u8) {
        record(&self.trace, Call::BrightnessOn(percent));
    }

    fn set_brightness_dim(&mut self, percent: u8) {
        record(&self.trace, Call::BrightnessDim(percent));
    }

    fn set_on_time_display(&mut self, seconds: u16) {
        record(&self.trace, Call::OnTimeDisplay(seconds));
    }

    fn set_on_time_event(&mut self, seconds: u16) {
        record(&self.trace, Call::OnTimeEvent(seconds));
    }

    fn show_event(&mut self, line: &str) {
        record(&self.trace, Call::ShowEvent(line.into()));
    }

    fn trigger_rx_led(&mut self) {
        record(&self.trace, Call::RxLed);
    }

    fn trigger_tx_led(&mut self) {
        record(&self.trace, Call::TxLed);
    }

    fn service(&mut self, status: &StatusBar) {
        record(&self.trace, Call::DisplayService(*status));
    }
}

// ── Network ───────────────────────────────────────────────────

pub struct MockNetwork {
    trace: Trace,
    link: Rc<Cell<bool>>,
    lease: Rc<Cell<Option<Ipv4Addr>>>,
    ip: Ipv4Addr,
}

impl NetworkPort for MockNetwork {
    fn init(&mut self, mac: &MacAddress) {
        record(&self.trace, Call::NetInit(*mac));
    }

    fn request_lease(
        &mut self,
        _mac: &MacAddress,
        timeout_ms: u32,
        response_timeout_ms: u32,
    ) -> Option<Ipv4Addr> {
        record(
            &self.trace,
            Call::Lease {
                timeout_ms,
                response_timeout_ms,
            },
        );
        let lease = self.lease.get();
        self.ip = lease.unwrap_or(Ipv4Addr::UNSPECIFIED);
        lease
    }

    fn local_ip(&self) -> Ipv4Addr {
        self.ip
    }

    fn link_up(&self) -> bool {
        self.link.get()
    }

    fn maintain(&mut self) {
        record(&self.trace, Call::Maintain);
    }
}

// ── Messaging ─────────────────────────────────────────────────

pub struct MockMessaging {
    trace: Trace,
    settings: MqttSettings,
    inbox: Rc<RefCell<VecDeque<MessagingEvent>>>,
    broker_up: Rc<Cell<bool>>,
}

impl MessagingPort for MockMessaging {
    fn settings(&self) -> &MqttSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut MqttSettings {
        &mut self.settings
    }

    fn service(&mut self) {
        record(&self.trace, Call::MqttService);
    }

    fn poll_event(&mut self) -> Option<MessagingEvent> {
        self.inbox.borrow_mut().pop_front()
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), MessagingError> {
        record(&self.trace, Call::Subscribe(topic.into()));
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MessagingError> {
        if !self.broker_up.get() {
            return Err(MessagingError::NotConnected);
        }
        record(&self.trace, Call::Publish(topic.into(), payload.to_vec()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.broker_up.get()
    }
}

// ── Management API ────────────────────────────────────────────

pub struct MockApi {
    trace: Trace,
    stored_client_id: Rc<RefCell<Option<String>>>,
    adoptions: Rc<RefCell<Vec<Value>>>,
}

impl ManagementApiPort for MockApi {
    fn begin(&mut self, mqtt: &mut MqttSettings) {
        record(&self.trace, Call::ApiBegin);
        if let Some(id) = self.stored_client_id.borrow().as_ref() {
            mqtt.client_id = id.clone();
        }
    }

    fn listen(&mut self, port: u16) {
        record(&self.trace, Call::ApiListen(port));
    }

    fn service(&mut self, adoption: &dyn AdoptionSource) {
        record(&self.trace, Call::ApiService);
        self.adoptions.borrow_mut().push(adoption.adoption());
    }
}

// ── Host ──────────────────────────────────────────────────────

pub struct MockHost;

impl HostPort for MockHost {
    fn base_mac(&self) -> MacAddress {
        BASE_MAC
    }

    fn system_stats(&self) -> SystemStats {
        SystemStats {
            heap_free_bytes: 4096,
            sketch_space_used_bytes: 1_200_000,
            sketch_space_total_bytes: 1_536_000,
            ..SystemStats::default()
        }
    }

    fn restart(&mut self) -> ! {
        panic!("restart");
    }
}

// ── Reset pin / delay / sink ──────────────────────────────────

pub struct MockPin {
    trace: Trace,
    fail: Rc<Cell<bool>>,
}

impl ErrorType for MockPin {
    type Error = ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(ErrorKind::Other);
        }
        record(&self.trace, Call::Reset(false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(ErrorKind::Other);
        }
        record(&self.trace, Call::Reset(true));
        Ok(())
    }
}

pub struct MockDelay {
    trace: Trace,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        record(&self.trace, Call::DelayMs(ns / 1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        record(&self.trace, Call::DelayMs(ms));
    }
}

pub struct MockSink {
    trace: Trace,
}

impl EventSink for MockSink {
    fn emit(&mut self, event: &ControllerEvent) {
        record(&self.trace, Call::Event(event.clone()));
    }
}

// ── Board ─────────────────────────────────────────────────────

pub struct MockBoard;

impl Board for MockBoard {
    type Display = MockDisplay;
    type Network = MockNetwork;
    type Messaging = MockMessaging;
    type Api = MockApi;
    type Host = MockHost;
    type ResetPin = MockPin;
    type Delay = MockDelay;
    type Sink = MockSink;
}

/// Shared knobs and observations for one controller under test.
#[allow(dead_code)]
pub struct Rig {
    pub trace: Trace,
    pub link: Rc<Cell<bool>>,
    pub lease: Rc<Cell<Option<Ipv4Addr>>>,
    pub inbox: Rc<RefCell<VecDeque<MessagingEvent>>>,
    pub broker_up: Rc<Cell<bool>>,
    pub stored_client_id: Rc<RefCell<Option<String>>>,
    pub adoptions: Rc<RefCell<Vec<Value>>>,
    pub pin_fails: Rc<Cell<bool>>,
}

#[allow(dead_code)]
impl Rig {
    /// Link up, lease available, broker down, nothing stored.
    pub fn new() -> Self {
        Self {
            trace: Rc::new(RefCell::new(Vec::new())),
            link: Rc::new(Cell::new(true)),
            lease: Rc::new(Cell::new(Some(LEASE_IP))),
            inbox: Rc::new(RefCell::new(VecDeque::new())),
            broker_up: Rc::new(Cell::new(false)),
            stored_client_id: Rc::new(RefCell::new(None)),
            adoptions: Rc::new(RefCell::new(Vec::new())),
            pin_fails: Rc::new(Cell::new(false)),
        }
    }

    pub fn controller(&self) -> Controller<MockBoard> {
        self.controller_with(ControllerConfig::default())
    }

    pub fn controller_with(&self, config: ControllerConfig) -> Controller<MockBoard> {
        let peripherals = Peripherals::<MockBoard> {
            display: MockDisplay {
                trace: Rc::clone(&self.trace),
            },
            network: MockNetwork {
                trace: Rc::clone(&self.trace),
                link: Rc::clone(&self.link),
                lease: Rc::clone(&self.lease),
                ip: Ipv4Addr::UNSPECIFIED,
            },
            messaging: MockMessaging {
                trace: Rc::clone(&self.trace),
                settings: MqttSettings::default(),
                inbox: Rc::clone(&self.inbox),
                broker_up: Rc::clone(&self.broker_up),
            },
            api: MockApi {
                trace: Rc::clone(&self.trace),
                stored_client_id: Rc::clone(&self.stored_client_id),
                adoptions: Rc::clone(&self.adoptions),
            },
            host: MockHost,
            reset_pin: MockPin {
                trace: Rc::clone(&self.trace),
                fail: Rc::clone(&self.pin_fails),
            },
            delay: MockDelay {
                trace: Rc::clone(&self.trace),
            },
            sink: MockSink {
                trace: Rc::clone(&self.trace),
            },
        };
        Controller::new(config, peripherals, None)
    }

    /// Controller after a successful `begin`, with the trace cleared.
    pub fn started(
        &self,
        config_handler: Option<JsonHandler>,
        command_handler: Option<JsonHandler>,
    ) -> Controller<MockBoard> {
        let mut controller = self.controller();
        controller
            .begin(config_handler, command_handler)
            .expect("bring-up");
        self.clear();
        controller
    }

    pub fn calls(&self) -> Vec<Call> {
        self.trace.borrow().clone()
    }

    pub fn clear(&self) {
        self.trace.borrow_mut().clear();
    }

    pub fn events(&self) -> Vec<ControllerEvent> {
        self.trace
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Event(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.trace
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Publish(t, p) => Some((t.clone(), p.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn push_inbound(&self, event: MessagingEvent) {
        self.inbox.borrow_mut().push_back(event);
    }
}

/// Handler that records every document it receives.
#[allow(dead_code)]
pub fn recording_handler() -> (JsonHandler, Rc<RefCell<Vec<Value>>>) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let handler: JsonHandler = Box::new(move |doc: &Value| sink.borrow_mut().push(doc.clone()));
    (handler, seen)
}
