//! MQTT client adapter.
//!
//! Implements [`MessagingPort`]. The ESP-IDF client is callback-driven and
//! runs its own task; its callbacks only push [`MessagingEvent`]s onto a
//! shared queue that the controller drains from its servicing cycle.
//!
//! ```text
//!  esp-mqtt task ──callback──▶ Channel ──poll_event──▶ Controller
//! ```
//!
//! The client is created lazily on the first `service()` call where the
//! settings are connectable, so persisted settings applied during bring-up
//! are the ones used. Reconnection is handled inside the ESP-IDF client; a
//! failed client creation is retried after [`CREATE_RETRY`].
//!
//! On the host the adapter is a loopback broker: subscriptions, publishes
//! and injected messages are recorded for inspection.

use std::sync::Arc;
#[cfg(target_os = "espidf")]
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use log::{info, warn};

use crate::app::ports::{MessagingEvent, MessagingPort};
use crate::error::MessagingError;
use crate::topics::MqttSettings;

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, Ordering};
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EventPayload, MqttClientConfiguration, QoS,
};

/// Largest payload handed to the client.
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// Events buffered between two servicing cycles. Newer events are refused
/// (and logged) once full, so a queued `Connected` is never lost.
const EVENT_QUEUE_DEPTH: usize = 16;

/// Wait before retrying a failed client creation.
#[cfg(target_os = "espidf")]
pub const CREATE_RETRY: Duration = Duration::from_secs(5);

/// State code reported when an established session drops.
#[cfg(target_os = "espidf")]
const CODE_CONNECTION_LOST: i32 = -3;
/// State code reported when a connect attempt fails.
#[cfg(target_os = "espidf")]
const CODE_CONNECT_FAILED: i32 = -2;

/// Client task → servicing cycle.
type EventQueue = Arc<Channel<CriticalSectionRawMutex, MessagingEvent, EVENT_QUEUE_DEPTH>>;

fn push_event(queue: &EventQueue, event: MessagingEvent) {
    if let Err(TrySendError::Full(event)) = queue.try_send(event) {
        warn!("MQTT: event queue full, dropping {:?}", event);
    }
}

fn check_size(topic: &str, payload: &[u8]) -> Result<(), MessagingError> {
    if topic.is_empty() || payload.len() > MAX_PAYLOAD_BYTES {
        return Err(MessagingError::TooLarge);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// MQTT adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter {
    settings: MqttSettings,
    events: EventQueue,

    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    connected: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    retry_at: Option<Instant>,

    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

/// Host loopback state.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimBroker {
    connected: bool,
    /// Refuse connects with this state code.
    refuse_code: Option<i32>,
    subscriptions: Vec<String>,
    published: Vec<(String, Vec<u8>)>,
}

impl Default for MqttAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MqttAdapter {
    pub fn new() -> Self {
        Self {
            settings: MqttSettings::default(),
            events: Arc::new(Channel::new()),
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            connected: Arc::new(AtomicBool::new(false)),
            #[cfg(target_os = "espidf")]
            retry_at: None,
            #[cfg(not(target_os = "espidf"))]
            sim: SimBroker::default(),
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_service(&mut self) {
        if self.client.is_some() || !self.settings.is_connectable() {
            return;
        }
        if self.retry_at.is_some_and(|at| Instant::now() < at) {
            return;
        }

        let broker = self.settings.broker.as_deref().unwrap_or_default();
        let url = format!("mqtt://{}:{}", broker, self.settings.port);
        let conf = MqttClientConfiguration {
            client_id: Some(&self.settings.client_id),
            username: self.settings.username.as_deref(),
            password: self.settings.password.as_deref(),
            ..Default::default()
        };

        let events = Arc::clone(&self.events);
        let connected = Arc::clone(&self.connected);
        let result = EspMqttClient::new_cb(&url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => {
                connected.store(true, Ordering::Release);
                push_event(&events, MessagingEvent::Connected);
            }
            EventPayload::Disconnected => {
                let code = if connected.swap(false, Ordering::AcqRel) {
                    CODE_CONNECTION_LOST
                } else {
                    CODE_CONNECT_FAILED
                };
                push_event(&events, MessagingEvent::Disconnected(code));
            }
            EventPayload::Received {
                topic: Some(topic),
                data,
                details: Details::Complete,
                ..
            } => {
                push_event(
                    &events,
                    MessagingEvent::Received {
                        topic: topic.into(),
                        payload: data.to_vec(),
                    },
                );
            }
            EventPayload::Received { .. } => {
                warn!("MQTT: fragmented message dropped");
            }
            EventPayload::Error(e) => {
                warn!("MQTT: client error {}", e);
                if !connected.load(Ordering::Acquire) {
                    push_event(&events, MessagingEvent::Disconnected(CODE_CONNECT_FAILED));
                }
            }
            _ => {}
        });

        match result {
            Ok(client) => {
                info!("MQTT: client started for {}", url);
                self.client = Some(client);
                self.retry_at = None;
            }
            Err(e) => {
                warn!("MQTT: client creation failed: {}, retrying in {:?}", e, CREATE_RETRY);
                self.retry_at = Some(Instant::now() + CREATE_RETRY);
                push_event(&self.events, MessagingEvent::Disconnected(CODE_CONNECT_FAILED));
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), MessagingError> {
        let client = self.client.as_mut().ok_or(MessagingError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| MessagingError::SendFailed)
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MessagingError> {
        if !self.platform_connected() {
            return Err(MessagingError::NotConnected);
        }
        let client = self.client.as_mut().ok_or(MessagingError::NotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|_| MessagingError::SendFailed)
    }

    #[cfg(target_os = "espidf")]
    fn platform_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_service(&mut self) {
        if self.sim.connected || !self.settings.is_connectable() {
            return;
        }
        match self.sim.refuse_code {
            Some(code) => push_event(&self.events, MessagingEvent::Disconnected(code)),
            None => {
                self.sim.connected = true;
                info!("MQTT(sim): connected as '{}'", self.settings.client_id);
                push_event(&self.events, MessagingEvent::Connected);
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, topic: &str) -> Result<(), MessagingError> {
        if !self.sim.connected {
            return Err(MessagingError::NotConnected);
        }
        if !self.sim.subscriptions.iter().any(|t| t == topic) {
            self.sim.subscriptions.push(topic.into());
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MessagingError> {
        if !self.sim.connected {
            return Err(MessagingError::NotConnected);
        }
        self.sim.published.push((topic.into(), payload.to_vec()));
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connected(&self) -> bool {
        self.sim.connected
    }
}

// ── Simulation controls ───────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    /// Deliver a message as if the broker had sent it. Dropped unless the
    /// topic is subscribed.
    pub fn inject(&mut self, topic: &str, payload: &[u8]) -> bool {
        let subscribed = self.sim.connected && self.sim.subscriptions.iter().any(|t| t == topic);
        if subscribed {
            push_event(
                &self.events,
                MessagingEvent::Received {
                    topic: topic.into(),
                    payload: payload.to_vec(),
                },
            );
        }
        subscribed
    }

    /// Drop the session, reporting `code`.
    pub fn drop_connection(&mut self, code: i32) {
        self.sim.connected = false;
        self.sim.subscriptions.clear();
        push_event(&self.events, MessagingEvent::Disconnected(code));
    }

    /// Refuse future connects with `code`, or accept them with `None`.
    pub fn refuse_connects(&mut self, code: Option<i32>) {
        self.sim.refuse_code = code;
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.sim.subscriptions
    }

    pub fn published(&self) -> &[(String, Vec<u8>)] {
        &self.sim.published
    }
}

impl MessagingPort for MqttAdapter {
    fn settings(&self) -> &MqttSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut MqttSettings {
        &mut self.settings
    }

    fn service(&mut self) {
        self.platform_service();
    }

    fn poll_event(&mut self) -> Option<MessagingEvent> {
        self.events.try_receive().ok()
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), MessagingError> {
        check_size(topic, &[])?;
        self.platform_subscribe(topic)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MessagingError> {
        check_size(topic, payload)?;
        self.platform_publish(topic, payload)
    }

    fn is_connected(&self) -> bool {
        self.platform_connected()
    }
}
