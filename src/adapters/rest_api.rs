//! Management REST API adapter.
//!
//! Implements [`ManagementApiPort`]. Two endpoints:
//!
//! | Method | Path     | Behaviour                                         |
//! |--------|----------|---------------------------------------------------|
//! | GET    | `/adopt` | Current adoption document (JSON)                  |
//! | POST   | `/mqtt`  | Persist MQTT settings; applied on the next boot   |
//!
//! HTTP handlers run on the server's task, so they never touch the
//! controller. They serve a cached adoption body and queue posted settings;
//! [`ManagementApiPort::service`] refreshes the cache and persists the queue
//! from the main loop.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::app::ports::{AdoptionSource, ManagementApiPort};
use crate::topics::MqttSettings;

use super::settings_store::SettingsStore;

#[cfg(target_os = "espidf")]
use esp_idf_svc::http::Method;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
#[cfg(target_os = "espidf")]
use esp_idf_svc::io::{Read, Write};

/// How long a cached adoption body is served before it is rebuilt.
pub const ADOPTION_REFRESH: Duration = Duration::from_secs(1);

/// What the handlers share with the main loop.
#[derive(Default)]
struct Shared {
    adoption: Vec<u8>,
    pending_mqtt: Option<Vec<u8>>,
}

type SharedState = Arc<Mutex<Shared>>;

pub struct RestApiAdapter {
    store: SettingsStore,
    shared: SharedState,
    refreshed_at: Option<Instant>,
    port: Option<u16>,
    adoption_builds: u32,

    #[cfg(target_os = "espidf")]
    server: Option<EspHttpServer<'static>>,
}

impl RestApiAdapter {
    pub fn new(store: SettingsStore) -> Self {
        Self {
            store,
            shared: Arc::new(Mutex::new(Shared::default())),
            refreshed_at: None,
            port: None,
            adoption_builds: 0,
            #[cfg(target_os = "espidf")]
            server: None,
        }
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Adoption documents built since boot.
    pub fn adoption_builds(&self) -> u32 {
        self.adoption_builds
    }

    fn refresh_adoption(&mut self, source: &dyn AdoptionSource, now: Instant) {
        let stale = self
            .refreshed_at
            .is_none_or(|t| now.saturating_duration_since(t) >= ADOPTION_REFRESH);
        if !stale {
            return;
        }
        match serde_json::to_vec(&source.adoption()) {
            Ok(body) => {
                if let Ok(mut shared) = self.shared.lock() {
                    shared.adoption = body;
                }
                self.adoption_builds = self.adoption_builds.wrapping_add(1);
                self.refreshed_at = Some(now);
            }
            Err(e) => warn!("REST: adoption encoding failed: {}", e),
        }
    }

    fn persist_pending(&mut self) {
        let pending = self.shared.lock().ok().and_then(|mut s| s.pending_mqtt.take());
        let Some(body) = pending else {
            return;
        };
        match self.store.save_json(&body) {
            Ok(settings) => info!(
                "REST: mqtt settings stored (client id '{}'), applied on next boot",
                settings.client_id
            ),
            Err(e) => warn!("REST: mqtt settings rejected: {}", e),
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_listen(&mut self, port: u16) {
        let conf = Configuration {
            http_port: port,
            ..Default::default()
        };
        let mut server = match EspHttpServer::new(&conf) {
            Ok(server) => server,
            Err(e) => {
                warn!("REST: server start failed: {}", e);
                return;
            }
        };

        let adopt_state = Arc::clone(&self.shared);
        let adopt = server.fn_handler("/adopt", Method::Get, move |req| {
            let body = adopt_state
                .lock()
                .map(|s| s.adoption.clone())
                .unwrap_or_default();
            let mut resp =
                req.into_response(200, None, &[("Content-Type", "application/json")])?;
            resp.write_all(&body)?;
            Ok::<(), esp_idf_svc::io::EspIOError>(())
        });

        let mqtt_state = Arc::clone(&self.shared);
        let registered = adopt.and_then(|server| {
            server.fn_handler("/mqtt", Method::Post, move |mut req| {
                let mut buf = vec![0u8; super::settings_store::MAX_SETTINGS_BYTES];
                let mut len = 0;
                while len < buf.len() {
                    let n = req.read(&mut buf[len..])?;
                    if n == 0 {
                        break;
                    }
                    len += n;
                }
                buf.truncate(len);
                if let Ok(mut s) = mqtt_state.lock() {
                    s.pending_mqtt = Some(buf);
                }
                req.into_status_response(202)?;
                Ok::<(), esp_idf_svc::io::EspIOError>(())
            })
        })
        .map(|_| ());

        match registered {
            Ok(_) => {
                self.server = Some(server);
                self.port = Some(port);
            }
            Err(e) => warn!("REST: handler registration failed: {}", e),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_listen(&mut self, port: u16) {
        self.port = Some(port);
    }
}

// ── Simulation controls ───────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl RestApiAdapter {
    /// Body a `GET /adopt` would return right now.
    pub fn get_adopt(&self) -> Vec<u8> {
        self.shared
            .lock()
            .map(|s| s.adoption.clone())
            .unwrap_or_default()
    }

    /// Queue a `POST /mqtt` body.
    pub fn post_mqtt(&mut self, body: &[u8]) {
        if let Ok(mut s) = self.shared.lock() {
            s.pending_mqtt = Some(body.to_vec());
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }
}

impl ManagementApiPort for RestApiAdapter {
    fn begin(&mut self, mqtt: &mut MqttSettings) {
        match self.store.load() {
            Some(stored) => {
                let client_id = if stored.client_id.is_empty() {
                    core::mem::take(&mut mqtt.client_id)
                } else {
                    stored.client_id.clone()
                };
                *mqtt = MqttSettings { client_id, ..stored };
                info!("REST: stored mqtt settings applied");
            }
            None => info!("REST: no stored mqtt settings"),
        }
    }

    fn listen(&mut self, port: u16) {
        self.platform_listen(port);
        if self.port == Some(port) {
            info!("REST: listening on port {}", port);
        }
    }

    fn service(&mut self, adoption: &dyn AdoptionSource) {
        if self.port.is_none() {
            return;
        }
        self.refresh_adoption(adoption, Instant::now());
        self.persist_pending();
    }
}
