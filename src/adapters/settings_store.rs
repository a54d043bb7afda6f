//! Persisted MQTT settings (NVS on the device, in-memory on the host).
//!
//! The management API writes broker settings here; on the next boot they
//! override the MAC-derived defaults. Settings are stored as one JSON blob
//! so the same document the API accepts is what lands in flash.
//!
//! # Notes
//!
//! - Validation happens before persistence; a rejected document never
//!   replaces a good one.
//! - ESP-IDF NVS commits are atomic per `nvs_commit()`.

use log::{info, warn};

use crate::error::ConfigError;
use crate::topics::MqttSettings;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"rackctl\0";
#[cfg(target_os = "espidf")]
const MQTT_KEY: &[u8] = b"mqtt\0";

/// Largest settings document accepted.
pub const MAX_SETTINGS_BYTES: usize = 1024;

pub struct SettingsStore {
    #[cfg(not(target_os = "espidf"))]
    blob: Option<Vec<u8>>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            blob: None,
        }
    }
}

impl SettingsStore {
    /// Initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the partition is erased and
    /// re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from main() before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("SettingsStore: erasing and re-initialising NVS partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::Storage);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::Storage);
            }
            info!("SettingsStore: NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("SettingsStore: simulation backend");

        Ok(Self::default())
    }

    /// Stored settings, or `None` when nothing usable is stored.
    pub fn load(&self) -> Option<MqttSettings> {
        let bytes = self.read_blob()?;
        match serde_json::from_slice(&bytes) {
            Ok(settings) => {
                info!("SettingsStore: loaded mqtt settings ({} bytes)", bytes.len());
                Some(settings)
            }
            Err(e) => {
                warn!("SettingsStore: stored mqtt settings unreadable: {}", e);
                None
            }
        }
    }

    /// Validate and persist a raw settings document.
    pub fn save_json(&mut self, body: &[u8]) -> Result<MqttSettings, ConfigError> {
        if body.len() > MAX_SETTINGS_BYTES {
            return Err(ConfigError::ValidationFailed("mqtt settings too large"));
        }
        let settings: MqttSettings = serde_json::from_slice(body)
            .map_err(|_| ConfigError::ValidationFailed("mqtt settings are not valid JSON"))?;
        self.save(&settings)?;
        Ok(settings)
    }

    pub fn save(&mut self, settings: &MqttSettings) -> Result<(), ConfigError> {
        validate(settings)?;
        let bytes = serde_json::to_vec(settings).map_err(|_| ConfigError::Storage)?;
        self.write_blob(&bytes)?;
        info!("SettingsStore: mqtt settings saved ({} bytes)", bytes.len());
        Ok(())
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Option<Vec<u8>> {
        self.blob.clone()
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        self.blob = Some(bytes.to_vec());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Option<Vec<u8>> {
        let result = with_nvs_handle(false, |handle| {
            let mut size: usize = 0;
            // First call: get size
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    MQTT_KEY.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK || size == 0 || size > MAX_SETTINGS_BYTES {
                return Err(ret);
            }
            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    MQTT_KEY.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        });
        match result {
            Ok(buf) => Some(buf),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => None,
            Err(e) => {
                warn!("SettingsStore: NVS read error {}", e);
                None
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        with_nvs_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    MQTT_KEY.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        })
        .map_err(|e| {
            warn!("SettingsStore: NVS write error {}", e);
            ConfigError::Storage
        })
    }
}

/// Open the settings namespace, run `f` with the handle, then close.
#[cfg(target_os = "espidf")]
fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
where
    F: FnOnce(nvs_handle_t) -> Result<T, i32>,
{
    let mut handle: nvs_handle_t = 0;
    let mode = if write {
        nvs_open_mode_t_NVS_READWRITE
    } else {
        nvs_open_mode_t_NVS_READONLY
    };
    let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
    if ret != ESP_OK {
        return Err(ret);
    }
    let result = f(handle);
    unsafe {
        nvs_close(handle);
    }
    result
}

fn validate(settings: &MqttSettings) -> Result<(), ConfigError> {
    if settings.client_id.len() > 64 {
        return Err(ConfigError::ValidationFailed("clientId must be at most 64 chars"));
    }
    if settings.port == 0 {
        return Err(ConfigError::ValidationFailed("port must be non-zero"));
    }
    let segment_ok = |s: &Option<String>| {
        s.as_deref()
            .is_none_or(|s| !s.contains(['+', '#']) && !s.starts_with('/') && !s.ends_with('/'))
    };
    if !segment_ok(&settings.topic_prefix) || !segment_ok(&settings.topic_suffix) {
        return Err(ConfigError::ValidationFailed(
            "topic prefix/suffix must not contain wildcards or edge slashes",
        ));
    }
    Ok(())
}
