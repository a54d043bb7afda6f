//! Inbound message classification and the built-in handler chains.
//!
//! ```text
//!  payload ──▶ parse ──▶ classify(topic) ──▶ config chain ──▶ firmware handler
//!                                       └──▶ command chain ─▶ firmware handler
//! ```
//!
//! Built-in keys are intercepted for device-level effects, but the firmware
//! handler always sees the complete, unmodified document.

use serde_json::Value;

use super::adoption::{
    ACTIVE_BRIGHTNESS_PERCENT, ACTIVE_DISPLAY_SECONDS, EVENT_DISPLAY_SECONDS,
    INACTIVE_BRIGHTNESS_PERCENT, MAX_BRIGHTNESS_PERCENT, MAX_DISPLAY_SECONDS, RESTART,
};
use super::lifecycle::DispatchOutcome;
use super::ports::DisplayPort;

/// Firmware callback receiving a full inbound document.
pub type JsonHandler = Box<dyn FnMut(&Value)>;

/// Optional firmware handlers registered at bring-up.
#[derive(Default)]
pub struct Handlers {
    pub config: Option<JsonHandler>,
    pub command: Option<JsonHandler>,
}

impl Handlers {
    pub fn new(config: Option<JsonHandler>, command: Option<JsonHandler>) -> Self {
        Self { config, command }
    }

    pub fn forward_config(&mut self, doc: &Value) -> DispatchOutcome {
        match self.config.as_mut() {
            Some(handler) => {
                handler(doc);
                DispatchOutcome::Delivered
            }
            None => DispatchOutcome::NoConfigHandler,
        }
    }

    pub fn forward_command(&mut self, doc: &Value) -> DispatchOutcome {
        match self.command.as_mut() {
            Some(handler) => {
                handler(doc);
                DispatchOutcome::Delivered
            }
            None => DispatchOutcome::NoCommandHandler,
        }
    }
}

/// Decode a raw payload. Empty input is reported separately from
/// malformed JSON.
pub fn parse_payload(payload: &[u8]) -> Result<Value, DispatchOutcome> {
    if payload.is_empty() {
        return Err(DispatchOutcome::EmptyPayload);
    }
    serde_json::from_slice(payload).map_err(|e| {
        log::debug!("payload rejected: {}", e);
        DispatchOutcome::MalformedPayload
    })
}

/// Apply every built-in config key present in `doc` to the display.
/// Returns the number of keys applied.
pub fn apply_config_builtins(doc: &Value, display: &mut impl DisplayPort) -> usize {
    let mut applied = 0;

    if let Some(percent) = percent_field(doc, ACTIVE_BRIGHTNESS_PERCENT) {
        display.set_brightness_on(percent);
        applied += 1;
    }
    if let Some(percent) = percent_field(doc, INACTIVE_BRIGHTNESS_PERCENT) {
        display.set_brightness_dim(percent);
        applied += 1;
    }
    if let Some(seconds) = seconds_field(doc, ACTIVE_DISPLAY_SECONDS) {
        display.set_on_time_display(seconds);
        applied += 1;
    }
    if let Some(seconds) = seconds_field(doc, EVENT_DISPLAY_SECONDS) {
        display.set_on_time_event(seconds);
        applied += 1;
    }

    applied
}

/// Whether a command document asks for an immediate restart.
pub fn wants_restart(doc: &Value) -> bool {
    doc.get(RESTART).and_then(Value::as_bool).unwrap_or(false)
}

fn percent_field(doc: &Value, key: &str) -> Option<u8> {
    integer_field(doc, key, MAX_BRIGHTNESS_PERCENT.into()).map(|v| v as u8)
}

fn seconds_field(doc: &Value, key: &str) -> Option<u16> {
    integer_field(doc, key, MAX_DISPLAY_SECONDS.into()).map(|v| v as u16)
}

/// Integer value at `key`, clamped to `0..=max`. Floats are truncated;
/// anything else is ignored.
fn integer_field(doc: &Value, key: &str, max: i64) -> Option<i64> {
    let value = doc.get(key)?;
    let whole = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64));
    match whole {
        Some(v) => Some(v.clamp(0, max)),
        None => {
            log::warn!("ignoring non-numeric {}: {}", key, value);
            None
        }
    }
}
