//! Adoption info: the descriptor a managing system uses to discover this
//! device, its resources, and the configuration/command fields it accepts.
//!
//! Built on demand and never cached; system counters are read live on
//! every build.

use core::net::Ipv4Addr;

use serde_json::{Map, Value, json};

use crate::config::FirmwareIdentity;
use crate::schema::merge;

use super::identity::{MacAddress, mac_display};
use super::ports::SystemStats;

/// JSON-Schema draft advertised in both schemas.
pub const JSON_SCHEMA_VERSION: &str = "https://json-schema.org/draft/2020-12/schema";

/// Network mode tag reported in the `network` section.
pub const NETWORK_MODE: &str = "ethernet";

// Built-in config keys.
pub const ACTIVE_BRIGHTNESS_PERCENT: &str = "activeBrightnessPercent";
pub const INACTIVE_BRIGHTNESS_PERCENT: &str = "inactiveBrightnessPercent";
pub const ACTIVE_DISPLAY_SECONDS: &str = "activeDisplaySeconds";
pub const EVENT_DISPLAY_SECONDS: &str = "eventDisplaySeconds";

// Built-in command keys.
pub const RESTART: &str = "restart";

pub const MAX_BRIGHTNESS_PERCENT: u8 = 100;
pub const MAX_DISPLAY_SECONDS: u16 = 600;

/// Firmware schema contributions, each replaced wholesale on set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaContributions {
    config: Value,
    command: Value,
}

impl SchemaContributions {
    pub fn set_config(&mut self, schema: Value) {
        warn_if_not_object("config", &schema);
        self.config = schema;
    }

    pub fn set_command(&mut self, schema: Value) {
        warn_if_not_object("command", &schema);
        self.command = schema;
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn command(&self) -> &Value {
        &self.command
    }
}

fn warn_if_not_object(kind: &str, schema: &Value) {
    if !schema.is_object() && !schema.is_null() {
        log::warn!("{} schema is not an object, it will not be advertised", kind);
    }
}

/// Network identity reported in the `network` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    pub ip: Ipv4Addr,
    pub mac: MacAddress,
}

/// Everything needed to produce one adoption document.
pub struct AdoptionBuilder<'a> {
    pub firmware: &'a FirmwareIdentity,
    pub stats: SystemStats,
    pub network: NetworkInfo,
    pub schemas: &'a SchemaContributions,
}

impl AdoptionBuilder<'_> {
    pub fn build(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("firmware".into(), firmware_json(self.firmware));
        doc.insert("system".into(), system_json(&self.stats));
        doc.insert("network".into(), network_json(&self.network));
        doc.insert(
            "configSchema".into(),
            config_schema(&self.firmware.short_name, self.schemas.config()),
        );
        doc.insert(
            "commandSchema".into(),
            command_schema(&self.firmware.short_name, self.schemas.command()),
        );
        Value::Object(doc)
    }
}

pub fn firmware_json(firmware: &FirmwareIdentity) -> Value {
    serde_json::to_value(firmware).unwrap_or(Value::Null)
}

pub fn system_json(stats: &SystemStats) -> Value {
    serde_json::to_value(stats).unwrap_or(Value::Null)
}

pub fn network_json(network: &NetworkInfo) -> Value {
    json!({
        "mode": NETWORK_MODE,
        "ip": network.ip.to_string(),
        "mac": mac_display(&network.mac).as_str(),
    })
}

/// Schema envelope with the firmware contribution merged first and the
/// built-in display fields written last, so built-ins always win.
pub fn config_schema(title: &str, contribution: &Value) -> Value {
    let mut properties = contributed_properties(contribution);
    let builtins = json!({
        ACTIVE_BRIGHTNESS_PERCENT: {
            "title": "LCD Active Brightness (%)",
            "description": "Brightness of the LCD when active (defaults to 100%). Must be a number between 0 and 100.",
            "type": "integer",
            "minimum": 0,
            "maximum": MAX_BRIGHTNESS_PERCENT,
        },
        INACTIVE_BRIGHTNESS_PERCENT: {
            "title": "LCD Inactive Brightness (%)",
            "description": "Brightness of the LCD when inactive (defaults to 10%). Must be a number between 0 and 100.",
            "type": "integer",
            "minimum": 0,
            "maximum": MAX_BRIGHTNESS_PERCENT,
        },
        ACTIVE_DISPLAY_SECONDS: {
            "title": "LCD Active Display Timeout (seconds)",
            "description": "How long the LCD remains 'active' after an event is detected (defaults to 10 seconds, setting to 0 disables the timeout). Must be a number between 0 and 600 (i.e. 10 minutes).",
            "type": "integer",
            "minimum": 0,
            "maximum": MAX_DISPLAY_SECONDS,
        },
        EVENT_DISPLAY_SECONDS: {
            "title": "LCD Event Display Timeout (seconds)",
            "description": "How long the last event is displayed on the LCD (defaults to 3 seconds, setting to 0 disables the timeout). Must be a number between 0 and 600 (i.e. 10 minutes).",
            "type": "integer",
            "minimum": 0,
            "maximum": MAX_DISPLAY_SECONDS,
        },
    });
    overwrite_builtins(&mut properties, builtins);
    envelope(title, properties)
}

pub fn command_schema(title: &str, contribution: &Value) -> Value {
    let mut properties = contributed_properties(contribution);
    let builtins = json!({
        RESTART: {
            "title": "Restart",
            "type": "boolean",
        },
    });
    overwrite_builtins(&mut properties, builtins);
    envelope(title, properties)
}

fn contributed_properties(contribution: &Value) -> Map<String, Value> {
    let mut properties = Value::Object(Map::new());
    if contribution.is_object() {
        merge(&mut properties, contribution);
    }
    match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Built-in fields replace any same-named contribution outright rather
/// than merging into it.
fn overwrite_builtins(properties: &mut Map<String, Value>, builtins: Value) {
    if let Value::Object(map) = builtins {
        for (key, value) in map {
            properties.insert(key, value);
        }
    }
}

fn envelope(title: &str, properties: Map<String, Value>) -> Value {
    json!({
        "$schema": JSON_SCHEMA_VERSION,
        "title": title,
        "type": "object",
        "properties": Value::Object(properties),
    })
}
