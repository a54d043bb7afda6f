//! Connection-lifecycle and dispatch outcome taxonomy.
//!
//! Pure classification: numeric status codes from the MQTT client (and from
//! message receive handling) map onto fixed enums, which are then routed to
//! the [`EventSink`]. Retries belong to the messaging client, not here.

use super::events::ControllerEvent;
use super::ports::EventSink;

// ───────────────────────────────────────────────────────────────
// Connection outcomes
// ───────────────────────────────────────────────────────────────

/// Why a broker session ended or failed to start.
///
/// Codes follow the de-facto MQTT client state convention: negative values
/// are transport-level, positive values are CONNACK return codes, and `0`
/// means connected (not an outcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionOutcome {
    Timeout,
    ConnectionLost,
    ConnectFailed,
    Disconnected,
    BadProtocol,
    BadClientId,
    Unavailable,
    BadCredentials,
    Unauthorized,
}

impl ConnectionOutcome {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -4 => Some(Self::Timeout),
            -3 => Some(Self::ConnectionLost),
            -2 => Some(Self::ConnectFailed),
            -1 => Some(Self::Disconnected),
            1 => Some(Self::BadProtocol),
            2 => Some(Self::BadClientId),
            3 => Some(Self::Unavailable),
            4 => Some(Self::BadCredentials),
            5 => Some(Self::Unauthorized),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Timeout => -4,
            Self::ConnectionLost => -3,
            Self::ConnectFailed => -2,
            Self::Disconnected => -1,
            Self::BadProtocol => 1,
            Self::BadClientId => 2,
            Self::Unavailable => 3,
            Self::BadCredentials => 4,
            Self::Unauthorized => 5,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Timeout => "mqtt connection timeout",
            Self::ConnectionLost => "mqtt connection lost",
            Self::ConnectFailed => "mqtt connect failed",
            Self::Disconnected => "mqtt disconnected",
            Self::BadProtocol => "mqtt bad protocol",
            Self::BadClientId => "mqtt bad client id",
            Self::Unavailable => "mqtt unavailable",
            Self::BadCredentials => "mqtt bad credentials",
            Self::Unauthorized => "mqtt unauthorised",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Dispatch outcomes
// ───────────────────────────────────────────────────────────────

/// Result of handling one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handed to the external handler.
    Delivered,
    EmptyPayload,
    MalformedPayload,
    /// Config message with no external handler registered.
    NoConfigHandler,
    /// Command message with no external handler registered.
    NoCommandHandler,
    /// Topic is neither this device's config nor command topic.
    UnknownTopic,
}

impl DispatchOutcome {
    pub fn code(self) -> u8 {
        match self {
            Self::Delivered => 0,
            Self::EmptyPayload => 1,
            Self::MalformedPayload => 2,
            Self::NoConfigHandler => 3,
            Self::NoCommandHandler => 4,
            Self::UnknownTopic => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Delivered),
            1 => Some(Self::EmptyPayload),
            2 => Some(Self::MalformedPayload),
            3 => Some(Self::NoConfigHandler),
            4 => Some(Self::NoCommandHandler),
            5 => Some(Self::UnknownTopic),
            _ => None,
        }
    }

    pub fn is_delivered(self) -> bool {
        self == Self::Delivered
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Delivered => "mqtt payload delivered",
            Self::EmptyPayload => "empty mqtt payload received",
            Self::MalformedPayload => "failed to deserialise mqtt json payload",
            Self::NoConfigHandler => "no mqtt config handler",
            Self::NoCommandHandler => "no mqtt command handler",
            Self::UnknownTopic => "mqtt payload on unknown topic",
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Reporting
// ───────────────────────────────────────────────────────────────

/// Classify a client state code and report it. Returns the outcome, or
/// `None` for codes outside the taxonomy (including `0`, connected).
pub fn report_connection(code: i32, sink: &mut impl EventSink) -> Option<ConnectionOutcome> {
    let outcome = ConnectionOutcome::from_code(code);
    match outcome {
        Some(o) => sink.emit(&ControllerEvent::Connection(o)),
        None => log::debug!("mqtt state code {} not reported", code),
    }
    outcome
}

pub fn report_dispatch(outcome: DispatchOutcome, sink: &mut impl EventSink) {
    sink.emit(&ControllerEvent::Dispatch(outcome));
}
