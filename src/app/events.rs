//! Outbound observability events.
//!
//! The [`Controller`](super::controller::Controller) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them, for example log them to serial. The
//! `Display` text is what reaches the serial log and the `log` topic.

use core::fmt;
use core::net::Ipv4Addr;

use crate::config::FirmwareIdentity;

use super::identity::{MacAddress, mac_display};
use super::lifecycle::{ConnectionOutcome, DispatchOutcome};
use super::ports::HeaderStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Bring-up started with this firmware.
    Started(FirmwareIdentity),

    /// The display header was drawn.
    HeaderDrawn(HeaderStatus),

    /// Ethernet MAC derived from the base MAC.
    MacDerived(MacAddress),

    LeaseAcquired(Ipv4Addr),

    /// No lease; the interface continues with `0.0.0.0`.
    LeaseFailed,

    ApiListening(u16),

    /// Broker session established (adoption published).
    MessagingConnected,

    /// Broker session lost or a connect attempt failed.
    Connection(ConnectionOutcome),

    /// Result of handling one inbound message.
    Dispatch(DispatchOutcome),

    /// A restart command was accepted.
    Restarting,
}

impl ControllerEvent {
    /// Failures and degraded states, logged at `warn`.
    pub fn is_failure(&self) -> bool {
        match self {
            Self::LeaseFailed | Self::Connection(_) | Self::Restarting => true,
            Self::HeaderDrawn(status) => *status == HeaderStatus::NoLogo,
            Self::Dispatch(outcome) => !outcome.is_delivered(),
            _ => false,
        }
    }

    /// Whether the event is worth mirroring to the broker. Successful
    /// deliveries happen on every message and stay on serial.
    pub fn is_mirrored(&self) -> bool {
        !matches!(self, Self::Dispatch(outcome) if outcome.is_delivered())
    }
}

impl fmt::Display for ControllerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started(fw) => write!(f, "{} v{} ({})", fw.name, fw.version, fw.maker),
            Self::HeaderDrawn(status) => f.write_str(match status {
                HeaderStatus::LogoFromFilesystem => "logo loaded from filesystem",
                HeaderStatus::LogoFromEmbedded => "logo loaded from firmware",
                HeaderStatus::DefaultLogo => "no logo found, using default",
                HeaderStatus::NoLogo => "no logo available",
            }),
            Self::MacDerived(mac) => write!(f, "mac address: {}", mac_display(mac)),
            Self::LeaseAcquired(ip) => write!(f, "ip address: {}", ip),
            Self::LeaseFailed => write!(f, "ip address: {} (no dhcp lease)", Ipv4Addr::UNSPECIFIED),
            Self::ApiListening(port) => write!(f, "rest api listening on port {}", port),
            Self::MessagingConnected => f.write_str("mqtt connected"),
            Self::Connection(outcome) => write!(f, "[{}] {}", outcome.code(), outcome.describe()),
            Self::Dispatch(outcome) if outcome.is_delivered() => f.write_str(outcome.describe()),
            Self::Dispatch(outcome) => write!(f, "[{}] {}", outcome.code(), outcome.describe()),
            Self::Restarting => f.write_str("restarting"),
        }
    }
}
