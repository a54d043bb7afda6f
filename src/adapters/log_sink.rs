//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured controller events to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production). Failure
//! outcomes are logged at `warn`, everything else at `info`.

use log::{info, warn};

use crate::app::events::ControllerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ControllerEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged since boot.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControllerEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        let tag = tag(event);
        if event.is_failure() {
            warn!("{} | {}", tag, event);
        } else {
            info!("{} | {}", tag, event);
        }
    }
}

fn tag(event: &ControllerEvent) -> &'static str {
    match event {
        ControllerEvent::Started(_)
        | ControllerEvent::HeaderDrawn(_)
        | ControllerEvent::Restarting => "BOOT ",
        ControllerEvent::MacDerived(_)
        | ControllerEvent::LeaseAcquired(_)
        | ControllerEvent::LeaseFailed => "NET  ",
        ControllerEvent::ApiListening(_) => "API  ",
        ControllerEvent::MessagingConnected | ControllerEvent::Connection(_) => "MQTT ",
        ControllerEvent::Dispatch(_) => "RX   ",
    }
}
