//! Headless LCD adapter.
//!
//! Implements [`DisplayPort`] by tracking what the panel would show (header,
//! latest event, footer, backlight level, activity LEDs) and logging
//! changes. Pixel rendering belongs to a panel driver behind this state.
//!
//! Timing follows the panel's usual behaviour:
//! - an event wakes the backlight to the active level for
//!   `on_time_display` seconds, then it falls back to the inactive level;
//! - the event line is cleared after `on_time_event` seconds;
//! - a timeout of 0 never expires.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::app::publish::EventLine;
use crate::app::ports::{DisplayPort, HeaderInfo, HeaderStatus, StatusBar};

pub const DEFAULT_BRIGHTNESS_ON: u8 = 100;
pub const DEFAULT_BRIGHTNESS_DIM: u8 = 10;
pub const DEFAULT_ON_TIME_DISPLAY_SECS: u16 = 10;
pub const DEFAULT_ON_TIME_EVENT_SECS: u16 = 3;

pub struct LcdAdapter {
    brightness_on: u8,
    brightness_dim: u8,
    on_time_display: u16,
    on_time_event: u16,

    backlight: u8,
    header: Option<String>,
    event: Option<EventLine>,
    footer: Option<StatusBar>,

    active_since: Option<Instant>,
    event_since: Option<Instant>,

    rx_count: u32,
    tx_count: u32,
}

impl Default for LcdAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LcdAdapter {
    pub fn new() -> Self {
        Self {
            brightness_on: DEFAULT_BRIGHTNESS_ON,
            brightness_dim: DEFAULT_BRIGHTNESS_DIM,
            on_time_display: DEFAULT_ON_TIME_DISPLAY_SECS,
            on_time_event: DEFAULT_ON_TIME_EVENT_SECS,
            backlight: 0,
            header: None,
            event: None,
            footer: None,
            active_since: None,
            event_since: None,
            rx_count: 0,
            tx_count: 0,
        }
    }

    pub fn backlight(&self) -> u8 {
        self.backlight
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn footer(&self) -> Option<&StatusBar> {
        self.footer.as_ref()
    }

    /// RX / TX activity LED flashes since boot.
    pub fn activity(&self) -> (u32, u32) {
        (self.rx_count, self.tx_count)
    }

    fn wake(&mut self, now: Instant) {
        self.active_since = Some(now);
        self.backlight = self.brightness_on;
    }

    /// Apply timeouts as of `now`.
    pub fn tick(&mut self, now: Instant) {
        if expired(self.active_since, self.on_time_display, now) {
            self.active_since = None;
            self.backlight = self.brightness_dim;
            debug!("LCD: backlight dimmed to {}%", self.backlight);
        }
        if expired(self.event_since, self.on_time_event, now) {
            self.event_since = None;
            self.event = None;
        }
    }
}

fn expired(since: Option<Instant>, secs: u16, now: Instant) -> bool {
    match since {
        Some(t) if secs > 0 => now.saturating_duration_since(t) >= Duration::from_secs(secs.into()),
        _ => false,
    }
}

impl DisplayPort for LcdAdapter {
    fn begin(&mut self) {
        info!("LCD: init");
        self.wake(Instant::now());
    }

    fn draw_header(&mut self, header: &HeaderInfo<'_>) -> HeaderStatus {
        let text = format!(
            "{} v{} | {} | {}",
            header.name, header.version, header.maker, header.platform
        );
        info!("LCD: header {}", text);
        self.header = Some(text);
        match header.logo {
            Some(logo) if !logo.is_empty() => HeaderStatus::LogoFromEmbedded,
            _ => HeaderStatus::DefaultLogo,
        }
    }

    fn set_brightness_on(&mut self, percent: u8) {
        self.brightness_on = percent.min(100);
        if self.active_since.is_some() {
            self.backlight = self.brightness_on;
        }
    }

    fn set_brightness_dim(&mut self, percent: u8) {
        self.brightness_dim = percent.min(100);
        if self.active_since.is_none() {
            self.backlight = self.brightness_dim;
        }
    }

    fn set_on_time_display(&mut self, seconds: u16) {
        self.on_time_display = seconds;
    }

    fn set_on_time_event(&mut self, seconds: u16) {
        self.on_time_event = seconds;
    }

    fn show_event(&mut self, line: &str) {
        let now = Instant::now();
        let mut event = EventLine::new();
        for c in line.chars() {
            if event.push(c).is_err() {
                break;
            }
        }
        info!("LCD: event {}", event);
        self.event = Some(event);
        self.event_since = Some(now);
        self.wake(now);
    }

    fn trigger_rx_led(&mut self) {
        self.rx_count = self.rx_count.wrapping_add(1);
    }

    fn trigger_tx_led(&mut self) {
        self.tx_count = self.tx_count.wrapping_add(1);
    }

    fn service(&mut self, status: &StatusBar) {
        if self.footer.as_ref() != Some(status) {
            info!(
                "LCD: link={} ip={} mqtt={}",
                if status.link_up { "up" } else { "down" },
                status.ip,
                if status.mqtt_connected { "up" } else { "down" },
            );
            self.footer = Some(*status);
        }
        self.tick(Instant::now());
    }
}
