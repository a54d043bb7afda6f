//! Fuzz target: inbound payload decoding and the config built-ins.
//!
//! Arbitrary bytes must either be rejected with an outcome or decode to a
//! document whose built-in fields land on the display clamped to range.
//!
//! cargo fuzz run fuzz_dispatch_payload

#![no_main]

use libfuzzer_sys::fuzz_target;
use rackctl::app::adoption::{MAX_BRIGHTNESS_PERCENT, MAX_DISPLAY_SECONDS};
use rackctl::app::dispatch::{apply_config_builtins, parse_payload, wants_restart};
use rackctl::app::lifecycle::DispatchOutcome;
use rackctl::app::ports::{DisplayPort, HeaderInfo, HeaderStatus, StatusBar};

#[derive(Default)]
struct Bounds {
    applied: usize,
}

impl DisplayPort for Bounds {
    fn begin(&mut self) {}
    fn draw_header(&mut self, _header: &HeaderInfo<'_>) -> HeaderStatus {
        HeaderStatus::DefaultLogo
    }
    fn set_brightness_on(&mut self, percent: u8) {
        assert!(percent <= MAX_BRIGHTNESS_PERCENT);
        self.applied += 1;
    }
    fn set_brightness_dim(&mut self, percent: u8) {
        assert!(percent <= MAX_BRIGHTNESS_PERCENT);
        self.applied += 1;
    }
    fn set_on_time_display(&mut self, seconds: u16) {
        assert!(seconds <= MAX_DISPLAY_SECONDS);
        self.applied += 1;
    }
    fn set_on_time_event(&mut self, seconds: u16) {
        assert!(seconds <= MAX_DISPLAY_SECONDS);
        self.applied += 1;
    }
    fn show_event(&mut self, _line: &str) {}
    fn trigger_rx_led(&mut self) {}
    fn trigger_tx_led(&mut self) {}
    fn service(&mut self, _status: &StatusBar) {}
}

fuzz_target!(|data: &[u8]| {
    match parse_payload(data) {
        Ok(doc) => {
            let mut display = Bounds::default();
            let applied = apply_config_builtins(&doc, &mut display);
            assert_eq!(applied, display.applied);
            assert!(applied <= 4);
            let _ = wants_restart(&doc);
        }
        Err(DispatchOutcome::EmptyPayload) => assert!(data.is_empty()),
        Err(outcome) => assert_eq!(outcome, DispatchOutcome::MalformedPayload),
    }
});
