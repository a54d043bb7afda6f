//! Device identity derived from the ESP32 factory MAC address.
//!
//! The Ethernet MAC is the base (WiFi station) MAC plus a fixed offset on
//! the last byte; ESP32 reserves base+3 for Ethernet. The default MQTT
//! client id is the last three bytes of that MAC in lowercase hex, so it is
//! stable across reboots and unique per board.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Six lowercase hex digits, e.g. `aabbcc`.
pub type ClientIdString = heapless::String<6>;

/// `AA:BB:CC:DD:EE:FF`.
pub type MacDisplay = heapless::String<17>;

/// Identity computed once per boot during bring-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub base_mac: MacAddress,
    /// MAC programmed into the Ethernet controller.
    pub mac: MacAddress,
    pub client_id: ClientIdString,
}

impl DeviceIdentity {
    pub fn derive(base_mac: MacAddress, offset: u8) -> Self {
        let mac = ethernet_mac(&base_mac, offset);
        Self {
            base_mac,
            mac,
            client_id: client_id(&mac),
        }
    }

    pub fn mac_display(&self) -> MacDisplay {
        mac_display(&self.mac)
    }
}

/// Apply `offset` to the last byte, wrapping like the hardware does.
pub fn ethernet_mac(base: &MacAddress, offset: u8) -> MacAddress {
    let mut mac = *base;
    mac[5] = mac[5].wrapping_add(offset);
    mac
}

pub fn client_id(mac: &MacAddress) -> ClientIdString {
    let mut id = ClientIdString::new();
    let _ = write!(id, "{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}

pub fn mac_display(mac: &MacAddress) -> MacDisplay {
    let mut s = MacDisplay::new();
    let _ = write!(
        s,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    s
}
