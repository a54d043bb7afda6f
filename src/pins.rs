//! GPIO / peripheral pin assignments for the rack controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// W5500 Ethernet (SPI)
// ---------------------------------------------------------------------------

/// SPI chip select for the W5500.
pub const ETHERNET_CS_GPIO: i32 = 5;
/// W5500 reset line (active LOW), pulsed by the core during bring-up.
pub const WIZNET_RESET_GPIO: i32 = 13;
/// W5500 interrupt output.
pub const ETHERNET_INT_GPIO: i32 = 4;

pub const SPI_SCLK_GPIO: i32 = 18;
pub const SPI_MISO_GPIO: i32 = 19;
pub const SPI_MOSI_GPIO: i32 = 23;

/// SPI clock for the W5500 (datasheet max 80 MHz; 20 MHz is reliable on
/// the board's trace lengths).
pub const ETHERNET_SPI_HZ: u32 = 20_000_000;
