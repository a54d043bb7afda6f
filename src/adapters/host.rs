//! Chip services: factory MAC, live resource counters, and restart.
//!
//! Implements [`HostPort`]. On ESP32 the base MAC is the WiFi station MAC
//! from eFuse; the Ethernet MAC is derived from it by the core.

use crate::app::identity::MacAddress;
use crate::app::ports::{HostPort, SystemStats};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Simulation base MAC. Deterministic so host runs get a stable client id.
#[cfg(not(target_os = "espidf"))]
pub const SIM_BASE_MAC: MacAddress = [0x24, 0x0A, 0xC4, 0xDE, 0xCA, 0xFB];

#[derive(Debug, Default)]
pub struct EspHost;

impl EspHost {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "espidf")]
impl HostPort for EspHost {
    fn base_mac(&self) -> MacAddress {
        let mut mac: MacAddress = [0u8; 6];
        // SAFETY: `mac` is a valid 6-byte buffer for the duration of the call.
        let ret = unsafe { esp_read_mac(mac.as_mut_ptr(), esp_mac_type_t_ESP_MAC_WIFI_STA) };
        if ret != ESP_OK {
            log::warn!("esp_read_mac failed ({}), using eFuse default", ret);
            unsafe {
                esp_efuse_mac_get_default(mac.as_mut_ptr());
            }
        }
        mac
    }

    fn system_stats(&self) -> SystemStats {
        // SAFETY: read-only queries of allocator and partition state.
        unsafe {
            let heap_total = heap_caps_get_total_size(MALLOC_CAP_DEFAULT) as u32;
            let heap_free = esp_get_free_heap_size();

            let mut flash_size: u32 = 0;
            if esp_flash_get_size(core::ptr::null_mut(), &mut flash_size) != ESP_OK {
                flash_size = 0;
            }

            let running = esp_ota_get_running_partition();
            let (sketch_used, sketch_total) = if running.is_null() {
                (0, 0)
            } else {
                (running_image_len(&*running), (*running).size)
            };

            let (mut fs_total, mut fs_used) = (0usize, 0usize);
            if esp_spiffs_info(core::ptr::null(), &mut fs_total, &mut fs_used) != ESP_OK {
                fs_total = 0;
                fs_used = 0;
            }

            SystemStats {
                heap_used_bytes: heap_total.saturating_sub(heap_free),
                heap_free_bytes: heap_free,
                heap_max_alloc_bytes: heap_caps_get_largest_free_block(MALLOC_CAP_DEFAULT) as u32,
                flash_chip_size_bytes: flash_size,
                sketch_space_used_bytes: sketch_used,
                sketch_space_total_bytes: sketch_total,
                file_system_used_bytes: fs_used as u32,
                file_system_total_bytes: fs_total as u32,
            }
        }
    }

    fn restart(&mut self) -> ! {
        log::warn!("restarting");
        esp_idf_hal::reset::restart()
    }
}

/// Length of the application image in the running partition, or 0 when
/// the image header cannot be read.
#[cfg(target_os = "espidf")]
fn running_image_len(running: &esp_partition_t) -> u32 {
    let pos = esp_partition_pos_t {
        offset: running.address,
        size: running.size,
    };
    // SAFETY: `pos` and `metadata` outlive the call; the metadata struct is
    // plain data that the call fills in.
    unsafe {
        let mut metadata: esp_image_metadata_t = core::mem::zeroed();
        if esp_image_get_metadata(&pos, &mut metadata) == ESP_OK {
            metadata.image_len
        } else {
            log::warn!("image metadata unavailable for running partition");
            0
        }
    }
}

/// Simulation: fixed MAC and counters; restart unwinds the calling thread.
#[cfg(not(target_os = "espidf"))]
impl HostPort for EspHost {
    fn base_mac(&self) -> MacAddress {
        SIM_BASE_MAC
    }

    fn system_stats(&self) -> SystemStats {
        SystemStats {
            heap_used_bytes: 96 * 1024,
            heap_free_bytes: 160 * 1024,
            heap_max_alloc_bytes: 110 * 1024,
            flash_chip_size_bytes: 4 * 1024 * 1024,
            sketch_space_used_bytes: 1024 * 1024,
            sketch_space_total_bytes: 1536 * 1024,
            file_system_used_bytes: 0,
            file_system_total_bytes: 0,
        }
    }

    fn restart(&mut self) -> ! {
        log::warn!("restart (sim)");
        panic!("restart requested");
    }
}
