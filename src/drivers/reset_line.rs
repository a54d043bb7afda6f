//! Ethernet controller reset line.
//!
//! A plain push-pull GPIO exposed as an `embedded_hal` [`OutputPin`] so the
//! core can pulse it without knowing the chip. Configured as an output,
//! driven high (released), at construction.

use embedded_hal::digital::{Error, ErrorKind, ErrorType, OutputPin};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Raw ESP-IDF error code from a GPIO call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError(pub i32);

impl core::fmt::Display for GpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GPIO call failed (rc={})", self.0)
    }
}

impl Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct ResetLine {
    gpio: i32,
    high: bool,
    /// Simulation: every level written, oldest first.
    #[cfg(not(target_os = "espidf"))]
    history: Vec<bool>,
}

impl ResetLine {
    #[cfg(target_os = "espidf")]
    pub fn new(gpio: i32) -> Result<Self, GpioError> {
        // SAFETY: one-shot pin configuration from the init path.
        unsafe {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << gpio,
                mode: gpio_mode_t_GPIO_MODE_OUTPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
                ..Default::default()
            };
            let ret = gpio_config(&cfg);
            if ret != ESP_OK {
                return Err(GpioError(ret));
            }
        }
        let mut line = Self { gpio, high: false };
        line.set_high()?;
        Ok(line)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(gpio: i32) -> Result<Self, GpioError> {
        log::info!("ResetLine(sim): GPIO {}", gpio);
        Ok(Self {
            gpio,
            high: true,
            history: Vec::new(),
        })
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn history(&self) -> &[bool] {
        &self.history
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        // SAFETY: pin configured as an output in `new`.
        let ret = unsafe { gpio_set_level(self.gpio, u32::from(high)) };
        if ret != ESP_OK {
            return Err(GpioError(ret));
        }
        self.high = high;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, high: bool) -> Result<(), GpioError> {
        self.history.push(high);
        self.high = high;
        Ok(())
    }
}

impl ErrorType for ResetLine {
    type Error = GpioError;
}

impl OutputPin for ResetLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}
