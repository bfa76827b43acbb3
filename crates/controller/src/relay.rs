//! Pump relay output. The `gpio` feature gates the real rppal driver;
//! without it, a mock implementation logs state changes.

use anyhow::Result;
use tracing::info;

#[cfg(feature = "gpio")]
use rppal::gpio::{Gpio, OutputPin as GpioPin};

/// A single binary output in logical terms: `true` means the pump runs.
pub trait OutputPin {
    fn set_active(&mut self, on: bool) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Real GPIO relay (rppal on a Raspberry Pi)
// ---------------------------------------------------------------------------
#[cfg(feature = "gpio")]
pub struct Relay {
    pin: GpioPin,
    active_low: bool, // relay modules usually trigger on LOW
}

#[cfg(feature = "gpio")]
impl Relay {
    pub fn new(gpio_pin: u8, active_low: bool) -> Result<Self> {
        let mut pin = Gpio::new()?.get(gpio_pin)?.into_output();
        // Keep driving the OFF level after the process exits.
        pin.set_reset_on_drop(false);
        let mut relay = Self { pin, active_low };
        relay.set_active(false)?;
        info!(gpio_pin, active_low, "relay initialised");
        Ok(relay)
    }
}

#[cfg(feature = "gpio")]
impl OutputPin for Relay {
    fn set_active(&mut self, on: bool) -> Result<()> {
        if level_for(on, self.active_low) {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        info!("relay set {}", if on { "ON" } else { "OFF" });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock relay (no hardware)
// ---------------------------------------------------------------------------
#[cfg(not(feature = "gpio"))]
pub struct Relay {
    pub(crate) on: bool,
}

#[cfg(not(feature = "gpio"))]
impl Relay {
    pub fn new(gpio_pin: u8, active_low: bool) -> Result<Self> {
        info!(gpio_pin, active_low, "[mock-gpio] relay registered (not wired)");
        Ok(Self { on: false })
    }
}

#[cfg(not(feature = "gpio"))]
impl OutputPin for Relay {
    fn set_active(&mut self, on: bool) -> Result<()> {
        self.on = on;
        info!("[mock-gpio] relay set {}", if on { "ON" } else { "OFF" });
        Ok(())
    }
}

/// Electrical level for a logical state: `true` is HIGH.
pub fn level_for(on: bool, active_low: bool) -> bool {
    on != active_low
}

// ===========================================================================
// Tests
// ===========================================================================
