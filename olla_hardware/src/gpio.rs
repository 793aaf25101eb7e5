//! rppal-backed pin banks for the Raspberry Pi header.
use std::collections::HashMap;

use olla_traits::{DigitalInput, DigitalOutput, PinError};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::debug;

use crate::error::{HwError, Result};

fn open_gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))
}

/// Float-switch inputs with the internal pull-up enabled.
pub struct GpioInputs {
    pins: HashMap<u8, InputPin>,
}

impl GpioInputs {
    pub fn open(pins: &[u8]) -> Result<Self> {
        let gpio = open_gpio()?;
        let mut map = HashMap::with_capacity(pins.len());
        for &p in pins {
            let pin = gpio
                .get(p)
                .map_err(|e| HwError::Gpio(format!("open input pin {p}: {e}")))?
                .into_input_pullup();
            debug!(pin = p, "input opened (pull-up)");
            map.insert(p, pin);
        }
        Ok(Self { pins: map })
    }
}

impl DigitalInput for GpioInputs {
    fn read(&mut self, pin: u8) -> std::result::Result<bool, PinError> {
        let input = self.pins.get(&pin).ok_or(HwError::UnknownPin(pin))?;
        Ok(input.is_high())
    }
}

/// Valve relay and LED outputs, opened driven low.
pub struct GpioOutputs {
    pins: HashMap<u8, OutputPin>,
}

impl GpioOutputs {
    pub fn open(pins: &[u8]) -> Result<Self> {
        let gpio = open_gpio()?;
        let mut map = HashMap::with_capacity(pins.len());
        for &p in pins {
            let mut pin = gpio
                .get(p)
                .map_err(|e| HwError::Gpio(format!("open output pin {p}: {e}")))?
                .into_output_low();
            // Leave the pin low after exit instead of restoring its previous mode.
            pin.set_reset_on_drop(false);
            debug!(pin = p, "output opened (low)");
            map.insert(p, pin);
        }
        Ok(Self { pins: map })
    }
}

impl DigitalOutput for GpioOutputs {
    fn write(&mut self, pin: u8, high: bool) -> std::result::Result<(), PinError> {
        let output = self.pins.get_mut(&pin).ok_or(HwError::UnknownPin(pin))?;
        if high {
            output.set_high();
        } else {
            output.set_low();
        }
        Ok(())
    }
}
