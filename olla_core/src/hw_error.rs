//! Maps `Box<dyn Error>` from trait boundaries to typed `OllaError`.
//!
//! The traits in `olla_traits` use `Box<dyn Error + Send + Sync>` so any pin
//! backend fits; this module converts those to our typed error enum, with an
//! optional feature-gated path for `olla_hardware::HwError` downcasting.

use crate::error::OllaError;

/// Map a trait-boundary error to a typed `OllaError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> OllaError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<olla_hardware::error::HwError>() {
            return match hw {
                olla_hardware::error::HwError::UnknownPin(pin) => {
                    OllaError::Config(format!("pin {pin} was not opened"))
                }
                olla_hardware::error::HwError::Gpio(msg) => OllaError::HardwareFault(msg.clone()),
                other => OllaError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("permission") {
        OllaError::HardwareFault(s)
    } else {
        OllaError::Hardware(s)
    }
}

/// Sensor-read failure on `channel`, with the cause mapped through `map_hw_error`.
pub fn sensor_error(channel: usize, e: &(dyn std::error::Error + 'static)) -> OllaError {
    OllaError::Sensor {
        channel,
        reason: map_hw_error(e).to_string(),
    }
}

/// Valve-write failure on `channel`, with the cause mapped through `map_hw_error`.
pub fn valve_error(channel: usize, e: &(dyn std::error::Error + 'static)) -> OllaError {
    OllaError::Valve {
        channel,
        reason: map_hw_error(e).to_string(),
    }
}
