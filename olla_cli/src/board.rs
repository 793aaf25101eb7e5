//! Pin banks for the configured backend: GPIO with the `hardware` feature
//! on Linux, a simulated board otherwise.

use eyre::Result;
use olla_traits::{DigitalInput, DigitalOutput};

pub struct Board {
    pub backend: &'static str,
    pub inputs: Box<dyn DigitalInput + Send>,
    pub outputs: Box<dyn DigitalOutput + Send>,
    /// Fault LED output, when `pins.led` is set.
    pub led: Option<(u8, Box<dyn DigitalOutput + Send>)>,
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open(cfg: &olla_config::Config) -> Result<Board> {
    use eyre::WrapErr;
    use olla_hardware::{GpioInputs, GpioOutputs};

    let inputs = GpioInputs::open(&cfg.pins.sensors).wrap_err("open sensor pins")?;
    let outputs = GpioOutputs::open(&cfg.pins.valves).wrap_err("open valve pins")?;
    let led = match cfg.pins.led {
        Some(pin) => {
            let out = GpioOutputs::open(&[pin]).wrap_err("open LED pin")?;
            Some((pin, Box::new(out) as Box<dyn DigitalOutput + Send>))
        }
        None => None,
    };
    Ok(Board {
        backend: "gpio",
        inputs: Box::new(inputs),
        outputs: Box::new(outputs),
        led,
    })
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open(cfg: &olla_config::Config) -> Result<Board> {
    use olla_hardware::SimBoard;
    use std::time::Duration;

    // Simulated fill time per reservoir.
    let fill_ms = std::env::var("OLLA_SIM_FILL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(3_000);
    let board = cfg
        .pins
        .sensors
        .iter()
        .zip(&cfg.pins.valves)
        .fold(SimBoard::new(), |b, (&s, &v)| {
            b.with_reservoir(s, v, Duration::from_millis(fill_ms))
        });
    if std::env::var_os("OLLA_SIM_FULL").is_some() {
        board.fill_all();
    }
    tracing::info!(fill_ms, "using simulated board");
    Ok(Board {
        backend: "sim",
        inputs: Box::new(board.clone()),
        outputs: Box::new(board.clone()),
        led: cfg
            .pins
            .led
            .map(|pin| (pin, Box::new(board) as Box<dyn DigitalOutput + Send>)),
    })
}

/// Best-effort LED pin lookup straight from the TOML text, for when the
/// typed config does not load.
pub fn led_pin_hint(path: &std::path::Path) -> Option<u8> {
    let text = std::fs::read_to_string(path).ok()?;
    let table: toml::Table = text.parse().ok()?;
    let led = table.get("pins")?.get("led")?.as_integer()?;
    u8::try_from(led).ok()
}

/// LED output for the config-error path, without a valid config.
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open_led(pin: u8) -> Option<Box<dyn DigitalOutput + Send>> {
    match olla_hardware::GpioOutputs::open(&[pin]) {
        Ok(out) => Some(Box::new(out)),
        Err(e) => {
            tracing::error!(pin, error = %e, "cannot open fault LED");
            None
        }
    }
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open_led(pin: u8) -> Option<Box<dyn DigitalOutput + Send>> {
    tracing::debug!(pin, "simulated fault LED");
    Some(Box::new(olla_hardware::SimBoard::new()))
}
