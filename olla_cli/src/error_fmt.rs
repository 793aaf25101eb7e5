//! Human-readable error descriptions and structured JSON error formatting.

use olla_core::error::{BuildError, OllaError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingConfig => {
                "What happened: The controller was built without a configuration.\nLikely causes: Internal wiring bug in the CLI.\nHow to fix: Report this with the command line used.".to_string()
            }
            BuildError::NoChannels => {
                "What happened: No reservoirs are configured.\nLikely causes: pins.valves and pins.sensors are empty.\nHow to fix: List one valve pin and one sensor pin per reservoir in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/olla_config.toml for a sample."
            ),
        };
    }

    if let Some(oe) = err.downcast_ref::<OllaError>() {
        return match oe {
            OllaError::Config(msg) => format!(
                "What happened: The configuration could not be loaded ({msg}).\nLikely causes: Syntax error, missing [pins]/[schedule]/[fill] section, list lengths that do not match the number of valves, or out-of-range values.\nHow to fix: Edit the config file and try again; no valve is driven until it loads."
            ),
            OllaError::Sensor { channel, reason } => format!(
                "What happened: Reading the float switch of reservoir {channel} failed ({reason}).\nLikely causes: Wrong sensor pin or loose wiring.\nHow to fix: Check pins.sensors and the switch wiring; run `olla wiring-test`."
            ),
            OllaError::Valve { channel, reason } => format!(
                "What happened: Driving the valve of reservoir {channel} failed ({reason}).\nLikely causes: Wrong valve pin or relay board not powered.\nHow to fix: Check pins.valves and the relay supply; run `olla wiring-test`."
            ),
            OllaError::Hardware(_) | OllaError::HardwareFault(_) => format!(
                "What happened: {oe}.\nLikely causes: GPIO not available or insufficient permissions.\nHow to fix: Run on the target board with access to /dev/gpiomem, or build without the hardware feature to simulate."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<olla_hardware::error::HwError>() {
        return format!(
            "What happened: Failed to initialize hardware pins ({hw}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
        );
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: configuration 2, hardware 3, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    if let Some(oe) = err.downcast_ref::<OllaError>() {
        return match oe {
            OllaError::Config(_) => 2,
            OllaError::Hardware(_)
            | OllaError::HardwareFault(_)
            | OllaError::Sensor { .. }
            | OllaError::Valve { .. } => 3,
            _ => 1,
        };
    }
    if err.downcast_ref::<olla_hardware::error::HwError>().is_some() {
        return 3;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        2 => "ConfigError",
        3 => "HardwareError",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
        "error": format!("{err:#}"),
    })
    .to_string()
}
