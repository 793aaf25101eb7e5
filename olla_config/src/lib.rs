#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the olla irrigation controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - Per-reservoir lists (`pins.valves`, `pins.sensors`, `fill.*`) are
//!   indexed by reservoir; their order is the fill sequence.
use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Pins {
    /// Valve relay outputs, one per reservoir, in sequence order.
    pub valves: Vec<u8>,
    /// Float-switch inputs, one per reservoir, same order as `valves`.
    pub sensors: Vec<u8>,
    /// Optional fault LED output.
    #[serde(default)]
    pub led: Option<u8>,
    /// Invert the raw sensor level (switch closes to ground when full).
    #[serde(default)]
    pub sensor_active_low: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Sensing {
    /// Minimum spacing between accepted samples (ms).
    pub interval_ms: u64,
    /// Window length (samples) for the "empty" mean.
    pub samples_empty: usize,
    /// Window length (samples) for the "full" mean.
    pub samples_full: usize,
    /// Empty when the mean is at or below this value.
    pub threshold_empty: f32,
    /// Full when the mean is at or above this value.
    pub threshold_full: f32,
    /// `[[sensing.reservoir]]` tables replacing window sizes or thresholds
    /// for one reservoir. The sampling interval is shared.
    #[serde(rename = "reservoir")]
    pub overrides: Vec<SensingOverride>,
}

impl Default for Sensing {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            samples_empty: 200,
            samples_full: 20,
            threshold_empty: 0.1,
            threshold_full: 0.9,
            overrides: Vec::new(),
        }
    }
}

impl Sensing {
    /// Effective settings for reservoir `index`, with its override applied.
    pub fn for_reservoir(&self, index: usize) -> Self {
        let mut s = Self {
            overrides: Vec::new(),
            ..self.clone()
        };
        if let Some(o) = self.overrides.iter().find(|o| o.index == index) {
            s.samples_empty = o.samples_empty.unwrap_or(s.samples_empty);
            s.samples_full = o.samples_full.unwrap_or(s.samples_full);
            s.threshold_empty = o.threshold_empty.unwrap_or(s.threshold_empty);
            s.threshold_full = o.threshold_full.unwrap_or(s.threshold_full);
        }
        s
    }

    fn validate(&self, scope: &str) -> eyre::Result<()> {
        // The newest sample is excluded from each mean, so one sample leaves nothing to average.
        if self.samples_empty < 2 {
            eyre::bail!("{scope}.samples_empty must be >= 2");
        }
        if self.samples_full < 2 {
            eyre::bail!("{scope}.samples_full must be >= 2");
        }
        if !(0.0..=1.0).contains(&self.threshold_empty) {
            eyre::bail!("{scope}.threshold_empty must be in [0.0, 1.0]");
        }
        if !(0.0..=1.0).contains(&self.threshold_full) {
            eyre::bail!("{scope}.threshold_full must be in [0.0, 1.0]");
        }
        if self.threshold_empty >= self.threshold_full {
            eyre::bail!("{scope}.threshold_empty must be < {scope}.threshold_full");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensingOverride {
    /// Reservoir position in `pins.valves`.
    pub index: usize,
    pub samples_empty: Option<usize>,
    pub samples_full: Option<usize>,
    pub threshold_empty: Option<f32>,
    pub threshold_full: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct Schedule {
    /// Window opening hour (0.0..24.0, fractional hours allowed).
    pub shift_hours: f64,
    /// Window length in hours; 0 disables watering.
    pub window_length_hours: f64,
}

#[derive(Debug, Deserialize)]
pub struct Fill {
    /// Extra fill time after "full" is first seen, per reservoir (s).
    pub overfill_time_s: Vec<u64>,
    /// Hard cap on the time spent filling, per reservoir (s).
    pub max_fill_time_s: Vec<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerCfg {
    /// Control loop period (ms).
    pub tick_ms: u64,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self { tick_ms: 10 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ClockCfg {
    /// Wall-clock time to assume at startup, e.g. "2025-05-01T00:00:00".
    /// When absent the system local time is used.
    pub start_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Indicator {
    /// How long a runtime fault keeps the LED blinking (s); 0 = until restart.
    pub fault_blink_s: u64,
    pub on_ms: u64,
    pub off_ms: u64,
}

impl Default for Indicator {
    fn default() -> Self {
        Self {
            fault_blink_s: 30,
            on_ms: 100,
            off_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    /// Append-only fault log, one `[YYYY/MM/DD HH:MM:SS] message` line per fault.
    pub fault_log: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            file: None,
            level: None,
            rotation: None,
            fault_log: "olla_faults.log".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub sensing: Sensing,
    pub schedule: Schedule,
    pub fill: Fill,
    #[serde(default)]
    pub controller: ControllerCfg,
    #[serde(default)]
    pub clock: ClockCfg,
    #[serde(default)]
    pub indicator: Indicator,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {e}", path.display()))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

impl Config {
    /// Number of reservoirs, taken from the valve list.
    pub fn reservoir_count(&self) -> usize {
        self.pins.valves.len()
    }

    pub fn validate(&self) -> eyre::Result<()> {
        let n = self.reservoir_count();

        // Pins
        if n == 0 {
            eyre::bail!("pins.valves must list at least one reservoir");
        }
        if self.pins.sensors.len() != n {
            eyre::bail!(
                "pins.sensors has {} entries, expected {n} (one per valve)",
                self.pins.sensors.len()
            );
        }
        let mut seen = HashSet::new();
        for &p in self
            .pins
            .valves
            .iter()
            .chain(&self.pins.sensors)
            .chain(self.pins.led.iter())
        {
            if !seen.insert(p) {
                eyre::bail!("pin {p} is assigned more than once");
            }
        }

        // Sensing
        let s = &self.sensing;
        if s.interval_ms == 0 {
            eyre::bail!("sensing.interval_ms must be >= 1");
        }
        s.validate("sensing")?;
        let mut overridden = HashSet::new();
        for o in &s.overrides {
            if o.index >= n {
                eyre::bail!(
                    "sensing.reservoir index {} is out of range (only {n} reservoirs)",
                    o.index
                );
            }
            if !overridden.insert(o.index) {
                eyre::bail!("sensing.reservoir index {} is listed more than once", o.index);
            }
            s.for_reservoir(o.index)
                .validate(&format!("sensing.reservoir[{}]", o.index))?;
        }

        // Schedule
        let sch = &self.schedule;
        if !(0.0..24.0).contains(&sch.shift_hours) {
            eyre::bail!("schedule.shift_hours must be in [0, 24)");
        }
        if sch.window_length_hours.is_nan() || sch.window_length_hours < 0.0 {
            eyre::bail!("schedule.window_length_hours must be >= 0");
        }
        if sch.shift_hours + sch.window_length_hours > 24.0 {
            eyre::bail!(
                "schedule window {}h + {}h ends after midnight; windows do not wrap past midnight",
                sch.shift_hours,
                sch.window_length_hours
            );
        }

        // Fill
        if self.fill.overfill_time_s.len() != n {
            eyre::bail!(
                "fill.overfill_time_s has {} entries, expected {n}",
                self.fill.overfill_time_s.len()
            );
        }
        if self.fill.max_fill_time_s.len() != n {
            eyre::bail!(
                "fill.max_fill_time_s has {} entries, expected {n}",
                self.fill.max_fill_time_s.len()
            );
        }
        if let Some(i) = self.fill.max_fill_time_s.iter().position(|&t| t == 0) {
            eyre::bail!("fill.max_fill_time_s[{i}] must be >= 1");
        }

        // Controller
        if self.controller.tick_ms == 0 {
            eyre::bail!("controller.tick_ms must be >= 1");
        }

        // Indicator
        if self.indicator.on_ms == 0 || self.indicator.off_ms == 0 {
            eyre::bail!("indicator.on_ms and indicator.off_ms must be >= 1");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {r:?}");
        }
        if self.logging.fault_log.trim().is_empty() {
            eyre::bail!("logging.fault_log must not be empty");
        }

        Ok(())
    }
}
