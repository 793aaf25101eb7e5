//! `From` implementations bridging `olla_config` types to `olla_core` types.

use std::time::Duration;

use crate::config::{BlinkPattern, ChannelCfg, ControllerCfg, LevelCfg, ScheduleCfg};

// ── LevelCfg ─────────────────────────────────────────────────────────────────

impl From<&olla_config::Sensing> for LevelCfg {
    fn from(c: &olla_config::Sensing) -> Self {
        Self {
            interval_ms: c.interval_ms,
            samples_empty: c.samples_empty,
            samples_full: c.samples_full,
            threshold_empty: c.threshold_empty,
            threshold_full: c.threshold_full,
        }
    }
}

// ── ScheduleCfg ──────────────────────────────────────────────────────────────

impl From<&olla_config::Schedule> for ScheduleCfg {
    fn from(c: &olla_config::Schedule) -> Self {
        Self {
            shift_hours: c.shift_hours,
            length_hours: c.window_length_hours,
        }
    }
}

// ── BlinkPattern ─────────────────────────────────────────────────────────────

impl From<&olla_config::Indicator> for BlinkPattern {
    fn from(c: &olla_config::Indicator) -> Self {
        Self {
            on: Duration::from_millis(c.on_ms),
            off: Duration::from_millis(c.off_ms),
        }
    }
}

// ── ControllerCfg ────────────────────────────────────────────────────────────

/// Channels are zipped by index: `pins.sensors[i]`, `pins.valves[i]`,
/// `fill.*[i]`. Lengths are checked by `olla_config::Config::validate`;
/// any surplus entries are ignored here.
impl From<&olla_config::Config> for ControllerCfg {
    fn from(c: &olla_config::Config) -> Self {
        let channels = c
            .pins
            .sensors
            .iter()
            .zip(&c.pins.valves)
            .zip(c.fill.overfill_time_s.iter().zip(&c.fill.max_fill_time_s))
            .enumerate()
            .map(|(i, ((&sensor_pin, &valve_pin), (&overfill_s, &max_fill_s)))| ChannelCfg {
                sensor_pin,
                valve_pin,
                level: LevelCfg::from(&c.sensing.for_reservoir(i)),
                overfill_ms: overfill_s.saturating_mul(1000),
                max_fill_ms: max_fill_s.saturating_mul(1000),
            })
            .collect();
        Self {
            channels,
            schedule: ScheduleCfg::from(&c.schedule),
            tick_ms: c.controller.tick_ms,
            sensor_active_low: c.pins.sensor_active_low,
            fault_blink: (c.indicator.fault_blink_s > 0)
                .then(|| Duration::from_secs(c.indicator.fault_blink_s)),
        }
    }
}
