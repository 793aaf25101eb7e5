//! Type-state builder for `Controller`.
//!
//! Inputs and outputs are type parameters that start as `Missing`, so
//! `build()` only exists once both hardware banks have been supplied.
//! Configuration is checked at `build()` time.

use std::sync::Arc;

use olla_traits::{Clock, DigitalInput, DigitalOutput, MonotonicClock};

use crate::config::ControllerCfg;
use crate::controller::{Channel, Controller, ControllerContext, Parts};
use crate::error::{BuildError, Result};
use crate::fault::{FaultSink, NullFaultSink};
use crate::indicator::{FaultIndicator, NoIndicator};
use crate::level::LevelSensor;
use crate::sequencer::{ChannelTiming, FillSequencer};
use crate::wall_clock::{SystemWallClock, WallClock};
use crate::window::TimeWindow;

// ── Type-state marker ────────────────────────────────────────────────────────

/// Placeholder for a hardware bank not yet supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct Missing;

pub struct ControllerBuilder<I, O> {
    inputs: I,
    outputs: O,
    cfg: Option<ControllerCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    wall_clock: Option<Box<dyn WallClock + Send>>,
    fault_sink: Option<Box<dyn FaultSink + Send>>,
    indicator: Option<Box<dyn FaultIndicator + Send>>,
}

impl Default for ControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            inputs: Missing,
            outputs: Missing,
            cfg: None,
            clock: None,
            wall_clock: None,
            fault_sink: None,
            indicator: None,
        }
    }
}

impl ControllerBuilder<Missing, Missing> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I, O> ControllerBuilder<I, O> {
    pub fn with_inputs<I2: DigitalInput>(self, inputs: I2) -> ControllerBuilder<I2, O> {
        ControllerBuilder {
            inputs,
            outputs: self.outputs,
            cfg: self.cfg,
            clock: self.clock,
            wall_clock: self.wall_clock,
            fault_sink: self.fault_sink,
            indicator: self.indicator,
        }
    }

    pub fn with_outputs<O2: DigitalOutput>(self, outputs: O2) -> ControllerBuilder<I, O2> {
        ControllerBuilder {
            inputs: self.inputs,
            outputs,
            cfg: self.cfg,
            clock: self.clock,
            wall_clock: self.wall_clock,
            fault_sink: self.fault_sink,
            indicator: self.indicator,
        }
    }

    pub fn with_config(mut self, cfg: ControllerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Monotonic clock for sampling and timers. Defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Time-of-day source. Defaults to host local time.
    pub fn with_wall_clock(mut self, wall_clock: impl WallClock + Send + 'static) -> Self {
        self.wall_clock = Some(Box::new(wall_clock));
        self
    }

    /// Defaults to discarding records (faults are still traced).
    pub fn with_fault_sink(mut self, sink: impl FaultSink + Send + 'static) -> Self {
        self.fault_sink = Some(Box::new(sink));
        self
    }

    /// Defaults to no LED.
    pub fn with_indicator(mut self, indicator: impl FaultIndicator + Send + 'static) -> Self {
        self.indicator = Some(Box::new(indicator));
        self
    }
}

impl<I: DigitalInput, O: DigitalOutput> ControllerBuilder<I, O> {
    pub fn build(self) -> Result<Controller<I, O>> {
        let cfg = self.cfg.ok_or(BuildError::MissingConfig)?;
        validate(&cfg)?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let epoch = clock.now();

        let channels: Vec<Channel> = cfg
            .channels
            .iter()
            .enumerate()
            .map(|(i, c)| Channel::new(i, c.sensor_pin, c.valve_pin, LevelSensor::new(c.level, 0)))
            .collect();
        let timings = cfg
            .channels
            .iter()
            .map(|c| ChannelTiming {
                overfill_ms: c.overfill_ms,
                max_fill_ms: c.max_fill_ms,
            })
            .collect();

        Ok(Controller::from_parts(Parts {
            ctx: ControllerContext::new(self.inputs, self.outputs, channels.len()),
            channels,
            sequencer: FillSequencer::new(timings, 0),
            window: TimeWindow::from(cfg.schedule),
            tick: std::time::Duration::from_millis(cfg.tick_ms),
            sensor_active_low: cfg.sensor_active_low,
            fault_blink: cfg.fault_blink,
            clock,
            epoch,
            wall_clock: self
                .wall_clock
                .unwrap_or_else(|| Box::new(SystemWallClock)),
            fault_sink: self.fault_sink.unwrap_or_else(|| Box::new(NullFaultSink)),
            indicator: self.indicator.unwrap_or_else(|| Box::new(NoIndicator)),
        }))
    }
}

// ── Validation ───────────────────────────────────────────────────────────────

fn validate(cfg: &ControllerCfg) -> std::result::Result<(), BuildError> {
    if cfg.channels.is_empty() {
        return Err(BuildError::NoChannels);
    }
    if cfg.tick_ms == 0 {
        return Err(BuildError::InvalidConfig("tick_ms must be >= 1"));
    }
    let s = cfg.schedule;
    if !s.shift_hours.is_finite() || !s.length_hours.is_finite() {
        return Err(BuildError::InvalidConfig("schedule hours must be finite"));
    }
    let mut pins = std::collections::HashSet::new();
    for c in &cfg.channels {
        if !pins.insert(c.sensor_pin) || !pins.insert(c.valve_pin) {
            return Err(BuildError::InvalidConfig("pins must be distinct"));
        }
        let l = &c.level;
        if l.interval_ms == 0 {
            return Err(BuildError::InvalidConfig("interval_ms must be >= 1"));
        }
        if l.samples_empty < 2 || l.samples_full < 2 {
            return Err(BuildError::InvalidConfig("sample windows must be >= 2"));
        }
        if !(0.0..=1.0).contains(&l.threshold_empty) || !(0.0..=1.0).contains(&l.threshold_full) {
            return Err(BuildError::InvalidConfig("thresholds must be in [0, 1]"));
        }
        if l.threshold_empty >= l.threshold_full {
            return Err(BuildError::InvalidConfig(
                "threshold_empty must be < threshold_full",
            ));
        }
        if c.max_fill_ms == 0 {
            return Err(BuildError::InvalidConfig("max_fill_ms must be >= 1"));
        }
    }
    Ok(())
}
