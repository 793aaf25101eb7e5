//! The watering control loop.
//!
//! One `tick()`:
//! 1. read every sensor and feed its level filter,
//! 2. detect window edges (open: fresh run; close: abort any fill),
//! 3. step the sequencer while inside the window and not yet done today,
//! 4. drive valve outputs from the sequencer phases.
//!
//! Valve levels are derived, not stored: a valve is high exactly while its
//! channel is `Filling` or `ToppingOff` inside the window. Writes only happen
//! on change; a failed write is retried on the next tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use olla_traits::{Clock, DigitalInput, DigitalOutput};

use crate::error::OllaError;
use crate::fault::{Fault, FaultSink};
use crate::hw_error::{sensor_error, valve_error};
use crate::indicator::FaultIndicator;
use crate::level::LevelSensor;
use crate::sequencer::{FillSequencer, LevelReading, StepEvent};
use crate::status::{RunSummary, TickReport};
use crate::wall_clock::{WallClock, hour_of_day};
use crate::window::{TimeWindow, WindowEdge};

/// Hardware handles shared by every sub-step of a tick.
pub struct ControllerContext<I, O> {
    pub inputs: I,
    pub outputs: O,
    // Last level successfully written per valve; `None` forces a write.
    written: Vec<Option<bool>>,
}

impl<I: DigitalInput, O: DigitalOutput> ControllerContext<I, O> {
    pub fn new(inputs: I, outputs: O, valves: usize) -> Self {
        Self {
            inputs,
            outputs,
            written: vec![None; valves],
        }
    }

    pub fn read_sensor(&mut self, channel: usize, pin: u8) -> Result<bool, OllaError> {
        self.inputs
            .read(pin)
            .map_err(|e| sensor_error(channel, &*e))
    }

    /// Drive a valve to `open` unless it is already known to be there.
    /// Returns whether a write happened.
    pub fn drive_valve(&mut self, channel: usize, pin: u8, open: bool) -> Result<bool, OllaError> {
        if self.written.get(channel).copied().flatten() == Some(open) {
            return Ok(false);
        }
        self.write_valve(channel, pin, open).map(|()| true)
    }

    /// Write unconditionally.
    pub fn write_valve(&mut self, channel: usize, pin: u8, open: bool) -> Result<(), OllaError> {
        let res = self.outputs.write(pin, open);
        let slot = self.written.get_mut(channel);
        match res {
            Ok(()) => {
                if let Some(s) = slot {
                    *s = Some(open);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(s) = slot {
                    *s = None;
                }
                Err(valve_error(channel, &*e))
            }
        }
    }

    /// Commanded level per valve as last written (`false` when unknown).
    pub fn valve_levels(&self) -> Vec<bool> {
        self.written.iter().map(|w| w.unwrap_or(false)).collect()
    }
}

/// One reservoir: its pins and its level filter.
#[derive(Debug, Clone)]
pub struct Channel {
    pub index: usize,
    pub sensor_pin: u8,
    pub valve_pin: u8,
    pub sensor: LevelSensor,
    read_failing: bool,
}

impl Channel {
    pub fn new(index: usize, sensor_pin: u8, valve_pin: u8, sensor: LevelSensor) -> Self {
        Self {
            index,
            sensor_pin,
            valve_pin,
            sensor,
            read_failing: false,
        }
    }
}

/// Once the run completes inside a window, nothing more happens until the
/// window has been left and re-entered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WindowLatch {
    pub completed_today: bool,
}

pub(crate) struct Parts<I, O> {
    pub ctx: ControllerContext<I, O>,
    pub channels: Vec<Channel>,
    pub sequencer: FillSequencer,
    pub window: TimeWindow,
    pub tick: Duration,
    pub sensor_active_low: bool,
    pub fault_blink: Option<Duration>,
    pub clock: Arc<dyn Clock + Send + Sync>,
    pub epoch: Instant,
    pub wall_clock: Box<dyn WallClock + Send>,
    pub fault_sink: Box<dyn FaultSink + Send>,
    pub indicator: Box<dyn FaultIndicator + Send>,
}

pub struct Controller<I: DigitalInput, O: DigitalOutput> {
    ctx: ControllerContext<I, O>,
    channels: Vec<Channel>,
    sequencer: FillSequencer,
    window: TimeWindow,
    latch: WindowLatch,
    was_in_window: bool,
    tick: Duration,
    sensor_active_low: bool,
    fault_blink: Option<Duration>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    wall_clock: Box<dyn WallClock + Send>,
    fault_sink: Box<dyn FaultSink + Send>,
    indicator: Box<dyn FaultIndicator + Send>,
    last_fault: Option<Fault>,
    faults_reported: u64,
    runs_completed: u64,
    shut_down: bool,
}

impl<I: DigitalInput, O: DigitalOutput> core::fmt::Debug for Controller<I, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("channels", &self.channels.len())
            .field("current_index", &self.sequencer.current_index())
            .field("window", &self.window)
            .field("latch", &self.latch)
            .field("faults_reported", &self.faults_reported)
            .finish_non_exhaustive()
    }
}

impl<I: DigitalInput, O: DigitalOutput> Controller<I, O> {
    pub(crate) fn from_parts(p: Parts<I, O>) -> Self {
        Self {
            ctx: p.ctx,
            channels: p.channels,
            sequencer: p.sequencer,
            window: p.window,
            latch: WindowLatch::default(),
            was_in_window: false,
            tick: p.tick,
            sensor_active_low: p.sensor_active_low,
            fault_blink: p.fault_blink,
            clock: p.clock,
            epoch: p.epoch,
            wall_clock: p.wall_clock,
            fault_sink: p.fault_sink,
            indicator: p.indicator,
            last_fault: None,
            faults_reported: 0,
            runs_completed: 0,
            shut_down: false,
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn sequencer(&self) -> &FillSequencer {
        &self.sequencer
    }

    pub fn latch(&self) -> WindowLatch {
        self.latch
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Window membership as of the last tick.
    pub fn in_window(&self) -> bool {
        self.was_in_window
    }

    pub fn tick_period(&self) -> Duration {
        self.tick
    }

    pub fn faults_reported(&self) -> u64 {
        self.faults_reported
    }

    pub fn last_fault(&self) -> Option<&Fault> {
        self.last_fault.as_ref()
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed
    }

    pub fn valve_levels(&self) -> Vec<bool> {
        self.ctx.valve_levels()
    }

    pub fn context(&self) -> &ControllerContext<I, O> {
        &self.ctx
    }

    /// Time to fill every level buffer once with real samples.
    pub fn warm_up_duration(&self) -> Duration {
        let ms = self
            .channels
            .iter()
            .map(|c| c.sensor.cfg().warm_up_ms())
            .max()
            .unwrap_or(0);
        Duration::from_millis(ms)
    }

    /// Sample sensors without driving any valve until the filters hold real
    /// data. Returns early if `shutdown` is raised.
    pub fn warm_up(&mut self, shutdown: &AtomicBool) -> Duration {
        let target = self.warm_up_duration();
        tracing::info!(secs = target.as_secs_f32(), "warming up level sensors");
        let start = self.clock.now();
        loop {
            let spent = self.clock.now().saturating_duration_since(start);
            if spent >= target {
                tracing::info!("warm-up complete");
                return spent;
            }
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("warm-up interrupted");
                return spent;
            }
            let now_ms = self.clock.ms_since(self.epoch);
            self.sample_sensors(now_ms);
            self.clock.sleep(self.tick);
        }
    }

    /// One control loop iteration.
    pub fn tick(&mut self) -> TickReport {
        // Any tick may open a valve again.
        self.shut_down = false;
        let now_ms = self.clock.ms_since(self.epoch);
        let wall = self.wall_clock.now();
        let hour = hour_of_day(&wall);

        let mut readings = self.sample_sensors(now_ms);

        let in_window = self.window.contains(hour);
        let edge = WindowEdge::between(self.was_in_window, in_window);
        self.was_in_window = in_window;
        match edge {
            Some(WindowEdge::Opened) => self.on_window_opened(now_ms, hour),
            Some(WindowEdge::Closed) => self.on_window_closed(now_ms, hour),
            None => {}
        }

        let mut event = None;
        if in_window && !self.latch.completed_today {
            let reading = match self.sequencer.active() {
                Some(i) if i < readings.len() => readings.swap_remove(i),
                _ => Ok(LevelReading {
                    empty: false,
                    full: false,
                    fresh: false,
                }),
            };
            let ev = self.sequencer.step(now_ms, reading);
            self.log_event(&ev);
            if let StepEvent::Faulted(f) = &ev {
                self.report_fault(wall, f.clone());
            }
            event = Some(ev);
        }

        self.drive_valves(now_ms, wall, in_window);

        if in_window && !self.latch.completed_today && self.sequencer.is_complete() {
            self.latch.completed_today = true;
            self.runs_completed = self.runs_completed.saturating_add(1);
            tracing::info!(runs = self.runs_completed, "watering run complete");
        }

        TickReport {
            now_ms,
            hour_of_day: hour,
            in_window,
            edge,
            event,
            open_valve: if in_window {
                self.sequencer.open_channel()
            } else {
                None
            },
            completed_today: self.latch.completed_today,
        }
    }

    /// Tick at the configured period until `shutdown` is raised or `limit`
    /// elapses, then close every valve.
    pub fn run(&mut self, shutdown: &AtomicBool, limit: Option<Duration>) -> RunSummary {
        self.shut_down = false;
        let started = self.clock.now();
        let mut next = started;
        let mut ticks = 0u64;
        let faults_before = self.faults_reported;
        let runs_before = self.runs_completed;
        tracing::info!(
            channels = self.channels.len(),
            tick_ms = self.tick.as_millis() as u64,
            shift_hours = self.window.shift_hours,
            length_hours = self.window.length_hours,
            "controller running"
        );
        loop {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("shutdown requested");
                break;
            }
            let elapsed = self.clock.now().saturating_duration_since(started);
            if limit.is_some_and(|l| elapsed >= l) {
                tracing::info!(secs = elapsed.as_secs_f32(), "run limit reached");
                break;
            }
            self.tick();
            ticks += 1;

            next += self.tick;
            let now = self.clock.now();
            if next > now {
                self.clock.sleep(next - now);
            } else {
                tracing::trace!("tick overran its period");
                next = now;
            }
        }
        self.shutdown();
        RunSummary {
            ticks,
            runs_completed: self.runs_completed - runs_before,
            faults: self.faults_reported - faults_before,
            elapsed: self.clock.now().saturating_duration_since(started),
        }
    }

    /// Close every valve regardless of what was last written.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.close_all_valves();
        self.shut_down = true;
        tracing::info!("all valves closed");
    }

    fn close_all_valves(&mut self) {
        let now_ms = self.clock.ms_since(self.epoch);
        if let Some(ch) = self.sequencer.interrupt(now_ms) {
            tracing::warn!(channel = ch, "shutting down mid-fill");
        }
        for ch in &self.channels {
            if let Err(e) = self.ctx.write_valve(ch.index, ch.valve_pin, false) {
                tracing::error!(channel = ch.index, error = %e, "failed to close valve on shutdown");
            }
        }
    }

    // ── Sub-steps ────────────────────────────────────────────────────────────

    fn sample_sensors(&mut self, now_ms: u64) -> Vec<Result<LevelReading, OllaError>> {
        let active_low = self.sensor_active_low;
        let mut out = Vec::with_capacity(self.channels.len());
        for ch in &mut self.channels {
            match self.ctx.read_sensor(ch.index, ch.sensor_pin) {
                Ok(level) => {
                    let wet = level != active_low;
                    let fresh = ch.sensor.update(now_ms, if wet { 1.0 } else { 0.0 });
                    if std::mem::take(&mut ch.read_failing) {
                        tracing::info!(channel = ch.index, "sensor read recovered");
                    }
                    out.push(Ok(LevelReading {
                        empty: ch.sensor.is_empty(),
                        full: ch.sensor.is_full(),
                        fresh,
                    }));
                }
                Err(e) => {
                    if !ch.read_failing {
                        tracing::warn!(channel = ch.index, error = %e, "sensor read failed; sample skipped");
                        ch.read_failing = true;
                    }
                    out.push(Err(e));
                }
            }
        }
        out
    }

    fn on_window_opened(&mut self, now_ms: u64, hour: f64) {
        tracing::info!(hour, "watering window opened");
        self.latch.completed_today = false;
        self.sequencer.reset(now_ms);
    }

    fn on_window_closed(&mut self, now_ms: u64, hour: f64) {
        if let Some(ch) = self.sequencer.interrupt(now_ms) {
            tracing::warn!(channel = ch, "window closed mid-fill; valve closed");
        }
        if !self.latch.completed_today {
            tracing::warn!(
                next = self.sequencer.current_index(),
                "window closed before every reservoir was handled"
            );
        }
        for ch in &mut self.channels {
            ch.sensor.reset();
        }
        tracing::info!(hour, "watering window closed");
    }

    fn drive_valves(&mut self, now_ms: u64, wall: NaiveDateTime, in_window: bool) {
        for i in 0..self.channels.len() {
            let pin = self.channels[i].valve_pin;
            let open = in_window && self.sequencer.valve_open(i);
            match self.ctx.drive_valve(i, pin, open) {
                Ok(true) => tracing::debug!(channel = i, pin, open, "valve"),
                Ok(false) => {}
                Err(e) if open => {
                    tracing::error!(channel = i, error = %e, "failed to open valve");
                    if let Some(f) = self.sequencer.fail_active(now_ms, &e) {
                        self.report_fault(wall, f);
                    }
                    if let Err(e) = self.ctx.write_valve(i, pin, false) {
                        tracing::error!(channel = i, error = %e, "failed to close valve; retrying");
                    }
                }
                Err(e) => {
                    tracing::error!(channel = i, error = %e, "failed to close valve; retrying");
                }
            }
        }
    }

    fn report_fault(&mut self, at: NaiveDateTime, fault: Fault) {
        tracing::warn!(
            kind = %fault.kind,
            channel = fault.channel,
            message = %fault.message,
            "fault"
        );
        self.fault_sink.report(at, &fault);
        match self.fault_blink {
            Some(d) => self.indicator.arm_for(d),
            None => self.indicator.arm(false),
        }
        self.faults_reported = self.faults_reported.saturating_add(1);
        self.last_fault = Some(fault);
    }

    fn log_event(&self, ev: &StepEvent) {
        match ev {
            StepEvent::Opened { channel } => {
                tracing::info!(channel, "reservoir empty; filling")
            }
            StepEvent::Skipped { channel, reason } => {
                tracing::info!(channel, ?reason, "reservoir skipped")
            }
            StepEvent::ToppingOff { channel } => {
                tracing::info!(channel, "reservoir full; topping off")
            }
            StepEvent::Closed { channel, open_ms } => {
                tracing::info!(channel, secs = *open_ms as f64 / 1000.0, "reservoir filled")
            }
            StepEvent::Waiting { .. } | StepEvent::Faulted(_) | StepEvent::Complete => {}
        }
    }
}

impl<I: DigitalInput, O: DigitalOutput> Drop for Controller<I, O> {
    fn drop(&mut self) {
        // Unconditional: the pins must read low once the controller is gone.
        self.close_all_valves();
    }
}
