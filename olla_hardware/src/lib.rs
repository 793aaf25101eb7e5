pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{GpioInputs, GpioOutputs};

use olla_traits::{DigitalInput, DigitalOutput, PinError};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::error::HwError;

/// One simulated reservoir: its sensor reads high once the paired valve has
/// been open for `fill` in total.
#[derive(Debug, Clone)]
struct SimReservoir {
    sensor_pin: u8,
    valve_pin: u8,
    fill: Duration,
    filled: Duration,
    last_seen: Option<Instant>,
}

impl SimReservoir {
    fn advance(&mut self, valve_open: bool, now: Instant) {
        if let Some(prev) = self.last_seen
            && valve_open
        {
            self.filled = (self.filled + now.saturating_duration_since(prev)).min(self.fill);
        }
        self.last_seen = Some(now);
    }

    fn is_full(&self) -> bool {
        self.filled >= self.fill
    }
}

#[derive(Debug, Default)]
struct SimState {
    inputs: HashMap<u8, bool>,
    outputs: HashMap<u8, bool>,
    reservoirs: Vec<SimReservoir>,
    failing_reads: HashSet<u8>,
    failing_writes: HashSet<u8>,
    writes: u64,
}

/// Simulated board: shared input levels, recorded output levels and an
/// optional reservoir plant that fills while a valve is open.
///
/// Clones share state, so one clone can be handed to the controller as the
/// input bank, another as the output bank, and a third kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct SimBoard {
    state: Arc<Mutex<SimState>>,
}

impl SimBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A poisoned lock only means a test thread panicked; the state is still usable.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Attach a reservoir that reads full once `valve_pin` has been high for `fill`.
    pub fn with_reservoir(self, sensor_pin: u8, valve_pin: u8, fill: Duration) -> Self {
        self.lock().reservoirs.push(SimReservoir {
            sensor_pin,
            valve_pin,
            fill,
            filled: Duration::ZERO,
            last_seen: None,
        });
        self
    }

    /// Mark every simulated reservoir as already full.
    pub fn fill_all(&self) {
        for r in &mut self.lock().reservoirs {
            r.filled = r.fill;
        }
    }

    /// Empty the reservoir wired to `sensor_pin`.
    pub fn drain(&self, sensor_pin: u8) {
        for r in &mut self.lock().reservoirs {
            if r.sensor_pin == sensor_pin {
                r.filled = Duration::ZERO;
            }
        }
    }

    /// Force the level seen on an input pin without a plant attached.
    pub fn set_input(&self, pin: u8, high: bool) {
        self.lock().inputs.insert(pin, high);
    }

    /// Last level written to `pin` (low if never written).
    pub fn output(&self, pin: u8) -> bool {
        self.lock().outputs.get(&pin).copied().unwrap_or(false)
    }

    /// Output pins currently driven high, sorted.
    pub fn outputs_high(&self) -> Vec<u8> {
        let mut pins: Vec<u8> = self
            .lock()
            .outputs
            .iter()
            .filter_map(|(p, high)| high.then_some(*p))
            .collect();
        pins.sort_unstable();
        pins
    }

    /// Number of writes performed so far.
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    /// Make reads of `pin` fail until cleared.
    pub fn fail_reads(&self, pin: u8, failing: bool) {
        let mut s = self.lock();
        if failing {
            s.failing_reads.insert(pin);
        } else {
            s.failing_reads.remove(&pin);
        }
    }

    /// Make writes to `pin` fail until cleared.
    pub fn fail_writes(&self, pin: u8, failing: bool) {
        let mut s = self.lock();
        if failing {
            s.failing_writes.insert(pin);
        } else {
            s.failing_writes.remove(&pin);
        }
    }
}

impl DigitalInput for SimBoard {
    fn read(&mut self, pin: u8) -> Result<bool, PinError> {
        let now = Instant::now();
        let mut guard = self.lock();
        let s = &mut *guard;
        if s.failing_reads.contains(&pin) {
            return Err(Box::new(HwError::ReadFailed(pin)));
        }
        if let Some(r) = s.reservoirs.iter_mut().find(|r| r.sensor_pin == pin) {
            let open = s.outputs.get(&r.valve_pin).copied().unwrap_or(false);
            r.advance(open, now);
            return Ok(r.is_full());
        }
        Ok(s.inputs.get(&pin).copied().unwrap_or(false))
    }
}

impl DigitalOutput for SimBoard {
    fn write(&mut self, pin: u8, high: bool) -> Result<(), PinError> {
        let now = Instant::now();
        let mut guard = self.lock();
        let s = &mut *guard;
        if s.failing_writes.contains(&pin) {
            return Err(Box::new(HwError::WriteFailed(pin)));
        }
        // Account fill time up to this edge before the valve changes state.
        let was_open = s.outputs.get(&pin).copied().unwrap_or(false);
        for r in s.reservoirs.iter_mut().filter(|r| r.valve_pin == pin) {
            r.advance(was_open, now);
        }
        s.outputs.insert(pin, high);
        s.writes = s.writes.saturating_add(1);
        tracing::trace!(pin, high, "sim write");
        Ok(())
    }
}
