//! Test and helper mocks for olla_core

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::fault::{Fault, FaultSink};
use crate::indicator::FaultIndicator;

/// Fault sink that keeps every record in memory. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct RecordingFaultSink {
    records: Arc<Mutex<Vec<(NaiveDateTime, Fault)>>>,
}

impl RecordingFaultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(NaiveDateTime, Fault)> {
        self.records
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn faults(&self) -> Vec<Fault> {
        self.records().into_iter().map(|(_, f)| f).collect()
    }
}

impl FaultSink for RecordingFaultSink {
    fn report(&mut self, at: NaiveDateTime, fault: &Fault) {
        if let Ok(mut g) = self.records.lock() {
            g.push((at, fault.clone()));
        }
    }
}

/// Indicator that counts how it was driven. Clones share counters.
/// `arm(true)` does not block.
#[derive(Debug, Clone, Default)]
pub struct RecordingIndicator {
    arms: Arc<AtomicUsize>,
    timed: Arc<Mutex<Vec<Duration>>>,
    disarms: Arc<AtomicUsize>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Untimed arms.
    pub fn arms(&self) -> usize {
        self.arms.load(Ordering::SeqCst)
    }

    /// Periods passed to `arm_for`.
    pub fn timed_arms(&self) -> Vec<Duration> {
        self.timed.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn disarms(&self) -> usize {
        self.disarms.load(Ordering::SeqCst)
    }
}

impl FaultIndicator for RecordingIndicator {
    fn arm(&self, _blocking: bool) {
        self.arms.fetch_add(1, Ordering::SeqCst);
    }

    fn arm_for(&self, d: Duration) {
        if let Ok(mut g) = self.timed.lock() {
            g.push(d);
        }
    }

    fn disarm(&self) {
        self.disarms.fetch_add(1, Ordering::SeqCst);
    }
}
