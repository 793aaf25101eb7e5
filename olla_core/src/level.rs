//! Debounced float-switch level detection.
//!
//! Each sensor keeps a fixed-capacity ring of recent samples. Two means over
//! differently sized windows give hysteresis: a short window declares "full"
//! quickly so filling stops promptly, a long window rides out switch bounce
//! before declaring "empty" and committing to a fill.
//!
//! Both means skip the newest sample (a `[-N:-1]` window, N-1 values).
//! The buffer starts zero-filled, so readings are biased toward "empty"
//! until one full capacity of real samples has been taken.

use crate::config::LevelCfg;

#[derive(Debug, Clone)]
pub struct LevelSensor {
    cfg: LevelCfg,
    samples: Vec<f32>,
    // Index of the slot the next sample overwrites (the oldest one).
    head: usize,
    last_sample_ms: u64,
}

impl LevelSensor {
    /// Create a zero-filled sensor. The first sample is accepted one
    /// interval after `now_ms`.
    pub fn new(cfg: LevelCfg, now_ms: u64) -> Self {
        Self {
            samples: vec![0.0; cfg.capacity()],
            cfg,
            head: 0,
            last_sample_ms: now_ms,
        }
    }

    /// Offer a raw reading. Returns `false` without touching state if less
    /// than `interval_ms` has passed since the last accepted sample.
    pub fn update(&mut self, now_ms: u64, raw: f32) -> bool {
        if now_ms.saturating_sub(self.last_sample_ms) < self.cfg.interval_ms {
            return false;
        }
        if self.samples.is_empty() {
            return false;
        }
        let v = if raw.is_nan() { 0.0 } else { raw.clamp(0.0, 1.0) };
        self.samples[self.head] = v;
        self.head = (self.head + 1) % self.samples.len();
        self.last_sample_ms = now_ms;
        tracing::trace!(raw = v, "level sample");
        true
    }

    pub fn is_empty(&self) -> bool {
        self.empty_mean() <= self.cfg.threshold_empty
    }

    pub fn is_full(&self) -> bool {
        self.full_mean() >= self.cfg.threshold_full
    }

    /// Mean used for the "empty" decision.
    pub fn empty_mean(&self) -> f32 {
        self.mean_excluding_newest(self.cfg.samples_empty)
    }

    /// Mean used for the "full" decision.
    pub fn full_mean(&self) -> f32 {
        self.mean_excluding_newest(self.cfg.samples_full)
    }

    /// Zero-fill the history (reads as "empty"). The sampling clock is kept.
    pub fn reset(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
        self.head = 0;
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn last_sample_ms(&self) -> u64 {
        self.last_sample_ms
    }

    pub fn cfg(&self) -> &LevelCfg {
        &self.cfg
    }

    /// Mean of the `window - 1` samples preceding the newest one.
    fn mean_excluding_newest(&self, window: usize) -> f32 {
        let cap = self.samples.len();
        let count = window.min(cap).saturating_sub(1);
        if count == 0 {
            return 0.0;
        }
        let newest = (self.head + cap - 1) % cap;
        let sum: f32 = (1..=count)
            .map(|k| self.samples[(newest + cap - k) % cap])
            .sum();
        sum / count as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LevelCfg {
        LevelCfg {
            interval_ms: 10,
            samples_empty: 5,
            samples_full: 3,
            threshold_empty: 0.1,
            threshold_full: 0.9,
        }
    }

    fn feed(s: &mut LevelSensor, t: &mut u64, values: &[f32]) {
        for &v in values {
            *t += 10;
            assert!(s.update(*t, v));
        }
    }

    #[test]
    fn starts_empty_with_zeroed_history() {
        let s = LevelSensor::new(cfg(), 0);
        assert_eq!(s.capacity(), 5);
        assert!(s.is_empty());
        assert!(!s.is_full());
    }

    #[test]
    fn rejects_samples_inside_interval() {
        let mut s = LevelSensor::new(cfg(), 0);
        assert!(!s.update(9, 1.0));
        assert!(s.update(10, 1.0));
        assert!(!s.update(19, 1.0));
        assert_eq!(s.last_sample_ms(), 10);
    }

    #[test]
    fn newest_sample_is_excluded() {
        let mut s = LevelSensor::new(cfg(), 0);
        let mut t = 0;
        feed(&mut s, &mut t, &[1.0, 1.0, 1.0, 1.0]);
        // Full window covers the two samples before the newest one.
        assert!(s.is_full());
        feed(&mut s, &mut t, &[0.0]);
        assert!(s.is_full(), "a single fresh 0 is not seen yet");
        feed(&mut s, &mut t, &[0.0]);
        assert!((s.full_mean() - 0.5).abs() < 1e-6);
        assert!(!s.is_full());
    }

    #[test]
    fn empty_uses_longer_window() {
        let mut s = LevelSensor::new(cfg(), 0);
        let mut t = 0;
        feed(&mut s, &mut t, &[1.0; 5]);
        feed(&mut s, &mut t, &[0.0, 0.0, 0.0]);
        // Empty window (4 samples before newest) still holds two ones.
        assert!((s.empty_mean() - 0.5).abs() < 1e-6);
        assert!(!s.is_empty());
        feed(&mut s, &mut t, &[0.0, 0.0]);
        assert!(s.is_empty());
    }

    #[test]
    fn clamps_out_of_range_and_nan() {
        let mut s = LevelSensor::new(cfg(), 0);
        let mut t = 0;
        feed(&mut s, &mut t, &[7.0, 7.0, f32::NAN]);
        assert!((s.full_mean() - 1.0).abs() < 1e-6);
        feed(&mut s, &mut t, &[-3.0]);
        assert!((s.full_mean() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn reset_zero_fills() {
        let mut s = LevelSensor::new(cfg(), 0);
        let mut t = 0;
        feed(&mut s, &mut t, &[1.0; 6]);
        assert!(s.is_full());
        s.reset();
        assert!(s.is_empty());
        assert!(!s.is_full());
        assert_eq!(s.last_sample_ms(), t);
    }
}
