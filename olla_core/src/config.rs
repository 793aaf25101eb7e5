//! Configuration types for the controller.
//!
//! These are the runtime configuration structs used by `Controller`.
//! They are separate from the TOML-deserialized config in `olla_config`.

use std::time::Duration;

/// Level filter parameters for one float sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCfg {
    /// Minimum spacing between accepted samples (ms).
    pub interval_ms: u64,
    /// Window length for the "empty" mean (samples).
    pub samples_empty: usize,
    /// Window length for the "full" mean (samples).
    pub samples_full: usize,
    /// Empty when the mean is `<=` this.
    pub threshold_empty: f32,
    /// Full when the mean is `>=` this.
    pub threshold_full: f32,
}

impl Default for LevelCfg {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            samples_empty: 200,
            samples_full: 20,
            threshold_empty: 0.1,
            threshold_full: 0.9,
        }
    }
}

impl LevelCfg {
    /// Ring buffer capacity: the longer of the two windows.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.samples_empty.max(self.samples_full)
    }

    /// Time needed to fill the buffer once with real samples.
    #[inline]
    pub fn warm_up_ms(&self) -> u64 {
        self.interval_ms
            .saturating_mul(u64::try_from(self.capacity()).unwrap_or(u64::MAX))
    }
}

/// One sensor + valve pair and its fill limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelCfg {
    pub sensor_pin: u8,
    pub valve_pin: u8,
    pub level: LevelCfg,
    /// Topping-off time after "full" is first seen (ms).
    pub overfill_ms: u64,
    /// Hard cap on time spent filling (ms).
    pub max_fill_ms: u64,
}

/// Daily watering slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleCfg {
    pub shift_hours: f64,
    pub length_hours: f64,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            shift_hours: 8.0,
            length_hours: 2.0,
        }
    }
}

/// LED blink timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub on: Duration,
    pub off: Duration,
}

impl Default for BlinkPattern {
    fn default() -> Self {
        Self {
            on: Duration::from_millis(100),
            off: Duration::from_millis(2000),
        }
    }
}

/// Everything the control loop needs besides hardware handles.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerCfg {
    /// Channels in sequence order.
    pub channels: Vec<ChannelCfg>,
    pub schedule: ScheduleCfg,
    /// Control loop period (ms).
    pub tick_ms: u64,
    /// Treat a low input level as "water present".
    pub sensor_active_low: bool,
    /// How long a runtime fault keeps the indicator armed; `None` = until restart.
    pub fault_blink: Option<Duration>,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            schedule: ScheduleCfg::default(),
            tick_ms: 10,
            sensor_active_low: false,
            fault_blink: Some(Duration::from_secs(30)),
        }
    }
}

impl ControllerCfg {
    /// Longest warm-up among all channels.
    pub fn warm_up_ms(&self) -> u64 {
        self.channels
            .iter()
            .map(|c| c.level.warm_up_ms())
            .max()
            .unwrap_or(0)
    }
}
