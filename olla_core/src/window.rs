//! Daily watering window.
//!
//! A window starts `shift_hours` after local midnight and lasts
//! `length_hours`. Both bounds are inclusive. Windows never wrap past
//! midnight; `olla_config` rejects configurations that would need it.

use crate::config::ScheduleCfg;

/// True when `hour_of_day` lies in `[shift_hours, shift_hours + length_hours]`.
///
/// A zero or negative length never matches.
pub fn in_window(hour_of_day: f64, shift_hours: f64, length_hours: f64) -> bool {
    if length_hours.is_nan() || length_hours <= 0.0 {
        return false;
    }
    shift_hours <= hour_of_day && hour_of_day <= shift_hours + length_hours
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub shift_hours: f64,
    pub length_hours: f64,
}

impl TimeWindow {
    pub fn new(shift_hours: f64, length_hours: f64) -> Self {
        Self {
            shift_hours,
            length_hours,
        }
    }

    pub fn contains(&self, hour_of_day: f64) -> bool {
        in_window(hour_of_day, self.shift_hours, self.length_hours)
    }

    pub fn end_hours(&self) -> f64 {
        self.shift_hours + self.length_hours
    }
}

impl From<ScheduleCfg> for TimeWindow {
    fn from(s: ScheduleCfg) -> Self {
        Self::new(s.shift_hours, s.length_hours)
    }
}

/// Change of window membership between two consecutive ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEdge {
    Opened,
    Closed,
}

impl WindowEdge {
    pub fn between(was_inside: bool, is_inside: bool) -> Option<Self> {
        match (was_inside, is_inside) {
            (false, true) => Some(Self::Opened),
            (true, false) => Some(Self::Closed),
            _ => None,
        }
    }
}
