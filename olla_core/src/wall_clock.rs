//! Local time-of-day sources.
//!
//! The control loop measures elapsed time with a monotonic [`Clock`] and
//! asks a [`WallClock`] only for the hour of day. Boards without a backed-up
//! RTC use [`SyncedWallClock`]: set once at startup, then advanced by the
//! monotonic clock.

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use olla_traits::Clock;

pub trait WallClock {
    fn now(&self) -> NaiveDateTime;

    fn hour_of_day(&self) -> f64 {
        hour_of_day(&self.now())
    }
}

/// Fractional hour in `[0, 24)`.
pub fn hour_of_day(t: &NaiveDateTime) -> f64 {
    f64::from(t.hour())
        + f64::from(t.minute()) / 60.0
        + f64::from(t.second()) / 3600.0
        + f64::from(t.nanosecond()) / 3.6e12
}

/// Host local time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Wall time pinned to `start` at construction, advancing with `clock`.
pub struct SyncedWallClock {
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    start: NaiveDateTime,
}

impl SyncedWallClock {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, start: NaiveDateTime) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            start,
        }
    }
}

impl std::fmt::Debug for SyncedWallClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedWallClock")
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

impl WallClock for SyncedWallClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = self.clock.now().saturating_duration_since(self.epoch);
        let delta = TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::MAX);
        self.start
            .checked_add_signed(delta)
            .unwrap_or(NaiveDateTime::MAX)
    }
}

impl<T: WallClock + ?Sized> WallClock for Box<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use olla_traits::clock::test_clock::TestClock;
    use std::time::Duration;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .expect("valid date")
    }

    #[test]
    fn fractional_hours() {
        assert!((hour_of_day(&at(8, 30, 0)) - 8.5).abs() < 1e-9);
        assert!((hour_of_day(&at(10, 0, 36)) - 10.01).abs() < 1e-9);
        assert!(hour_of_day(&at(23, 59, 59)) < 24.0);
    }

    #[test]
    fn synced_clock_follows_monotonic_time() {
        let tc = TestClock::new();
        let wc = SyncedWallClock::new(Arc::new(tc.clone()), at(7, 59, 0));
        assert_eq!(wc.now(), at(7, 59, 0));
        tc.advance(Duration::from_secs(90));
        assert_eq!(wc.now(), at(8, 0, 30));
        assert!((wc.hour_of_day() - (8.0 + 30.0 / 3600.0)).abs() < 1e-9);
    }

    #[test]
    fn synced_clock_rolls_over_midnight() {
        let tc = TestClock::new();
        let wc = SyncedWallClock::new(Arc::new(tc.clone()), at(23, 59, 0));
        tc.advance(Duration::from_secs(120));
        assert_eq!(wc.now().format("%H:%M").to_string(), "00:01");
    }
}
