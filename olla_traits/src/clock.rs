use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time for the controller: sensor sample spacing, fill and
/// top-off timeouts, and the tick deadline all read `now()`. Warm-up and the
/// run loop wait through `sleep()`, so a simulated clock makes a whole
/// watering window pass instantly.
///
/// Time of day is not this trait's job; `olla_core::wall_clock` derives it.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Whole milliseconds since `epoch`; 0 when `epoch` is in the future.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }
}

/// The clock used on the board.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            thread::sleep(d);
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_clock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Hand-cranked clock for controller tests.
    ///
    /// Time only moves through `advance()` or `sleep()`, and clones share it:
    /// the controller gets one clone (and a `SyncedWallClock` another) while
    /// the test body steps all of them together.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        pub fn advance(&self, d: Duration) {
            if let Ok(mut off) = self.offset.lock() {
                *off = off.saturating_add(d);
            }
        }

        /// Total simulated time so far.
        pub fn elapsed(&self) -> Duration {
            self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            self.advance(d);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn an_hour_long_window_passes_without_blocking() {
            let clock = TestClock::new();
            let epoch = clock.now();
            clock.sleep(Duration::from_secs(3600));
            assert_eq!(clock.ms_since(epoch), 3_600_000);
        }

        #[test]
        fn clones_share_time() {
            let clock = TestClock::new();
            let handle = clock.clone();
            let epoch = clock.now();
            handle.advance(Duration::from_millis(250));
            assert_eq!(clock.ms_since(epoch), 250);
            assert_eq!(clock.elapsed(), Duration::from_millis(250));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_since_saturates_for_future_epoch() {
        let clock = MonotonicClock::new();
        let future = clock.now() + Duration::from_secs(10);
        assert_eq!(clock.ms_since(future), 0);
    }
}
