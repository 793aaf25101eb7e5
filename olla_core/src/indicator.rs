//! Fault indicator LED.
//!
//! [`BlinkIndicator`] owns the LED output on a background thread and is
//! driven by commands over a crossbeam channel, so arming it never blocks
//! the control loop. The pattern is a short flash followed by a long pause.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel as xch;
use olla_traits::DigitalOutput;

use crate::config::BlinkPattern;

pub trait FaultIndicator {
    /// Start blinking with no end. With `blocking`, never return; used when
    /// the controller cannot start at all.
    fn arm(&self, blocking: bool);

    /// Blink for `d`, then go dark. Re-arming extends or shortens the period.
    fn arm_for(&self, d: Duration);

    fn disarm(&self);
}

impl<T: FaultIndicator + ?Sized> FaultIndicator for Box<T> {
    fn arm(&self, blocking: bool) {
        (**self).arm(blocking)
    }
    fn arm_for(&self, d: Duration) {
        (**self).arm_for(d)
    }
    fn disarm(&self) {
        (**self).disarm()
    }
}

/// No LED wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndicator;

impl FaultIndicator for NoIndicator {
    fn arm(&self, blocking: bool) {
        if blocking {
            park_forever();
        }
    }
    fn arm_for(&self, _d: Duration) {}
    fn disarm(&self) {}
}

fn park_forever() -> ! {
    loop {
        std::thread::park();
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    /// `None` blinks until disarmed.
    Arm { until: Option<Instant> },
    Disarm,
}

// Wake-up period while dark, so shutdown is noticed promptly.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// LED blinker running on its own thread.
pub struct BlinkIndicator {
    tx: Option<xch::Sender<Command>>,
    shutdown: Arc<AtomicBool>,
    armed: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl BlinkIndicator {
    /// Take ownership of `out` and blink `pin` according to `pattern`.
    pub fn spawn<O>(out: O, pin: u8, pattern: BlinkPattern) -> Self
    where
        O: DigitalOutput + Send + 'static,
    {
        let (tx, rx) = xch::unbounded::<Command>();
        let shutdown = Arc::new(AtomicBool::new(false));
        let armed = Arc::new(AtomicBool::new(false));
        let join = {
            let shutdown = shutdown.clone();
            let armed = armed.clone();
            std::thread::Builder::new()
                .name("olla-fault-led".into())
                .spawn(move || blink_loop(out, pin, pattern, &rx, &shutdown, &armed))
                .map_err(|e| tracing::error!(error = %e, "failed to spawn fault LED thread"))
                .ok()
        };
        Self {
            tx: Some(tx),
            shutdown,
            armed,
            join,
        }
    }

    /// Whether the blink thread currently considers itself armed.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    fn send(&self, cmd: Command) {
        if let Some(tx) = &self.tx
            && tx.send(cmd).is_err()
        {
            tracing::warn!("fault LED thread is gone; command dropped");
        }
    }
}

impl std::fmt::Debug for BlinkIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlinkIndicator")
            .field("armed", &self.is_armed())
            .finish_non_exhaustive()
    }
}

impl FaultIndicator for BlinkIndicator {
    fn arm(&self, blocking: bool) {
        self.send(Command::Arm { until: None });
        if blocking {
            park_forever();
        }
    }

    fn arm_for(&self, d: Duration) {
        self.send(Command::Arm {
            until: Some(Instant::now() + d),
        });
    }

    fn disarm(&self) {
        self.send(Command::Disarm);
    }
}

impl Drop for BlinkIndicator {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        // Dropping the sender wakes the thread with Disconnected.
        self.tx.take();
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

struct BlinkState {
    // None = dark. Some(None) = armed without end.
    armed_until: Option<Option<Instant>>,
    lit: bool,
    next_toggle: Instant,
}

fn set_led<O: DigitalOutput>(out: &mut O, pin: u8, on: bool) {
    if let Err(e) = out.write(pin, on) {
        tracing::warn!(pin, error = %e, "fault LED write failed");
    }
}

fn blink_loop<O: DigitalOutput>(
    mut out: O,
    pin: u8,
    pattern: BlinkPattern,
    rx: &xch::Receiver<Command>,
    shutdown: &AtomicBool,
    armed: &AtomicBool,
) {
    let mut st = BlinkState {
        armed_until: None,
        lit: false,
        next_toggle: Instant::now(),
    };
    set_led(&mut out, pin, false);

    while !shutdown.load(Ordering::Acquire) {
        let timeout = if st.armed_until.is_some() {
            st.next_toggle.saturating_duration_since(Instant::now())
        } else {
            IDLE_POLL
        };
        match rx.recv_timeout(timeout) {
            Ok(Command::Arm { until }) => {
                if st.armed_until.is_none() {
                    st.lit = true;
                    set_led(&mut out, pin, true);
                    st.next_toggle = Instant::now() + pattern.on;
                    tracing::debug!(pin, "fault LED armed");
                }
                st.armed_until = Some(until);
                armed.store(true, Ordering::Release);
            }
            Ok(Command::Disarm) => {
                st.armed_until = None;
                st.lit = false;
                set_led(&mut out, pin, false);
                armed.store(false, Ordering::Release);
            }
            Err(xch::RecvTimeoutError::Timeout) => {}
            Err(xch::RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        if let Some(until) = st.armed_until {
            if until.is_some_and(|u| now >= u) {
                st.armed_until = None;
                st.lit = false;
                set_led(&mut out, pin, false);
                armed.store(false, Ordering::Release);
                tracing::debug!(pin, "fault LED period elapsed");
                continue;
            }
            if now >= st.next_toggle {
                st.lit = !st.lit;
                set_led(&mut out, pin, st.lit);
                st.next_toggle = now + if st.lit { pattern.on } else { pattern.off };
            }
        }
    }
    set_led(&mut out, pin, false);
    armed.store(false, Ordering::Release);
}
