//! Status returned from each control loop iteration and from a full run.

use std::time::Duration;

use crate::sequencer::StepEvent;
use crate::window::WindowEdge;

/// What happened during a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Milliseconds since the controller was built.
    pub now_ms: u64,
    pub hour_of_day: f64,
    pub in_window: bool,
    pub edge: Option<WindowEdge>,
    /// Sequencer outcome, when the sequencer ran this tick.
    pub event: Option<StepEvent>,
    /// Channel whose valve is commanded open after this tick.
    pub open_valve: Option<usize>,
    pub completed_today: bool,
}

/// Totals for one call to `Controller::run`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub runs_completed: u64,
    pub faults: u64,
    pub elapsed: Duration,
}
