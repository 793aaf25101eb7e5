#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core irrigation logic (hardware-agnostic).
//!
//! Fills a row of clay-pot reservoirs once per day, one at a time, inside a
//! configured time window. All hardware interaction goes through
//! `olla_traits::DigitalInput` and `olla_traits::DigitalOutput`.
//!
//! ## Architecture
//!
//! - **Level sensing**: debounced float-switch filter (`level` module)
//! - **Scheduling**: daily window membership and edges (`window` module)
//! - **Sequencing**: per-reservoir fill state machine (`sequencer` module)
//! - **Faults**: fault records, persistent log and LED indicator
//!   (`fault`, `indicator` modules)
//! - **Control loop**: ties the above to hardware (`controller` module)
//!
//! ## Safety
//!
//! At most one valve is open at any time, and only inside the window.
//! Every fill is bounded by a per-channel `max_fill_time`. Dropping the
//! controller drives every valve off.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod fault;
pub mod hw_error;
pub mod indicator;
pub mod level;
pub mod mocks;
pub mod sequencer;
pub mod status;
pub mod wall_clock;
pub mod window;

pub use builder::{ControllerBuilder, Missing};
pub use config::{BlinkPattern, ChannelCfg, ControllerCfg, LevelCfg, ScheduleCfg};
pub use controller::{Channel, Controller, ControllerContext, WindowLatch};
pub use error::{BuildError, OllaError, Report, Result};
pub use fault::{Fault, FaultKind, FaultSink, FileFaultLog, NullFaultSink};
pub use indicator::{BlinkIndicator, FaultIndicator, NoIndicator};
pub use level::LevelSensor;
pub use sequencer::{FillSequencer, LevelReading, Phase, ReservoirState, StepEvent};
pub use status::{RunSummary, TickReport};
pub use wall_clock::{SyncedWallClock, SystemWallClock, WallClock};
pub use window::{TimeWindow, WindowEdge, in_window};

