//! Per-reservoir fill state machine.
//!
//! Reservoirs are filled strictly one at a time in index order. Each
//! channel moves `Idle -> Filling -> ToppingOff -> Done`, or straight from
//! `Idle` to `Done` when no fill is needed. A valve is open exactly while
//! its channel is `Filling` or `ToppingOff`, and only the channel at
//! `current_index` can be in either phase.
//!
//! Level-driven transitions need a fresh sample; timer-driven ones are
//! checked on every step.

use crate::error::OllaError;
use crate::fault::Fault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Filling,
    ToppingOff,
    Done,
}

impl Phase {
    #[inline]
    pub fn valve_open(self) -> bool {
        matches!(self, Self::Filling | Self::ToppingOff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservoirState {
    pub phase: Phase,
    pub phase_started_at_ms: u64,
}

impl ReservoirState {
    fn idle(now_ms: u64) -> Self {
        Self {
            phase: Phase::Idle,
            phase_started_at_ms: now_ms,
        }
    }

    fn enter(&mut self, phase: Phase, now_ms: u64) {
        self.phase = phase;
        self.phase_started_at_ms = now_ms;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTiming {
    pub overfill_ms: u64,
    pub max_fill_ms: u64,
}

/// Filtered level of the active channel as seen this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelReading {
    pub empty: bool,
    pub full: bool,
    /// A new sample was accepted on this tick.
    pub fresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyFull,
    NotEmpty,
}

/// Outcome of one sequencer step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    /// Nothing changed on the active channel.
    Waiting { channel: usize },
    Skipped { channel: usize, reason: SkipReason },
    Opened { channel: usize },
    ToppingOff { channel: usize },
    Closed { channel: usize, open_ms: u64 },
    /// The active channel was closed and abandoned.
    Faulted(Fault),
    /// Every channel is `Done`.
    Complete,
}

#[derive(Debug, Clone)]
pub struct FillSequencer {
    timings: Vec<ChannelTiming>,
    states: Vec<ReservoirState>,
    current_index: usize,
    // Time the active channel's valve opened; survives the ToppingOff switch.
    opened_at_ms: u64,
}

impl FillSequencer {
    pub fn new(timings: Vec<ChannelTiming>, now_ms: u64) -> Self {
        let states = vec![ReservoirState::idle(now_ms); timings.len()];
        Self {
            timings,
            states,
            current_index: 0,
            opened_at_ms: now_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.states.len()
    }

    /// Channel the sequencer is working on, if any remain.
    pub fn active(&self) -> Option<usize> {
        (!self.is_complete()).then_some(self.current_index)
    }

    pub fn state(&self, channel: usize) -> Option<ReservoirState> {
        self.states.get(channel).copied()
    }

    pub fn states(&self) -> &[ReservoirState] {
        &self.states
    }

    pub fn valve_open(&self, channel: usize) -> bool {
        self.states
            .get(channel)
            .is_some_and(|s| s.phase.valve_open())
    }

    /// Channel whose valve should currently be open.
    pub fn open_channel(&self) -> Option<usize> {
        self.active().filter(|&i| self.valve_open(i))
    }

    /// Start a new run: every channel `Idle`, index back to 0.
    pub fn reset(&mut self, now_ms: u64) {
        for s in &mut self.states {
            *s = ReservoirState::idle(now_ms);
        }
        self.current_index = 0;
        self.opened_at_ms = now_ms;
    }

    /// Abort mid-fill: the active channel goes back to `Idle` with its valve
    /// closed. Returns the channel whose valve was open, if any.
    pub fn interrupt(&mut self, now_ms: u64) -> Option<usize> {
        let idx = self.open_channel()?;
        self.states[idx].enter(Phase::Idle, now_ms);
        Some(idx)
    }

    /// Close and abandon the active channel because of `err`.
    pub fn fail_active(&mut self, now_ms: u64, err: &OllaError) -> Option<Fault> {
        let idx = self.active()?;
        self.finish(idx, now_ms);
        Some(Fault::sequence(idx, err))
    }

    /// Advance the active channel given this tick's level reading.
    pub fn step(
        &mut self,
        now_ms: u64,
        level: std::result::Result<LevelReading, OllaError>,
    ) -> StepEvent {
        let Some(idx) = self.active() else {
            return StepEvent::Complete;
        };
        let level = match level {
            Ok(l) => l,
            Err(e) => {
                let fault = Fault::sequence(idx, &e);
                self.finish(idx, now_ms);
                return StepEvent::Faulted(fault);
            }
        };
        let st = self.states[idx];
        let timing = self.timings[idx];
        let in_phase_ms = now_ms.saturating_sub(st.phase_started_at_ms);

        match st.phase {
            Phase::Idle if !level.fresh => StepEvent::Waiting { channel: idx },
            Phase::Idle if level.full => {
                self.finish(idx, now_ms);
                StepEvent::Skipped {
                    channel: idx,
                    reason: SkipReason::AlreadyFull,
                }
            }
            Phase::Idle if level.empty => {
                self.states[idx].enter(Phase::Filling, now_ms);
                self.opened_at_ms = now_ms;
                StepEvent::Opened { channel: idx }
            }
            Phase::Idle => {
                self.finish(idx, now_ms);
                StepEvent::Skipped {
                    channel: idx,
                    reason: SkipReason::NotEmpty,
                }
            }
            Phase::Filling if level.fresh && level.full => {
                self.states[idx].enter(Phase::ToppingOff, now_ms);
                StepEvent::ToppingOff { channel: idx }
            }
            Phase::Filling if in_phase_ms >= timing.max_fill_ms => {
                self.finish(idx, now_ms);
                StepEvent::Faulted(Fault::max_fill_timeout(idx, in_phase_ms))
            }
            Phase::Filling => StepEvent::Waiting { channel: idx },
            Phase::ToppingOff if in_phase_ms >= timing.overfill_ms => {
                let open_ms = now_ms.saturating_sub(self.opened_at_ms);
                self.finish(idx, now_ms);
                StepEvent::Closed {
                    channel: idx,
                    open_ms,
                }
            }
            Phase::ToppingOff => StepEvent::Waiting { channel: idx },
            Phase::Done => {
                // Only reachable if a caller mutated state out of order.
                self.current_index += 1;
                StepEvent::Waiting { channel: idx }
            }
        }
    }

    fn finish(&mut self, idx: usize, now_ms: u64) {
        self.states[idx].enter(Phase::Done, now_ms);
        self.current_index = idx + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(n: usize) -> FillSequencer {
        FillSequencer::new(
            vec![
                ChannelTiming {
                    overfill_ms: 1_000,
                    max_fill_ms: 60_000,
                };
                n
            ],
            0,
        )
    }

    fn fresh(empty: bool, full: bool) -> Result<LevelReading, OllaError> {
        Ok(LevelReading {
            empty,
            full,
            fresh: true,
        })
    }

    fn stale() -> Result<LevelReading, OllaError> {
        Ok(LevelReading {
            empty: true,
            full: false,
            fresh: false,
        })
    }

    #[test]
    fn idle_waits_for_fresh_sample() {
        let mut s = seq(1);
        assert_eq!(s.step(0, stale()), StepEvent::Waiting { channel: 0 });
        assert_eq!(s.state(0).map(|r| r.phase), Some(Phase::Idle));
    }

    #[test]
    fn full_fill_cycle() {
        let mut s = seq(2);
        assert_eq!(s.step(0, fresh(true, false)), StepEvent::Opened { channel: 0 });
        assert!(s.valve_open(0));
        assert_eq!(s.step(500, fresh(false, false)), StepEvent::Waiting { channel: 0 });
        assert_eq!(s.step(5_000, fresh(false, true)), StepEvent::ToppingOff { channel: 0 });
        assert!(s.valve_open(0));
        assert_eq!(s.step(5_999, stale()), StepEvent::Waiting { channel: 0 });
        assert_eq!(
            s.step(6_000, stale()),
            StepEvent::Closed {
                channel: 0,
                open_ms: 6_000
            }
        );
        assert!(!s.valve_open(0));
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn full_at_start_is_skipped() {
        let mut s = seq(1);
        assert_eq!(
            s.step(0, fresh(false, true)),
            StepEvent::Skipped {
                channel: 0,
                reason: SkipReason::AlreadyFull
            }
        );
        assert!(s.is_complete());
        assert_eq!(s.step(10, fresh(true, false)), StepEvent::Complete);
    }

    #[test]
    fn neither_empty_nor_full_is_skipped() {
        let mut s = seq(2);
        assert_eq!(
            s.step(0, fresh(false, false)),
            StepEvent::Skipped {
                channel: 0,
                reason: SkipReason::NotEmpty
            }
        );
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn timeout_is_checked_without_fresh_samples() {
        let mut s = seq(2);
        s.step(0, fresh(true, false));
        assert_eq!(s.step(59_999, stale()), StepEvent::Waiting { channel: 0 });
        match s.step(60_000, stale()) {
            StepEvent::Faulted(f) => {
                assert_eq!(f.kind, crate::fault::FaultKind::MaxFillTimeout);
                assert_eq!(f.channel, 0);
            }
            other => panic!("expected fault, got {other:?}"),
        }
        assert!(!s.valve_open(0));
        assert_eq!(s.active(), Some(1));
    }

    #[test]
    fn full_wins_over_timeout_on_same_step() {
        let mut s = seq(1);
        s.step(0, fresh(true, false));
        assert_eq!(s.step(60_000, fresh(false, true)), StepEvent::ToppingOff { channel: 0 });
    }

    #[test]
    fn read_error_faults_and_advances() {
        let mut s = seq(2);
        s.step(0, fresh(true, false));
        let err = OllaError::Sensor {
            channel: 0,
            reason: "boom".into(),
        };
        match s.step(10, Err(err)) {
            StepEvent::Faulted(f) => {
                assert_eq!(f.kind, crate::fault::FaultKind::SequenceFault);
                assert!(f.message.contains("boom"));
            }
            other => panic!("expected fault, got {other:?}"),
        }
        assert_eq!(s.state(0).map(|r| r.phase), Some(Phase::Done));
        assert_eq!(s.active(), Some(1));
    }

    #[test]
    fn interrupt_returns_channel_to_idle() {
        let mut s = seq(2);
        s.step(0, fresh(true, false));
        assert_eq!(s.interrupt(100), Some(0));
        assert_eq!(s.state(0).map(|r| r.phase), Some(Phase::Idle));
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.open_channel(), None);
        assert_eq!(s.interrupt(200), None);
    }

    #[test]
    fn reset_restarts_from_first_channel() {
        let mut s = seq(2);
        s.step(0, fresh(false, true));
        s.step(10, fresh(false, true));
        assert!(s.is_complete());
        s.reset(20);
        assert_eq!(s.active(), Some(0));
        assert!(s.states().iter().all(|r| r.phase == Phase::Idle));
    }

    #[test]
    fn fail_active_closes_valve() {
        let mut s = seq(1);
        s.step(0, fresh(true, false));
        let err = OllaError::Valve {
            channel: 0,
            reason: "stuck".into(),
        };
        let fault = s.fail_active(5, &err).expect("active channel");
        assert_eq!(fault.channel, 0);
        assert!(s.is_complete());
        assert!(s.fail_active(6, &err).is_none());
    }
}
