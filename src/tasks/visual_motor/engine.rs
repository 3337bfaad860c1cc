//! State machine for the visual-motor integration subtest.
//!
//! Per trial: a circular target appears at a generated position and stays up
//! for at most `display_ms`. A tap inside `hit_radius` of the center is a
//! hit; a tap outside is a miss at its measured distance; no tap before the
//! window closes is a miss at the far sentinel distance. Coordinates and
//! distances are in percent of the play-surface dimension.

use rand::Rng;

use crate::core::timing::{InstantStamp, ResponseWindow};
use crate::tasks::stimulus::{self, TargetPoint};
use crate::tasks::{
    CountdownStep, ResponseOutcome, ScheduledStimulus, ScheduledTick, COUNTDOWN_START,
    COUNTDOWN_TICK_MS,
};

/// Distance recorded for a trial that timed out with no tap.
pub const TIMEOUT_DISTANCE: f64 = 999.0;

#[derive(Debug, Clone)]
pub struct VisualMotorConfig {
    pub total_targets: usize,
    pub display_ms: u64,
    pub inter_trial_ms: u64,
    /// Hit radius around the target center, percent of surface dimension.
    pub hit_radius: f64,
}

impl Default for VisualMotorConfig {
    fn default() -> Self {
        Self {
            total_targets: 20,
            display_ms: 2000,
            inter_trial_ms: 300,
            hit_radius: 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Instructions,
    Countdown { remaining: u8 },
    Playing,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrialOutcome {
    Pending,
    Hit { rt_ms: f64, distance: f64 },
    Miss { rt_ms: f64, distance: f64 },
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct TargetTrial {
    pub index: usize,
    pub target: TargetPoint,
    window: Option<ResponseWindow>,
    pub outcome: TrialOutcome,
}

impl TargetTrial {
    fn new(index: usize, target: TargetPoint) -> Self {
        Self {
            index,
            target,
            window: None,
            outcome: TrialOutcome::Pending,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.outcome, TrialOutcome::Pending)
    }

    #[cfg(test)]
    pub(crate) fn for_fixture(index: usize, target: TargetPoint) -> Self {
        Self::new(index, target)
    }
}

#[derive(Debug, Default)]
pub struct VisualMotorEngine {
    pub run_id: u64,
    pub config: VisualMotorConfig,
    pub trials: Vec<TargetTrial>,
    phase: Phase,
}

impl VisualMotorEngine {
    pub fn new(config: VisualMotorConfig) -> Self {
        Self {
            run_id: 0,
            config,
            trials: Vec::new(),
            phase: Phase::Instructions,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Begin a fresh run with newly drawn target positions. Returns `None`
    /// while a run is live.
    pub fn start(&mut self, rng: &mut impl Rng) -> Option<ScheduledTick> {
        if !matches!(self.phase, Phase::Instructions | Phase::Done) {
            tracing::debug!(run_id = self.run_id, "start ignored, run in progress");
            return None;
        }
        self.run_id += 1;
        self.trials = (0..self.config.total_targets)
            .map(|index| TargetTrial::new(index, stimulus::target_point(rng)))
            .collect();
        self.phase = Phase::Countdown {
            remaining: COUNTDOWN_START,
        };
        Some(ScheduledTick {
            run_id: self.run_id,
            wait_ms: COUNTDOWN_TICK_MS,
        })
    }

    pub fn abort(&mut self) {
        self.run_id += 1;
        self.trials.clear();
        self.phase = Phase::Instructions;
    }

    pub fn tick_countdown(&mut self, run_id: u64) -> CountdownStep {
        if run_id != self.run_id {
            return CountdownStep::Ignored;
        }
        let Phase::Countdown { remaining } = self.phase else {
            return CountdownStep::Ignored;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.phase = Phase::Playing;
            CountdownStep::Begin(ScheduledStimulus {
                run_id: self.run_id,
                trial_index: 0,
                wait_ms: 0,
            })
        } else {
            self.phase = Phase::Countdown { remaining };
            CountdownStep::Tick(ScheduledTick {
                run_id: self.run_id,
                wait_ms: COUNTDOWN_TICK_MS,
            })
        }
    }

    /// The target for `trial_index` just appeared; its response window opens
    /// now. Returns how long the driver should leave it up.
    pub fn mark_target_on(
        &mut self,
        run_id: u64,
        trial_index: usize,
        now: InstantStamp,
    ) -> Option<u64> {
        if run_id != self.run_id || self.phase != Phase::Playing {
            return None;
        }
        let display_ms = self.config.display_ms;
        let trial = self.trials.get_mut(trial_index)?;
        if trial.window.is_some() || trial.is_resolved() {
            return None;
        }
        trial.window = Some(ResponseWindow::open(now, display_ms));
        Some(display_ms)
    }

    /// A tap landed at percent coordinates. The live target resolves to a hit
    /// or a distance-scored miss; taps with no target up are dropped.
    pub fn register_tap(&mut self, x: f64, y: f64, now: InstantStamp) -> ResponseOutcome {
        if self.phase != Phase::Playing {
            return ResponseOutcome::Ignored;
        }
        let hit_radius = self.config.hit_radius;
        let Some(trial) = self
            .trials
            .iter_mut()
            .find(|trial| trial.window.is_some() && !trial.is_resolved())
        else {
            return ResponseOutcome::Ignored;
        };
        let Some(window) = trial.window.as_mut() else {
            return ResponseOutcome::Ignored;
        };
        let Some(rt_ms) = window.try_respond(now) else {
            return ResponseOutcome::Ignored;
        };
        let distance = trial.target.distance_to(x, y);
        trial.outcome = if distance <= hit_radius {
            TrialOutcome::Hit { rt_ms, distance }
        } else {
            TrialOutcome::Miss { rt_ms, distance }
        };
        let index = trial.index;
        self.advance_after(index)
    }

    /// The display window elapsed with no tap: an auto-miss at the sentinel
    /// distance, recorded exactly once.
    pub fn register_timeout(&mut self, run_id: u64, trial_index: usize) -> ResponseOutcome {
        if run_id != self.run_id || self.phase != Phase::Playing {
            return ResponseOutcome::Ignored;
        }
        let Some(trial) = self.trials.get_mut(trial_index) else {
            return ResponseOutcome::Ignored;
        };
        let Some(window) = trial.window.as_mut() else {
            return ResponseOutcome::Ignored;
        };
        if !window.expire() {
            return ResponseOutcome::Ignored;
        }
        trial.outcome = TrialOutcome::TimedOut;
        self.advance_after(trial_index)
    }

    pub fn metrics(&self) -> Option<super::VisualMotorMetrics> {
        if self.phase == Phase::Done {
            Some(super::VisualMotorMetrics::from_trials(&self.trials))
        } else {
            None
        }
    }

    fn advance_after(&mut self, resolved_index: usize) -> ResponseOutcome {
        let next = resolved_index + 1;
        if next >= self.trials.len() {
            self.phase = Phase::Done;
            ResponseOutcome::RunCompleted
        } else {
            ResponseOutcome::NextScheduled(ScheduledStimulus {
                run_id: self.run_id,
                trial_index: next,
                wait_ms: self.config.inter_trial_ms,
            })
        }
    }
}
