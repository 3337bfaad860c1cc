//! State machine for the decision-efficiency (go/no-go) subtest.
//!
//! Per trial: a `gap_ms` inter-stimulus pause, then one cue visible for
//! `display_ms`. Tapping is correct only on GO cues; withholding is correct
//! on NO-GO and DISTRACTOR cues. The first tap inside the display window owns
//! the trial; the trial itself always runs the full display before the next
//! one is scheduled, so a tap never shortens the pacing.

use rand::Rng;

use crate::core::timing::{InstantStamp, ResponseWindow};
use crate::tasks::stimulus::{self, Cue, CueClass};
use crate::tasks::{
    CountdownStep, ResponseOutcome, ScheduledStimulus, ScheduledTick, COUNTDOWN_START,
    COUNTDOWN_TICK_MS,
};

#[derive(Debug, Clone)]
pub struct DecisionEfficiencyConfig {
    pub total_rounds: usize,
    pub gap_ms: u64,
    pub display_ms: u64,
}

impl Default for DecisionEfficiencyConfig {
    fn default() -> Self {
        Self {
            total_rounds: 25,
            gap_ms: 500,
            display_ms: 800,
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
    Tapped { rt_ms: f64, correct: bool },
    Withheld { correct: bool },
}

#[derive(Debug, Clone)]
pub struct CueTrial {
    pub index: usize,
    pub cue: Cue,
    window: Option<ResponseWindow>,
    pub outcome: TrialOutcome,
}

impl CueTrial {
    fn new(index: usize, cue: Cue) -> Self {
        Self {
            index,
            cue,
            window: None,
            outcome: TrialOutcome::Pending,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.outcome, TrialOutcome::Pending)
    }

    #[cfg(test)]
    pub(crate) fn for_fixture(index: usize, cue: Cue) -> Self {
        Self::new(index, cue)
    }
}

#[derive(Debug, Default)]
pub struct DecisionEfficiencyEngine {
    pub run_id: u64,
    pub config: DecisionEfficiencyConfig,
    pub trials: Vec<CueTrial>,
    phase: Phase,
    /// Index of the trial currently being presented. Off events for any other
    /// index are stale and must not advance the run a second time.
    cursor: usize,
}

impl DecisionEfficiencyEngine {
    pub fn new(config: DecisionEfficiencyConfig) -> Self {
        Self {
            run_id: 0,
            config,
            trials: Vec::new(),
            phase: Phase::Instructions,
            cursor: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Begin a fresh run with a newly drawn cue sequence. Returns `None`
    /// while a run is live.
    pub fn start(&mut self, rng: &mut impl Rng) -> Option<ScheduledTick> {
        if !matches!(self.phase, Phase::Instructions | Phase::Done) {
            tracing::debug!(run_id = self.run_id, "start ignored, run in progress");
            return None;
        }
        self.run_id += 1;
        self.trials = stimulus::cue_sequence(rng, self.config.total_rounds)
            .into_iter()
            .enumerate()
            .map(|(index, cue)| CueTrial::new(index, cue))
            .collect();
        self.cursor = 0;
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
        self.cursor = 0;
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
                wait_ms: self.config.gap_ms,
            })
        } else {
            self.phase = Phase::Countdown { remaining };
            CountdownStep::Tick(ScheduledTick {
                run_id: self.run_id,
                wait_ms: COUNTDOWN_TICK_MS,
            })
        }
    }

    /// The cue for `trial_index` just became visible; its tap window opens
    /// now. Returns how long the driver should keep it on screen.
    pub fn mark_cue_on(
        &mut self,
        run_id: u64,
        trial_index: usize,
        now: InstantStamp,
    ) -> Option<u64> {
        if run_id != self.run_id || self.phase != Phase::Playing || trial_index != self.cursor {
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

    /// A tap landed. The first tap inside the live cue's window records the
    /// trial outcome; taps between cues or after the window are dropped.
    /// Returns whether anything was recorded.
    pub fn register_tap(&mut self, now: InstantStamp) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        let Some(trial) = self
            .trials
            .iter_mut()
            .find(|trial| trial.window.is_some() && !trial.is_resolved())
        else {
            return false;
        };
        let Some(window) = trial.window.as_mut() else {
            return false;
        };
        let Some(rt_ms) = window.try_respond(now) else {
            return false;
        };
        trial.outcome = TrialOutcome::Tapped {
            rt_ms,
            correct: trial.cue.class == CueClass::Go,
        };
        true
    }

    /// The cue was hidden; the trial finalizes (a withhold if no tap landed)
    /// and the next one is scheduled.
    pub fn mark_cue_off(&mut self, run_id: u64, trial_index: usize) -> ResponseOutcome {
        if run_id != self.run_id || self.phase != Phase::Playing || trial_index != self.cursor {
            return ResponseOutcome::Ignored;
        }
        let Some(trial) = self.trials.get_mut(trial_index) else {
            return ResponseOutcome::Ignored;
        };
        let Some(window) = trial.window.as_mut() else {
            return ResponseOutcome::Ignored;
        };
        if window.expire() {
            trial.outcome = TrialOutcome::Withheld {
                correct: trial.cue.class != CueClass::Go,
            };
        }
        self.advance_after(trial_index)
    }

    pub fn metrics(&self) -> Option<super::DecisionEfficiencyMetrics> {
        if self.phase == Phase::Done {
            Some(super::DecisionEfficiencyMetrics::from_trials(&self.trials))
        } else {
            None
        }
    }

    fn advance_after(&mut self, resolved_index: usize) -> ResponseOutcome {
        let next = resolved_index + 1;
        self.cursor = next;
        if next >= self.trials.len() {
            self.phase = Phase::Done;
            ResponseOutcome::RunCompleted
        } else {
            ResponseOutcome::NextScheduled(ScheduledStimulus {
                run_id: self.run_id,
                trial_index: next,
                wait_ms: self.config.gap_ms,
            })
        }
    }
}
