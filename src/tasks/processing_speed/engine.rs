//! State machine for the processing-speed subtest.
//!
//! Per trial: the pattern grid is visible for `display_ms`, then hidden; a
//! choice window of `choice_window_ms` opens and the subject picks how many
//! patterns matched the target (0, 1, or 2). A timeout scores the trial
//! incorrect. Reaction time runs from window open to choice.

use rand::Rng;

use crate::core::timing::{InstantStamp, ResponseWindow};
use crate::tasks::stimulus::{self, PatternRound, MAX_MATCHES};
use crate::tasks::{
    CountdownStep, ResponseOutcome, ScheduledStimulus, ScheduledTick, COUNTDOWN_START,
    COUNTDOWN_TICK_MS,
};

#[derive(Debug, Clone)]
pub struct ProcessingSpeedConfig {
    pub total_rounds: usize,
    pub display_ms: u64,
    pub choice_window_ms: u64,
    pub inter_trial_ms: u64,
}

impl Default for ProcessingSpeedConfig {
    fn default() -> Self {
        Self {
            total_rounds: 20,
            display_ms: 1500,
            choice_window_ms: 3000,
            inter_trial_ms: 500,
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
    Answered { choice: u8, correct: bool, rt_ms: f64 },
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct PatternTrial {
    pub index: usize,
    pub round: PatternRound,
    grid_shown_at: Option<InstantStamp>,
    window: Option<ResponseWindow>,
    pub outcome: TrialOutcome,
}

impl PatternTrial {
    fn new(index: usize, round: PatternRound) -> Self {
        Self {
            index,
            round,
            grid_shown_at: None,
            window: None,
            outcome: TrialOutcome::Pending,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.outcome, TrialOutcome::Pending)
    }

    #[cfg(test)]
    pub(crate) fn for_fixture(index: usize, round: PatternRound) -> Self {
        Self::new(index, round)
    }
}

#[derive(Debug, Default)]
pub struct ProcessingSpeedEngine {
    pub run_id: u64,
    pub config: ProcessingSpeedConfig,
    pub trials: Vec<PatternTrial>,
    phase: Phase,
}

impl ProcessingSpeedEngine {
    pub fn new(config: ProcessingSpeedConfig) -> Self {
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

    /// Begin a fresh run: pre-generate every round, bump the run id, and hand
    /// back the first countdown tick. Returns `None` while a run is live.
    pub fn start(&mut self, rng: &mut impl Rng) -> Option<ScheduledTick> {
        if !matches!(self.phase, Phase::Instructions | Phase::Done) {
            tracing::debug!(run_id = self.run_id, "start ignored, run in progress");
            return None;
        }
        self.run_id += 1;
        self.trials = (0..self.config.total_rounds)
            .map(|index| PatternTrial::new(index, stimulus::pattern_round(rng)))
            .collect();
        self.phase = Phase::Countdown {
            remaining: COUNTDOWN_START,
        };
        Some(ScheduledTick {
            run_id: self.run_id,
            wait_ms: COUNTDOWN_TICK_MS,
        })
    }

    /// Abandon the run. Bumping the run id orphans every in-flight timer, so
    /// stale events land as `Ignored` even if their sleeps still fire.
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

    /// The grid for `trial_index` just became visible. Returns how long the
    /// driver should keep it on screen.
    pub fn mark_grid_on(
        &mut self,
        run_id: u64,
        trial_index: usize,
        now: InstantStamp,
    ) -> Option<u64> {
        if run_id != self.run_id || self.phase != Phase::Playing {
            return None;
        }
        let trial = self.trials.get_mut(trial_index)?;
        if trial.grid_shown_at.is_some() || trial.is_resolved() {
            return None;
        }
        trial.grid_shown_at = Some(now);
        Some(self.config.display_ms)
    }

    /// The grid was hidden; the choice window opens now. Returns the window
    /// length so the driver can schedule the timeout.
    pub fn mark_grid_off(
        &mut self,
        run_id: u64,
        trial_index: usize,
        now: InstantStamp,
    ) -> Option<u64> {
        if run_id != self.run_id || self.phase != Phase::Playing {
            return None;
        }
        let window_ms = self.config.choice_window_ms;
        let trial = self.trials.get_mut(trial_index)?;
        if trial.grid_shown_at.is_none() || trial.window.is_some() || trial.is_resolved() {
            return None;
        }
        trial.window = Some(ResponseWindow::open(now, window_ms));
        Some(window_ms)
    }

    /// Accept a match-count choice. Only the trial whose window is currently
    /// open can resolve; anything else is ignored.
    pub fn register_choice(&mut self, choice: u8, now: InstantStamp) -> ResponseOutcome {
        if self.phase != Phase::Playing || choice > MAX_MATCHES {
            return ResponseOutcome::Ignored;
        }
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
        let correct = choice == trial.round.match_count;
        trial.outcome = TrialOutcome::Answered {
            choice,
            correct,
            rt_ms,
        };
        let index = trial.index;
        self.advance_after(index)
    }

    /// A choice-window timeout fired. Scores the trial incorrect unless a
    /// choice already resolved it.
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

    pub fn metrics(&self) -> Option<super::ProcessingSpeedMetrics> {
        if self.phase == Phase::Done {
            Some(super::ProcessingSpeedMetrics::from_trials(&self.trials))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timing::InstantStamp;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stamp(ms: f64) -> InstantStamp {
        InstantStamp::from_ms(ms)
    }

    fn engine(rounds: usize) -> (ProcessingSpeedEngine, StdRng) {
        let engine = ProcessingSpeedEngine::new(ProcessingSpeedConfig {
            total_rounds: rounds,
            ..ProcessingSpeedConfig::default()
        });
        (engine, StdRng::seed_from_u64(42))
    }

    fn run_countdown(engine: &mut ProcessingSpeedEngine, run_id: u64) -> ScheduledStimulus {
        loop {
            match engine.tick_countdown(run_id) {
                CountdownStep::Tick(_) => continue,
                CountdownStep::Begin(first) => return first,
                CountdownStep::Ignored => panic!("countdown tick ignored"),
            }
        }
    }

    #[test]
    fn start_is_not_reentrant() {
        let (mut engine, mut rng) = engine(2);
        assert!(engine.start(&mut rng).is_some());
        assert!(engine.start(&mut rng).is_none());
    }

    #[test]
    fn full_run_resolves_every_trial() {
        let (mut engine, mut rng) = engine(2);
        let tick = engine.start(&mut rng).unwrap();
        let first = run_countdown(&mut engine, tick.run_id);
        assert_eq!(first.trial_index, 0);

        assert_eq!(engine.mark_grid_on(first.run_id, 0, stamp(0.0)), Some(1500));
        assert_eq!(engine.mark_grid_off(first.run_id, 0, stamp(1500.0)), Some(3000));
        let correct_choice = engine.trials[0].round.match_count;
        let outcome = engine.register_choice(correct_choice, stamp(2100.0));
        let ResponseOutcome::NextScheduled(next) = outcome else {
            panic!("expected next trial, got {outcome:?}");
        };
        assert_eq!(next.trial_index, 1);

        engine.mark_grid_on(next.run_id, 1, stamp(3000.0));
        engine.mark_grid_off(next.run_id, 1, stamp(4500.0));
        assert_eq!(
            engine.register_timeout(next.run_id, 1),
            ResponseOutcome::RunCompleted
        );

        assert_eq!(
            engine.trials[0].outcome,
            TrialOutcome::Answered {
                choice: correct_choice,
                correct: true,
                rt_ms: 600.0
            }
        );
        assert_eq!(engine.trials[1].outcome, TrialOutcome::TimedOut);
        assert!(engine.metrics().is_some());
    }

    #[test]
    fn choice_outside_any_open_window_is_ignored() {
        let (mut engine, mut rng) = engine(2);
        let tick = engine.start(&mut rng).unwrap();
        let first = run_countdown(&mut engine, tick.run_id);
        engine.mark_grid_on(first.run_id, 0, stamp(0.0));
        // Grid still visible, no window open yet.
        assert_eq!(engine.register_choice(1, stamp(700.0)), ResponseOutcome::Ignored);
    }

    #[test]
    fn late_timeout_after_choice_is_ignored() {
        let (mut engine, mut rng) = engine(2);
        let tick = engine.start(&mut rng).unwrap();
        let first = run_countdown(&mut engine, tick.run_id);
        engine.mark_grid_on(first.run_id, 0, stamp(0.0));
        engine.mark_grid_off(first.run_id, 0, stamp(1500.0));
        let _ = engine.register_choice(0, stamp(2000.0));
        assert_eq!(
            engine.register_timeout(first.run_id, 0),
            ResponseOutcome::Ignored
        );
    }

    #[test]
    fn stale_run_events_are_ignored_after_abort() {
        let (mut engine, mut rng) = engine(2);
        let tick = engine.start(&mut rng).unwrap();
        let first = run_countdown(&mut engine, tick.run_id);
        engine.mark_grid_on(first.run_id, 0, stamp(0.0));
        engine.mark_grid_off(first.run_id, 0, stamp(1500.0));
        engine.abort();

        assert_eq!(
            engine.register_timeout(first.run_id, 0),
            ResponseOutcome::Ignored
        );
        assert!(engine.mark_grid_on(first.run_id, 1, stamp(2000.0)).is_none());
        // A fresh start works after the abort.
        assert!(engine.start(&mut rng).is_some());
    }

    #[test]
    fn duplicate_choice_does_not_double_count() {
        let (mut engine, mut rng) = engine(2);
        let tick = engine.start(&mut rng).unwrap();
        let first = run_countdown(&mut engine, tick.run_id);
        engine.mark_grid_on(first.run_id, 0, stamp(0.0));
        engine.mark_grid_off(first.run_id, 0, stamp(1500.0));
        assert!(matches!(
            engine.register_choice(2, stamp(1900.0)),
            ResponseOutcome::NextScheduled(_)
        ));
        // Second input before the next window opens lands nowhere.
        assert_eq!(engine.register_choice(2, stamp(1950.0)), ResponseOutcome::Ignored);
    }
}
