//! Scoring for decision-efficiency runs.
//!
//! `accuracy_points = correct / total × 50`, `hit_points = hit rate × 25`,
//! `inhibition_points = (1 − false-alarm rate) × 25`. NO-GO and DISTRACTOR
//! cues are pooled for the false-alarm rate: both demand withholding.

use serde::{Deserialize, Serialize};

use super::engine::{CueTrial, TrialOutcome};
use crate::core::scoring;
use crate::tasks::stimulus::CueClass;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionEfficiencyMetrics {
    pub total_rounds: usize,
    pub go_trials: usize,
    pub withhold_trials: usize,
    pub correct_trials: u32,
    pub hits: u32,
    pub false_alarms: u32,
    pub hit_rate: f64,
    pub false_alarm_rate: f64,
    pub mean_hit_rt_ms: f64,
    pub accuracy_points: f64,
    pub hit_points: f64,
    pub inhibition_points: f64,
    pub score: u8,
}

impl DecisionEfficiencyMetrics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_trials(trials: &[CueTrial]) -> Self {
        let total_rounds = trials.len();
        if total_rounds == 0 {
            return Self::default();
        }

        let mut go_trials = 0usize;
        let mut withhold_trials = 0usize;
        let mut correct_trials = 0u32;
        let mut hits = 0u32;
        let mut false_alarms = 0u32;
        let mut hit_rts = Vec::new();

        for trial in trials {
            let is_go = trial.cue.class == CueClass::Go;
            if is_go {
                go_trials += 1;
            } else {
                withhold_trials += 1;
            }

            match &trial.outcome {
                TrialOutcome::Tapped { rt_ms, correct } => {
                    if is_go {
                        hits = hits.saturating_add(1);
                        hit_rts.push(*rt_ms);
                    } else {
                        false_alarms = false_alarms.saturating_add(1);
                    }
                    if *correct {
                        correct_trials = correct_trials.saturating_add(1);
                    }
                }
                TrialOutcome::Withheld { correct } => {
                    if *correct {
                        correct_trials = correct_trials.saturating_add(1);
                    }
                }
                TrialOutcome::Pending => {}
            }
        }

        let hit_rate = if go_trials > 0 {
            hits as f64 / go_trials as f64
        } else {
            0.0
        };
        let false_alarm_rate = if withhold_trials > 0 {
            false_alarms as f64 / withhold_trials as f64
        } else {
            0.0
        };

        let accuracy_points = correct_trials as f64 / total_rounds as f64 * 50.0;
        let hit_points = hit_rate * 25.0;
        let inhibition_points = (1.0 - false_alarm_rate) * 25.0;
        let score = scoring::cap_score(accuracy_points + hit_points + inhibition_points);

        Self {
            total_rounds,
            go_trials,
            withhold_trials,
            correct_trials,
            hits,
            false_alarms,
            hit_rate,
            false_alarm_rate,
            mean_hit_rt_ms: scoring::mean(&hit_rts),
            accuracy_points,
            hit_points,
            inhibition_points,
            score,
        }
    }
}
