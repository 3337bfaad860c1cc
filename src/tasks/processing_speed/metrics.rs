//! Scoring for processing-speed runs.
//!
//! `accuracy_points = correct / total × 60`; `speed_points = max(0, 40 −
//! mean correct RT / 100)`, with a zero-correct run earning no speed points
//! at all. Final score is the capped, rounded sum.

use serde::{Deserialize, Serialize};

use super::engine::{PatternTrial, TrialOutcome};
use crate::core::scoring;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingSpeedMetrics {
    pub total_rounds: usize,
    pub correct_rounds: u32,
    pub timeouts: u32,
    pub mean_correct_rt_ms: f64,
    pub accuracy_points: f64,
    pub speed_points: f64,
    pub score: u8,
}

impl ProcessingSpeedMetrics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_trials(trials: &[PatternTrial]) -> Self {
        let total_rounds = trials.len();
        if total_rounds == 0 {
            return Self::default();
        }

        let mut correct_rounds = 0u32;
        let mut timeouts = 0u32;
        let mut correct_rts = Vec::new();

        for trial in trials {
            match &trial.outcome {
                TrialOutcome::Answered { correct, rt_ms, .. } => {
                    if *correct {
                        correct_rounds = correct_rounds.saturating_add(1);
                        correct_rts.push(*rt_ms);
                    }
                }
                TrialOutcome::TimedOut => {
                    timeouts = timeouts.saturating_add(1);
                }
                TrialOutcome::Pending => {}
            }
        }

        let mean_correct_rt_ms = scoring::mean(&correct_rts);
        let accuracy_points = correct_rounds as f64 / total_rounds as f64 * 60.0;
        let speed_points = if correct_rounds == 0 {
            0.0
        } else {
            (40.0 - mean_correct_rt_ms / 100.0).max(0.0)
        };
        let score = scoring::cap_score(accuracy_points + speed_points);

        Self {
            total_rounds,
            correct_rounds,
            timeouts,
            mean_correct_rt_ms,
            accuracy_points,
            speed_points,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::stimulus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn trial(index: usize, outcome: TrialOutcome) -> PatternTrial {
        let mut rng = StdRng::seed_from_u64(index as u64);
        let mut trial = PatternTrial::for_fixture(index, stimulus::pattern_round(&mut rng));
        trial.outcome = outcome;
        trial
    }

    fn answered(index: usize, correct: bool, rt_ms: f64) -> PatternTrial {
        trial(
            index,
            TrialOutcome::Answered {
                choice: 1,
                correct,
                rt_ms,
            },
        )
    }

    #[test]
    fn perfect_fast_run_scores_high() {
        let trials: Vec<_> = (0..20).map(|i| answered(i, true, 800.0)).collect();
        let metrics = ProcessingSpeedMetrics::from_trials(&trials);
        assert_eq!(metrics.correct_rounds, 20);
        assert_eq!(metrics.accuracy_points, 60.0);
        assert_eq!(metrics.speed_points, 32.0);
        assert_eq!(metrics.score, 92);
    }

    #[test]
    fn zero_correct_earns_no_speed_points() {
        let trials: Vec<_> = (0..20).map(|i| trial(i, TrialOutcome::TimedOut)).collect();
        let metrics = ProcessingSpeedMetrics::from_trials(&trials);
        assert_eq!(metrics.correct_rounds, 0);
        assert_eq!(metrics.speed_points, 0.0);
        assert_eq!(metrics.score, 0);
        assert_eq!(metrics.timeouts, 20);
    }

    #[test]
    fn slow_correct_answers_lose_the_speed_bonus_gradually() {
        // 4000 ms average leaves 0 speed points.
        let trials: Vec<_> = (0..20).map(|i| answered(i, true, 4000.0)).collect();
        let metrics = ProcessingSpeedMetrics::from_trials(&trials);
        assert_eq!(metrics.speed_points, 0.0);
        assert_eq!(metrics.score, 60);
    }

    #[test]
    fn mixed_run() {
        let mut trials: Vec<_> = (0..10).map(|i| answered(i, true, 1000.0)).collect();
        trials.extend((10..20).map(|i| answered(i, false, 500.0)));
        let metrics = ProcessingSpeedMetrics::from_trials(&trials);
        assert_eq!(metrics.accuracy_points, 30.0);
        assert_eq!(metrics.mean_correct_rt_ms, 1000.0);
        assert_eq!(metrics.speed_points, 30.0);
        assert_eq!(metrics.score, 60);
    }
}
