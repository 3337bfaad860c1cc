//! Scoring for visual-motor runs.
//!
//! `accuracy_points = hits / total × 50`; `precision_points = max(0, 25 −
//! mean clamped distance × 0.5)` with every trial's distance clamped to 50
//! before averaging (the timeout sentinel clamps down to 50 too);
//! `speed_points = max(0, 25 − mean hit RT / 80)`, zero when there were no
//! hits.

use serde::{Deserialize, Serialize};

use super::engine::{TargetTrial, TrialOutcome, TIMEOUT_DISTANCE};
use crate::core::scoring;

/// Per-trial distance cap applied before averaging.
pub const DISTANCE_CLAMP: f64 = 50.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisualMotorMetrics {
    pub total_targets: usize,
    pub hits: u32,
    pub misses: u32,
    pub timeouts: u32,
    pub mean_clamped_distance: f64,
    pub mean_hit_rt_ms: f64,
    pub accuracy_points: f64,
    pub precision_points: f64,
    pub speed_points: f64,
    pub score: u8,
}

impl VisualMotorMetrics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_trials(trials: &[TargetTrial]) -> Self {
        let total_targets = trials.len();
        if total_targets == 0 {
            return Self::default();
        }

        let mut hits = 0u32;
        let mut misses = 0u32;
        let mut timeouts = 0u32;
        let mut clamped_distances = Vec::with_capacity(total_targets);
        let mut hit_rts = Vec::new();

        for trial in trials {
            match &trial.outcome {
                TrialOutcome::Hit { rt_ms, distance } => {
                    hits = hits.saturating_add(1);
                    hit_rts.push(*rt_ms);
                    clamped_distances.push(distance.min(DISTANCE_CLAMP));
                }
                TrialOutcome::Miss { distance, .. } => {
                    misses = misses.saturating_add(1);
                    clamped_distances.push(distance.min(DISTANCE_CLAMP));
                }
                TrialOutcome::TimedOut => {
                    timeouts = timeouts.saturating_add(1);
                    clamped_distances.push(TIMEOUT_DISTANCE.min(DISTANCE_CLAMP));
                }
                TrialOutcome::Pending => {}
            }
        }

        let mean_clamped_distance = scoring::mean(&clamped_distances);
        let mean_hit_rt_ms = scoring::mean(&hit_rts);

        let accuracy_points = hits as f64 / total_targets as f64 * 50.0;
        let precision_points = (25.0 - mean_clamped_distance * 0.5).max(0.0);
        let speed_points = if hits == 0 {
            0.0
        } else {
            (25.0 - mean_hit_rt_ms / 80.0).max(0.0)
        };
        let score = scoring::cap_score(accuracy_points + precision_points + speed_points);

        Self {
            total_targets,
            hits,
            misses,
            timeouts,
            mean_clamped_distance,
            mean_hit_rt_ms,
            accuracy_points,
            precision_points,
            speed_points,
            score,
        }
    }
}
