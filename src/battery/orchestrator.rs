//! Battery orchestration: sequence the three subtests, aggregate the overall
//! score, compare against the baseline, and persist exactly one result.
//!
//! The orchestrator never inspects subtest internals. Each subtest hands back
//! a single 0-100 score via `submit_score`, and the phase only reaches
//! `Results` after a successful insert: a failed save keeps the computed
//! scores available for another `finalize` call and leaves the retest gate
//! governed by the previous successful result.

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};

use crate::battery::gate::{self, Eligibility};
use crate::core::scoring;
use crate::core::storage::{
    format_date, DiagnosticResult, ResultStore, ScoreComparison, Sport, StorageError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryPhase {
    Intro,
    ProcessingSpeed,
    DecisionEfficiency,
    VisualMotor,
    Results,
}

/// Scores accumulated as the battery runs; `None` until that subtest
/// completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubtestScores {
    pub processing_speed: Option<u8>,
    pub decision_efficiency: Option<u8>,
    pub visual_motor: Option<u8>,
}

impl SubtestScores {
    pub fn is_complete(&self) -> bool {
        self.processing_speed.is_some()
            && self.decision_efficiency.is_some()
            && self.visual_motor.is_some()
    }
}

#[derive(Debug, Error)]
pub enum BatteryError {
    #[error("retest gate is locked for another {days_remaining} days")]
    CooldownActive { days_remaining: i64 },
    #[error("battery already started")]
    AlreadyStarted,
    #[error("not every subtest has a score yet")]
    ScoresIncomplete,
    #[error("run abandoned before completion")]
    Aborted,
    #[error("failed to persist result: {0}")]
    Persistence(#[from] StorageError),
    #[error("failed to format completion timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

/// Drives one assessment attempt for a (user, sport) pair.
pub struct DiagnosticOrchestrator {
    user_id: String,
    sport: Sport,
    baseline: Option<DiagnosticResult>,
    phase: BatteryPhase,
    scores: SubtestScores,
}

impl DiagnosticOrchestrator {
    /// Build an orchestrator around a baseline the caller already fetched.
    pub fn new(
        user_id: impl Into<String>,
        sport: Sport,
        baseline: Option<DiagnosticResult>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            sport,
            baseline,
            phase: BatteryPhase::Intro,
            scores: SubtestScores::default(),
        }
    }

    /// Build an orchestrator by fetching the latest result from the store.
    pub fn for_user(
        store: &dyn ResultStore,
        user_id: impl Into<String>,
        sport: Sport,
    ) -> Result<Self, StorageError> {
        let user_id = user_id.into();
        let baseline = store.fetch_latest(&user_id, sport)?;
        Ok(Self::new(user_id, sport, baseline))
    }

    pub fn phase(&self) -> BatteryPhase {
        self.phase
    }

    pub fn scores(&self) -> SubtestScores {
        self.scores
    }

    pub fn baseline(&self) -> Option<&DiagnosticResult> {
        self.baseline.as_ref()
    }

    /// Gate evaluation against the governing baseline.
    pub fn eligibility(&self, today: Date) -> Eligibility {
        gate::evaluate(today, self.baseline.as_ref())
    }

    /// Leave the intro screen and enter the first subtest. Refused while the
    /// retest gate is locked; a second call while a battery is live is an
    /// explicit error the caller may treat as ignorable.
    pub fn begin(&mut self, today: Date) -> Result<(), BatteryError> {
        if self.phase != BatteryPhase::Intro {
            return Err(BatteryError::AlreadyStarted);
        }
        let eligibility = self.eligibility(today);
        if !eligibility.can_take_test {
            return Err(BatteryError::CooldownActive {
                days_remaining: eligibility.days_remaining,
            });
        }
        self.phase = BatteryPhase::ProcessingSpeed;
        tracing::info!(user = %self.user_id, sport = self.sport.as_str(), "battery started");
        Ok(())
    }

    /// Record the score of the subtest currently in progress and advance.
    /// The pure `(phase, scores) -> (phase', scores')` transition: no timers,
    /// no subtest internals. Returns the phase now in progress.
    pub fn submit_score(&mut self, score: u8) -> BatteryPhase {
        match self.phase {
            BatteryPhase::ProcessingSpeed => {
                self.scores.processing_speed = Some(score);
                self.phase = BatteryPhase::DecisionEfficiency;
            }
            BatteryPhase::DecisionEfficiency => {
                self.scores.decision_efficiency = Some(score);
                self.phase = BatteryPhase::VisualMotor;
            }
            BatteryPhase::VisualMotor => {
                self.scores.visual_motor = Some(score);
                // Stay on VisualMotor until the result persists; `Results` is
                // only reachable through a successful finalize.
            }
            BatteryPhase::Intro | BatteryPhase::Results => {
                tracing::debug!(phase = ?self.phase, score, "score submitted out of phase, ignored");
            }
        }
        tracing::debug!(phase = ?self.phase, score, "subtest score recorded");
        self.phase
    }

    /// Build the result row, insert it, and move to `Results`. On a
    /// persistence error the phase and scores are untouched, so the caller
    /// can surface the failure and try again.
    pub fn finalize(
        &mut self,
        store: &dyn ResultStore,
        today: Date,
        now: OffsetDateTime,
    ) -> Result<DiagnosticResult, BatteryError> {
        let (Some(ps), Some(de), Some(vm)) = (
            self.scores.processing_speed,
            self.scores.decision_efficiency,
            self.scores.visual_motor,
        ) else {
            return Err(BatteryError::ScoresIncomplete);
        };

        let overall = scoring::overall_score(ps, de, vm);
        let result = DiagnosticResult {
            id: String::new(),
            user_id: self.user_id.clone(),
            sport: self.sport,
            test_date: format_date(today),
            processing_speed_score: ps,
            decision_efficiency_score: de,
            visual_motor_score: vm,
            overall_score: overall,
            comparison_vs_prior: ScoreComparison::against(self.baseline.as_ref(), ps, de, vm, overall),
            next_test_date: format_date(gate::next_test_date(today)),
            completed_at: now.format(&Rfc3339)?,
        };

        let persisted = store.insert(result)?;
        self.phase = BatteryPhase::Results;
        self.baseline = Some(persisted.clone());
        tracing::info!(
            user = %self.user_id,
            sport = self.sport.as_str(),
            overall = persisted.overall_score,
            "assessment persisted"
        );
        Ok(persisted)
    }
}
