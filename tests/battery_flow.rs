//! End-to-end battery scenarios: engines driven to completion, scores
//! aggregated and persisted, gate and comparison behavior across runs.

use futures_channel::mpsc::unbounded;
use rand::rngs::StdRng;
use rand::SeedableRng;
use time::macros::{date, datetime};

use cognition::battery::orchestrator::{BatteryError, BatteryPhase, DiagnosticOrchestrator};
use cognition::battery::runner::{run_battery, PlayerInput, RunnerConfig};
use cognition::battery::{evaluate, gate};
use cognition::core::scoring;
use cognition::core::storage::{MemoryStore, ResultStore, Sport};
use cognition::core::timing::InstantStamp;
use cognition::tasks::processing_speed::ProcessingSpeedEngine;
use cognition::tasks::{CountdownStep, ResponseOutcome};

fn stamp(ms: f64) -> InstantStamp {
    InstantStamp::from_ms(ms)
}

fn finish(orchestrator: &mut DiagnosticOrchestrator, today: time::Date, scores: [u8; 3]) {
    orchestrator.begin(today).unwrap();
    for score in scores {
        orchestrator.submit_score(score);
    }
}

#[test]
fn first_run_is_a_baseline_with_all_null_comparison() {
    let store = MemoryStore::new();
    let mut orchestrator = DiagnosticOrchestrator::new("ath-1", Sport::Baseball, None);
    finish(&mut orchestrator, date!(2024 - 01 - 01), [80, 70, 90]);

    let result = orchestrator
        .finalize(&store, date!(2024 - 01 - 01), datetime!(2024-01-01 09:30 UTC))
        .unwrap();

    assert_eq!(result.overall_score, 80);
    assert_eq!(result.comparison_vs_prior.processing_speed_change, None);
    assert_eq!(result.comparison_vs_prior.decision_efficiency_change, None);
    assert_eq!(result.comparison_vs_prior.visual_motor_change, None);
    assert_eq!(result.comparison_vs_prior.overall_change, None);
    assert_eq!(result.test_date, "2024-01-01");
    assert_eq!(result.next_test_date, "2024-04-22");
}

#[test]
fn second_run_reports_the_overall_delta() {
    let store = MemoryStore::new();
    let mut first = DiagnosticOrchestrator::new("ath-1", Sport::Baseball, None);
    finish(&mut first, date!(2024 - 01 - 01), [60, 60, 60]);
    first
        .finalize(&store, date!(2024 - 01 - 01), datetime!(2024-01-01 09:30 UTC))
        .unwrap();

    let mut second = DiagnosticOrchestrator::for_user(&store, "ath-1", Sport::Baseball).unwrap();
    finish(&mut second, date!(2024 - 04 - 22), [75, 75, 75]);
    let result = second
        .finalize(&store, date!(2024 - 04 - 22), datetime!(2024-04-22 09:30 UTC))
        .unwrap();

    assert_eq!(result.overall_score, 75);
    assert_eq!(result.comparison_vs_prior.overall_change, Some(15));
}

#[test]
fn gate_cycles_closed_then_open_across_a_completed_run() {
    let store = MemoryStore::new();
    let today = date!(2024 - 01 - 01);

    // No prior result: open.
    assert!(evaluate(today, store.fetch_latest("ath-1", Sport::Softball).unwrap().as_ref())
        .can_take_test);

    let mut orchestrator = DiagnosticOrchestrator::new("ath-1", Sport::Softball, None);
    finish(&mut orchestrator, today, [50, 60, 70]);
    orchestrator
        .finalize(&store, today, datetime!(2024-01-01 09:30 UTC))
        .unwrap();

    // Locked the day after, open again on the stored next test date.
    let latest = store.fetch_latest("ath-1", Sport::Softball).unwrap();
    let locked = evaluate(date!(2024 - 01 - 02), latest.as_ref());
    assert!(!locked.can_take_test);
    assert_eq!(locked.days_remaining, 111);

    let reopened = evaluate(date!(2024 - 04 - 22), latest.as_ref());
    assert!(reopened.can_take_test);
    assert_eq!(reopened.days_remaining, 0);
}

#[test]
fn sports_keep_independent_cooldowns() {
    let store = MemoryStore::new();
    let today = date!(2024 - 01 - 01);
    let mut orchestrator = DiagnosticOrchestrator::new("ath-1", Sport::Baseball, None);
    finish(&mut orchestrator, today, [50, 60, 70]);
    orchestrator
        .finalize(&store, today, datetime!(2024-01-01 09:30 UTC))
        .unwrap();

    let mut softball = DiagnosticOrchestrator::for_user(&store, "ath-1", Sport::Softball).unwrap();
    assert!(softball.begin(date!(2024 - 01 - 02)).is_ok());
}

/// Drive a processing-speed engine to completion with synthetic stamps:
/// `correct` trials answered right at an 800 ms reaction time, the rest
/// answered wrong. Verifies the subtest score lands where the formula says.
fn drive_processing_speed(correct: usize) -> u8 {
    let mut engine = ProcessingSpeedEngine::default();
    let mut rng = StdRng::seed_from_u64(17);
    let tick = engine.start(&mut rng).unwrap();

    let mut schedule = loop {
        match engine.tick_countdown(tick.run_id) {
            CountdownStep::Tick(_) => continue,
            CountdownStep::Begin(first) => break first,
            CountdownStep::Ignored => unreachable!("countdown tick dropped"),
        }
    };

    let mut clock = 0.0;
    loop {
        let index = schedule.trial_index;
        assert!(engine.mark_grid_on(schedule.run_id, index, stamp(clock)).is_some());
        assert!(engine
            .mark_grid_off(schedule.run_id, index, stamp(clock + 1500.0))
            .is_some());

        let actual = engine.trials[index].round.match_count;
        let choice = if index < correct { actual } else { (actual + 1) % 3 };
        match engine.register_choice(choice, stamp(clock + 2300.0)) {
            ResponseOutcome::NextScheduled(next) => {
                schedule = next;
                clock += 4000.0;
            }
            ResponseOutcome::RunCompleted => break,
            ResponseOutcome::Ignored => unreachable!("choice dropped mid-run"),
        }
    }

    engine.metrics().unwrap().score
}

#[test]
fn processing_speed_scores_follow_the_formula_end_to_end() {
    // All 20 correct at 800 ms: 60 accuracy + 32 speed.
    assert_eq!(drive_processing_speed(20), 92);
    // Half correct: 30 accuracy + 32 speed.
    assert_eq!(drive_processing_speed(10), 62);
    // None correct: no accuracy, and no speed bonus either.
    assert_eq!(drive_processing_speed(0), 0);
}

#[test]
fn overall_score_is_the_rounded_mean_everywhere() {
    let store = MemoryStore::new();
    let mut orchestrator = DiagnosticOrchestrator::new("ath-9", Sport::Baseball, None);
    let scores = [92, 62, 47];
    finish(&mut orchestrator, date!(2024 - 01 - 01), scores);
    let result = orchestrator
        .finalize(&store, date!(2024 - 01 - 01), datetime!(2024-01-01 09:30 UTC))
        .unwrap();
    assert_eq!(
        result.overall_score,
        scoring::overall_score(scores[0], scores[1], scores[2])
    );
}

#[tokio::test(start_paused = true)]
async fn unattended_battery_times_out_every_trial_and_persists() {
    let store = MemoryStore::new();
    let mut orchestrator = DiagnosticOrchestrator::new("ath-7", Sport::Baseball, None);
    let (_inputs_tx, mut inputs) = unbounded::<PlayerInput>();
    let mut rng = StdRng::seed_from_u64(23);

    let result = run_battery(
        &mut orchestrator,
        &store,
        RunnerConfig::default(),
        &mut inputs,
        &mut rng,
        date!(2024 - 01 - 01),
    )
    .await
    .unwrap();

    // No input at all: processing speed and visual-motor bottom out, the
    // go/no-go run still banks its correct withholds plus full inhibition.
    assert_eq!(result.processing_speed_score, 0);
    assert_eq!(result.visual_motor_score, 0);
    assert!(result.decision_efficiency_score >= 25);
    assert!(result.decision_efficiency_score <= 75);
    assert_eq!(
        result.overall_score,
        scoring::overall_score(0, result.decision_efficiency_score, 0)
    );

    assert_eq!(orchestrator.phase(), BatteryPhase::Results);
    let latest = store.fetch_latest("ath-7", Sport::Baseball).unwrap().unwrap();
    assert_eq!(latest.id, result.id);
    assert_eq!(latest.next_test_date, "2024-04-22");
    assert!(!evaluate(date!(2024 - 01 - 02), Some(&latest)).can_take_test);
}

#[tokio::test(start_paused = true)]
async fn closing_the_input_channel_abandons_the_attempt() {
    let store = MemoryStore::new();
    let mut orchestrator = DiagnosticOrchestrator::new("ath-8", Sport::Baseball, None);
    let (inputs_tx, mut inputs) = unbounded::<PlayerInput>();
    let mut rng = StdRng::seed_from_u64(29);
    drop(inputs_tx);

    let err = run_battery(
        &mut orchestrator,
        &store,
        RunnerConfig::default(),
        &mut inputs,
        &mut rng,
        date!(2024 - 01 - 01),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, BatteryError::Aborted));
    assert!(store.is_empty());
    assert_ne!(orchestrator.phase(), BatteryPhase::Results);
    // Nothing was recorded, so the gate stays open for the next attempt.
    assert!(orchestrator.eligibility(date!(2024 - 01 - 01)).can_take_test);
}

#[test]
fn cooldown_arithmetic_handles_month_lengths() {
    assert_eq!(
        gate::next_test_date(date!(2024 - 01 - 01)),
        date!(2024 - 04 - 22)
    );
}
