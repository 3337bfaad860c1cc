//! Headless driver for a full battery run.
//!
//! One single-threaded event loop per subtest: engine scheduling requests
//! become spawned sleeps that feed an unbounded event channel, and player
//! input merges into the same loop from its own channel. Every timer event
//! carries the `(run_id, trial_index)` it was scheduled for, and the engine
//! rejects any event whose identity no longer matches, so a sleep that
//! outlives its trial fires into nothing.
//!
//! Subtests run strictly sequentially: a subtest's loop owns the input
//! stream until its engine reports `RunCompleted`, and the orchestrator
//! receives exactly one score per subtest.

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::StreamExt;
use rand::Rng;
use time::{Date, OffsetDateTime};

use crate::battery::orchestrator::{BatteryError, DiagnosticOrchestrator};
use crate::core::storage::{DiagnosticResult, ResultStore};
use crate::core::timing;
use crate::tasks::decision_efficiency::{DecisionEfficiencyConfig, DecisionEfficiencyEngine};
use crate::tasks::processing_speed::{ProcessingSpeedConfig, ProcessingSpeedEngine};
use crate::tasks::visual_motor::{VisualMotorConfig, VisualMotorEngine};
use crate::tasks::{CountdownStep, ResponseOutcome, ScheduledStimulus};

/// Player input fed into the live subtest. Inputs that make no sense for the
/// current subtest or moment are dropped by the engines, not the channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerInput {
    /// Match-count choice for the processing-speed grid.
    Choice(u8),
    /// Anywhere-tap for the go/no-go stream.
    Tap,
    /// Positioned tap for the visual-motor targets, percent coordinates.
    TapAt { x: f64, y: f64 },
}

/// Trial parameters for each subtest; defaults are the standard battery.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub processing_speed: ProcessingSpeedConfig,
    pub decision_efficiency: DecisionEfficiencyConfig,
    pub visual_motor: VisualMotorConfig,
}

#[derive(Debug, Clone, Copy)]
enum TimerEvent {
    Tick { run_id: u64 },
    StimulusOn { run_id: u64, trial_index: usize },
    StimulusOff { run_id: u64, trial_index: usize },
    Timeout { run_id: u64, trial_index: usize },
}

fn queue_event(tx: &UnboundedSender<TimerEvent>, wait_ms: u64, event: TimerEvent) {
    let tx = tx.clone();
    tokio::spawn(async move {
        timing::sleep_ms(wait_ms).await;
        let _ = tx.unbounded_send(event);
    });
}

fn queue_stimulus(tx: &UnboundedSender<TimerEvent>, schedule: ScheduledStimulus) {
    queue_event(
        tx,
        schedule.wait_ms,
        TimerEvent::StimulusOn {
            run_id: schedule.run_id,
            trial_index: schedule.trial_index,
        },
    );
}

/// Run the whole battery: gate check, three subtests, persist. `today` is
/// the assessment's calendar date; the completion timestamp is taken when
/// the result is built. Closing the input channel mid-run aborts the attempt
/// and loses its transient trial data.
pub async fn run_battery(
    orchestrator: &mut DiagnosticOrchestrator,
    store: &dyn ResultStore,
    config: RunnerConfig,
    inputs: &mut UnboundedReceiver<PlayerInput>,
    rng: &mut impl Rng,
    today: Date,
) -> Result<DiagnosticResult, BatteryError> {
    orchestrator.begin(today)?;

    let mut processing_speed = ProcessingSpeedEngine::new(config.processing_speed);
    let score = run_processing_speed(&mut processing_speed, inputs, rng)
        .await
        .ok_or(BatteryError::Aborted)?;
    orchestrator.submit_score(score);

    let mut decision_efficiency = DecisionEfficiencyEngine::new(config.decision_efficiency);
    let score = run_decision_efficiency(&mut decision_efficiency, inputs, rng)
        .await
        .ok_or(BatteryError::Aborted)?;
    orchestrator.submit_score(score);

    let mut visual_motor = VisualMotorEngine::new(config.visual_motor);
    let score = run_visual_motor(&mut visual_motor, inputs, rng)
        .await
        .ok_or(BatteryError::Aborted)?;
    orchestrator.submit_score(score);

    orchestrator.finalize(store, today, OffsetDateTime::now_utc())
}

async fn run_processing_speed(
    engine: &mut ProcessingSpeedEngine,
    inputs: &mut UnboundedReceiver<PlayerInput>,
    rng: &mut impl Rng,
) -> Option<u8> {
    let (tx, mut events) = unbounded();
    let tick = engine.start(rng)?;
    queue_event(&tx, tick.wait_ms, TimerEvent::Tick { run_id: tick.run_id });

    loop {
        futures_util::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                match event {
                    TimerEvent::Tick { run_id } => match engine.tick_countdown(run_id) {
                        CountdownStep::Tick(next) => {
                            queue_event(&tx, next.wait_ms, TimerEvent::Tick { run_id: next.run_id });
                        }
                        CountdownStep::Begin(first) => queue_stimulus(&tx, first),
                        CountdownStep::Ignored => {
                            tracing::warn!(run_id, "stale countdown tick dropped");
                        }
                    },
                    TimerEvent::StimulusOn { run_id, trial_index } => {
                        if let Some(display_ms) =
                            engine.mark_grid_on(run_id, trial_index, timing::now())
                        {
                            queue_event(
                                &tx,
                                display_ms,
                                TimerEvent::StimulusOff { run_id, trial_index },
                            );
                        }
                    }
                    TimerEvent::StimulusOff { run_id, trial_index } => {
                        if let Some(window_ms) =
                            engine.mark_grid_off(run_id, trial_index, timing::now())
                        {
                            queue_event(
                                &tx,
                                window_ms,
                                TimerEvent::Timeout { run_id, trial_index },
                            );
                        }
                    }
                    TimerEvent::Timeout { run_id, trial_index } => {
                        match engine.register_timeout(run_id, trial_index) {
                            ResponseOutcome::NextScheduled(next) => queue_stimulus(&tx, next),
                            ResponseOutcome::RunCompleted => break,
                            ResponseOutcome::Ignored => {}
                        }
                    }
                }
            }
            input = inputs.next() => {
                match input {
                    Some(PlayerInput::Choice(choice)) => {
                        match engine.register_choice(choice, timing::now()) {
                            ResponseOutcome::NextScheduled(next) => queue_stimulus(&tx, next),
                            ResponseOutcome::RunCompleted => break,
                            ResponseOutcome::Ignored => {}
                        }
                    }
                    Some(_) => {}
                    None => {
                        engine.abort();
                        return None;
                    }
                }
            }
        }
    }

    engine.metrics().map(|metrics| metrics.score)
}

async fn run_decision_efficiency(
    engine: &mut DecisionEfficiencyEngine,
    inputs: &mut UnboundedReceiver<PlayerInput>,
    rng: &mut impl Rng,
) -> Option<u8> {
    let (tx, mut events) = unbounded();
    let tick = engine.start(rng)?;
    queue_event(&tx, tick.wait_ms, TimerEvent::Tick { run_id: tick.run_id });

    loop {
        futures_util::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                match event {
                    TimerEvent::Tick { run_id } => match engine.tick_countdown(run_id) {
                        CountdownStep::Tick(next) => {
                            queue_event(&tx, next.wait_ms, TimerEvent::Tick { run_id: next.run_id });
                        }
                        CountdownStep::Begin(first) => queue_stimulus(&tx, first),
                        CountdownStep::Ignored => {
                            tracing::warn!(run_id, "stale countdown tick dropped");
                        }
                    },
                    TimerEvent::StimulusOn { run_id, trial_index } => {
                        if let Some(display_ms) =
                            engine.mark_cue_on(run_id, trial_index, timing::now())
                        {
                            queue_event(
                                &tx,
                                display_ms,
                                TimerEvent::StimulusOff { run_id, trial_index },
                            );
                        }
                    }
                    TimerEvent::StimulusOff { run_id, trial_index } => {
                        match engine.mark_cue_off(run_id, trial_index) {
                            ResponseOutcome::NextScheduled(next) => queue_stimulus(&tx, next),
                            ResponseOutcome::RunCompleted => break,
                            ResponseOutcome::Ignored => {}
                        }
                    }
                    TimerEvent::Timeout { .. } => {}
                }
            }
            input = inputs.next() => {
                match input {
                    Some(PlayerInput::Tap) | Some(PlayerInput::TapAt { .. }) => {
                        engine.register_tap(timing::now());
                    }
                    Some(_) => {}
                    None => {
                        engine.abort();
                        return None;
                    }
                }
            }
        }
    }

    engine.metrics().map(|metrics| metrics.score)
}

async fn run_visual_motor(
    engine: &mut VisualMotorEngine,
    inputs: &mut UnboundedReceiver<PlayerInput>,
    rng: &mut impl Rng,
) -> Option<u8> {
    let (tx, mut events) = unbounded();
    let tick = engine.start(rng)?;
    queue_event(&tx, tick.wait_ms, TimerEvent::Tick { run_id: tick.run_id });

    loop {
        futures_util::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                match event {
                    TimerEvent::Tick { run_id } => match engine.tick_countdown(run_id) {
                        CountdownStep::Tick(next) => {
                            queue_event(&tx, next.wait_ms, TimerEvent::Tick { run_id: next.run_id });
                        }
                        CountdownStep::Begin(first) => queue_stimulus(&tx, first),
                        CountdownStep::Ignored => {
                            tracing::warn!(run_id, "stale countdown tick dropped");
                        }
                    },
                    TimerEvent::StimulusOn { run_id, trial_index } => {
                        if let Some(display_ms) =
                            engine.mark_target_on(run_id, trial_index, timing::now())
                        {
                            queue_event(
                                &tx,
                                display_ms,
                                TimerEvent::Timeout { run_id, trial_index },
                            );
                        }
                    }
                    TimerEvent::Timeout { run_id, trial_index } => {
                        match engine.register_timeout(run_id, trial_index) {
                            ResponseOutcome::NextScheduled(next) => queue_stimulus(&tx, next),
                            ResponseOutcome::RunCompleted => break,
                            ResponseOutcome::Ignored => {}
                        }
                    }
                    TimerEvent::StimulusOff { .. } => {}
                }
            }
            input = inputs.next() => {
                match input {
                    Some(PlayerInput::TapAt { x, y }) => {
                        match engine.register_tap(x, y, timing::now()) {
                            ResponseOutcome::NextScheduled(next) => queue_stimulus(&tx, next),
                            ResponseOutcome::RunCompleted => break,
                            ResponseOutcome::Ignored => {}
                        }
                    }
                    Some(_) => {}
                    None => {
                        engine.abort();
                        return None;
                    }
                }
            }
        }
    }

    engine.metrics().map(|metrics| metrics.score)
}
