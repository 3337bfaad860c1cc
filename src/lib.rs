//! Headless core of the cognition diagnostic: three precisely-timed subtest
//! state machines (processing speed, decision efficiency, visual-motor
//! integration), per-subtest scoring, overall aggregation with longitudinal
//! deltas, and a 112-day retest gate over an append-only result store.

pub mod battery;
pub mod core;
pub mod tasks;

pub use battery::{DiagnosticOrchestrator, Eligibility};
pub use crate::core::storage::{DiagnosticResult, ResultStore, ScoreComparison, Sport};
