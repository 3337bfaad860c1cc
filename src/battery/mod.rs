//! The diagnostic battery: sequencing, eligibility, and the headless driver.

pub mod gate;
pub mod orchestrator;
pub mod runner;

pub use gate::{evaluate, Eligibility, RETEST_INTERVAL_DAYS};
pub use orchestrator::{BatteryError, BatteryPhase, DiagnosticOrchestrator, SubtestScores};
pub use runner::{run_battery, PlayerInput, RunnerConfig};
