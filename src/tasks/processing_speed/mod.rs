//! Processing-speed subtest: flash an 8-pattern grid, hide it, ask how many
//! patterns matched the target.

pub mod engine;
pub mod metrics;

pub use engine::{PatternTrial, Phase, ProcessingSpeedConfig, ProcessingSpeedEngine, TrialOutcome};
pub use metrics::ProcessingSpeedMetrics;
