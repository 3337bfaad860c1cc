//! Visual-motor integration subtest: tap circular targets as they appear.

pub mod engine;
pub mod metrics;

pub use engine::{Phase, TargetTrial, TrialOutcome, VisualMotorConfig, VisualMotorEngine};
pub use metrics::VisualMotorMetrics;
