//! Decision-efficiency subtest: go/no-go response inhibition over a colored
//! cue stream.

pub mod engine;
pub mod metrics;

pub use engine::{CueTrial, DecisionEfficiencyConfig, DecisionEfficiencyEngine, Phase, TrialOutcome};
pub use metrics::DecisionEfficiencyMetrics;
