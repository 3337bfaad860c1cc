//! Shared scoring helpers.
//!
//! Every place that needs the overall diagnostic score goes through
//! `overall_score` so the "rounded mean of the three subtests" invariant
//! holds by construction instead of by duplication.

/// Overall diagnostic score: unweighted mean of the three subtest scores,
/// rounded to the nearest integer.
pub fn overall_score(processing_speed: u8, decision_efficiency: u8, visual_motor: u8) -> u8 {
    let sum = processing_speed as f64 + decision_efficiency as f64 + visual_motor as f64;
    (sum / 3.0).round() as u8
}

/// Collapse accumulated component points into a final subtest score,
/// capped to the 0..=100 integer range.
pub fn cap_score(points: f64) -> u8 {
    points.min(100.0).max(0.0).round() as u8
}

/// Mean of a slice, 0.0 when empty.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        0.0
    } else {
        data.iter().sum::<f64>() / data.len() as f64
    }
}
