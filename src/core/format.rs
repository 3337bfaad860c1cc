//! Formatting helpers for presenting scores and gate timings.

pub fn format_ms(value: f64) -> String {
    format!("{value:.0} ms")
}

pub fn format_score(value: u8) -> String {
    format!("{value}/100")
}

/// Compact day-count phrase for gate messaging: `0 → "today"`, `1 → "1 day"`,
/// otherwise `"N days"`.
pub fn format_days(days: i64) -> String {
    match days {
        d if d <= 0 => "today".to_string(),
        1 => "1 day".to_string(),
        d => format!("{d} days"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_phrases() {
        assert_eq!(format_days(0), "today");
        assert_eq!(format_days(1), "1 day");
        assert_eq!(format_days(45), "45 days");
    }
}
