//! Retest gate for the diagnostic battery.
//!
//! A completed assessment locks its (user, sport) pair for a fixed interval:
//! a new attempt may be recorded no earlier than `next_test_date`, 112 days
//! (16 weeks) after the test date. The gate is a pure function of "today"
//! and the single latest stored result; with no prior result it is always
//! open, since a first assessment establishes the baseline.
//!
//! Cooldown math is date-granular: hours and minutes never matter, only
//! whole calendar days.

use time::{Date, Duration};

use crate::core::format;
use crate::core::storage::DiagnosticResult;

/// Days between a completed assessment and the earliest permitted retest.
pub const RETEST_INTERVAL_DAYS: i64 = 112;

/// The earliest date a new assessment may be recorded after one completed on
/// `test_date`.
pub fn next_test_date(test_date: Date) -> Date {
    test_date + Duration::days(RETEST_INTERVAL_DAYS)
}

/// Output of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    /// Whether a new assessment may be recorded today.
    pub can_take_test: bool,
    /// Whole days until the gate opens; 0 when it already is.
    pub days_remaining: i64,
    /// Test date of the governing result, if one exists and parses.
    pub last_test_date: Option<Date>,
    /// Date the gate opens, if a governing result exists.
    pub next_test_date: Option<Date>,
}

impl Eligibility {
    /// Short status label suitable for a badge.
    pub fn status_label(&self) -> &'static str {
        if self.can_take_test {
            "Ready"
        } else {
            "Locked"
        }
    }

    /// Human detail sentence (English).
    pub fn detail_message(&self) -> String {
        match (self.last_test_date, self.next_test_date) {
            (None, _) => "No prior assessment on record.".to_string(),
            (Some(_), Some(next)) if self.can_take_test => {
                format!("Retest window open since {next}.")
            }
            (Some(_), Some(next)) => {
                format!(
                    "Next assessment available {next} ({}).",
                    format::format_days(self.days_remaining)
                )
            }
            _ => "Unable to read the previous assessment date.".to_string(),
        }
    }
}

/// Evaluate the gate for `today` against the latest stored result. A row
/// whose dates fail to parse degrades to "no usable record", which leaves
/// the gate open rather than locking a subject out on corrupt data.
pub fn evaluate(today: Date, latest: Option<&DiagnosticResult>) -> Eligibility {
    let open = Eligibility {
        can_take_test: true,
        days_remaining: 0,
        last_test_date: None,
        next_test_date: None,
    };

    let Some(row) = latest else {
        return open;
    };
    let Some(last) = row.parsed_test_date() else {
        return open;
    };
    let next = row
        .parsed_next_test_date()
        .unwrap_or_else(|| next_test_date(last));

    let days_until = (next - today).whole_days();
    Eligibility {
        can_take_test: days_until <= 0,
        days_remaining: days_until.max(0),
        last_test_date: Some(last),
        next_test_date: Some(next),
    }
}
