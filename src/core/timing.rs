//! High-resolution timing utilities for task engines.
//!
//! Scored response times come from a monotonic clock, never from frame
//! callbacks: `now()` measures milliseconds since a process-local origin
//! pinned on first use. Event sources stamp their events at the source
//! (`timing::now()` at the input site) so queue latency never inflates a
//! reaction time.

use once_cell::sync::Lazy;
use std::time::Instant;

static ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// A monotonic millisecond stamp. Differences between stamps are meaningful;
/// absolute values are not.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
pub struct InstantStamp {
    ms: f64,
}

impl InstantStamp {
    pub fn from_ms(ms: f64) -> Self {
        Self { ms }
    }

    pub fn as_ms(&self) -> f64 {
        self.ms
    }

    /// Elapsed milliseconds since `earlier`. Clamped at zero so a stamp pair
    /// delivered out of order cannot produce a negative reaction time.
    pub fn since(&self, earlier: InstantStamp) -> f64 {
        (self.ms - earlier.ms).max(0.0)
    }
}

/// Current monotonic stamp.
pub fn now() -> InstantStamp {
    InstantStamp::from_ms(ORIGIN.elapsed().as_secs_f64() * 1000.0)
}

/// Suspend the current task for `ms` milliseconds.
pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
}

/// The timing envelope of a single trial's response phase.
///
/// A window opens at a stamp with a bounded duration and resolves exactly
/// once: either to the first in-window response or to a timeout. Late
/// responses and duplicate events are ignored rather than re-recorded.
#[derive(Debug, Clone, Copy)]
pub struct ResponseWindow {
    opened_at: InstantStamp,
    max_ms: u64,
    resolved: bool,
}

impl ResponseWindow {
    pub fn open(opened_at: InstantStamp, max_ms: u64) -> Self {
        Self {
            opened_at,
            max_ms,
            resolved: false,
        }
    }

    pub fn opened_at(&self) -> InstantStamp {
        self.opened_at
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Accept a response at `now`. Returns the elapsed milliseconds from
    /// window open for the first response that lands inside the window;
    /// `None` if the window already resolved or `now` is past the deadline.
    pub fn try_respond(&mut self, now: InstantStamp) -> Option<f64> {
        if self.resolved {
            return None;
        }
        let elapsed = now.since(self.opened_at);
        if elapsed > self.max_ms as f64 {
            return None;
        }
        self.resolved = true;
        Some(elapsed)
    }

    /// Record a timeout. Returns `true` only for the first resolution, so a
    /// timer that fires after a response was already accepted is a no-op.
    pub fn expire(&mut self) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(ms: f64) -> InstantStamp {
        InstantStamp::from_ms(ms)
    }

    #[test]
    fn first_response_wins() {
        let mut window = ResponseWindow::open(stamp(1000.0), 3000);
        assert_eq!(window.try_respond(stamp(1450.0)), Some(450.0));
        assert_eq!(window.try_respond(stamp(1500.0)), None);
        assert!(!window.expire());
    }

    #[test]
    fn late_response_gets_no_credit() {
        let mut window = ResponseWindow::open(stamp(1000.0), 3000);
        assert_eq!(window.try_respond(stamp(4200.0)), None);
        assert!(window.expire());
    }

    #[test]
    fn timeout_records_exactly_once() {
        let mut window = ResponseWindow::open(stamp(0.0), 800);
        assert!(window.expire());
        assert!(!window.expire());
        assert_eq!(window.try_respond(stamp(100.0)), None);
    }

    #[test]
    fn out_of_order_stamps_clamp_to_zero() {
        let mut window = ResponseWindow::open(stamp(500.0), 1000);
        assert_eq!(window.try_respond(stamp(400.0)), Some(0.0));
    }

    #[test]
    fn monotonic_now_advances() {
        let a = now();
        let b = now();
        assert!(b.as_ms() >= a.as_ms());
    }
}
