use crate::fatal;
use chrono::{DateTime, TimeDelta, Utc};

/// A delay pinned to the instant a phase was entered.
///
/// Zero and negative delays are representable; such a deadline has already elapsed at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDeadline {
    start: DateTime<Utc>,
    delay: TimeDelta,
}

impl PhaseDeadline {
    pub fn new(start: DateTime<Utc>, delay: TimeDelta) -> Self { Self { start, delay } }
    pub fn start(&self) -> DateTime<Utc> { self.start }
    pub fn delay(&self) -> TimeDelta { self.delay }

    pub fn end(&self) -> DateTime<Utc> {
        self.start
            .checked_add_signed(self.delay)
            .unwrap_or_else(|| fatal!("Phase deadline {} after {} overflows the calendar", self.delay, self.start))
    }

    /// Time until the deadline, clamped at zero once it has passed.
    pub fn time_left(&self, now: DateTime<Utc>) -> TimeDelta {
        (self.end() - now).max(TimeDelta::zero())
    }

    pub fn has_elapsed(&self, now: DateTime<Utc>) -> bool { now >= self.end() }
}
