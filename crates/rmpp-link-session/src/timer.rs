use std::time::{Duration, Instant};

/// A single-shot timer slot.
///
/// Arming replaces whatever deadline was pending, so one slot can never hold
/// two live timers. Firing clears the slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Arm for an absolute instant.
    pub fn arm(&mut self, at: Instant) {
        self.at = Some(at);
    }

    /// Arm for `after` from `now`.
    pub fn arm_after(&mut self, now: Instant, after: Duration) {
        self.arm(now + after);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Pending deadline, if any.
    pub fn at(&self) -> Option<Instant> {
        self.at
    }

    /// Returns true exactly once when `now` has reached the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.at {
            Some(at) if now >= at => {
                self.at = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of several optional deadlines.
pub(crate) fn earliest(deadlines: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    deadlines.into_iter().flatten().min()
}
