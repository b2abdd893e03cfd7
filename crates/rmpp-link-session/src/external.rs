use std::time::{Duration, Instant};

use crate::timer::Deadline;

/// Edge seen on the device's external-control flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalControlTransition {
    Started,
    Stopped,
}

#[derive(Debug, Clone)]
struct ResendTask {
    next: Deadline,
}

/// Periodic setpoint resend while the device reports external control.
///
/// The loop is active exactly when its resend task exists, so the two can
/// never disagree, and repeated enables cannot create a second task.
#[derive(Debug, Clone)]
pub struct ExternalControlLoop {
    period: Duration,
    task: Option<ResendTask>,
}

impl ExternalControlLoop {
    pub fn new(period: Duration) -> Self {
        Self { period, task: None }
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Feed the flag from a decoded status frame.
    pub fn observe(&mut self, enabled: bool, now: Instant) -> Option<ExternalControlTransition> {
        match (enabled, self.task.is_some()) {
            (true, false) => {
                let mut next = Deadline::default();
                next.arm_after(now, self.period);
                self.task = Some(ResendTask { next });
                Some(ExternalControlTransition::Started)
            }
            (false, true) => {
                self.task = None;
                Some(ExternalControlTransition::Stopped)
            }
            _ => None,
        }
    }

    /// Returns true when a resend is due, and schedules the next one.
    ///
    /// Ticks keep a fixed cadence; if the caller fell more than a period
    /// behind, missed ticks are skipped rather than replayed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(task) = self.task.as_mut() else {
            return false;
        };
        let Some(due) = task.next.at() else {
            return false;
        };
        if !task.next.fire(now) {
            return false;
        }
        let mut next = due + self.period;
        if next <= now {
            next = now + self.period;
        }
        task.next.arm(next);
        true
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.task.as_ref().and_then(|task| task.next.at())
    }

    /// Drop the task regardless of the flag, as on session teardown.
    pub fn cancel(&mut self) {
        self.task = None;
    }
}
