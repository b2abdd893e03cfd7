use std::time::{Duration, Instant};

use crate::timer::Deadline;

/// Payload liveness: has a status frame arrived recently?
///
/// Independent of the heartbeat. The transport can be perfectly healthy while
/// the device has stopped reporting.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    window: Duration,
    last_status: Option<Instant>,
    expiry: Deadline,
}

impl LivenessMonitor {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_status: None,
            expiry: Deadline::default(),
        }
    }

    /// A status frame was decoded; restart the window.
    pub fn on_status_received(&mut self, now: Instant) {
        self.last_status = Some(now);
        self.expiry.arm_after(now, self.window);
    }

    /// True before the first frame and whenever the window has elapsed.
    pub fn is_stale(&self, now: Instant) -> bool {
        match self.last_status {
            Some(at) => now.saturating_duration_since(at) >= self.window,
            None => true,
        }
    }

    /// Returns true once per transition into staleness.
    pub fn poll(&mut self, now: Instant) -> bool {
        self.expiry.fire(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.expiry.at()
    }

    /// Forget everything, as on session teardown.
    pub fn reset(&mut self) {
        self.last_status = None;
        self.expiry.cancel();
    }
}
