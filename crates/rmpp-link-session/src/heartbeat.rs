use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::timer::{earliest, Deadline};

/// Where the ping/pong cycle currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    /// No open transport to supervise.
    Stopped,
    /// Transport open, waiting out the quiet period.
    Idle,
    /// Probe sent, waiting for the acknowledgment.
    PingSent,
    /// Acknowledgment never came; the transport must be replaced.
    ReconnectRequested,
}

/// What the supervisor needs the session to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send the heartbeat probe now.
    SendProbe,
    /// Discard the transport and open a new one.
    Reconnect,
}

/// Transport liveness supervisor.
///
/// Runs the cycle `Idle --quiet period--> PingSent --ack--> Idle`, or
/// `PingSent --timeout--> ReconnectRequested`. Only the session's
/// [`start`](Self::start) leaves `ReconnectRequested`, so each expired probe
/// produces exactly one [`HeartbeatAction::Reconnect`].
#[derive(Debug, Clone)]
pub struct HeartbeatSupervisor {
    state: HeartbeatState,
    quiet: Deadline,
    timeout: Deadline,
    quiet_period: Duration,
    ack_timeout: Duration,
}

impl HeartbeatSupervisor {
    pub fn new(quiet_period: Duration, ack_timeout: Duration) -> Self {
        Self {
            state: HeartbeatState::Stopped,
            quiet: Deadline::default(),
            timeout: Deadline::default(),
            quiet_period,
            ack_timeout,
        }
    }

    pub fn state(&self) -> HeartbeatState {
        self.state
    }

    /// Begin a fresh cycle on a newly opened transport.
    pub fn start(&mut self, now: Instant) {
        self.state = HeartbeatState::Idle;
        self.timeout.cancel();
        self.quiet.arm_after(now, self.quiet_period);
        trace!(quiet_period = ?self.quiet_period, "heartbeat cycle started");
    }

    /// Cancel everything; the transport is gone.
    pub fn stop(&mut self) {
        self.state = HeartbeatState::Stopped;
        self.quiet.cancel();
        self.timeout.cancel();
    }

    /// Handle an acknowledgment. Returns false if no probe was outstanding.
    pub fn on_ack(&mut self, now: Instant) -> bool {
        if self.state != HeartbeatState::PingSent {
            debug!(state = ?self.state, "heartbeat ack without outstanding probe");
            return false;
        }
        self.timeout.cancel();
        self.state = HeartbeatState::Idle;
        self.quiet.arm_after(now, self.quiet_period);
        true
    }

    /// Advance the cycle. At most one action per call.
    pub fn poll(&mut self, now: Instant) -> Option<HeartbeatAction> {
        match self.state {
            HeartbeatState::Idle if self.quiet.fire(now) => {
                self.state = HeartbeatState::PingSent;
                self.timeout.arm_after(now, self.ack_timeout);
                Some(HeartbeatAction::SendProbe)
            }
            HeartbeatState::PingSent if self.timeout.fire(now) => {
                self.state = HeartbeatState::ReconnectRequested;
                self.quiet.cancel();
                Some(HeartbeatAction::Reconnect)
            }
            _ => None,
        }
    }

    /// Next instant at which [`poll`](Self::poll) may act.
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([self.quiet.at(), self.timeout.at()])
    }
}
