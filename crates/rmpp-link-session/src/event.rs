use rmpp_link_frame::{Direction, StatusFrame};

use crate::session::LinkState;

/// Something the UI side should know about, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The session moved to a new connection state.
    StateChanged(LinkState),
    /// Flags byte 1 differs from the previous frame.
    MotionChanged { mode: u8, direction: Direction },
    /// A status frame was decoded.
    Status(StatusFrame),
    /// The device's external-control flag flipped.
    ExternalControl { enabled: bool },
    /// No status frame within the liveness window; readouts should show "no data".
    Stale,
    /// The operator setpoint was reset to zero.
    SetpointReset,
}

impl LinkEvent {
    /// Deliver this event to the matching observer callback.
    pub fn dispatch<O: LinkObserver + ?Sized>(&self, observer: &mut O) {
        match self {
            Self::StateChanged(state) => observer.on_state_changed(*state),
            Self::MotionChanged { mode, direction } => observer.on_motion_changed(*mode, *direction),
            Self::Status(frame) => observer.on_status(frame),
            Self::ExternalControl { enabled } => observer.on_external_control(*enabled),
            Self::Stale => observer.on_stale(),
            Self::SetpointReset => observer.on_setpoint_reset(),
        }
    }
}

/// Subscription point for the UI collaborator. Every callback is optional.
pub trait LinkObserver {
    fn on_state_changed(&mut self, _state: LinkState) {}

    fn on_motion_changed(&mut self, _mode: u8, _direction: Direction) {}

    fn on_status(&mut self, _frame: &StatusFrame) {}

    fn on_external_control(&mut self, _enabled: bool) {}

    fn on_stale(&mut self) {}

    fn on_setpoint_reset(&mut self) {}
}

/// Collects events as they are dispatched.
impl LinkObserver for Vec<LinkEvent> {
    fn on_state_changed(&mut self, state: LinkState) {
        self.push(LinkEvent::StateChanged(state));
    }

    fn on_motion_changed(&mut self, mode: u8, direction: Direction) {
        self.push(LinkEvent::MotionChanged { mode, direction });
    }

    fn on_status(&mut self, frame: &StatusFrame) {
        self.push(LinkEvent::Status(*frame));
    }

    fn on_external_control(&mut self, enabled: bool) {
        self.push(LinkEvent::ExternalControl { enabled });
    }

    fn on_stale(&mut self) {
        self.push(LinkEvent::Stale);
    }

    fn on_setpoint_reset(&mut self) {
        self.push(LinkEvent::SetpointReset);
    }
}
