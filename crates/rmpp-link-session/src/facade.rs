use rmpp_link_frame::{CommandFrame, Direction, MAX_DUTY};
use rmpp_link_transport::Connector;
use tracing::debug;

use crate::event::LinkEvent;
use crate::session::LinkSession;

/// Convert a 0–100 slider percentage to the 12-bit duty domain.
///
/// `floor(pct * 4096 / 100)`, so 100 % maps to 4096 and saturates to
/// [`MAX_DUTY`] when encoded. Out-of-range and NaN input is clamped first.
pub fn duty_from_percent(percent: f32) -> u16 {
    let percent = clamp_percent(percent);
    let duty = (f64::from(percent) * 4096.0 / 100.0).floor();
    duty.min(f64::from(MAX_DUTY + 1)) as u16
}

fn clamp_percent(percent: f32) -> f32 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// Operator intent, turned into command frames.
///
/// A short-lived borrow of the session, obtained through
/// [`LinkSession::control`]. Every method returns whether a frame was
/// actually transmitted.
pub struct ControlFacade<'a, C: Connector> {
    session: &'a mut LinkSession<C>,
}

impl<'a, C: Connector> ControlFacade<'a, C> {
    pub(crate) fn new(session: &'a mut LinkSession<C>) -> Self {
        Self { session }
    }

    /// Select a travel direction and send a zero-duty command in it.
    ///
    /// `Direction::None` clears the selection and sends nothing; the wire has
    /// no way to say "no direction" except the power-off frame.
    pub fn select_direction(&mut self, direction: Direction) -> bool {
        self.session.set_direction(direction);
        match CommandFrame::drive(direction, 0) {
            Ok(frame) => self.session.send(&frame.encode()),
            Err(_) => {
                debug!("direction cleared");
                false
            }
        }
    }

    /// Move the setpoint; sent only when a direction is selected.
    pub fn set_duty_percent(&mut self, percent: f32) -> bool {
        self.session.set_duty_percent(clamp_percent(percent));
        self.session.send_setpoint()
    }

    /// Zero the operator setpoint without transmitting anything.
    ///
    /// The device keeps its last commanded state until the next setpoint or
    /// power-off.
    pub fn stop(&mut self) {
        self.session.set_duty_percent(0.0);
        self.session.push_event(LinkEvent::SetpointReset);
    }

    /// Clear the direction and send the safe-stop frame `12 00 00`, whatever
    /// the current selection.
    pub fn power_off(&mut self) -> bool {
        self.session.set_direction(Direction::None);
        self.session.set_duty_percent(0.0);
        self.session.push_event(LinkEvent::SetpointReset);
        self.session.send(&CommandFrame::power_off().encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_to_duty_reference_points() {
        assert_eq!(duty_from_percent(0.0), 0);
        assert_eq!(duty_from_percent(50.0), 2048);
        assert_eq!(duty_from_percent(25.0), 1024);
        assert_eq!(duty_from_percent(33.3), 1363);
        assert_eq!(duty_from_percent(99.99), 4095);
        assert_eq!(duty_from_percent(100.0), 4096);
    }

    #[test]
    fn percent_out_of_range_clamps() {
        assert_eq!(duty_from_percent(-5.0), 0);
        assert_eq!(duty_from_percent(250.0), 4096);
        assert_eq!(duty_from_percent(f32::NAN), 0);
    }
}
