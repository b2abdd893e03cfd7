use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rmpp_link_frame::{decode_status, CommandFrame, Direction, StatusFrame};
use rmpp_link_transport::{Connector, Message, MessageTransport, TransportError};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::LinkConfig;
use crate::control::{is_heartbeat_ack, HEARTBEAT_PROBE};
use crate::event::LinkEvent;
use crate::external::{ExternalControlLoop, ExternalControlTransition};
use crate::facade::{duty_from_percent, ControlFacade};
use crate::heartbeat::{HeartbeatAction, HeartbeatSupervisor};
use crate::liveness::LivenessMonitor;
use crate::timer::{earliest, Deadline};

/// Connection state of a [`LinkSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// A transport is being constructed.
    Connecting,
    /// Transport up, no heartbeat probe outstanding.
    Open,
    /// Transport up, heartbeat probe outstanding.
    AwaitingPong,
    /// No transport. A retry may be scheduled.
    Closed,
}

impl LinkState {
    /// Payload can be sent in this state.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::AwaitingPong)
    }
}

/// The single authoritative connection to the device.
///
/// Owns the transport exclusively; reconnecting replaces it, and no other
/// component ever holds it. Also owns the operator's setpoint (direction and
/// duty percentage) and the last seen flags byte 1, because both are needed
/// to rebuild outgoing commands and to filter indicator updates.
pub struct LinkSession<C: Connector> {
    connector: C,
    transport: Option<C::Transport>,
    state: LinkState,
    config: LinkConfig,
    heartbeat: HeartbeatSupervisor,
    liveness: LivenessMonitor,
    external: ExternalControlLoop,
    retry: Deadline,
    direction: Direction,
    duty_percent: f32,
    last_motion_flags: Option<u8>,
    last_seen: Instant,
    reconnects: u64,
    events: VecDeque<LinkEvent>,
}

impl<C: Connector> LinkSession<C> {
    /// Create a closed session. Nothing happens until [`open`](Self::open).
    pub fn new(connector: C, config: LinkConfig) -> Self {
        Self {
            connector,
            transport: None,
            state: LinkState::Closed,
            heartbeat: HeartbeatSupervisor::new(
                config.heartbeat_interval,
                config.heartbeat_timeout,
            ),
            liveness: LivenessMonitor::new(config.stale_after),
            external: ExternalControlLoop::new(config.resend_period),
            config,
            retry: Deadline::default(),
            direction: Direction::None,
            duty_percent: 0.0,
            last_motion_flags: None,
            last_seen: Instant::now(),
            reconnects: 0,
            events: VecDeque::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Direction used for outgoing commands.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Operator setpoint, 0–100.
    pub fn duty_percent(&self) -> f32 {
        self.duty_percent
    }

    /// Reconnects forced by heartbeat timeouts or transport errors.
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects
    }

    pub fn heartbeat(&self) -> &HeartbeatSupervisor {
        &self.heartbeat
    }

    pub fn liveness(&self) -> &LivenessMonitor {
        &self.liveness
    }

    pub fn external_control(&self) -> &ExternalControlLoop {
        &self.external
    }

    /// True while a transport exists.
    pub fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// True while a failed connect is waiting for its retry.
    pub fn retry_pending(&self) -> bool {
        self.retry.is_armed()
    }

    /// Operator-facing API.
    pub fn control(&mut self) -> ControlFacade<'_, C> {
        ControlFacade::new(self)
    }

    /// Construct a fresh transport, replacing any existing one.
    ///
    /// On failure the session is Closed and a retry is scheduled after the
    /// configured interval; the error is returned for callers that want it.
    pub fn open(&mut self, now: Instant) -> Result<(), TransportError> {
        self.last_seen = now;
        self.retry.cancel();
        self.heartbeat.stop();
        self.transport = None;
        self.set_state(LinkState::Connecting);

        match self.connector.connect() {
            Ok(transport) => {
                self.transport = Some(transport);
                self.set_state(LinkState::Open);
                self.heartbeat.start(now);
                info!(endpoint = %self.connector.endpoint(), "link open");
                Ok(())
            }
            Err(err) => {
                warn!(
                    endpoint = %self.connector.endpoint(),
                    error = %err,
                    retry_in = ?self.config.retry_interval,
                    "connect failed"
                );
                self.set_state(LinkState::Closed);
                self.retry.arm_after(now, self.config.retry_interval);
                Err(err)
            }
        }
    }

    /// Tear the session down: drop the transport and cancel every timer.
    pub fn shutdown(&mut self) {
        self.transport = None;
        self.heartbeat.stop();
        self.liveness.reset();
        self.external.cancel();
        self.retry.cancel();
        self.last_motion_flags = None;
        self.set_state(LinkState::Closed);
        debug!("link session shut down");
    }

    /// Wait up to `timeout` for the next inbound message.
    ///
    /// Without a transport this returns `Ok(None)` immediately.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>, TransportError> {
        match self.transport.as_mut() {
            Some(transport) => transport.recv_timeout(timeout),
            None => Ok(None),
        }
    }

    /// Classify and handle one inbound message.
    pub fn handle_message(&mut self, message: Message, now: Instant) {
        self.last_seen = now;
        match message {
            Message::Text(text) if is_heartbeat_ack(&text) => {
                if self.heartbeat.on_ack(now) {
                    trace!("heartbeat acknowledged");
                    self.set_state(LinkState::Open);
                }
            }
            Message::Text(text) => {
                warn!(text = %text, "dropping unrecognized text message");
            }
            Message::Binary(payload) => match decode_status(&payload) {
                Ok(frame) => self.fan_out(frame, now),
                Err(err) => {
                    warn!(error = %err, "dropping undecodable payload");
                    debug!(raw = ?err.raw(), "undecodable payload bytes");
                }
            },
        }
    }

    /// The transport reported a failure: replace it immediately.
    pub fn handle_transport_error(&mut self, err: TransportError, now: Instant) {
        warn!(error = %err, "transport failed; reconnecting");
        self.reconnect(now);
    }

    /// Service every timer that is due at `now`.
    pub fn handle_timeout(&mut self, now: Instant) {
        self.last_seen = now;

        while let Some(action) = self.heartbeat.poll(now) {
            match action {
                HeartbeatAction::SendProbe => self.send_probe(),
                HeartbeatAction::Reconnect => {
                    warn!(
                        timeout = ?self.config.heartbeat_timeout,
                        "heartbeat not acknowledged; reconnecting"
                    );
                    self.reconnect(now);
                }
            }
        }

        if self.liveness.poll(now) {
            warn!(window = ?self.config.stale_after, "no status frame received; link stale");
            self.events.push_back(LinkEvent::Stale);
        }

        if self.external.poll(now) {
            trace!("external control resend");
            self.send_setpoint();
        }

        // Last, so a write failure above is recovered within the same call.
        if self.retry.fire(now) {
            let _ = self.open(now);
        }
    }

    /// Earliest pending timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        earliest([
            self.retry.at(),
            self.heartbeat.next_deadline(),
            self.liveness.next_deadline(),
            self.external.next_deadline(),
        ])
    }

    /// Send a payload buffer. Returns whether it went out.
    ///
    /// Payloads offered while the link is not open are dropped, not queued:
    /// a setpoint delivered late is worse than none.
    pub fn send(&mut self, payload: &[u8]) -> bool {
        if !self.state.is_open() {
            debug!(state = ?self.state, len = payload.len(), "link not open; dropping payload");
            return false;
        }
        let message = Message::binary(payload.to_vec());
        self.transmit(&message)
    }

    /// Next queued event, oldest first.
    pub fn poll_event(&mut self) -> Option<LinkEvent> {
        self.events.pop_front()
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn set_duty_percent(&mut self, percent: f32) {
        self.duty_percent = percent;
    }

    pub(crate) fn push_event(&mut self, event: LinkEvent) {
        self.events.push_back(event);
    }

    /// Send the current setpoint. Without a direction there is nothing to send.
    pub(crate) fn send_setpoint(&mut self) -> bool {
        match CommandFrame::drive(self.direction, duty_from_percent(self.duty_percent)) {
            Ok(frame) => self.send(&frame.encode()),
            Err(_) => false,
        }
    }

    fn fan_out(&mut self, frame: StatusFrame, now: Instant) {
        self.liveness.on_status_received(now);

        let motion = frame.motion_flags();
        if self.last_motion_flags != Some(motion) {
            self.last_motion_flags = Some(motion);
            self.direction = frame.direction;
            debug!(mode = frame.mode, direction = ?frame.direction, "device motion changed");
            self.events.push_back(LinkEvent::MotionChanged {
                mode: frame.mode,
                direction: frame.direction,
            });
        }

        self.events.push_back(LinkEvent::Status(frame));

        match self.external.observe(frame.external_control, now) {
            Some(ExternalControlTransition::Started) => {
                info!("external control enabled");
                self.events
                    .push_back(LinkEvent::ExternalControl { enabled: true });
            }
            Some(ExternalControlTransition::Stopped) => {
                info!("external control disabled");
                self.events
                    .push_back(LinkEvent::ExternalControl { enabled: false });
            }
            None => {}
        }
    }

    fn send_probe(&mut self) {
        trace!("sending heartbeat probe");
        self.set_state(LinkState::AwaitingPong);
        self.transmit(&Message::text(HEARTBEAT_PROBE));
    }

    /// Write to the transport. A write failure closes the session and makes
    /// the reconnect due immediately.
    fn transmit(&mut self, message: &Message) -> bool {
        let Some(transport) = self.transport.as_mut() else {
            return false;
        };
        match transport.send(message) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, kind = message.kind_name(), "send failed; reconnecting");
                self.reconnects += 1;
                self.transport = None;
                self.heartbeat.stop();
                self.set_state(LinkState::Closed);
                self.retry.arm(self.last_seen);
                false
            }
        }
    }

    fn reconnect(&mut self, now: Instant) {
        self.reconnects += 1;
        self.transport = None;
        self.heartbeat.stop();
        self.set_state(LinkState::Closed);
        let _ = self.open(now);
    }

    fn set_state(&mut self, state: LinkState) {
        if self.state == state {
            return;
        }
        debug!(from = ?self.state, to = ?state, "link state");
        self.state = state;
        self.events.push_back(LinkEvent::StateChanged(state));
    }
}

impl<C: Connector> std::fmt::Debug for LinkSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSession")
            .field("endpoint", &self.connector.endpoint())
            .field("state", &self.state)
            .field("direction", &self.direction)
            .field("duty_percent", &self.duty_percent)
            .field("reconnects", &self.reconnects)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::control::HEARTBEAT_ACK;
    use crate::heartbeat::HeartbeatState;
    use crate::testing::{ScriptedConnector, Wire};

    const FORWARD_ON: u8 = 0x12;
    const REVERSE_ON: u8 = 0x22;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn status(motion: u8, flags: u8) -> Message {
        Message::binary(vec![0x04, motion, flags, 120, 0x99])
    }

    fn opened(t0: Instant) -> (LinkSession<ScriptedConnector>, Rc<RefCell<Wire>>) {
        let (connector, wire) = ScriptedConnector::new();
        let mut session = LinkSession::new(connector, LinkConfig::default());
        session.open(t0).unwrap();
        drain(&mut session);
        (session, wire)
    }

    fn drain(session: &mut LinkSession<ScriptedConnector>) -> Vec<LinkEvent> {
        std::iter::from_fn(|| session.poll_event()).collect()
    }

    #[test]
    fn open_reports_connecting_then_open() {
        let (connector, wire) = ScriptedConnector::new();
        let mut session = LinkSession::new(connector, LinkConfig::default());
        assert_eq!(session.state(), LinkState::Closed);

        session.open(Instant::now()).unwrap();
        assert_eq!(
            drain(&mut session),
            vec![
                LinkEvent::StateChanged(LinkState::Connecting),
                LinkEvent::StateChanged(LinkState::Open),
            ]
        );
        assert_eq!(wire.borrow().connects, 1);
        assert_eq!(session.heartbeat().state(), HeartbeatState::Idle);
    }

    #[test]
    fn status_frame_fans_out_and_motion_changes_only_on_new_flags() {
        let t0 = Instant::now();
        let (mut session, _wire) = opened(t0);

        session.handle_message(status(FORWARD_ON, 0), t0 + ms(10));
        let events = drain(&mut session);
        assert_eq!(
            events[0],
            LinkEvent::MotionChanged {
                mode: 2,
                direction: Direction::Forward
            }
        );
        assert!(matches!(events[1], LinkEvent::Status(frame) if frame.cpu_temperature == 25));
        assert_eq!(events.len(), 2);

        session.handle_message(status(FORWARD_ON, 0), t0 + ms(210));
        let events = drain(&mut session);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LinkEvent::Status(_)));
        assert!(!session.liveness().is_stale(t0 + ms(210)));
    }

    #[test]
    fn device_direction_overwrites_operator_direction() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);

        session.control().select_direction(Direction::Reverse);
        session.handle_message(status(FORWARD_ON, 0), t0 + ms(10));
        assert_eq!(session.direction(), Direction::Forward);

        assert!(session.control().set_duty_percent(25.0));
        assert_eq!(wire.borrow().sent_binary().last().unwrap(), &vec![0x12, 0x00, 0x44]);
    }

    #[test]
    fn undecodable_input_is_dropped() {
        let t0 = Instant::now();
        let (mut session, _wire) = opened(t0);

        session.handle_message(Message::binary(vec![0x04, 0x32, 0, 120, 0x99]), t0);
        session.handle_message(Message::binary(vec![0x04, 0x12, 0]), t0);
        session.handle_message(Message::binary(vec![0x05, 0x12, 0, 120, 0x99]), t0);
        session.handle_message(Message::text("hello"), t0);

        assert!(drain(&mut session).is_empty());
        assert_eq!(session.state(), LinkState::Open);
        assert!(session.liveness().is_stale(t0), "no frame was accepted");
    }

    #[test]
    fn unsolicited_pong_changes_nothing() {
        let t0 = Instant::now();
        let (mut session, _wire) = opened(t0);

        session.handle_message(Message::text(HEARTBEAT_ACK), t0 + ms(100));
        assert!(drain(&mut session).is_empty());
        assert_eq!(session.heartbeat().state(), HeartbeatState::Idle);
    }

    #[test]
    fn probe_and_ack_cycle() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);

        session.handle_timeout(t0 + ms(3999));
        assert!(wire.borrow().sent_text().is_empty());

        session.handle_timeout(t0 + ms(4000));
        assert_eq!(wire.borrow().sent_text(), vec!["ping".to_string()]);
        assert_eq!(session.state(), LinkState::AwaitingPong);
        assert!(session.is_open(), "payload may still be sent while awaiting pong");

        session.handle_message(Message::text("pong"), t0 + ms(4200));
        assert_eq!(session.state(), LinkState::Open);
        assert_eq!(
            drain(&mut session),
            vec![
                LinkEvent::StateChanged(LinkState::AwaitingPong),
                LinkEvent::StateChanged(LinkState::Open),
            ]
        );

        session.handle_timeout(t0 + ms(5200));
        assert_eq!(session.reconnect_count(), 0);
        assert_eq!(session.heartbeat().next_deadline(), Some(t0 + ms(8200)));
    }

    #[test]
    fn heartbeat_timeout_reconnects_exactly_once() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);

        session.handle_timeout(t0 + ms(4000));
        for late in [5000u64, 5000, 5001, 5500, 6000] {
            session.handle_timeout(t0 + ms(late));
        }

        assert_eq!(session.reconnect_count(), 1);
        assert_eq!(wire.borrow().connects, 2);
        assert_eq!(session.state(), LinkState::Open);
        assert_eq!(session.heartbeat().next_deadline(), Some(t0 + ms(9000)));
    }

    #[test]
    fn late_service_with_every_timer_due_reconnects_once() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);
        session.handle_message(status(FORWARD_ON, 0x01), t0 + ms(3500));
        session.handle_timeout(t0 + ms(4000));
        drain(&mut session);

        session.handle_timeout(t0 + ms(20_000));

        assert_eq!(session.reconnect_count(), 1);
        assert_eq!(wire.borrow().connects, 2);
        let events = drain(&mut session);
        assert_eq!(events.iter().filter(|e| **e == LinkEvent::Stale).count(), 1);
        assert_eq!(
            events
                .iter()
                .filter(|e| **e == LinkEvent::StateChanged(LinkState::Open))
                .count(),
            1
        );
    }

    #[test]
    fn transport_error_replaces_transport_immediately() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);

        session.handle_transport_error(TransportError::Closed, t0 + ms(50));

        assert_eq!(session.state(), LinkState::Open);
        assert_eq!(session.reconnect_count(), 1);
        assert_eq!(wire.borrow().connects, 2);
    }

    #[test]
    fn send_failure_reconnects_on_next_timeout() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);
        wire.borrow_mut().fail_sends = true;

        assert!(!session.control().select_direction(Direction::Forward));
        assert_eq!(session.state(), LinkState::Closed);
        assert!(session.retry_pending());
        assert!(!session.has_transport());

        wire.borrow_mut().fail_sends = false;
        session.handle_timeout(t0 + ms(1));
        assert_eq!(session.state(), LinkState::Open);
        assert_eq!(session.reconnect_count(), 1);
        assert_eq!(wire.borrow().connects, 2);
    }

    #[test]
    fn failed_connect_retries_at_fixed_interval() {
        let t0 = Instant::now();
        let (connector, wire) = ScriptedConnector::new();
        wire.borrow_mut().refuse_connects = true;
        let mut session = LinkSession::new(connector, LinkConfig::default());

        assert!(session.open(t0).is_err());
        assert_eq!(session.state(), LinkState::Closed);
        assert_eq!(session.next_deadline(), Some(t0 + ms(1000)));

        session.handle_timeout(t0 + ms(999));
        assert_eq!(wire.borrow().connects, 1);

        session.handle_timeout(t0 + ms(1000));
        assert_eq!(wire.borrow().connects, 2);
        assert_eq!(session.next_deadline(), Some(t0 + ms(2000)));

        wire.borrow_mut().refuse_connects = false;
        session.handle_timeout(t0 + ms(2000));
        assert_eq!(session.state(), LinkState::Open);
        assert_eq!(wire.borrow().connects, 3);
        assert_eq!(session.reconnect_count(), 0);
        assert!(!session.retry_pending());
    }

    #[test]
    fn send_is_a_no_op_unless_open() {
        let (connector, wire) = ScriptedConnector::new();
        let mut session = LinkSession::new(connector, LinkConfig::default());

        assert!(!session.send(&[0x12, 0, 0]));
        assert!(!session.control().power_off());
        assert!(wire.borrow().sent.is_empty());
    }

    #[test]
    fn direction_selection_sends_zero_duty_command() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);

        assert!(session.control().select_direction(Direction::Forward));
        assert!(session.control().select_direction(Direction::Reverse));
        assert!(!session.control().select_direction(Direction::None));

        assert_eq!(
            wire.borrow().sent_binary(),
            vec![vec![0x12, 0x00, 0x40], vec![0x12, 0x00, 0x80]]
        );
        assert_eq!(session.direction(), Direction::None);
    }

    #[test]
    fn duty_without_direction_is_stored_but_not_sent() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);

        assert!(!session.control().set_duty_percent(50.0));
        assert!(wire.borrow().sent.is_empty());
        assert_eq!(session.duty_percent(), 50.0);

        assert!(session.control().select_direction(Direction::Reverse));
        assert!(session.control().set_duty_percent(50.0));
        assert_eq!(wire.borrow().sent_binary().last().unwrap(), &vec![0x12, 0x00, 0x88]);
    }

    #[test]
    fn full_scale_duty_saturates() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);

        session.control().select_direction(Direction::Forward);
        session.control().set_duty_percent(100.0);
        assert_eq!(wire.borrow().sent_binary().last().unwrap(), &vec![0x12, 0xFF, 0x4F]);
    }

    #[test]
    fn power_off_sends_safe_stop_and_resets_setpoint() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);

        session.control().select_direction(Direction::Forward);
        session.control().set_duty_percent(40.0);
        drain(&mut session);

        assert!(session.control().power_off());
        assert_eq!(wire.borrow().sent_binary().last().unwrap(), &vec![0x12, 0x00, 0x00]);
        assert_eq!(session.direction(), Direction::None);
        assert_eq!(session.duty_percent(), 0.0);
        assert_eq!(drain(&mut session), vec![LinkEvent::SetpointReset]);
    }

    #[test]
    fn stop_resets_setpoint_without_sending() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);
        session.control().select_direction(Direction::Forward);
        session.control().set_duty_percent(40.0);
        let sent_before = wire.borrow().sent.len();

        session.control().stop();
        assert_eq!(wire.borrow().sent.len(), sent_before);
        assert_eq!(session.duty_percent(), 0.0);
        assert_eq!(session.direction(), Direction::Forward);
    }

    #[test]
    fn external_control_flag_pattern_starts_and_stops_once() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);
        session.control().select_direction(Direction::Forward);
        session.control().set_duty_percent(50.0);
        let sent_before = wire.borrow().sent_binary().len();

        for (i, flag) in [0u8, 1, 1, 1, 0].into_iter().enumerate() {
            let now = t0 + ms(i as u64 * 100);
            session.handle_message(status(FORWARD_ON, flag), now);
            session.handle_timeout(now);
        }

        let toggles: Vec<_> = drain(&mut session)
            .into_iter()
            .filter(|e| matches!(e, LinkEvent::ExternalControl { .. }))
            .collect();
        assert_eq!(
            toggles,
            vec![
                LinkEvent::ExternalControl { enabled: true },
                LinkEvent::ExternalControl { enabled: false },
            ]
        );
        assert!(!session.external_control().is_active());

        // Enabled at 100 ms, resent once at 300 ms, cancelled at 400 ms.
        let sent = wire.borrow().sent_binary();
        assert_eq!(sent.len() - sent_before, 1);
        assert_eq!(sent.last().unwrap(), &vec![0x12, 0x00, 0x48]);
    }

    #[test]
    fn external_control_resends_current_setpoint_each_period() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);
        session.handle_message(status(REVERSE_ON, 0x01), t0);
        session.control().set_duty_percent(25.0);
        let sent_before = wire.borrow().sent_binary().len();

        for tick in 1..=3u64 {
            session.handle_timeout(t0 + ms(tick * 200));
        }
        session.control().set_duty_percent(50.0);
        session.handle_timeout(t0 + ms(800));

        let sent = wire.borrow().sent_binary();
        let resent = &sent[sent_before..];
        assert_eq!(
            resent,
            &[
                vec![0x12, 0x00, 0x84],
                vec![0x12, 0x00, 0x84],
                vec![0x12, 0x00, 0x84],
                vec![0x12, 0x00, 0x88],
                vec![0x12, 0x00, 0x88],
            ]
        );
    }

    #[test]
    fn stale_link_reports_once_and_recovers_on_next_frame() {
        let t0 = Instant::now();
        let (mut session, _wire) = opened(t0);

        session.handle_message(status(FORWARD_ON, 0), t0 + ms(100));
        drain(&mut session);

        session.handle_timeout(t0 + ms(1099));
        assert!(drain(&mut session).is_empty());

        session.handle_timeout(t0 + ms(1100));
        session.handle_timeout(t0 + ms(1500));
        assert_eq!(drain(&mut session), vec![LinkEvent::Stale]);
        assert!(session.liveness().is_stale(t0 + ms(1500)));

        session.handle_message(status(FORWARD_ON, 0), t0 + ms(1600));
        let events = drain(&mut session);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], LinkEvent::Status(_)));
        assert!(!session.liveness().is_stale(t0 + ms(1600)));
    }

    #[test]
    fn direction_selected_while_stale_survives_unchanged_frame() {
        let t0 = Instant::now();
        let (mut session, wire) = opened(t0);

        session.handle_message(status(FORWARD_ON, 0), t0 + ms(100));
        session.handle_timeout(t0 + ms(1100));
        assert!(session.liveness().is_stale(t0 + ms(1100)));

        session.control().select_direction(Direction::Reverse);
        session.handle_message(status(FORWARD_ON, 0), t0 + ms(1200));
        assert_eq!(session.direction(), Direction::Reverse);

        assert!(session.control().set_duty_percent(25.0));
        assert_eq!(wire.borrow().sent_binary().last().unwrap(), &vec![0x12, 0x00, 0x84]);
        drain(&mut session);

        session.handle_message(status(REVERSE_ON, 0), t0 + ms(1400));
        assert_eq!(session.direction(), Direction::Reverse);
        assert!(drain(&mut session)
            .iter()
            .any(|event| matches!(event, LinkEvent::MotionChanged { .. })));
    }

    #[test]
    fn shutdown_cancels_every_timer() {
        let t0 = Instant::now();
        let (mut session, _wire) = opened(t0);
        session.handle_message(status(FORWARD_ON, 0x01), t0);

        session.shutdown();
        assert_eq!(session.state(), LinkState::Closed);
        assert_eq!(session.next_deadline(), None);
        assert!(!session.external_control().is_active());
    }
}
