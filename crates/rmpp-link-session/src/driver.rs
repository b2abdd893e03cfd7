//! Wall-clock driver for a [`LinkSession`].
//!
//! The session itself never reads the clock or blocks. This module does both:
//! each turn waits for one inbound message, bounded by the next pending
//! deadline, then services whatever timers have come due.

use std::thread;
use std::time::{Duration, Instant};

use rmpp_link_transport::Connector;
use tracing::trace;

use crate::event::LinkObserver;
use crate::session::{LinkSession, LinkState};

/// Upper bound on a single wait, so callers regain control regularly.
pub const MAX_WAIT: Duration = Duration::from_millis(100);

/// Run one iteration: receive at most one message, then service timers.
pub fn turn<C: Connector>(session: &mut LinkSession<C>, max_wait: Duration) {
    let wait = wait_budget(session.next_deadline(), Instant::now(), max_wait);

    if session.has_transport() {
        match session.recv_timeout(wait) {
            Ok(Some(message)) => session.handle_message(message, Instant::now()),
            Ok(None) => {}
            Err(err) => session.handle_transport_error(err, Instant::now()),
        }
    } else if !wait.is_zero() {
        thread::sleep(wait);
    }

    session.handle_timeout(Instant::now());
}

/// Deliver every queued event to `observer`. Returns how many were delivered.
pub fn dispatch_events<C, O>(session: &mut LinkSession<C>, observer: &mut O) -> usize
where
    C: Connector,
    O: LinkObserver + ?Sized,
{
    let mut delivered = 0;
    while let Some(event) = session.poll_event() {
        event.dispatch(observer);
        delivered += 1;
    }
    delivered
}

/// Drive the session until `keep_running` returns false.
///
/// `keep_running` is consulted once per turn, after events are dispatched. It
/// may use the session (for example to issue control commands) and inspect
/// the observer.
pub fn run<C, O, F>(session: &mut LinkSession<C>, observer: &mut O, mut keep_running: F)
where
    C: Connector,
    O: LinkObserver + ?Sized,
    F: FnMut(&mut LinkSession<C>, &O) -> bool,
{
    if session.state() == LinkState::Closed && !session.retry_pending() {
        // A failed first connect arms the retry; the loop picks it up.
        let _ = session.open(Instant::now());
    }

    loop {
        dispatch_events(session, observer);
        if !keep_running(session, observer) {
            break;
        }
        turn(session, MAX_WAIT);
    }

    dispatch_events(session, observer);
    trace!("link driver stopped");
}

fn wait_budget(next_deadline: Option<Instant>, now: Instant, max_wait: Duration) -> Duration {
    match next_deadline {
        Some(at) => at.saturating_duration_since(now).min(max_wait),
        None => max_wait,
    }
}
