//! Link session management for the rmpp-link console.
//!
//! This is the protocol core: a single-threaded, sans-I/O state machine that
//! owns the transport, supervises it with a ping/pong heartbeat, watches
//! payload liveness, keeps resending the operator setpoint while the device
//! asks for it, and turns operator intent into command frames.
//!
//! Every operation takes the current [`Instant`](std::time::Instant)
//! explicitly. Timers are deadline slots serviced by
//! [`LinkSession::handle_timeout`]; [`driver`] runs the loop against the
//! wall clock.

pub mod config;
pub mod control;
pub mod driver;
pub mod error;
pub mod event;
pub mod external;
pub mod facade;
pub mod heartbeat;
pub mod liveness;
pub mod session;
pub mod timer;

#[cfg(test)]
mod testing;

pub use config::{LinkConfig, MAX_PERIOD};
pub use control::{HEARTBEAT_ACK, HEARTBEAT_PROBE};
pub use error::{LinkError, Result};
pub use event::{LinkEvent, LinkObserver};
pub use external::{ExternalControlLoop, ExternalControlTransition};
pub use facade::{duty_from_percent, ControlFacade};
pub use heartbeat::{HeartbeatAction, HeartbeatState, HeartbeatSupervisor};
pub use liveness::LivenessMonitor;
pub use session::{LinkSession, LinkState};
pub use timer::Deadline;
