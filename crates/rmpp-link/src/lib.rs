//! Console-side link to a model railway power pack.
//!
//! The device streams 5-byte status frames and accepts 3-byte command frames
//! over a message transport that also carries a text ping/pong heartbeat.
//!
//! # Crate Structure
//!
//! - [`transport`]: message transport abstraction (Unix domain sockets)
//! - [`frame`]: status and command frame codecs
//! - [`session`]: link session, heartbeat, liveness, external-control resend
//!   and operator control (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use rmpp_link_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use rmpp_link_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use rmpp_link_session::*;
}
