//! Heartbeat tokens on the text side of the connection.
//!
//! The binary side carries frames; text messages are reserved for the
//! liveness exchange between console and device.

/// Probe sent by the console.
pub const HEARTBEAT_PROBE: &str = "ping";

/// Acknowledgment sent back by the device.
pub const HEARTBEAT_ACK: &str = "pong";

/// True if `text` acknowledges a heartbeat probe.
pub fn is_heartbeat_ack(text: &str) -> bool {
    text == HEARTBEAT_ACK
}
