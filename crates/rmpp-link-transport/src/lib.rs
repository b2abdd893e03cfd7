//! Message-oriented transport for the rmpp-link console.
//!
//! The link layer above this crate only ever sees whole messages:
//! - text messages carry the heartbeat probe/acknowledgment
//! - binary messages carry status and command frames
//!
//! How those messages are delimited on the wire is this crate's business.
//! The provided implementation frames them over Unix domain sockets.

pub mod codec;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use codec::{decode_message, encode_message, HEADER_SIZE, MAX_MESSAGE_SIZE};
pub use error::{Result, TransportError};
pub use traits::{Connector, Message, MessageTransport};

#[cfg(unix)]
pub use uds::{UnixConnector, UnixMessageListener, UnixMessageStream};
