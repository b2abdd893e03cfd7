use std::time::Duration;

use bytes::Bytes;

use crate::error::Result;

/// A whole message as delivered by the transport.
///
/// Text messages belong to the connection's control exchange (heartbeat),
/// binary messages carry opaque payload buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Bytes),
}

impl Message {
    /// Create a text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a binary message.
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::Binary(payload.into())
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(payload) => payload.len(),
        }
    }

    /// True when the message carries no payload.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short label for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
        }
    }
}

/// A connected, message-oriented transport.
pub trait MessageTransport {
    /// Send one whole message.
    fn send(&mut self, message: &Message) -> Result<()>;

    /// Wait up to `timeout` for the next whole message.
    ///
    /// Returns `Ok(None)` when the timeout elapses without a complete message.
    /// A closed connection is reported as [`TransportError::Closed`](crate::TransportError::Closed).
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>>;
}

impl<T: MessageTransport + ?Sized> MessageTransport for Box<T> {
    fn send(&mut self, message: &Message) -> Result<()> {
        (**self).send(message)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Message>> {
        (**self).recv_timeout(timeout)
    }
}

/// Builds fresh transports. Reconnecting means asking for a new one.
pub trait Connector {
    type Transport: MessageTransport;

    /// Establish a new connection.
    fn connect(&mut self) -> Result<Self::Transport>;

    /// Human-readable endpoint for logs.
    fn endpoint(&self) -> String;
}
