//! In-memory connector for driving a session without sockets.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::Duration;

use rmpp_link_transport::{Connector, Message, MessageTransport, Result, TransportError};

/// Shared state between a test and every transport its connector hands out.
#[derive(Debug, Default)]
pub(crate) struct Wire {
    pub inbound: VecDeque<Message>,
    pub sent: Vec<Message>,
    /// Connect attempts, successful or not.
    pub connects: usize,
    pub refuse_connects: bool,
    pub fail_sends: bool,
    /// Report the next receive as a closed connection.
    pub break_next_recv: bool,
}

impl Wire {
    pub fn push_binary(&mut self, payload: &[u8]) {
        self.inbound.push_back(Message::binary(payload.to_vec()));
    }

    pub fn push_text(&mut self, text: &str) {
        self.inbound.push_back(Message::text(text));
    }

    /// Binary payloads sent so far, oldest first.
    pub fn sent_binary(&self) -> Vec<Vec<u8>> {
        self.sent
            .iter()
            .filter_map(|message| match message {
                Message::Binary(payload) => Some(payload.to_vec()),
                Message::Text(_) => None,
            })
            .collect()
    }

    /// Text messages sent so far, oldest first.
    pub fn sent_text(&self) -> Vec<String> {
        self.sent
            .iter()
            .filter_map(|message| match message {
                Message::Text(text) => Some(text.clone()),
                Message::Binary(_) => None,
            })
            .collect()
    }
}

pub(crate) struct ScriptedConnector {
    wire: Rc<RefCell<Wire>>,
}

impl ScriptedConnector {
    pub fn new() -> (Self, Rc<RefCell<Wire>>) {
        let wire = Rc::new(RefCell::new(Wire::default()));
        (
            Self {
                wire: Rc::clone(&wire),
            },
            wire,
        )
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&mut self) -> Result<ScriptedTransport> {
        let mut wire = self.wire.borrow_mut();
        wire.connects += 1;
        if wire.refuse_connects {
            return Err(TransportError::Connect {
                path: "scripted".into(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            });
        }
        Ok(ScriptedTransport {
            wire: Rc::clone(&self.wire),
        })
    }

    fn endpoint(&self) -> String {
        "scripted".to_string()
    }
}

pub(crate) struct ScriptedTransport {
    wire: Rc<RefCell<Wire>>,
}

impl MessageTransport for ScriptedTransport {
    fn send(&mut self, message: &Message) -> Result<()> {
        let mut wire = self.wire.borrow_mut();
        if wire.fail_sends {
            return Err(TransportError::Io(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        wire.sent.push(message.clone());
        Ok(())
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> Result<Option<Message>> {
        let mut wire = self.wire.borrow_mut();
        if wire.break_next_recv {
            wire.break_next_recv = false;
            return Err(TransportError::Closed);
        }
        Ok(wire.inbound.pop_front())
    }
}
