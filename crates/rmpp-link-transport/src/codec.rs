use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TransportError};
use crate::traits::Message;

/// Message header: kind (1) + length (2) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Largest payload a single message may carry.
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// Header kind for text messages.
pub const KIND_TEXT: u8 = 0x01;

/// Header kind for binary messages.
pub const KIND_BINARY: u8 = 0x02;

/// Encode a message into the stream format.
///
/// Wire format:
/// ```text
/// ┌───────────┬────────────┬──────────────────┐
/// │ Kind (1B) │ Length     │ Payload          │
/// │ 01 text   │ (2B LE)    │ (Length bytes)   │
/// │ 02 binary │            │                  │
/// └───────────┴────────────┴──────────────────┘
/// ```
pub fn encode_message(message: &Message, dst: &mut BytesMut) -> Result<()> {
    let (kind, payload): (u8, &[u8]) = match message {
        Message::Text(text) => (KIND_TEXT, text.as_bytes()),
        Message::Binary(payload) => (KIND_BINARY, payload.as_ref()),
    };
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(TransportError::MessageTooLarge {
            size: payload.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u8(kind);
    dst.put_u16_le(payload.len() as u16);
    dst.put_slice(payload);
    Ok(())
}

/// Decode one message from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
/// On success, consumes the message bytes from the buffer.
pub fn decode_message(src: &mut BytesMut) -> Result<Option<Message>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let kind = src[0];
    if kind != KIND_TEXT && kind != KIND_BINARY {
        return Err(TransportError::UnknownKind(kind));
    }

    let len = u16::from_le_bytes([src[1], src[2]]) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(TransportError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    if src.len() < HEADER_SIZE + len {
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload: Bytes = src.split_to(len).freeze();

    // Invalid UTF-8 does not desync the stream; the text is left for the
    // receiver to classify.
    let message = if kind == KIND_TEXT {
        Message::Text(String::from_utf8_lossy(&payload).into_owned())
    } else {
        Message::Binary(payload)
    };
    Ok(Some(message))
}
