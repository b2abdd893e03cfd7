use bytes::Bytes;

use crate::command::Direction;

/// A payload buffer that is not a well-formed frame.
///
/// Every variant keeps the offending buffer so callers can log it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer length does not match the frame shape.
    #[error("unexpected {frame} frame length ({len} bytes, expected {expected})")]
    InvalidLength {
        frame: &'static str,
        len: usize,
        expected: usize,
        raw: Bytes,
    },

    /// The first byte is not the expected frame tag.
    #[error("unexpected frame tag 0x{tag:02x} (expected 0x{expected:02x})")]
    InvalidTag { tag: u8, expected: u8, raw: Bytes },

    /// Both direction bits are set, which no device state produces.
    #[error("direction bits 0b11 do not name a direction")]
    InvalidDirection { raw: Bytes },
}

impl DecodeError {
    /// The rejected buffer.
    pub fn raw(&self) -> &[u8] {
        match self {
            Self::InvalidLength { raw, .. }
            | Self::InvalidTag { raw, .. }
            | Self::InvalidDirection { raw } => raw.as_ref(),
        }
    }
}

/// A command that cannot be put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Only forward and reverse have a wire marker.
    #[error("direction {0:?} cannot be transmitted")]
    DirectionNotTransmittable(Direction),
}
