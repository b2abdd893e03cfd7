use bytes::Bytes;

use crate::command::{CommandFrame, Direction};
use crate::error::{DecodeError, EncodeError};
use crate::status::{Decivolts, StatusFrame};

/// First byte of every status frame.
pub const STATUS_TAG: u8 = 0x04;

/// First byte of every command frame.
pub const COMMAND_TAG: u8 = 0x12;

/// Status frame: tag + two flag bytes + voltage + temperature.
pub const STATUS_FRAME_LEN: usize = 5;

/// Command frame: tag + duty low byte + duty high bits/direction marker.
pub const COMMAND_FRAME_LEN: usize = 3;

const MODE_MASK: u8 = 0x0F;
const DIRECTION_SHIFT: u8 = 4;
const DIRECTION_MASK: u8 = 0x03;
const EXTERNAL_CONTROL_BIT: u8 = 0x01;
const OUTPUT_FAULT_BIT: u8 = 0x20;
const SYSTEM_FAULT_BIT: u8 = 0x80;
const TEMPERATURE_OFFSET_BIT: u8 = 0x80;

/// Encode a drive setpoint.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────┬─────────────────────────────┐
/// │ Tag 0x12 │ Duty bits0-7 │ b7 rev │ b6 fwd │ duty 8-13 │
/// └──────────┴──────────────┴─────────────────────────────┘
/// ```
///
/// Duty saturates at 4095. Direction must be forward or reverse; the
/// power-off frame is [`CommandFrame::power_off`].
pub fn encode_command(
    direction: Direction,
    duty: u16,
) -> Result<[u8; COMMAND_FRAME_LEN], EncodeError> {
    Ok(CommandFrame::drive(direction, duty)?.encode())
}

/// Decode a status frame.
///
/// Wire format:
/// ```text
/// ┌──────────┬─────────────────────┬──────────────────────────┬────────┬──────────┐
/// │ Tag 0x04 │ b0-3 mode, b4-5 dir │ b0 ext, b5 out, b7 sys   │ 0.1 V  │ °C + 128 │
/// └──────────┴─────────────────────┴──────────────────────────┴────────┴──────────┘
/// ```
///
/// Anything that is not exactly this shape is a [`DecodeError`] carrying the
/// buffer; a frame is never partially populated.
pub fn decode_status(bytes: &[u8]) -> Result<StatusFrame, DecodeError> {
    check_shape(bytes, "status", STATUS_FRAME_LEN, STATUS_TAG)?;

    let motion = bytes[1];
    let flags = bytes[2];
    let direction = Direction::from_status_bits((motion >> DIRECTION_SHIFT) & DIRECTION_MASK)
        .ok_or_else(|| DecodeError::InvalidDirection {
            raw: Bytes::copy_from_slice(bytes),
        })?;

    Ok(StatusFrame {
        mode: motion & MODE_MASK,
        direction,
        external_control: flags & EXTERNAL_CONTROL_BIT != 0,
        output_fault: flags & OUTPUT_FAULT_BIT != 0,
        system_fault: flags & SYSTEM_FAULT_BIT != 0,
        input_voltage: Decivolts(bytes[3]),
        cpu_temperature: (bytes[4] ^ TEMPERATURE_OFFSET_BIT) as i8,
    })
}

/// Encode a status frame, as the device does.
pub fn encode_status(frame: &StatusFrame) -> [u8; STATUS_FRAME_LEN] {
    [
        STATUS_TAG,
        frame.motion_flags(),
        frame.status_flags(),
        frame.input_voltage.0,
        (frame.cpu_temperature as u8) ^ TEMPERATURE_OFFSET_BIT,
    ]
}

/// Decode a command frame, as the device does.
///
/// No marker means power-off, whatever the duty bits say.
pub fn decode_command(bytes: &[u8]) -> Result<CommandFrame, DecodeError> {
    check_shape(bytes, "command", COMMAND_FRAME_LEN, COMMAND_TAG)?;

    let duty = u16::from_le_bytes([bytes[1], bytes[2] & 0x3F]);
    let direction = match bytes[2] >> 6 {
        0b00 => return Ok(CommandFrame::power_off()),
        0b01 => Direction::Forward,
        0b10 => Direction::Reverse,
        _ => {
            return Err(DecodeError::InvalidDirection {
                raw: Bytes::copy_from_slice(bytes),
            })
        }
    };

    CommandFrame::drive(direction, duty).map_err(|_| DecodeError::InvalidDirection {
        raw: Bytes::copy_from_slice(bytes),
    })
}

fn check_shape(
    bytes: &[u8],
    frame: &'static str,
    expected: usize,
    tag: u8,
) -> Result<(), DecodeError> {
    if bytes.len() != expected {
        return Err(DecodeError::InvalidLength {
            frame,
            len: bytes.len(),
            expected,
            raw: Bytes::copy_from_slice(bytes),
        });
    }
    if bytes[0] != tag {
        return Err(DecodeError::InvalidTag {
            tag: bytes[0],
            expected: tag,
            raw: Bytes::copy_from_slice(bytes),
        });
    }
    Ok(())
}
