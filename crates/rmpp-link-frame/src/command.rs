use serde::Serialize;

use crate::error::EncodeError;

/// Largest duty value: the setpoint is 12 bits wide.
pub const MAX_DUTY: u16 = 4095;

const MARKER_FORWARD: u8 = 0x40;
const MARKER_REVERSE: u8 = 0x80;

/// Travel direction of the motor output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// No direction selected; the output is off.
    #[default]
    None,
    Forward,
    Reverse,
}

impl Direction {
    /// Parse the two direction bits of a status frame.
    ///
    /// `0b11` is unused by the device and is rejected.
    pub fn from_status_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::None),
            1 => Some(Self::Forward),
            2 => Some(Self::Reverse),
            _ => None,
        }
    }

    /// The two-bit status encoding.
    pub fn status_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Forward => 1,
            Self::Reverse => 2,
        }
    }

    /// The marker OR'd into the command frame's high byte.
    pub fn command_marker(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Forward => MARKER_FORWARD,
            Self::Reverse => MARKER_REVERSE,
        }
    }

    /// True for forward or reverse.
    pub fn is_selected(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// A setpoint sent from the console to the device.
///
/// Built only through [`CommandFrame::drive`] or [`CommandFrame::power_off`],
/// so the duty is always within `0..=MAX_DUTY` and a direction-less frame is
/// always the zero-duty power-off frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    direction: Direction,
    duty: u16,
}

impl CommandFrame {
    /// A drive setpoint. Duty saturates at [`MAX_DUTY`].
    pub fn drive(direction: Direction, duty: u16) -> Result<Self, EncodeError> {
        if !direction.is_selected() {
            return Err(EncodeError::DirectionNotTransmittable(direction));
        }
        Ok(Self {
            direction,
            duty: duty.min(MAX_DUTY),
        })
    }

    /// The designated safe-stop frame: no direction marker, zero duty.
    pub fn power_off() -> Self {
        Self {
            direction: Direction::None,
            duty: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn is_power_off(&self) -> bool {
        !self.direction.is_selected()
    }

    /// Wire form of this frame.
    pub fn encode(&self) -> [u8; crate::codec::COMMAND_FRAME_LEN] {
        let [low, high] = self.duty.to_le_bytes();
        [
            crate::codec::COMMAND_TAG,
            low,
            (high & 0x3F) | self.direction.command_marker(),
        ]
    }
}
