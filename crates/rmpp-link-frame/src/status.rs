use std::fmt;

use serde::{Serialize, Serializer};

use crate::command::Direction;

/// Input voltage in units of 0.1 V, exactly as the device reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Decivolts(pub u8);

impl Decivolts {
    /// Whole volts and the tenths digit, without floating point.
    pub fn split(self) -> (u8, u8) {
        (self.0 / 10, self.0 % 10)
    }

    /// Value in volts.
    pub fn volts(self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl fmt::Display for Decivolts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (whole, tenths) = self.split();
        write!(f, "{whole}.{tenths}")
    }
}

impl Serialize for Decivolts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.volts())
    }
}

/// Operating modes the device firmware reports in the low nibble of flags byte 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMode {
    Init,
    Off,
    On,
    Fault,
    Fail,
    Other(u8),
}

impl From<u8> for DeviceMode {
    fn from(mode: u8) -> Self {
        match mode {
            0 => Self::Init,
            1 => Self::Off,
            2 => Self::On,
            3 => Self::Fault,
            4 => Self::Fail,
            other => Self::Other(other),
        }
    }
}

/// One telemetry sample streamed by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusFrame {
    /// Operating mode, 0–15.
    pub mode: u8,
    pub direction: Direction,
    /// The device expects the console to keep resending its setpoint.
    pub external_control: bool,
    pub output_fault: bool,
    pub system_fault: bool,
    pub input_voltage: Decivolts,
    /// Degrees Celsius.
    pub cpu_temperature: i8,
}

impl StatusFrame {
    /// Known-mode view of [`StatusFrame::mode`].
    pub fn device_mode(&self) -> DeviceMode {
        DeviceMode::from(self.mode)
    }

    /// Flags byte 1: mode and direction. Changes here drive indicator updates.
    pub fn motion_flags(&self) -> u8 {
        (self.mode & 0x0F) | (self.direction.status_bits() << 4)
    }

    /// Flags byte 2: external control and fault bits.
    pub fn status_flags(&self) -> u8 {
        u8::from(self.external_control)
            | (u8::from(self.output_fault) << 5)
            | (u8::from(self.system_fault) << 7)
    }
}
