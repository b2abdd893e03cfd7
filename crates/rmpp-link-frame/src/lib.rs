//! Status and command frames of the power-pack link.
//!
//! Two fixed-size binary frames travel over the link:
//! - a 5-byte status frame (tag `0x04`) streamed by the device
//! - a 3-byte command frame (tag `0x12`) sent by the console
//!
//! Everything here is pure: no I/O, no clocks, no state.

pub mod codec;
pub mod command;
pub mod error;
pub mod status;

pub use codec::{
    decode_command, decode_status, encode_command, encode_status, COMMAND_FRAME_LEN,
    COMMAND_TAG, STATUS_FRAME_LEN, STATUS_TAG,
};
pub use command::{CommandFrame, Direction, MAX_DUTY};
pub use error::{DecodeError, EncodeError};
pub use status::{Decivolts, DeviceMode, StatusFrame};
