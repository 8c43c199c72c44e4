//! Device information preamble sent once on the video socket before any
//! video unit.
//!
//! ```text
//! [name:64, NUL-padded UTF-8][width:2][height:2]
//! ```

use crate::protocol::codec::ProtocolError;
use crate::protocol::messages::Size;
use serde::{Deserialize, Serialize};

/// Length of the fixed device name field, including its terminating NUL.
pub const DEVICE_NAME_FIELD_LENGTH: usize = 64;

/// Total size of the preamble.
pub const DEVICE_INFO_SIZE: usize = DEVICE_NAME_FIELD_LENGTH + 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub frame_size: Size,
}

/// Decodes the device preamble from the first [`DEVICE_INFO_SIZE`] bytes.
///
/// The name is read up to the first NUL; the last byte of the field is
/// always treated as a terminator. Invalid UTF-8 is replaced lossily.
pub fn decode_device_info(bytes: &[u8]) -> Result<DeviceInfo, ProtocolError> {
    if bytes.len() < DEVICE_INFO_SIZE {
        return Err(ProtocolError::Incomplete {
            needed: DEVICE_INFO_SIZE,
            available: bytes.len(),
        });
    }

    let field = &bytes[..DEVICE_NAME_FIELD_LENGTH - 1];
    let name_len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let name = String::from_utf8_lossy(&field[..name_len]).into_owned();

    let width = u16::from_be_bytes([bytes[64], bytes[65]]);
    let height = u16::from_be_bytes([bytes[66], bytes[67]]);

    Ok(DeviceInfo {
        name,
        frame_size: Size { width, height },
    })
}

/// Encodes a preamble; names longer than 63 bytes are cut on a character boundary.
pub fn encode_device_info(info: &DeviceInfo) -> [u8; DEVICE_INFO_SIZE] {
    let mut buf = [0u8; DEVICE_INFO_SIZE];
    let len = crate::protocol::codec::utf8_truncation_index(&info.name, DEVICE_NAME_FIELD_LENGTH - 1);
    buf[..len].copy_from_slice(&info.name.as_bytes()[..len]);
    buf[64..66].copy_from_slice(&info.frame_size.width.to_be_bytes());
    buf[66..68].copy_from_slice(&info.frame_size.height.to_be_bytes());
    buf
}
