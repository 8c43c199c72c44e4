//! Framing for the video socket.
//!
//! Every encoded unit is preceded by a fixed 12-byte header:
//! ```text
//! [pts:8][len:4][payload:len]
//! ```
//! A `pts` of [`NO_PTS`] marks a codec configuration unit (SPS/PPS) that
//! must be prepended to the next media unit before decoding.

use crate::protocol::codec::ProtocolError;

/// Size of the per-unit header on the video socket.
pub const VIDEO_HEADER_SIZE: usize = 12;

/// Sentinel presentation timestamp for codec configuration units.
pub const NO_PTS: u64 = u64::MAX;

/// Largest unit payload accepted from the device (64 MiB).
pub const VIDEO_UNIT_MAX_SIZE: u32 = 1 << 26;

/// Parsed form of a video unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoUnitHeader {
    /// `None` for configuration units.
    pub pts: Option<u64>,
    /// Payload length in bytes, always non-zero.
    pub len: u32,
}

impl VideoUnitHeader {
    pub fn is_config(&self) -> bool {
        self.pts.is_none()
    }
}

/// One framed unit as read from the socket, before any reassembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVideoUnit {
    pub pts: Option<u64>,
    pub payload: Vec<u8>,
}

impl RawVideoUnit {
    pub fn config(payload: Vec<u8>) -> Self {
        Self { pts: None, payload }
    }

    pub fn media(pts: u64, payload: Vec<u8>) -> Self {
        Self {
            pts: Some(pts),
            payload,
        }
    }

    pub fn is_config(&self) -> bool {
        self.pts.is_none()
    }
}

/// Parses a 12-byte video header.
///
/// # Errors
///
/// [`ProtocolError::MalformedPayload`] for a zero-length unit or a media
/// timestamp with the top bit set (only [`NO_PTS`] may use it);
/// [`ProtocolError::InvalidLength`] for a unit above [`VIDEO_UNIT_MAX_SIZE`].
pub fn decode_video_header(bytes: &[u8; VIDEO_HEADER_SIZE]) -> Result<VideoUnitHeader, ProtocolError> {
    let mut raw_pts = [0u8; 8];
    raw_pts.copy_from_slice(&bytes[..8]);
    let raw_pts = u64::from_be_bytes(raw_pts);
    let len = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

    if len == 0 {
        return Err(ProtocolError::MalformedPayload(
            "zero-length video unit".to_string(),
        ));
    }
    if len > VIDEO_UNIT_MAX_SIZE {
        return Err(ProtocolError::InvalidLength {
            declared: len as usize,
            max: VIDEO_UNIT_MAX_SIZE as usize,
        });
    }

    let pts = if raw_pts == NO_PTS {
        None
    } else if raw_pts & (1 << 63) != 0 {
        return Err(ProtocolError::MalformedPayload(format!(
            "invalid pts: 0x{raw_pts:016X}"
        )));
    } else {
        Some(raw_pts)
    };

    Ok(VideoUnitHeader { pts, len })
}

/// Builds the 12-byte header for a unit.
pub fn encode_video_header(pts: Option<u64>, len: u32) -> [u8; VIDEO_HEADER_SIZE] {
    let mut header = [0u8; VIDEO_HEADER_SIZE];
    header[..8].copy_from_slice(&pts.unwrap_or(NO_PTS).to_be_bytes());
    header[8..].copy_from_slice(&len.to_be_bytes());
    header
}

/// Header followed by payload, as the device would send it.
pub fn encode_video_unit(unit: &RawVideoUnit) -> Vec<u8> {
    let mut buf = Vec::with_capacity(VIDEO_HEADER_SIZE + unit.payload.len());
    buf.extend_from_slice(&encode_video_header(unit.pts, unit.payload.len() as u32));
    buf.extend_from_slice(&unit.payload);
    buf
}
