//! Binary codec for ScrMirror control-socket messages.
//!
//! Wire format (both directions):
//! ```text
//! [type:1][payload:N]
//! ```
//! The payload layout is fixed per type; strings are encoded as a 4-byte
//! length followed by UTF-8 bytes. All multi-byte integers are big-endian.
//!
//! Decoding distinguishes "not enough bytes yet" ([`ProtocolError::Incomplete`],
//! the caller should buffer more and retry) from unrecoverable input (every
//! other variant, the caller should close the channel).

use crate::protocol::messages::{
    ControlMessage, ControlMessageType, DeviceMessage, DeviceMessageType, KeyEventAction,
    MotionEventAction, Point, Position, Pressure, ScreenPowerMode, Size,
    CONTROL_MSG_CLIPBOARD_TEXT_MAX_LENGTH, CONTROL_MSG_INJECT_TEXT_MAX_LENGTH,
    DEVICE_MSG_TEXT_MAX_LENGTH,
};
use thiserror::Error;

/// Errors that can occur during message decoding.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes are available than the message declares. Not fatal.
    #[error("incomplete message: need {needed} bytes, got {available}")]
    Incomplete { needed: usize, available: usize },

    /// The type byte is not a recognized value.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// A declared string length exceeds the protocol maximum.
    #[error("invalid length: declared {declared}, maximum is {max}")]
    InvalidLength { declared: usize, max: usize },

    /// The payload could not be parsed (enum value out of range, UTF-8 error, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl ProtocolError {
    /// Returns `true` when the caller only needs to wait for more bytes.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ProtocolError::Incomplete { .. })
    }

    /// Returns `true` when the stream cannot be recovered.
    pub fn is_malformed(&self) -> bool {
        !self.is_incomplete()
    }
}

// ── Sizes ─────────────────────────────────────────────────────────────────────

const POSITION_SIZE: usize = 12;
const INJECT_KEYCODE_SIZE: usize = 14;
const INJECT_TOUCH_EVENT_SIZE: usize = 28;
const INJECT_SCROLL_EVENT_SIZE: usize = 21;
const SET_SCREEN_POWER_MODE_SIZE: usize = 2;

// ── Public API ────────────────────────────────────────────────────────────────

/// Serializes a [`ControlMessage`] into its wire representation.
///
/// Text payloads longer than the per-type maximum are truncated at a UTF-8
/// character boundary.
///
/// # Examples
///
/// ```rust
/// use scrmirror_core::protocol::{decode_control_message, encode_control_message};
/// use scrmirror_core::protocol::messages::ControlMessage;
///
/// let bytes = encode_control_message(&ControlMessage::RotateDevice);
/// assert_eq!(bytes, vec![10]);
/// let (decoded, consumed) = decode_control_message(&bytes).unwrap();
/// assert_eq!(decoded, ControlMessage::RotateDevice);
/// assert_eq!(consumed, 1);
/// ```
pub fn encode_control_message(msg: &ControlMessage) -> Vec<u8> {
    let mut buf = Vec::with_capacity(INJECT_TOUCH_EVENT_SIZE);
    buf.push(msg.message_type() as u8);
    match msg {
        ControlMessage::InjectKeycode {
            action,
            keycode,
            repeat,
            metastate,
        } => {
            buf.push(*action as u8);
            buf.extend_from_slice(&keycode.to_be_bytes());
            buf.extend_from_slice(&repeat.to_be_bytes());
            buf.extend_from_slice(&metastate.to_be_bytes());
        }
        ControlMessage::InjectText { text } => {
            write_string(&mut buf, text, CONTROL_MSG_INJECT_TEXT_MAX_LENGTH);
        }
        ControlMessage::InjectTouchEvent {
            action,
            pointer_id,
            position,
            pressure,
            buttons,
        } => {
            buf.push(*action as u8);
            buf.extend_from_slice(&pointer_id.to_be_bytes());
            write_position(&mut buf, position);
            buf.extend_from_slice(&pressure.0.to_be_bytes());
            buf.extend_from_slice(&buttons.to_be_bytes());
        }
        ControlMessage::InjectScrollEvent {
            position,
            hscroll,
            vscroll,
        } => {
            write_position(&mut buf, position);
            buf.extend_from_slice(&hscroll.to_be_bytes());
            buf.extend_from_slice(&vscroll.to_be_bytes());
        }
        ControlMessage::SetClipboard { text, paste } => {
            buf.push(u8::from(*paste));
            write_string(&mut buf, text, CONTROL_MSG_CLIPBOARD_TEXT_MAX_LENGTH);
        }
        ControlMessage::SetScreenPowerMode { mode } => buf.push(*mode as u8),
        ControlMessage::BackOrScreenOn
        | ControlMessage::ExpandNotificationPanel
        | ControlMessage::CollapseNotificationPanel
        | ControlMessage::GetClipboard
        | ControlMessage::RotateDevice => {} // no payload
    }
    buf
}

/// Decodes one [`ControlMessage`] from the beginning of `bytes`.
///
/// Returns the message and the number of bytes consumed.
///
/// # Errors
///
/// [`ProtocolError::Incomplete`] if `bytes` ends before the message does;
/// any other variant if the bytes can never form a valid message.
pub fn decode_control_message(bytes: &[u8]) -> Result<(ControlMessage, usize), ProtocolError> {
    require(bytes, 1)?;
    let msg_type = ControlMessageType::try_from(bytes[0])
        .map_err(|_| ProtocolError::UnknownMessageType(bytes[0]))?;

    match msg_type {
        ControlMessageType::InjectKeycode => {
            require(bytes, INJECT_KEYCODE_SIZE)?;
            let action = KeyEventAction::try_from(bytes[1]).map_err(|_| {
                ProtocolError::MalformedPayload(format!("unknown key action: {}", bytes[1]))
            })?;
            let msg = ControlMessage::InjectKeycode {
                action,
                keycode: read_u32(bytes, 2),
                repeat: read_u32(bytes, 6),
                metastate: read_u32(bytes, 10),
            };
            Ok((msg, INJECT_KEYCODE_SIZE))
        }
        ControlMessageType::InjectText => {
            let (text, end) = read_string(bytes, 1, CONTROL_MSG_INJECT_TEXT_MAX_LENGTH)?;
            Ok((ControlMessage::InjectText { text }, end))
        }
        ControlMessageType::InjectTouchEvent => {
            require(bytes, INJECT_TOUCH_EVENT_SIZE)?;
            let action = MotionEventAction::try_from(bytes[1]).map_err(|_| {
                ProtocolError::MalformedPayload(format!("unknown motion action: {}", bytes[1]))
            })?;
            let msg = ControlMessage::InjectTouchEvent {
                action,
                pointer_id: read_u64(bytes, 2),
                position: read_position(bytes, 10),
                pressure: Pressure(read_u16(bytes, 22)),
                buttons: read_u32(bytes, 24),
            };
            Ok((msg, INJECT_TOUCH_EVENT_SIZE))
        }
        ControlMessageType::InjectScrollEvent => {
            require(bytes, INJECT_SCROLL_EVENT_SIZE)?;
            let msg = ControlMessage::InjectScrollEvent {
                position: read_position(bytes, 1),
                hscroll: read_u32(bytes, 13) as i32,
                vscroll: read_u32(bytes, 17) as i32,
            };
            Ok((msg, INJECT_SCROLL_EVENT_SIZE))
        }
        ControlMessageType::SetClipboard => {
            require(bytes, 2)?;
            let paste = bytes[1] != 0;
            let (text, end) = read_string(bytes, 2, CONTROL_MSG_CLIPBOARD_TEXT_MAX_LENGTH)?;
            Ok((ControlMessage::SetClipboard { text, paste }, end))
        }
        ControlMessageType::SetScreenPowerMode => {
            require(bytes, SET_SCREEN_POWER_MODE_SIZE)?;
            let mode = ScreenPowerMode::try_from(bytes[1]).map_err(|_| {
                ProtocolError::MalformedPayload(format!("unknown power mode: {}", bytes[1]))
            })?;
            Ok((
                ControlMessage::SetScreenPowerMode { mode },
                SET_SCREEN_POWER_MODE_SIZE,
            ))
        }
        ControlMessageType::BackOrScreenOn => Ok((ControlMessage::BackOrScreenOn, 1)),
        ControlMessageType::ExpandNotificationPanel => {
            Ok((ControlMessage::ExpandNotificationPanel, 1))
        }
        ControlMessageType::CollapseNotificationPanel => {
            Ok((ControlMessage::CollapseNotificationPanel, 1))
        }
        ControlMessageType::GetClipboard => Ok((ControlMessage::GetClipboard, 1)),
        ControlMessageType::RotateDevice => Ok((ControlMessage::RotateDevice, 1)),
    }
}

/// Serializes a [`DeviceMessage`] into its wire representation.
pub fn encode_device_message(msg: &DeviceMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(msg.message_type() as u8);
    match msg {
        DeviceMessage::Clipboard { text } => {
            write_string(&mut buf, text, DEVICE_MSG_TEXT_MAX_LENGTH);
        }
    }
    buf
}

/// Decodes one [`DeviceMessage`] from the beginning of `bytes`.
///
/// # Errors
///
/// [`ProtocolError::Incomplete`] for any truncation of a valid message;
/// any other variant for an unknown type or an oversized declared length.
///
/// # Examples
///
/// ```rust
/// use scrmirror_core::protocol::decode_device_message;
///
/// let partial = [0x00, 0x00, 0x00, 0x00, 0x02, b'h'];
/// assert!(decode_device_message(&partial).unwrap_err().is_incomplete());
/// ```
pub fn decode_device_message(bytes: &[u8]) -> Result<(DeviceMessage, usize), ProtocolError> {
    require(bytes, 1)?;
    let msg_type = DeviceMessageType::try_from(bytes[0])
        .map_err(|_| ProtocolError::UnknownMessageType(bytes[0]))?;

    match msg_type {
        DeviceMessageType::Clipboard => {
            let (text, end) = read_string(bytes, 1, DEVICE_MSG_TEXT_MAX_LENGTH)?;
            Ok((DeviceMessage::Clipboard { text }, end))
        }
    }
}

/// Returns the largest byte index `<= max_len` that falls on a UTF-8
/// character boundary of `text`.
///
/// ```rust
/// use scrmirror_core::protocol::codec::utf8_truncation_index;
///
/// // "é" is two bytes; cutting at 2 would split it
/// assert_eq!(utf8_truncation_index("aé", 2), 1);
/// assert_eq!(utf8_truncation_index("abc", 10), 3);
/// ```
pub fn utf8_truncation_index(text: &str, max_len: usize) -> usize {
    if text.len() <= max_len {
        return text.len();
    }
    let mut index = max_len;
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn write_position(buf: &mut Vec<u8>, position: &Position) {
    buf.extend_from_slice(&position.point.x.to_be_bytes());
    buf.extend_from_slice(&position.point.y.to_be_bytes());
    buf.extend_from_slice(&position.screen_size.width.to_be_bytes());
    buf.extend_from_slice(&position.screen_size.height.to_be_bytes());
}

/// Writes a 4-byte length prefix followed by at most `max_len` UTF-8 bytes.
fn write_string(buf: &mut Vec<u8>, text: &str, max_len: usize) {
    let len = utf8_truncation_index(text, max_len);
    buf.extend_from_slice(&(len as u32).to_be_bytes());
    buf.extend_from_slice(&text.as_bytes()[..len]);
}

fn require(buf: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::Incomplete {
            needed,
            available: buf.len(),
        })
    } else {
        Ok(())
    }
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    u64::from_be_bytes(raw)
}

fn read_position(buf: &[u8], offset: usize) -> Position {
    debug_assert!(buf.len() >= offset + POSITION_SIZE);
    Position {
        point: Point {
            x: read_u32(buf, offset) as i32,
            y: read_u32(buf, offset + 4) as i32,
        },
        screen_size: Size {
            width: read_u16(buf, offset + 8),
            height: read_u16(buf, offset + 10),
        },
    }
}

/// Reads a 4-byte length prefix at `offset` and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after it.
fn read_string(buf: &[u8], offset: usize, max_len: usize) -> Result<(String, usize), ProtocolError> {
    require(buf, offset + 4)?;
    let len = read_u32(buf, offset) as usize;
    if len > max_len {
        return Err(ProtocolError::InvalidLength {
            declared: len,
            max: max_len,
        });
    }
    let start = offset + 4;
    require(buf, start + len)?;
    let text = std::str::from_utf8(&buf[start..start + len])
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((text, start + len))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
