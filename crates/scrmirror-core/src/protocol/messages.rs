//! All ScrMirror protocol message types.
//!
//! Two message families share the control socket:
//!
//! - [`ControlMessage`] travels host → device and asks the device to inject
//!   input or change power/clipboard state.
//! - [`DeviceMessage`] travels device → host; today it only carries the
//!   device clipboard.
//!
//! Text payloads are owned `String`s, so dropping a message releases them.

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Upper bound for one serialized control message (256 KiB).
pub const CONTROL_MSG_MAX_SIZE: usize = 1 << 18;

/// Maximum UTF-8 byte length of an `InjectText` payload.
pub const CONTROL_MSG_INJECT_TEXT_MAX_LENGTH: usize = 300;

/// Maximum UTF-8 byte length of a `SetClipboard` payload.
///
/// type: 1 byte; paste flag: 1 byte; length: 4 bytes.
pub const CONTROL_MSG_CLIPBOARD_TEXT_MAX_LENGTH: usize = CONTROL_MSG_MAX_SIZE - 6;

/// Upper bound for one serialized device message (256 KiB).
pub const DEVICE_MSG_MAX_SIZE: usize = 1 << 18;

/// Maximum UTF-8 byte length of a device `Clipboard` payload.
///
/// type: 1 byte; length: 4 bytes.
pub const DEVICE_MSG_TEXT_MAX_LENGTH: usize = DEVICE_MSG_MAX_SIZE - 5;

/// Pointer id used for events generated by the host mouse.
pub const POINTER_ID_MOUSE: u64 = u64::MAX;

/// Pointer id used for the synthetic second finger of a pinch gesture.
pub const POINTER_ID_VIRTUAL_FINGER: u64 = u64::MAX - 1;

// ── Message type codes ────────────────────────────────────────────────────────

/// Type tag of a host → device control message (first byte on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlMessageType {
    InjectKeycode = 0,
    InjectText = 1,
    InjectTouchEvent = 2,
    InjectScrollEvent = 3,
    BackOrScreenOn = 4,
    ExpandNotificationPanel = 5,
    CollapseNotificationPanel = 6,
    GetClipboard = 7,
    SetClipboard = 8,
    SetScreenPowerMode = 9,
    RotateDevice = 10,
}

impl TryFrom<u8> for ControlMessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(ControlMessageType::InjectKeycode),
            1 => Ok(ControlMessageType::InjectText),
            2 => Ok(ControlMessageType::InjectTouchEvent),
            3 => Ok(ControlMessageType::InjectScrollEvent),
            4 => Ok(ControlMessageType::BackOrScreenOn),
            5 => Ok(ControlMessageType::ExpandNotificationPanel),
            6 => Ok(ControlMessageType::CollapseNotificationPanel),
            7 => Ok(ControlMessageType::GetClipboard),
            8 => Ok(ControlMessageType::SetClipboard),
            9 => Ok(ControlMessageType::SetScreenPowerMode),
            10 => Ok(ControlMessageType::RotateDevice),
            _ => Err(()),
        }
    }
}

/// Type tag of a device → host message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceMessageType {
    Clipboard = 0,
}

impl TryFrom<u8> for DeviceMessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(DeviceMessageType::Clipboard),
            _ => Err(()),
        }
    }
}

// ── Field types ───────────────────────────────────────────────────────────────

/// Android `KeyEvent` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum KeyEventAction {
    Down = 0,
    Up = 1,
    Multiple = 2,
}

impl TryFrom<u8> for KeyEventAction {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(KeyEventAction::Down),
            1 => Ok(KeyEventAction::Up),
            2 => Ok(KeyEventAction::Multiple),
            _ => Err(()),
        }
    }
}

/// Android `MotionEvent` action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotionEventAction {
    Down = 0,
    Up = 1,
    Move = 2,
    Cancel = 3,
    Outside = 4,
    PointerDown = 5,
    PointerUp = 6,
    HoverMove = 7,
    Scroll = 8,
    HoverEnter = 9,
    HoverExit = 10,
    ButtonPress = 11,
    ButtonRelease = 12,
}

impl TryFrom<u8> for MotionEventAction {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(MotionEventAction::Down),
            1 => Ok(MotionEventAction::Up),
            2 => Ok(MotionEventAction::Move),
            3 => Ok(MotionEventAction::Cancel),
            4 => Ok(MotionEventAction::Outside),
            5 => Ok(MotionEventAction::PointerDown),
            6 => Ok(MotionEventAction::PointerUp),
            7 => Ok(MotionEventAction::HoverMove),
            8 => Ok(MotionEventAction::Scroll),
            9 => Ok(MotionEventAction::HoverEnter),
            10 => Ok(MotionEventAction::HoverExit),
            11 => Ok(MotionEventAction::ButtonPress),
            12 => Ok(MotionEventAction::ButtonRelease),
            _ => Err(()),
        }
    }
}

/// Android `MotionEvent` button state bitmask.
pub mod buttons {
    pub const PRIMARY: u32 = 1 << 0;
    pub const SECONDARY: u32 = 1 << 1;
    pub const TERTIARY: u32 = 1 << 2;
    pub const BACK: u32 = 1 << 3;
    pub const FORWARD: u32 = 1 << 4;
}

/// Display power mode, as understood by `SurfaceControl` on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ScreenPowerMode {
    Off = 0,
    Normal = 2,
}

impl TryFrom<u8> for ScreenPowerMode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0 => Ok(ScreenPowerMode::Off),
            2 => Ok(ScreenPowerMode::Normal),
            _ => Err(()),
        }
    }
}

/// Video frame dimensions in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

/// A point in video-frame coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// An absolute position together with the frame size it refers to.
///
/// The video size may differ from the real device screen size, so the device
/// rescales `point` from `screen_size` to its own resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub point: Point,
    pub screen_size: Size,
}

/// Touch pressure as an unsigned 16-bit fixed-point fraction of 1.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pressure(pub u16);

impl Pressure {
    /// Full pressure, as sent for mouse clicks.
    pub const MAX: Pressure = Pressure(0xFFFF);

    /// Converts a float pressure to fixed point.
    ///
    /// The input is clamped to `[0.0, 1.0]`, scaled by 2^16 and rounded; the
    /// result saturates at `0xFFFF` so that `1.0` stays representable.
    pub fn from_f32(pressure: f32) -> Self {
        let clamped = if pressure.is_nan() {
            0.0
        } else {
            pressure.clamp(0.0, 1.0)
        };
        let scaled = (clamped * 65536.0).round() as u32;
        Pressure(scaled.min(0xFFFF) as u16)
    }

    /// Returns the pressure as a float in `[0.0, 1.0)`.
    pub fn as_f32(self) -> f32 {
        f32::from(self.0) / 65536.0
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// A host → device command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    InjectKeycode {
        action: KeyEventAction,
        keycode: u32,
        repeat: u32,
        metastate: u32,
    },
    /// Text typed on the host; truncated to
    /// [`CONTROL_MSG_INJECT_TEXT_MAX_LENGTH`] bytes on the wire.
    InjectText { text: String },
    InjectTouchEvent {
        action: MotionEventAction,
        pointer_id: u64,
        position: Position,
        pressure: Pressure,
        buttons: u32,
    },
    InjectScrollEvent {
        position: Position,
        hscroll: i32,
        vscroll: i32,
    },
    BackOrScreenOn,
    ExpandNotificationPanel,
    CollapseNotificationPanel,
    GetClipboard,
    /// Replaces the device clipboard; `paste` additionally injects a paste.
    SetClipboard { text: String, paste: bool },
    SetScreenPowerMode { mode: ScreenPowerMode },
    RotateDevice,
}

impl ControlMessage {
    /// Returns the wire type tag of this message.
    pub fn message_type(&self) -> ControlMessageType {
        match self {
            ControlMessage::InjectKeycode { .. } => ControlMessageType::InjectKeycode,
            ControlMessage::InjectText { .. } => ControlMessageType::InjectText,
            ControlMessage::InjectTouchEvent { .. } => ControlMessageType::InjectTouchEvent,
            ControlMessage::InjectScrollEvent { .. } => ControlMessageType::InjectScrollEvent,
            ControlMessage::BackOrScreenOn => ControlMessageType::BackOrScreenOn,
            ControlMessage::ExpandNotificationPanel => ControlMessageType::ExpandNotificationPanel,
            ControlMessage::CollapseNotificationPanel => {
                ControlMessageType::CollapseNotificationPanel
            }
            ControlMessage::GetClipboard => ControlMessageType::GetClipboard,
            ControlMessage::SetClipboard { .. } => ControlMessageType::SetClipboard,
            ControlMessage::SetScreenPowerMode { .. } => ControlMessageType::SetScreenPowerMode,
            ControlMessage::RotateDevice => ControlMessageType::RotateDevice,
        }
    }
}

/// A device → host notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceMessage {
    /// The device clipboard changed to `text`.
    Clipboard { text: String },
}

impl DeviceMessage {
    /// Returns the wire type tag of this message.
    pub fn message_type(&self) -> DeviceMessageType {
        match self {
            DeviceMessage::Clipboard { .. } => DeviceMessageType::Clipboard,
        }
    }
}
