//! Protocol module containing message types, the control-socket codec, and
//! video-socket framing.

pub mod codec;
pub mod device_info;
pub mod messages;
pub mod video;

pub use codec::{
    decode_control_message, decode_device_message, encode_control_message, encode_device_message,
    ProtocolError,
};
pub use device_info::{decode_device_info, encode_device_info, DeviceInfo, DEVICE_INFO_SIZE};
pub use messages::*;
pub use video::{
    decode_video_header, encode_video_header, encode_video_unit, RawVideoUnit, VideoUnitHeader,
    NO_PTS, VIDEO_HEADER_SIZE, VIDEO_UNIT_MAX_SIZE,
};
