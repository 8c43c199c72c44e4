//! # scrmirror-core
//!
//! Shared library for the ScrMirror screen-mirroring client containing the
//! wire codecs and the thread handoff primitives.
//!
//! It has no dependencies on sockets, decoders, or UI frameworks; everything
//! here is pure data transformation or in-process synchronisation.
//!
//! # Architecture overview (for beginners)
//!
//! A ScrMirror device streams its screen as H.264 over one TCP socket and
//! exchanges small commands over a second one. The desktop client runs one
//! thread per socket direction, and those threads need two things from this
//! crate:
//!
//! - **`protocol`** – How bytes travel over the sockets. Control messages
//!   (host → device), device messages (device → host), the 12-byte video unit
//!   header and the 68-byte device info preamble are encoded and decoded here.
//!
//! - **`sync`** – How data moves between threads. A [`BoundedQueue`] feeds
//!   the control sender and the recorder; a [`FrameBuffer`] hands decoded
//!   frames from the decoder to the renderer.

pub mod protocol;
pub mod sync;

pub use protocol::codec::{
    decode_control_message, decode_device_message, encode_control_message, encode_device_message,
    ProtocolError,
};
pub use protocol::device_info::DeviceInfo;
pub use protocol::messages::{ControlMessage, DeviceMessage};
pub use protocol::video::RawVideoUnit;
pub use sync::{BoundedQueue, FrameBuffer, FramePolicy, QueueClosed};
