//! Application layer for the client: stream logic that does not touch
//! sockets, threads, or the OS.
//!
//! # What lives here?
//!
//! - **`decode`** – The `VideoDecoder` / `BitstreamParser` seams and the
//!   access-unit and frame types that flow through them.
//!
//! - **`reassemble`** – Joins configuration units with the media unit that
//!   follows them before decoding and recording.
//!
//! - **`record`** – Packet timing for recordings (one-packet lookahead) and
//!   the `ContainerMuxer` seam.
//!
//! - **`sync_clipboard`** – Applies device clipboard messages to the local
//!   clipboard and builds `SetClipboard` commands in the other direction.

pub mod decode;
pub mod reassemble;
pub mod record;
pub mod sync_clipboard;
