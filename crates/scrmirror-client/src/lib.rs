//! scrmirror-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does scrmirror-client do? (for beginners)
//!
//! The client shows and records the screen of a remote device and sends it
//! input. A server running on the device accepts two TCP connections:
//!
//! 1. The **video socket** starts with a 68-byte device info header (name and
//!    screen size), followed by an endless series of framed H.264 units.
//! 2. The **control socket** carries input commands to the device and
//!    clipboard updates back from it.
//!
//! Each direction gets its own thread so that a slow decoder never delays a
//! key press and a slow disk never delays the picture:
//!
//! ```text
//! video socket ─► VideoIngest ─► parser ─► decoder ─► FrameBuffer ─► renderer
//!                      └──────────► Recorder ─► file
//! input mapper ─► ControlSender ─► control socket
//! control socket ─► DeviceReceiver ─► local clipboard
//! ```
//!
//! [`infrastructure::session::MirrorSession`] owns all of these for one
//! connection.

/// Application layer: decoder/muxer/clipboard seams and pure stream logic.
pub mod application;

/// Infrastructure layer: sockets, threads, files.
pub mod infrastructure;
