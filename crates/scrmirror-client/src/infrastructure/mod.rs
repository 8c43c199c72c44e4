//! Infrastructure layer for the mirroring client.
//!
//! Everything that touches a socket, a thread, or a file lives here.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `scrmirror_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.
//!
//! # Sub-modules
//!
//! - **`network`** – socket connection plus the two control-socket channels:
//!   the outgoing control sender and the incoming device receiver.
//! - **`video`** – device info preamble and the video ingest thread.
//! - **`recording`** – recorder thread and the built-in Annex-B file muxer.
//! - **`decoding`** – the Annex-B bitstream parser and test decoders.
//! - **`clipboard`** – in-memory `PlatformClipboard` for headless runs and tests.
//! - **`session`** – `MirrorSession`, the owner of all channels of one connection.
//! - **`storage`** – TOML configuration file.

pub mod clipboard;
pub mod decoding;
pub mod network;
pub mod recording;
pub mod session;
pub mod storage;
pub mod video;
