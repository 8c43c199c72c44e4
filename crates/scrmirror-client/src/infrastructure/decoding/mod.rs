//! Bitstream parser and decoder adapters.
//!
//! - **`annexb`** – `AnnexBParser`, a dependency-free H.264 Annex-B parser
//!   that flags IDR access units as key frames.
//! - **`mock`** – Recording `VideoDecoder` / `BitstreamParser` doubles for tests.
//!
//! Real picture decoding is supplied by the embedding application through
//! `VideoDecoder`.

pub mod annexb;
pub mod mock;

pub use annexb::AnnexBParser;
