//! Decoder and bitstream parser seams.
//!
//! The client never decodes H.264 itself. Video Ingest drives two external
//! collaborators through these traits:
//!
//! - a [`BitstreamParser`], which inspects each reassembled access unit and
//!   reports whether it is a key frame, and
//! - an optional [`VideoDecoder`], which turns access units into pictures that
//!   are handed to the renderer through the frame buffer.
//!
//! Implementations live in the infrastructure layer (`infrastructure::decoding`).

use thiserror::Error;

/// One complete unit of compressed video, ready for the parser and decoder.
///
/// Configuration data received ahead of it has already been prepended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessUnit {
    pub pts: u64,
    pub data: Vec<u8>,
    pub key_frame: bool,
}

/// A decoded picture. Storage is reused between frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub pts: u64,
    pub data: Vec<u8>,
}

/// Result of parsing one access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedUnit {
    /// Bytes the parser consumed; must equal the input length.
    pub consumed: usize,
    pub key_frame: bool,
}

#[derive(Debug, Error)]
pub enum DecoderError {
    #[error("failed to open decoder: {0}")]
    Open(String),
    #[error("could not decode unit at pts {pts}: {reason}")]
    Decode { pts: u64, reason: String },
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("invalid bitstream: {0}")]
    InvalidBitstream(String),
}

/// Turns compressed access units into pictures.
pub trait VideoDecoder: Send {
    /// Allocates decoder state. Called once before the first `decode`.
    fn open(&mut self) -> Result<(), DecoderError>;

    /// Decodes `unit` into `frame`.
    ///
    /// Returns `true` when `frame` now holds a new picture, `false` when the
    /// decoder needs more input first.
    fn decode(&mut self, unit: &AccessUnit, frame: &mut DecodedFrame)
        -> Result<bool, DecoderError>;

    /// Releases decoder state.
    fn close(&mut self);
}

/// Splits and classifies access units.
///
/// The ingest thread always hands over complete units, so a parser that does
/// not consume the whole input indicates a broken stream.
pub trait BitstreamParser: Send {
    fn parse(&mut self, data: &[u8]) -> Result<ParsedUnit, ParserError>;

    fn close(&mut self);
}
