//! Mock decoder and parser for tests.
//!
//! Both mocks append to a shared [`LifecycleLog`] so tests can assert not
//! only what each collaborator saw but the order in which the ingest thread
//! opened, used, and closed them.

use std::sync::{Arc, Mutex};

use crate::application::decode::{
    AccessUnit, BitstreamParser, DecodedFrame, DecoderError, ParsedUnit, ParserError,
    VideoDecoder,
};

/// Ordered record of collaborator calls, shared between mocks.
#[derive(Debug, Clone, Default)]
pub struct LifecycleLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl LifecycleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    /// Index of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// Decoder that "decodes" a unit by copying its bytes into the frame.
#[derive(Debug, Default)]
pub struct MockDecoder {
    pub log: LifecycleLog,
    /// Units seen by `decode`, in order.
    pub decoded: Arc<Mutex<Vec<AccessUnit>>>,
    /// When `true`, `open` fails.
    pub fail_open: bool,
    pub width: u32,
    pub height: u32,
}

impl MockDecoder {
    pub fn new(log: LifecycleLog) -> Self {
        Self {
            log,
            width: 1080,
            height: 1920,
            ..Self::default()
        }
    }
}

impl VideoDecoder for MockDecoder {
    fn open(&mut self) -> Result<(), DecoderError> {
        if self.fail_open {
            return Err(DecoderError::Open("mock failure".into()));
        }
        self.log.push("decoder.open");
        Ok(())
    }

    fn decode(
        &mut self,
        unit: &AccessUnit,
        frame: &mut DecodedFrame,
    ) -> Result<bool, DecoderError> {
        self.decoded.lock().unwrap().push(unit.clone());
        frame.width = self.width;
        frame.height = self.height;
        frame.pts = unit.pts;
        frame.data.clear();
        frame.data.extend_from_slice(&unit.data);
        Ok(true)
    }

    fn close(&mut self) {
        self.log.push("decoder.close");
    }
}

/// Parser that accepts everything, optionally under-reporting consumption.
#[derive(Debug, Default)]
pub struct MockParser {
    pub log: LifecycleLog,
    /// Lengths of the inputs passed to `parse`.
    pub parsed: Arc<Mutex<Vec<usize>>>,
    /// When set, `parse` reports this many consumed bytes instead of the input length.
    pub consumed_override: Option<usize>,
}

impl MockParser {
    pub fn new(log: LifecycleLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }
}

impl BitstreamParser for MockParser {
    fn parse(&mut self, data: &[u8]) -> Result<ParsedUnit, ParserError> {
        self.parsed.lock().unwrap().push(data.len());
        Ok(ParsedUnit {
            consumed: self.consumed_override.unwrap_or(data.len()),
            key_frame: true,
        })
    }

    fn close(&mut self) {
        self.log.push("parser.close");
    }
}
