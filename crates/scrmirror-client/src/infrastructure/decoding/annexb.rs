//! H.264 Annex-B access-unit parser.
//!
//! Each unit handed over by the ingest thread is a complete access unit: one
//! or more NAL units, each introduced by a `00 00 01` or `00 00 00 01` start
//! code. The parser walks the start codes and reports a key frame when an IDR
//! slice (NAL type 5) is present.

use tracing::trace;

use crate::application::decode::{BitstreamParser, ParsedUnit, ParserError};

const NAL_TYPE_IDR: u8 = 5;
const NAL_TYPE_MASK: u8 = 0x1F;

#[derive(Debug, Default)]
pub struct AnnexBParser {
    units_parsed: u64,
    closed: bool,
}

impl AnnexBParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units_parsed(&self) -> u64 {
        self.units_parsed
    }
}

/// Returns the NAL unit types found in `data`, in order.
pub fn nal_unit_types(data: &[u8]) -> Vec<u8> {
    let mut types = Vec::new();
    let mut i = 0;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 1 {
            if let Some(&header) = data.get(i + 3) {
                types.push(header & NAL_TYPE_MASK);
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    types
}

fn starts_with_start_code(data: &[u8]) -> bool {
    data.starts_with(&[0, 0, 1]) || data.starts_with(&[0, 0, 0, 1])
}

impl BitstreamParser for AnnexBParser {
    fn parse(&mut self, data: &[u8]) -> Result<ParsedUnit, ParserError> {
        if self.closed {
            return Err(ParserError::InvalidBitstream("parser is closed".into()));
        }
        if !starts_with_start_code(data) {
            return Err(ParserError::InvalidBitstream(
                "access unit does not begin with a start code".into(),
            ));
        }
        let types = nal_unit_types(data);
        let key_frame = types.contains(&NAL_TYPE_IDR);
        self.units_parsed += 1;
        trace!(?types, key_frame, "access unit parsed");
        Ok(ParsedUnit {
            consumed: data.len(),
            key_frame,
        })
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: [u8; 5] = [0, 0, 0, 1, 0x67];
    const PPS: [u8; 5] = [0, 0, 0, 1, 0x68];
    const IDR: [u8; 6] = [0, 0, 0, 1, 0x65, 0x88];
    const SLICE: [u8; 6] = [0, 0, 1, 0x41, 0x9A, 0x00];

    #[test]
    fn test_nal_unit_types_walks_both_start_code_lengths() {
        let mut data = SPS.to_vec();
        data.extend_from_slice(&PPS);
        data.extend_from_slice(&IDR);
        data.extend_from_slice(&SLICE);
        assert_eq!(nal_unit_types(&data), vec![7, 8, 5, 1]);
    }

    #[test]
    fn test_config_plus_idr_is_key_frame() {
        // Arrange
        let mut data = SPS.to_vec();
        data.extend_from_slice(&PPS);
        data.extend_from_slice(&IDR);
        let mut parser = AnnexBParser::new();

        // Act
        let parsed = parser.parse(&data).unwrap();

        // Assert
        assert!(parsed.key_frame);
        assert_eq!(parsed.consumed, data.len());
    }

    #[test]
    fn test_non_idr_slice_is_not_key_frame() {
        let mut parser = AnnexBParser::new();
        let parsed = parser.parse(&SLICE).unwrap();
        assert!(!parsed.key_frame);
    }

    #[test]
    fn test_missing_start_code_is_rejected() {
        let mut parser = AnnexBParser::new();
        assert!(parser.parse(&[0x65, 0x88]).is_err());
        assert!(parser.parse(&[]).is_err());
    }

    #[test]
    fn test_closed_parser_rejects_input() {
        let mut parser = AnnexBParser::new();
        parser.close();
        assert!(parser.parse(&IDR).is_err());
    }
}
