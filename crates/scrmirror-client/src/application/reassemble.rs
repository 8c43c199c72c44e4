//! Joins configuration units with the media unit that follows them.
//!
//! The device sends SPS/PPS as separate configuration units (no timestamp).
//! Decoders and container muxers expect them in front of the next media
//! unit, so they are held back and prepended.

use scrmirror_core::RawVideoUnit;

use crate::application::decode::AccessUnit;

/// Holds at most one pending configuration buffer.
#[derive(Debug, Default)]
pub struct UnitAssembler {
    pending: Option<Vec<u8>>,
}

impl UnitAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts the next unit from the socket.
    ///
    /// Configuration units are buffered (consecutive ones extend the same
    /// buffer) and yield `None`. A media unit yields an [`AccessUnit`] made of
    /// the pending configuration bytes followed by its own payload, carrying
    /// its timestamp; the pending buffer is consumed either way.
    pub fn push(&mut self, unit: RawVideoUnit) -> Option<AccessUnit> {
        match unit.pts {
            None => {
                match self.pending.as_mut() {
                    Some(pending) => pending.extend_from_slice(&unit.payload),
                    None => self.pending = Some(unit.payload),
                }
                None
            }
            Some(pts) => {
                let data = match self.pending.take() {
                    Some(mut pending) => {
                        pending.extend_from_slice(&unit.payload);
                        pending
                    }
                    None => unit.payload,
                };
                Some(AccessUnit {
                    pts,
                    data,
                    key_frame: false,
                })
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_unit_without_config_passes_through() {
        let mut assembler = UnitAssembler::new();
        let unit = assembler.push(RawVideoUnit::media(5, vec![1, 2])).unwrap();
        assert_eq!(unit.pts, 5);
        assert_eq!(unit.data, vec![1, 2]);
    }

    #[test]
    fn test_config_is_prepended_to_next_media_unit() {
        // Arrange
        let mut assembler = UnitAssembler::new();

        // Act
        let first = assembler.push(RawVideoUnit::config(vec![0xC0, 0xC1]));
        let joined = assembler.push(RawVideoUnit::media(100, vec![0xD0]));

        // Assert
        assert!(first.is_none());
        let joined = joined.unwrap();
        assert_eq!(joined.pts, 100);
        assert_eq!(joined.data, vec![0xC0, 0xC1, 0xD0]);
        assert!(!assembler.has_pending());
    }

    #[test]
    fn test_consecutive_config_units_extend_one_buffer() {
        let mut assembler = UnitAssembler::new();
        assert!(assembler.push(RawVideoUnit::config(vec![1])).is_none());
        assert!(assembler.push(RawVideoUnit::config(vec![2, 3])).is_none());
        assert_eq!(assembler.pending_len(), 3);

        let joined = assembler.push(RawVideoUnit::media(7, vec![4])).unwrap();
        assert_eq!(joined.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_pending_is_not_reused_for_later_units() {
        let mut assembler = UnitAssembler::new();
        assembler.push(RawVideoUnit::config(vec![9]));
        assembler.push(RawVideoUnit::media(1, vec![1]));

        let second = assembler.push(RawVideoUnit::media(2, vec![2])).unwrap();
        assert_eq!(second.data, vec![2]);
    }
}
