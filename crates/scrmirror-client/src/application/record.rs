//! Recording logic: packet timing and the container muxer seam.
//!
//! Containers need a duration for every packet, but a live stream only tells
//! us when a packet *starts*. [`PacketWriter`] therefore holds each media
//! packet back until the next one arrives and uses the timestamp difference
//! as its duration. The packet still held when recording stops gets
//! [`FIXED_LAST_DURATION_US`].
//!
//! The first packet of a recording must be the codec configuration; it is
//! written as the container header and never muxed as media.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Duration given to the final packet, in microseconds.
pub const FIXED_LAST_DURATION_US: u64 = 100_000;

/// Output container, chosen from the file extension or configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    Mp4,
    Mkv,
    /// Raw Annex-B elementary stream.
    H264,
}

impl RecordFormat {
    /// Infers the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp4" => Some(RecordFormat::Mp4),
            "mkv" => Some(RecordFormat::Mkv),
            "h264" | "264" => Some(RecordFormat::H264),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RecordFormat::Mp4 => "mp4",
            RecordFormat::Mkv => "mkv",
            RecordFormat::H264 => "h264",
        }
    }
}

/// A packet queued for the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPacket {
    /// `None` for codec configuration packets.
    pub pts: Option<u64>,
    pub data: Vec<u8>,
    pub key_frame: bool,
}

impl RecordPacket {
    pub fn config(data: Vec<u8>) -> Self {
        Self {
            pts: None,
            data,
            key_frame: false,
        }
    }

    pub fn media(pts: u64, data: Vec<u8>, key_frame: bool) -> Self {
        Self {
            pts: Some(pts),
            data,
            key_frame,
        }
    }
}

/// A media packet with its computed duration, as handed to the muxer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxPacket<'a> {
    pub pts: u64,
    pub duration: u64,
    pub key_frame: bool,
    pub data: &'a [u8],
}

#[derive(Debug, Error)]
pub enum MuxerError {
    #[error("muxer I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format not supported by this muxer: {0:?}")]
    UnsupportedFormat(RecordFormat),
    #[error("muxer error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("first recorded packet is not a configuration packet")]
    MissingHeader,
    #[error("no packet was recorded")]
    Empty,
    #[error("recorder has failed")]
    Failed,
    #[error("recorder queue is full")]
    QueueFull,
    #[error("recorder already started")]
    AlreadyStarted,
    #[error("failed to spawn recorder thread: {0}")]
    Spawn(std::io::Error),
    #[error(transparent)]
    Muxer(#[from] MuxerError),
}

/// Writes a container file. Implemented by external muxing libraries or by
/// the built-in Annex-B writer.
pub trait ContainerMuxer: Send {
    /// Writes the container header from the codec configuration bytes.
    fn write_header(&mut self, config: &[u8]) -> Result<(), MuxerError>;

    fn write_packet(&mut self, packet: &MuxPacket<'_>) -> Result<(), MuxerError>;

    /// Finalizes the file. Only called when a header was written.
    fn write_trailer(&mut self) -> Result<(), MuxerError>;
}

impl<M: ContainerMuxer + ?Sized> ContainerMuxer for Box<M> {
    fn write_header(&mut self, config: &[u8]) -> Result<(), MuxerError> {
        (**self).write_header(config)
    }

    fn write_packet(&mut self, packet: &MuxPacket<'_>) -> Result<(), MuxerError> {
        (**self).write_packet(packet)
    }

    fn write_trailer(&mut self) -> Result<(), MuxerError> {
        (**self).write_trailer()
    }
}

/// Final state of a recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingSummary {
    /// Media packets written (the header is not counted).
    pub packets_written: u64,
    /// Packets rejected by the recorder queue and missing from the file.
    pub packets_dropped: u64,
    pub header_written: bool,
    pub failed: bool,
}

impl RecordingSummary {
    /// `true` when the file holds every packet that was offered.
    pub fn is_complete(&self) -> bool {
        self.header_written && !self.failed && self.packets_dropped == 0
    }
}

struct HeldPacket {
    pts: u64,
    data: Vec<u8>,
    key_frame: bool,
}

/// Applies header handling and one-packet lookahead in front of a muxer.
pub struct PacketWriter<M> {
    muxer: M,
    header_written: bool,
    held: Option<HeldPacket>,
    packets_written: u64,
}

impl<M: ContainerMuxer> PacketWriter<M> {
    pub fn new(muxer: M) -> Self {
        Self {
            muxer,
            header_written: false,
            held: None,
            packets_written: 0,
        }
    }

    /// Accepts the next packet in stream order.
    ///
    /// # Errors
    ///
    /// [`RecordError::MissingHeader`] if the first packet carries a
    /// timestamp; [`RecordError::Muxer`] if the muxer fails.
    pub fn write(&mut self, packet: RecordPacket) -> Result<(), RecordError> {
        if !self.header_written {
            if packet.pts.is_some() {
                return Err(RecordError::MissingHeader);
            }
            self.muxer.write_header(&packet.data)?;
            self.header_written = true;
            debug!(len = packet.data.len(), "recording header written");
            return Ok(());
        }

        let Some(pts) = packet.pts else {
            // configuration repeats are already part of the following media unit
            return Ok(());
        };

        if let Some(previous) = self.held.take() {
            let duration = match pts.checked_sub(previous.pts) {
                Some(d) => d,
                None => {
                    warn!(
                        previous = previous.pts,
                        current = pts,
                        "timestamps went backwards, using zero duration"
                    );
                    0
                }
            };
            self.emit(&previous, duration)?;
        }
        self.held = Some(HeldPacket {
            pts,
            data: packet.data,
            key_frame: packet.key_frame,
        });
        Ok(())
    }

    /// Writes the held packet, if any, with the fixed final duration.
    pub fn flush(&mut self) -> Result<(), RecordError> {
        if let Some(last) = self.held.take() {
            self.emit(&last, FIXED_LAST_DURATION_US)?;
        }
        Ok(())
    }

    /// Drops the held packet without writing it.
    pub fn discard_held(&mut self) {
        self.held = None;
    }

    /// Writes the trailer when a header was written.
    ///
    /// # Errors
    ///
    /// [`RecordError::Empty`] when nothing was ever recorded.
    pub fn finish(&mut self) -> Result<(), RecordError> {
        if !self.header_written {
            return Err(RecordError::Empty);
        }
        self.muxer.write_trailer()?;
        Ok(())
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn muxer(&self) -> &M {
        &self.muxer
    }

    fn emit(&mut self, packet: &HeldPacket, duration: u64) -> Result<(), RecordError> {
        self.muxer.write_packet(&MuxPacket {
            pts: packet.pts,
            duration,
            key_frame: packet.key_frame,
            data: &packet.data,
        })?;
        self.packets_written += 1;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::recording::mock::{MockMuxer, MuxerCall};
    use std::path::PathBuf;

    #[test]
    fn test_record_format_from_extension() {
        assert_eq!(
            RecordFormat::from_path(&PathBuf::from("out.MP4")),
            Some(RecordFormat::Mp4)
        );
        assert_eq!(
            RecordFormat::from_path(&PathBuf::from("a/b/c.mkv")),
            Some(RecordFormat::Mkv)
        );
        assert_eq!(
            RecordFormat::from_path(&PathBuf::from("raw.h264")),
            Some(RecordFormat::H264)
        );
        assert_eq!(RecordFormat::from_path(&PathBuf::from("video.avi")), None);
        assert_eq!(RecordFormat::from_path(&PathBuf::from("noext")), None);
    }

    #[test]
    fn test_first_packet_becomes_header() {
        // Arrange
        let mut writer = PacketWriter::new(MockMuxer::new());

        // Act
        writer.write(RecordPacket::config(vec![1, 2, 3])).unwrap();

        // Assert
        assert!(writer.header_written());
        assert_eq!(
            writer.muxer().calls(),
            vec![MuxerCall::Header(vec![1, 2, 3])]
        );
    }

    #[test]
    fn test_first_media_packet_is_rejected() {
        let mut writer = PacketWriter::new(MockMuxer::new());
        let err = writer.write(RecordPacket::media(0, vec![1], true));
        assert!(matches!(err, Err(RecordError::MissingHeader)));
        assert!(writer.muxer().calls().is_empty());
    }

    #[test]
    fn test_durations_come_from_next_timestamp() {
        // Arrange
        let mut writer = PacketWriter::new(MockMuxer::new());
        writer.write(RecordPacket::config(vec![0])).unwrap();

        // Act
        for pts in [1000, 2500, 4000, 5500] {
            writer.write(RecordPacket::media(pts, vec![1], false)).unwrap();
        }
        writer.flush().unwrap();

        // Assert
        assert_eq!(
            writer.muxer().durations(),
            vec![1500, 1500, 1500, FIXED_LAST_DURATION_US]
        );
        assert_eq!(writer.packets_written(), 4);
    }

    #[test]
    fn test_packet_is_held_until_next_arrives() {
        let mut writer = PacketWriter::new(MockMuxer::new());
        writer.write(RecordPacket::config(vec![0])).unwrap();
        writer.write(RecordPacket::media(10, vec![1], true)).unwrap();
        assert_eq!(writer.packets_written(), 0);

        writer.write(RecordPacket::media(30, vec![2], false)).unwrap();
        assert_eq!(writer.packets_written(), 1);
        assert_eq!(writer.muxer().durations(), vec![20]);
    }

    #[test]
    fn test_later_config_packets_are_ignored() {
        let mut writer = PacketWriter::new(MockMuxer::new());
        writer.write(RecordPacket::config(vec![0])).unwrap();
        writer.write(RecordPacket::media(0, vec![1], true)).unwrap();
        writer.write(RecordPacket::config(vec![9, 9])).unwrap();
        writer.write(RecordPacket::media(40, vec![2], false)).unwrap();
        writer.flush().unwrap();

        assert_eq!(writer.muxer().durations(), vec![40, FIXED_LAST_DURATION_US]);
        let headers = writer
            .muxer()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MuxerCall::Header(_)))
            .count();
        assert_eq!(headers, 1);
    }

    #[test]
    fn test_backwards_timestamp_gets_zero_duration() {
        let mut writer = PacketWriter::new(MockMuxer::new());
        writer.write(RecordPacket::config(vec![0])).unwrap();
        writer.write(RecordPacket::media(100, vec![1], true)).unwrap();
        writer.write(RecordPacket::media(50, vec![2], false)).unwrap();
        assert_eq!(writer.muxer().durations(), vec![0]);
    }

    #[test]
    fn test_finish_without_header_is_empty() {
        let mut writer = PacketWriter::new(MockMuxer::new());
        assert!(matches!(writer.finish(), Err(RecordError::Empty)));
        assert!(writer.muxer().calls().is_empty());
    }

    #[test]
    fn test_finish_writes_trailer() {
        let mut writer = PacketWriter::new(MockMuxer::new());
        writer.write(RecordPacket::config(vec![0])).unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.muxer().calls().last(), Some(&MuxerCall::Trailer));
    }
}
