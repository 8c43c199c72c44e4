//! Raw H.264 elementary-stream writer.
//!
//! An Annex-B file is the concatenation of the codec configuration and every
//! access unit, start codes included. There is no container index, so packet
//! timing is dropped; players assume a constant frame rate.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::application::record::{ContainerMuxer, MuxPacket, MuxerError};

pub struct AnnexBFileMuxer<W: Write = BufWriter<File>> {
    out: W,
    path: PathBuf,
    bytes_written: u64,
}

impl AnnexBFileMuxer {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: &Path) -> Result<Self, MuxerError> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file), path))
    }
}

impl<W: Write> AnnexBFileMuxer<W> {
    pub fn from_writer(out: W, path: &Path) -> Self {
        Self {
            out,
            path: path.to_path_buf(),
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn append(&mut self, data: &[u8]) -> Result<(), MuxerError> {
        self.out.write_all(data)?;
        self.bytes_written += data.len() as u64;
        Ok(())
    }
}

impl<W: Write + Send> ContainerMuxer for AnnexBFileMuxer<W> {
    fn write_header(&mut self, config: &[u8]) -> Result<(), MuxerError> {
        self.append(config)
    }

    fn write_packet(&mut self, packet: &MuxPacket<'_>) -> Result<(), MuxerError> {
        self.append(packet.data)
    }

    fn write_trailer(&mut self) -> Result<(), MuxerError> {
        self.out.flush()?;
        debug!(path = %self.path.display(), bytes = self.bytes_written, "annex-b file finalized");
        Ok(())
    }
}
