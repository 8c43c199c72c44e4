//! Recording infrastructure: the recorder thread and container muxers.
//!
//! - **`recorder`** – `Recorder`, the packet queue and its writer thread.
//! - **`annexb`** – `AnnexBFileMuxer`, the built-in raw `.h264` writer.
//! - **`mock`** – `MockMuxer`, a call-recording muxer for tests.
//!
//! MP4 and MKV need a real container library; the embedding application
//! supplies one as a `ContainerMuxer` and passes it to `Recorder::new`.

pub mod annexb;
pub mod mock;
pub mod recorder;

use std::path::Path;

pub use annexb::AnnexBFileMuxer;
pub use recorder::{Recorder, DEFAULT_RECORD_QUEUE_CAPACITY};

use crate::application::record::{ContainerMuxer, MuxerError, RecordFormat};

/// Opens the built-in muxer for `format` writing to `path`.
///
/// # Errors
///
/// [`MuxerError::UnsupportedFormat`] for containers that need an external
/// muxer; [`MuxerError::Io`] if the file cannot be created.
pub fn open_muxer(path: &Path, format: RecordFormat) -> Result<Box<dyn ContainerMuxer>, MuxerError> {
    match format {
        RecordFormat::H264 => Ok(Box::new(AnnexBFileMuxer::create(path)?)),
        RecordFormat::Mp4 | RecordFormat::Mkv => Err(MuxerError::UnsupportedFormat(format)),
    }
}
