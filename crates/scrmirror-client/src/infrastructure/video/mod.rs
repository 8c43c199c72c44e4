//! Video socket handling.
//!
//! The video socket starts with the device info preamble, read once on the
//! owning thread by [`read_device_info`], followed by framed video units
//! consumed by the [`VideoIngest`] thread.

pub mod ingest;

use std::io::Read;

use scrmirror_core::protocol::device_info::{decode_device_info, DEVICE_INFO_SIZE};
use scrmirror_core::DeviceInfo;
use tracing::debug;

pub use ingest::{IngestSinks, StreamEnd, StreamRecorder, VideoIngest};

use crate::infrastructure::network::ChannelError;

/// Reads and decodes the 68-byte device info preamble.
///
/// # Errors
///
/// [`ChannelError::Io`] if the socket closes before the preamble is complete.
pub fn read_device_info<R: Read>(reader: &mut R) -> Result<DeviceInfo, ChannelError> {
    let mut buf = [0u8; DEVICE_INFO_SIZE];
    reader.read_exact(&mut buf)?;
    let info = decode_device_info(&buf)?;
    debug!(
        device = %info.name,
        width = info.frame_size.width,
        height = info.frame_size.height,
        "device info received"
    );
    Ok(info)
}
