//! Incoming device channel: a reader thread on the control socket.
//!
//! Bytes are accumulated in a fixed buffer; every read is followed by
//! decoding as many complete messages as the buffer holds. An incomplete
//! tail is moved to the start of the buffer and completed by later reads.

use std::io::{ErrorKind, Read};
use std::thread::{self, JoinHandle};

use scrmirror_core::protocol::messages::DEVICE_MSG_MAX_SIZE;
use scrmirror_core::{decode_device_message, ProtocolError};
use tracing::{debug, info, warn};

use super::{ChannelError, ChannelExit, ChannelState};
use crate::application::sync_clipboard::ClipboardSync;

/// Size of the accumulation buffer; one maximal message always fits.
pub const DEVICE_MSG_BUFFER_SIZE: usize = DEVICE_MSG_MAX_SIZE;

pub struct DeviceReceiver {
    state: ChannelState,
    thread: Option<JoinHandle<ChannelExit>>,
}

impl Default for DeviceReceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceReceiver {
    pub fn new() -> Self {
        Self {
            state: ChannelState::Created,
            thread: None,
        }
    }

    /// Spawns the reader thread.
    ///
    /// The thread runs until the peer closes the socket, a read fails, or a
    /// malformed message arrives.
    pub fn start<R>(&mut self, reader: R, clipboard: ClipboardSync) -> Result<(), ChannelError>
    where
        R: Read + Send + 'static,
    {
        if self.state != ChannelState::Created {
            return Err(ChannelError::AlreadyStarted);
        }
        let handle = thread::Builder::new()
            .name("scrmirror-device".into())
            .spawn(move || run_receiver(reader, &clipboard))
            .map_err(|source| ChannelError::Spawn {
                name: "device",
                source,
            })?;
        self.thread = Some(handle);
        self.state = ChannelState::Running;
        Ok(())
    }

    /// Waits for the reader thread to end.
    pub fn join(&mut self) -> Option<ChannelExit> {
        let handle = self.thread.take()?;
        let exit = match handle.join() {
            Ok(exit) => exit,
            Err(_) => {
                warn!("device receiver thread panicked");
                ChannelExit::Stopped
            }
        };
        self.state = ChannelState::Joined;
        Some(exit)
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }
}

fn run_receiver<R: Read>(mut reader: R, clipboard: &ClipboardSync) -> ChannelExit {
    let mut buf = vec![0u8; DEVICE_MSG_BUFFER_SIZE];
    let mut head = 0;

    let exit = loop {
        let read = match reader.read(&mut buf[head..]) {
            Ok(0) => break ChannelExit::PeerClosed,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => break ChannelExit::Io(e),
        };
        head += read;

        let consumed = match process_messages(&buf[..head], clipboard) {
            Ok(consumed) => consumed,
            Err(e) => {
                warn!("malformed device message: {e}");
                break ChannelExit::Malformed(e);
            }
        };

        if consumed == 0 && head == buf.len() {
            // cannot happen with a conforming peer: one message always fits
            break ChannelExit::Malformed(ProtocolError::InvalidLength {
                declared: head,
                max: DEVICE_MSG_BUFFER_SIZE,
            });
        }
        buf.copy_within(consumed..head, 0);
        head -= consumed;
    };

    info!(reason = ?exit, "device receiver stopped");
    exit
}

/// Decodes and applies every complete message in `buf`.
///
/// Returns how many bytes were consumed.
fn process_messages(buf: &[u8], clipboard: &ClipboardSync) -> Result<usize, ProtocolError> {
    let mut offset = 0;
    while offset < buf.len() {
        match decode_device_message(&buf[offset..]) {
            Ok((msg, len)) => {
                debug!(kind = ?msg.message_type(), len, "device message received");
                if let Err(e) = clipboard.apply(&msg) {
                    warn!("could not apply device message: {e}");
                }
                offset += len;
            }
            Err(e) if e.is_incomplete() => break,
            Err(e) => return Err(e),
        }
    }
    Ok(offset)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
