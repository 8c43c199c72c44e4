//! One mirroring connection and the channels it owns.
//!
//! # Startup and shutdown order
//!
//! ```text
//! start():    control sender ─► device receiver ─► video ingest
//! shutdown(): stop ingest ─► stop control ─► shut sockets ─► join all
//! ```
//!
//! The owning thread receives [`SessionEvent`]s on a tokio channel: one
//! `NewFrame` whenever a decoded picture is ready and not already signalled,
//! and exactly one `StreamStopped` when the video stream ends.

use std::io;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;

use scrmirror_core::{FrameBuffer, FramePolicy};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

use crate::application::decode::{BitstreamParser, DecodedFrame, VideoDecoder};
use crate::application::record::RecordingSummary;
use crate::application::sync_clipboard::{ClipboardSync, PlatformClipboard};
use crate::infrastructure::network::{
    ChannelError, ControlHandle, ControlSender, DeviceReceiver, DEFAULT_CONTROL_QUEUE_CAPACITY,
};
use crate::infrastructure::video::{IngestSinks, StreamEnd, StreamRecorder, VideoIngest};

/// Notifications sent from the channel threads to the owning thread.
#[derive(Debug)]
pub enum SessionEvent {
    /// A new frame is waiting in the frame buffer.
    NewFrame,
    /// The video stream ended; sent once, after every collaborator is closed.
    StreamStopped {
        reason: StreamEnd,
        recording: Option<RecordingSummary>,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("failed to share socket between channels: {0}")]
    SocketClone(#[source] io::Error),
}

/// Collaborators and tuning for a session.
pub struct SessionDeps {
    pub parser: Box<dyn BitstreamParser>,
    pub decoder: Option<Box<dyn VideoDecoder>>,
    pub recorder: Option<StreamRecorder>,
    pub clipboard: Arc<dyn PlatformClipboard>,
    pub frame_policy: FramePolicy,
    pub control_queue_capacity: usize,
}

impl SessionDeps {
    /// Dependencies with no decoder, no recorder and default tuning.
    pub fn new(parser: Box<dyn BitstreamParser>, clipboard: Arc<dyn PlatformClipboard>) -> Self {
        Self {
            parser,
            decoder: None,
            recorder: None,
            clipboard,
            frame_policy: FramePolicy::default(),
            control_queue_capacity: DEFAULT_CONTROL_QUEUE_CAPACITY,
        }
    }
}

pub struct MirrorSession {
    video_socket: TcpStream,
    control_socket: TcpStream,
    frames: Arc<FrameBuffer<DecodedFrame>>,
    clipboard: ClipboardSync,
    control: ControlSender,
    device: DeviceReceiver,
    ingest: VideoIngest,
    shut_down: bool,
}

impl MirrorSession {
    /// Starts every channel on the two connected sockets.
    ///
    /// The device info preamble must already have been read from `video`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if a socket cannot be shared or a thread
    /// cannot be spawned. Channels started before the failure are stopped.
    pub fn start(
        video: TcpStream,
        control: TcpStream,
        deps: SessionDeps,
    ) -> Result<(Self, UnboundedReceiver<SessionEvent>), SessionError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let frames = Arc::new(FrameBuffer::new(deps.frame_policy));
        let clipboard = ClipboardSync::new(deps.clipboard);

        let control_writer = control.try_clone().map_err(SessionError::SocketClone)?;
        let control_reader = control.try_clone().map_err(SessionError::SocketClone)?;
        let video_reader = video.try_clone().map_err(SessionError::SocketClone)?;

        let mut session = Self {
            video_socket: video,
            control_socket: control,
            frames: Arc::clone(&frames),
            clipboard: clipboard.clone(),
            control: ControlSender::new(deps.control_queue_capacity),
            device: DeviceReceiver::new(),
            ingest: VideoIngest::new(frames),
            shut_down: false,
        };

        // on error, Drop shuts down whatever already started
        session.control.start(control_writer)?;
        session.device.start(control_reader, clipboard)?;
        session.ingest.start(
            video_reader,
            IngestSinks {
                parser: deps.parser,
                decoder: deps.decoder,
                recorder: deps.recorder,
            },
            events_tx,
        )?;

        info!("mirror session started");
        Ok((session, events_rx))
    }

    /// Producer handle for the outgoing control channel.
    pub fn control(&self) -> ControlHandle {
        self.control.handle()
    }

    pub fn frames(&self) -> &Arc<FrameBuffer<DecodedFrame>> {
        &self.frames
    }

    pub fn clipboard(&self) -> &ClipboardSync {
        &self.clipboard
    }

    /// Pushes the local clipboard to the device.
    ///
    /// Returns `false` when there was nothing to send or the message was dropped.
    pub fn send_local_clipboard(&self, paste: bool) -> bool {
        match self.clipboard.outgoing_set_clipboard(paste) {
            Ok(Some(msg)) => self.control.push(msg).is_ok(),
            Ok(None) => false,
            Err(e) => {
                warn!("could not read local clipboard: {e}");
                false
            }
        }
    }

    /// Stops every channel and waits for its thread. Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        debug!("shutting down mirror session");

        self.ingest.stop();
        self.control.stop();

        // unblock the reader threads
        for (name, socket) in [
            ("video", &self.video_socket),
            ("control", &self.control_socket),
        ] {
            if let Err(e) = socket.shutdown(Shutdown::Both) {
                if e.kind() != io::ErrorKind::NotConnected {
                    warn!("could not shut down {name} socket: {e}");
                }
            }
        }

        self.ingest.join();
        self.control.join();
        self.device.join();
        info!("mirror session stopped");
    }
}

impl Drop for MirrorSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
