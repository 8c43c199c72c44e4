//! Video ingest: the reader thread on the video socket.
//!
//! For every framed unit read from the socket the thread:
//!
//! 1. forwards configuration units to the recorder on their own (the first
//!    one becomes the container header) and holds them for reassembly;
//! 2. joins held configuration bytes with the next media unit;
//! 3. runs the joined unit through the parser, then the decoder, then the
//!    recorder;
//! 4. offers each decoded picture to the frame buffer and signals
//!    [`SessionEvent::NewFrame`] unless a previous signal is still pending.
//!
//! When the stream ends, for whatever reason, the collaborators are shut
//! down in a fixed order and [`SessionEvent::StreamStopped`] is sent last.

use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use scrmirror_core::protocol::video::{decode_video_header, VIDEO_HEADER_SIZE};
use scrmirror_core::{FrameBuffer, ProtocolError, RawVideoUnit};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, trace, warn};

use crate::application::decode::{BitstreamParser, DecodedFrame, VideoDecoder};
use crate::application::reassemble::UnitAssembler;
use crate::application::record::{ContainerMuxer, RecordPacket, RecordingSummary};
use crate::infrastructure::network::{ChannelError, ChannelState};
use crate::infrastructure::recording::Recorder;
use crate::infrastructure::session::SessionEvent;

/// Every this many dropped recording packets, the drop is logged as a warning.
const RECORD_DROP_LOG_INTERVAL: u64 = 100;

/// Recorder type driven by the ingest thread.
pub type StreamRecorder = Recorder<Box<dyn ContainerMuxer>>;

/// Why the video stream ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEnd {
    /// The device closed the socket.
    EndOfStream,
    /// The session asked the stream to stop.
    Stopped,
    Io(String),
    Malformed(ProtocolError),
    /// A unit was larger than the process could allocate.
    OutOfMemory { len: usize },
    Parser(String),
    Decoder(String),
}

/// Collaborators moved into the ingest thread.
pub struct IngestSinks {
    pub parser: Box<dyn BitstreamParser>,
    /// `None` when nothing consumes decoded pictures (headless recording).
    pub decoder: Option<Box<dyn VideoDecoder>>,
    pub recorder: Option<StreamRecorder>,
}

pub struct VideoIngest {
    frames: Arc<FrameBuffer<DecodedFrame>>,
    stopping: Arc<AtomicBool>,
    state: ChannelState,
    thread: Option<JoinHandle<()>>,
}

impl VideoIngest {
    pub fn new(frames: Arc<FrameBuffer<DecodedFrame>>) -> Self {
        Self {
            frames,
            stopping: Arc::new(AtomicBool::new(false)),
            state: ChannelState::Created,
            thread: None,
        }
    }

    /// Spawns the ingest thread reading framed units from `reader`.
    pub fn start<R>(
        &mut self,
        reader: R,
        sinks: IngestSinks,
        events: UnboundedSender<SessionEvent>,
    ) -> Result<(), ChannelError>
    where
        R: Read + Send + 'static,
    {
        if self.state != ChannelState::Created {
            return Err(ChannelError::AlreadyStarted);
        }
        let frames = Arc::clone(&self.frames);
        let stopping = Arc::clone(&self.stopping);
        let handle = thread::Builder::new()
            .name("scrmirror-video".into())
            .spawn(move || run_ingest(reader, sinks, &frames, &stopping, &events))
            .map_err(|source| ChannelError::Spawn {
                name: "video",
                source,
            })?;
        self.thread = Some(handle);
        self.state = ChannelState::Running;
        Ok(())
    }

    /// Requests the stream to stop.
    ///
    /// Interrupts the frame buffer so a decoder blocked on a slow renderer
    /// returns. The caller still has to unblock the socket read, typically
    /// with `TcpStream::shutdown`.
    pub fn stop(&mut self) {
        self.stopping.store(true, Ordering::Release);
        self.frames.interrupt();
        if self.state == ChannelState::Running {
            self.state = ChannelState::Stopping;
        }
    }

    pub fn join(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        if handle.join().is_err() {
            error!("video ingest thread panicked");
        }
        self.state = ChannelState::Joined;
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn frames(&self) -> &Arc<FrameBuffer<DecodedFrame>> {
        &self.frames
    }
}

/// Per-stream state owned by the ingest thread.
struct Pipeline<'a> {
    assembler: UnitAssembler,
    sinks: IngestSinks,
    frame: DecodedFrame,
    frames: &'a FrameBuffer<DecodedFrame>,
    events: &'a UnboundedSender<SessionEvent>,
}

impl Pipeline<'_> {
    fn handle(&mut self, unit: RawVideoUnit) -> Result<(), StreamEnd> {
        if unit.is_config() {
            trace!(len = unit.payload.len(), "configuration unit");
            self.record(RecordPacket::config(unit.payload.clone()));
            self.assembler.push(unit);
            return Ok(());
        }

        let Some(mut access_unit) = self.assembler.push(unit) else {
            return Ok(());
        };

        let parsed = self
            .sinks
            .parser
            .parse(&access_unit.data)
            .map_err(|e| StreamEnd::Parser(e.to_string()))?;
        if parsed.consumed != access_unit.data.len() {
            error!(
                consumed = parsed.consumed,
                len = access_unit.data.len(),
                "parser did not consume a complete unit"
            );
            return Err(StreamEnd::Parser(format!(
                "consumed {} of {} bytes",
                parsed.consumed,
                access_unit.data.len()
            )));
        }
        access_unit.key_frame = parsed.key_frame;

        if let Some(decoder) = self.sinks.decoder.as_mut() {
            let decoded = decoder
                .decode(&access_unit, &mut self.frame)
                .map_err(|e| StreamEnd::Decoder(e.to_string()))?;
            if decoded {
                self.publish_frame()?;
            }
        }

        self.record(RecordPacket::media(
            access_unit.pts,
            access_unit.data,
            access_unit.key_frame,
        ));
        Ok(())
    }

    fn publish_frame(&mut self) -> Result<(), StreamEnd> {
        match self.frames.offer(&mut self.frame) {
            Ok(previous_skipped) => {
                // a skipped frame means a NewFrame signal is still pending
                if !previous_skipped {
                    let _ = self.events.send(SessionEvent::NewFrame);
                }
                Ok(())
            }
            Err(_) => Err(StreamEnd::Stopped),
        }
    }

    /// Recording failures never end the stream.
    fn record(&mut self, packet: RecordPacket) {
        let Some(recorder) = self.sinks.recorder.as_ref() else {
            return;
        };
        if let Err(e) = recorder.push(packet) {
            let dropped = recorder.packets_dropped();
            if dropped == 1 || dropped % RECORD_DROP_LOG_INTERVAL == 0 {
                warn!(dropped, "recording packet dropped: {e}");
            } else {
                debug!(dropped, "recording packet dropped: {e}");
            }
        }
    }

    /// Closes every collaborator in order and reports the recording outcome.
    fn shutdown(mut self) -> Option<RecordingSummary> {
        self.sinks.parser.close();
        let summary = self.sinks.recorder.take().map(|mut recorder| {
            recorder.stop();
            recorder.join();
            recorder.close()
        });
        if let Some(decoder) = self.sinks.decoder.as_mut() {
            decoder.close();
        }
        drop(self.frame);
        summary
    }
}

fn run_ingest<R: Read>(
    mut reader: R,
    mut sinks: IngestSinks,
    frames: &FrameBuffer<DecodedFrame>,
    stopping: &AtomicBool,
    events: &UnboundedSender<SessionEvent>,
) {
    let mut opened = Ok(());
    if let Some(decoder) = sinks.decoder.as_mut() {
        opened = decoder.open().map_err(|e| StreamEnd::Decoder(e.to_string()));
    }
    if let Some(recorder) = sinks.recorder.as_mut() {
        if let Err(e) = recorder.start() {
            error!("could not start recorder: {e}");
        }
    }

    let mut pipeline = Pipeline {
        assembler: UnitAssembler::new(),
        sinks,
        frame: DecodedFrame::default(),
        frames,
        events,
    };

    let end = match opened {
        Err(end) => end,
        Ok(()) => loop {
            match read_unit(&mut reader) {
                Ok(Some(unit)) => {
                    if let Err(end) = pipeline.handle(unit) {
                        break end;
                    }
                }
                Ok(None) => break StreamEnd::EndOfStream,
                Err(end) => break end,
            }
        },
    };
    let end = if stopping.load(Ordering::Acquire) {
        StreamEnd::Stopped
    } else {
        end
    };

    match &end {
        StreamEnd::EndOfStream | StreamEnd::Stopped => info!(reason = ?end, "video stream ended"),
        _ => error!(reason = ?end, "video stream failed"),
    }

    let recording = pipeline.shutdown();
    let _ = events.send(SessionEvent::StreamStopped {
        reason: end,
        recording,
    });
    debug!("video ingest thread exiting");
}

/// Reads one framed unit. `Ok(None)` means the peer closed the socket.
fn read_unit<R: Read>(reader: &mut R) -> Result<Option<RawVideoUnit>, StreamEnd> {
    let mut header = [0u8; VIDEO_HEADER_SIZE];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(StreamEnd::Io(e.to_string())),
    }
    let header = decode_video_header(&header).map_err(StreamEnd::Malformed)?;

    let len = header.len as usize;
    let mut payload = Vec::new();
    payload
        .try_reserve_exact(len)
        .map_err(|_| StreamEnd::OutOfMemory { len })?;
    payload.resize(len, 0);
    match reader.read_exact(&mut payload) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(StreamEnd::Io(e.to_string())),
    }

    Ok(Some(RawVideoUnit {
        pts: header.pts,
        payload,
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
