//! Recorder: a packet queue drained by a writer thread.
//!
//! # Lifecycle
//!
//! ```text
//! new() ── start() ──► Running ── stop() ──► Stopping ── join() ──► Joined ── close()
//! ```
//!
//! Unlike the control channel, stopping the recorder *drains* the queue:
//! every packet accepted by [`Recorder::push`] ends up in the file unless a
//! write fails. After a write failure the recorder is marked failed, the
//! queue is emptied, and further pushes are rejected.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use scrmirror_core::BoundedQueue;
use tracing::{debug, error, info, warn};

use crate::application::record::{
    ContainerMuxer, PacketWriter, RecordError, RecordPacket, RecordingSummary,
};
use crate::infrastructure::network::ChannelState;

/// Queue capacity used when the configuration does not override it.
pub const DEFAULT_RECORD_QUEUE_CAPACITY: usize = 1024;

pub struct Recorder<M: ContainerMuxer + 'static> {
    queue: Arc<BoundedQueue<RecordPacket>>,
    failed: Arc<AtomicBool>,
    dropped: AtomicU64,
    writer: Option<PacketWriter<M>>,
    thread: Option<JoinHandle<PacketWriter<M>>>,
    state: ChannelState,
}

impl<M: ContainerMuxer + 'static> Recorder<M> {
    pub fn new(muxer: M, capacity: usize) -> Self {
        Self {
            queue: Arc::new(BoundedQueue::new(capacity)),
            failed: Arc::new(AtomicBool::new(false)),
            dropped: AtomicU64::new(0),
            writer: Some(PacketWriter::new(muxer)),
            thread: None,
            state: ChannelState::Created,
        }
    }

    /// Spawns the writer thread.
    ///
    /// # Errors
    ///
    /// [`RecordError::AlreadyStarted`] unless the recorder is `Created`;
    /// [`RecordError::Spawn`] if the thread cannot be created, after which
    /// the recorder is failed.
    pub fn start(&mut self) -> Result<(), RecordError> {
        if self.state != ChannelState::Created {
            return Err(RecordError::AlreadyStarted);
        }
        let Some(writer) = self.writer.take() else {
            return Err(RecordError::Failed);
        };
        let queue = Arc::clone(&self.queue);
        let failed = Arc::clone(&self.failed);

        let handle = thread::Builder::new()
            .name("scrmirror-recorder".into())
            .spawn(move || run_writer(&queue, writer, &failed))
            .map_err(|source| {
                self.failed.store(true, Ordering::Release);
                self.queue.close_and_discard();
                RecordError::Spawn(source)
            })?;

        self.thread = Some(handle);
        self.state = ChannelState::Running;
        debug!("recorder started");
        Ok(())
    }

    /// Queues a packet for writing without blocking.
    ///
    /// # Errors
    ///
    /// [`RecordError::Failed`] after a write failure or once stopped;
    /// [`RecordError::QueueFull`] when the writer is too far behind.
    /// Every rejected packet is counted in [`RecordingSummary::packets_dropped`].
    pub fn push(&self, packet: RecordPacket) -> Result<(), RecordError> {
        let result = if self.failed.load(Ordering::Acquire) {
            Err(RecordError::Failed)
        } else {
            self.queue.try_push(packet).map_err(|_| {
                if self.queue.is_shutdown() {
                    RecordError::Failed
                } else {
                    RecordError::QueueFull
                }
            })
        };
        if result.is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Packets rejected by [`push`](Self::push) so far.
    pub fn packets_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Rejects further packets and lets the writer drain the queue.
    pub fn stop(&mut self) {
        self.queue.signal_shutdown();
        if self.state == ChannelState::Running {
            self.state = ChannelState::Stopping;
        }
    }

    /// Waits for the writer thread to finish draining.
    pub fn join(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        match handle.join() {
            Ok(writer) => self.writer = Some(writer),
            Err(_) => {
                error!("recorder thread panicked");
                self.failed.store(true, Ordering::Release);
            }
        }
        self.state = ChannelState::Joined;
    }

    /// Finalizes the file and reports what was recorded.
    ///
    /// Stops and joins the writer first if the caller has not.
    pub fn close(mut self) -> RecordingSummary {
        self.stop();
        self.join();

        let mut failed = self.failed.load(Ordering::Acquire);
        let packets_dropped = self.packets_dropped();
        let Some(mut writer) = self.writer.take() else {
            return RecordingSummary {
                packets_dropped,
                failed: true,
                ..RecordingSummary::default()
            };
        };

        match writer.finish() {
            Ok(()) if !failed => info!(
                packets = writer.packets_written(),
                "recording complete"
            ),
            Ok(()) => warn!(
                packets = writer.packets_written(),
                "recording finalized after a write failure"
            ),
            Err(RecordError::Empty) => {
                warn!("recording is empty, no header was written");
                failed = true;
            }
            Err(e) => {
                error!("could not finalize recording: {e}");
                failed = true;
            }
        }

        if packets_dropped > 0 {
            warn!(dropped = packets_dropped, "recording is missing packets");
        }

        RecordingSummary {
            packets_written: writer.packets_written(),
            packets_dropped,
            header_written: writer.header_written(),
            failed,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }
}

impl<M: ContainerMuxer + 'static> Drop for Recorder<M> {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn run_writer<M: ContainerMuxer>(
    queue: &BoundedQueue<RecordPacket>,
    mut writer: PacketWriter<M>,
    failed: &AtomicBool,
) -> PacketWriter<M> {
    while let Ok(packet) = queue.blocking_take() {
        if let Err(e) = writer.write(packet) {
            error!("could not record packet: {e}");
            failed.store(true, Ordering::Release);
            writer.discard_held();
            let discarded = queue.close_and_discard();
            debug!(discarded, "recorder queue discarded after failure");
            return writer;
        }
    }

    // queue drained after stop
    if let Err(e) = writer.flush() {
        error!("could not record last packet: {e}");
        failed.store(true, Ordering::Release);
    }
    writer
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::record::FIXED_LAST_DURATION_US;
    use crate::infrastructure::recording::mock::{MockMuxer, MuxerCall};

    #[test]
    fn test_push_before_start_is_queued_and_written() {
        // Arrange
        let muxer = MockMuxer::new();
        let mut recorder = Recorder::new(muxer.clone(), 8);
        recorder.push(RecordPacket::config(vec![7])).unwrap();
        recorder.push(RecordPacket::media(0, vec![1], true)).unwrap();

        // Act
        recorder.start().unwrap();
        let summary = recorder.close();

        // Assert
        assert_eq!(summary.packets_written, 1);
        assert!(!summary.failed);
        assert_eq!(
            muxer.calls(),
            vec![
                MuxerCall::Header(vec![7]),
                MuxerCall::Packet {
                    pts: 0,
                    duration: FIXED_LAST_DURATION_US,
                    key_frame: true,
                    data: vec![1],
                },
                MuxerCall::Trailer,
            ]
        );
    }

    #[test]
    fn test_push_after_stop_is_rejected() {
        let mut recorder = Recorder::new(MockMuxer::new(), 8);
        recorder.start().unwrap();
        recorder.stop();
        assert!(matches!(
            recorder.push(RecordPacket::config(vec![1])),
            Err(RecordError::Failed)
        ));
    }

    #[test]
    fn test_full_queue_reports_queue_full() {
        let recorder = Recorder::new(MockMuxer::new(), 1);
        recorder.push(RecordPacket::config(vec![1])).unwrap();
        assert!(matches!(
            recorder.push(RecordPacket::media(0, vec![1], true)),
            Err(RecordError::QueueFull)
        ));
    }

    #[test]
    fn test_rejected_packets_are_reported_in_summary() {
        // Arrange
        let muxer = MockMuxer::new();
        let mut recorder = Recorder::new(muxer.clone(), 2);
        recorder.push(RecordPacket::config(vec![7])).unwrap();
        recorder.push(RecordPacket::media(0, vec![1], true)).unwrap();

        // Act
        let second = recorder.push(RecordPacket::media(10, vec![2], false));
        let third = recorder.push(RecordPacket::media(20, vec![3], false));
        recorder.start().unwrap();
        let summary = recorder.close();

        // Assert
        assert!(matches!(second, Err(RecordError::QueueFull)));
        assert!(matches!(third, Err(RecordError::QueueFull)));
        assert_eq!(summary.packets_written, 1);
        assert_eq!(summary.packets_dropped, 2);
        assert!(!summary.is_complete());
        assert_eq!(muxer.packet_timestamps(), vec![0]);
    }

    #[test]
    fn test_stop_drains_packets_pushed_while_running() {
        // Arrange
        let muxer = MockMuxer::new();
        let mut recorder = Recorder::new(muxer.clone(), 8);
        recorder.start().unwrap();

        // Act
        recorder.push(RecordPacket::config(vec![9])).unwrap();
        for pts in [100, 200, 300] {
            recorder.push(RecordPacket::media(pts, vec![1], false)).unwrap();
        }
        recorder.stop();
        recorder.join();

        // Assert
        assert_eq!(recorder.state(), ChannelState::Joined);
        assert_eq!(muxer.packet_timestamps(), vec![100, 200, 300]);
        assert_eq!(muxer.durations(), vec![100, 100, FIXED_LAST_DURATION_US]);
        let summary = recorder.close();
        assert_eq!(summary.packets_written, 3);
        assert!(summary.is_complete());
    }

    #[test]
    fn test_close_without_packets_is_failed() {
        let muxer = MockMuxer::new();
        let mut recorder = Recorder::new(muxer.clone(), 4);
        recorder.start().unwrap();

        let summary = recorder.close();

        assert!(summary.failed);
        assert!(!summary.header_written);
        assert!(muxer.calls().is_empty());
    }

    #[test]
    fn test_first_media_packet_fails_recording() {
        // Arrange
        let mut recorder = Recorder::new(MockMuxer::new(), 4);
        recorder.push(RecordPacket::media(5, vec![1], true)).unwrap();

        // Act
        recorder.start().unwrap();
        recorder.stop();
        recorder.join();

        // Assert
        assert!(recorder.is_failed());
        assert!(matches!(
            recorder.push(RecordPacket::config(vec![1])),
            Err(RecordError::Failed)
        ));
        assert!(recorder.close().failed);
    }

    #[test]
    fn test_start_twice_fails() {
        let mut recorder = Recorder::new(MockMuxer::new(), 4);
        recorder.start().unwrap();
        assert!(recorder.start().is_err());
    }
}
