//! Outgoing control channel: a bounded queue plus a sender thread.
//!
//! The input mapper pushes commands from the UI thread; the sender thread
//! serializes them and writes them to the control socket in push order.
//!
//! Stopping discards whatever is still queued. Input events that were not
//! sent before the user closed the window are stale by definition.

use std::io::Write;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use scrmirror_core::{encode_control_message, BoundedQueue, ControlMessage};
use tracing::{debug, info, trace, warn};

use super::{ChannelError, ChannelExit, ChannelState};

/// Queue capacity used when the configuration does not override it.
pub const DEFAULT_CONTROL_QUEUE_CAPACITY: usize = 64;

/// Cloneable producer side of the control channel.
#[derive(Clone)]
pub struct ControlHandle {
    queue: Arc<BoundedQueue<ControlMessage>>,
}

impl ControlHandle {
    /// Queues `msg` without blocking.
    ///
    /// # Errors
    ///
    /// Hands `msg` back when the queue is full or the channel has stopped;
    /// the caller treats it as dropped.
    pub fn push(&self, msg: ControlMessage) -> Result<(), ControlMessage> {
        self.queue.try_push(msg).map_err(|msg| {
            if self.queue.is_shutdown() {
                trace!(kind = ?msg.message_type(), "control channel stopped, dropping message");
            } else {
                debug!(kind = ?msg.message_type(), "control queue full, dropping message");
            }
            msg
        })
    }

    /// `true` once the channel has stopped and every push will be rejected.
    pub fn is_closed(&self) -> bool {
        self.queue.is_shutdown()
    }
}

pub struct ControlSender {
    queue: Arc<BoundedQueue<ControlMessage>>,
    state: ChannelState,
    thread: Option<JoinHandle<ChannelExit>>,
}

impl ControlSender {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(BoundedQueue::new(capacity)),
            state: ChannelState::Created,
            thread: None,
        }
    }

    /// Spawns the sender thread writing to `writer`.
    ///
    /// # Errors
    ///
    /// [`ChannelError::AlreadyStarted`] unless the channel is `Created`;
    /// [`ChannelError::Spawn`] if the OS refuses a new thread.
    pub fn start<W>(&mut self, writer: W) -> Result<(), ChannelError>
    where
        W: Write + Send + 'static,
    {
        if self.state != ChannelState::Created {
            return Err(ChannelError::AlreadyStarted);
        }
        let queue = Arc::clone(&self.queue);
        let handle = thread::Builder::new()
            .name("scrmirror-control".into())
            .spawn(move || run_sender(&queue, writer))
            .map_err(|source| ChannelError::Spawn {
                name: "control",
                source,
            })?;
        self.thread = Some(handle);
        self.state = ChannelState::Running;
        debug!("control sender started");
        Ok(())
    }

    pub fn push(&self, msg: ControlMessage) -> Result<(), ControlMessage> {
        self.handle().push(msg)
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Asks the sender thread to exit and drops every queued message.
    pub fn stop(&mut self) {
        let discarded = self.queue.close_and_discard();
        if discarded > 0 {
            debug!(discarded, "control messages discarded on stop");
        }
        if self.state == ChannelState::Running {
            self.state = ChannelState::Stopping;
        }
    }

    /// Waits for the sender thread. Returns `None` if it never started or was
    /// already joined.
    pub fn join(&mut self) -> Option<ChannelExit> {
        let handle = self.thread.take()?;
        let exit = match handle.join() {
            Ok(exit) => exit,
            Err(_) => {
                warn!("control sender thread panicked");
                ChannelExit::Stopped
            }
        };
        self.state = ChannelState::Joined;
        Some(exit)
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl Drop for ControlSender {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

fn run_sender<W: Write>(queue: &BoundedQueue<ControlMessage>, mut writer: W) -> ChannelExit {
    let exit = loop {
        let Ok(msg) = queue.blocking_take() else {
            break ChannelExit::Stopped;
        };
        let bytes = encode_control_message(&msg);
        if let Err(e) = writer.write_all(&bytes).and_then(|()| writer.flush()) {
            warn!("could not send control message: {e}");
            break ChannelExit::Io(e);
        }
        trace!(kind = ?msg.message_type(), len = bytes.len(), "control message sent");
    };
    // a dead socket must not keep accepting input
    queue.close_and_discard();
    info!("control sender stopped");
    exit
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::mpsc;
    use std::sync::Mutex;

    /// Writer that appends into a shared buffer and can be told to fail.
    #[derive(Clone, Default)]
    struct SharedWriter {
        bytes: Arc<Mutex<Vec<u8>>>,
        fail: bool,
    }

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            self.bytes.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Writer whose first write reports on `entered` and then waits for
    /// `release` before storing the bytes.
    struct GatedWriter {
        bytes: Arc<Mutex<Vec<u8>>>,
        entered: mpsc::Sender<()>,
        release: Option<mpsc::Receiver<()>>,
    }

    impl Write for GatedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Some(release) = self.release.take() {
                let _ = self.entered.send(());
                let _ = release.recv();
            }
            self.bytes.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_new_sender_is_created_and_accepts_pushes() {
        let sender = ControlSender::new(4);
        assert_eq!(sender.state(), ChannelState::Created);
        assert!(sender.push(ControlMessage::RotateDevice).is_ok());
        assert_eq!(sender.queued(), 1);
    }

    #[test]
    fn test_push_beyond_capacity_returns_message() {
        // Arrange
        let sender = ControlSender::new(2);
        sender.push(ControlMessage::GetClipboard).unwrap();
        sender.push(ControlMessage::GetClipboard).unwrap();

        // Act
        let rejected = sender.push(ControlMessage::RotateDevice);

        // Assert
        assert_eq!(rejected, Err(ControlMessage::RotateDevice));
    }

    #[test]
    fn test_messages_are_written_in_push_order() {
        // Arrange
        let writer = SharedWriter::default();
        let mut sender = ControlSender::new(8);
        sender.push(ControlMessage::BackOrScreenOn).unwrap();
        sender.push(ControlMessage::RotateDevice).unwrap();

        // Act
        sender.start(writer.clone()).unwrap();
        while sender.queued() > 0 {
            thread::yield_now();
        }
        // give the thread time to finish the last write_all
        thread::sleep(std::time::Duration::from_millis(20));
        sender.stop();
        let exit = sender.join();

        // Assert
        assert_eq!(*writer.bytes.lock().unwrap(), vec![4, 10]);
        assert!(matches!(exit, Some(ChannelExit::Stopped)));
        assert_eq!(sender.state(), ChannelState::Joined);
    }

    #[test]
    fn test_stop_before_start_discards_queue() {
        let mut sender = ControlSender::new(8);
        sender.push(ControlMessage::RotateDevice).unwrap();
        sender.stop();
        assert_eq!(sender.queued(), 0);
        assert!(sender.push(ControlMessage::RotateDevice).is_err());
        assert!(sender.join().is_none());
    }

    #[test]
    fn test_stop_lets_in_flight_message_finish_and_drops_the_rest() {
        // Arrange
        let bytes = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let writer = GatedWriter {
            bytes: Arc::clone(&bytes),
            entered: entered_tx,
            release: Some(release_rx),
        };
        let in_flight = ControlMessage::InjectText {
            text: "hello".to_string(),
        };
        let mut sender = ControlSender::new(8);
        sender.push(in_flight.clone()).unwrap();
        sender.push(ControlMessage::RotateDevice).unwrap();
        sender.start(writer).unwrap();
        entered_rx.recv().unwrap();

        // Act
        sender.stop();
        let queued_after_stop = sender.queued();
        release_tx.send(()).unwrap();
        let exit = sender.join();

        // Assert
        assert_eq!(queued_after_stop, 0);
        assert_eq!(*bytes.lock().unwrap(), encode_control_message(&in_flight));
        assert!(matches!(exit, Some(ChannelExit::Stopped)));
    }

    #[test]
    fn test_handle_reports_closed_after_stop() {
        // Arrange
        let mut sender = ControlSender::new(4);
        let handle = sender.handle();
        assert!(!handle.is_closed());

        // Act
        sender.stop();

        // Assert
        assert!(handle.is_closed());
        assert_eq!(
            handle.push(ControlMessage::GetClipboard),
            Err(ControlMessage::GetClipboard)
        );
    }

    #[test]
    fn test_write_failure_ends_thread_and_rejects_pushes() {
        // Arrange
        let writer = SharedWriter {
            fail: true,
            ..SharedWriter::default()
        };
        let mut sender = ControlSender::new(8);
        sender.push(ControlMessage::GetClipboard).unwrap();

        // Act
        sender.start(writer).unwrap();
        let exit = sender.join();

        // Assert
        assert!(matches!(exit, Some(ChannelExit::Io(_))));
        assert!(sender.push(ControlMessage::GetClipboard).is_err());
    }

    #[test]
    fn test_start_twice_fails() {
        let mut sender = ControlSender::new(1);
        sender.start(io::sink()).unwrap();
        assert!(matches!(
            sender.start(io::sink()),
            Err(ChannelError::AlreadyStarted)
        ));
    }
}
