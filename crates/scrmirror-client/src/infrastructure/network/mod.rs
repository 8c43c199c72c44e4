//! Socket-facing channels of the client.
//!
//! Architecture:
//! - [`ControlSender`] owns a queue of [`ControlMessage`]s and a thread that
//!   writes them to the control socket.
//! - [`DeviceReceiver`] owns a thread that reads device messages from the
//!   same socket and applies them (clipboard sync).
//!
//! Both run on plain OS threads with blocking I/O. A blocked read is released
//! by the peer closing the socket or by the session calling
//! `TcpStream::shutdown`.
//!
//! [`ControlMessage`]: scrmirror_core::ControlMessage

pub mod control_sender;
pub mod device_receiver;

use std::io;
use std::net::{SocketAddr, TcpStream};

use scrmirror_core::ProtocolError;
use thiserror::Error;
use tracing::info;

pub use control_sender::{ControlHandle, ControlSender, DEFAULT_CONTROL_QUEUE_CAPACITY};
pub use device_receiver::{DeviceReceiver, DEVICE_MSG_BUFFER_SIZE};

/// Errors raised while setting up or running a channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// TCP connection to the device failed.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// The worker thread could not be created.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
    /// `start` was called on a channel that is not in the `Created` state.
    #[error("channel already started")]
    AlreadyStarted,
    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Lifecycle of a channel worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Created,
    Running,
    Stopping,
    Joined,
}

/// Why a channel thread ended.
#[derive(Debug)]
pub enum ChannelExit {
    /// `stop()` was requested.
    Stopped,
    /// The peer closed the socket.
    PeerClosed,
    Io(io::Error),
    Malformed(ProtocolError),
}

/// Opens a blocking TCP connection with Nagle disabled.
///
/// # Errors
///
/// Returns [`ChannelError::ConnectFailed`] when the device is unreachable.
pub fn connect(addr: SocketAddr) -> Result<TcpStream, ChannelError> {
    let stream =
        TcpStream::connect(addr).map_err(|source| ChannelError::ConnectFailed { addr, source })?;
    stream.set_nodelay(true)?;
    info!("connected to {addr}");
    Ok(stream)
}
