//! Mock container muxer for tests.
//!
//! # Why a mock muxer?
//!
//! Real muxers write container files whose bytes are hard to assert on.
//! `MockMuxer` records every call in order so tests can check exactly which
//! header, packets, durations, and trailer reached the muxer.
//!
//! The call log lives behind an `Arc<Mutex<..>>`, so a clone kept by the
//! test observes the calls made by the copy moved into the recorder thread.
//!
//! # Failure injection
//!
//! `fail_on_packet(n)` makes the `n`-th `write_packet` call (zero-based) and
//! every later one fail, which exercises the recorder's failure path.

use std::sync::{Arc, Mutex};

use crate::application::record::{ContainerMuxer, MuxPacket, MuxerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MuxerCall {
    Header(Vec<u8>),
    Packet {
        pts: u64,
        duration: u64,
        key_frame: bool,
        data: Vec<u8>,
    },
    Trailer,
}

#[derive(Debug, Clone, Default)]
pub struct MockMuxer {
    calls: Arc<Mutex<Vec<MuxerCall>>>,
    fail_on_packet: Option<usize>,
    packets_seen: usize,
}

impl MockMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_packet(mut self, index: usize) -> Self {
        self.fail_on_packet = Some(index);
        self
    }

    /// Snapshot of all calls so far.
    pub fn calls(&self) -> Vec<MuxerCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Durations of the packets written so far, in order.
    pub fn durations(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MuxerCall::Packet { duration, .. } => Some(duration),
                _ => None,
            })
            .collect()
    }

    pub fn packet_timestamps(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MuxerCall::Packet { pts, .. } => Some(pts),
                _ => None,
            })
            .collect()
    }
}

impl ContainerMuxer for MockMuxer {
    fn write_header(&mut self, config: &[u8]) -> Result<(), MuxerError> {
        self.calls
            .lock()
            .unwrap()
            .push(MuxerCall::Header(config.to_vec()));
        Ok(())
    }

    fn write_packet(&mut self, packet: &MuxPacket<'_>) -> Result<(), MuxerError> {
        let index = self.packets_seen;
        self.packets_seen += 1;
        if self.fail_on_packet.is_some_and(|n| index >= n) {
            return Err(MuxerError::Other("mock write failure".into()));
        }
        self.calls.lock().unwrap().push(MuxerCall::Packet {
            pts: packet.pts,
            duration: packet.duration,
            key_frame: packet.key_frame,
            data: packet.data.to_vec(),
        });
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<(), MuxerError> {
        self.calls.lock().unwrap().push(MuxerCall::Trailer);
        Ok(())
    }
}
